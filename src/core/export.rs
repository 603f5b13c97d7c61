use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::store::{Link, Project};

/// Full-backup document as produced by the original dashboard's exporter:
/// the two project buckets plus the global links, stamped with the export
/// time. Courses are not part of the format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardBackup {
    pub ideas: Vec<Project>,
    pub completed: Vec<Project>,
    pub links: Vec<Link>,
    pub exported_at: String,
}

/// Decode and validate a backup document. The three top-level sequences must
/// all be present; anything less is rejected before any state is touched.
pub fn parse_backup(json: &str) -> anyhow::Result<BoardBackup> {
    let doc: Value = serde_json::from_str(json).context("Backup is not valid JSON")?;
    for field in ["ideas", "completed", "links"] {
        if !doc.get(field).map(Value::is_array).unwrap_or(false) {
            anyhow::bail!("Backup is missing the {field:?} sequence");
        }
    }
    serde_json::from_value(doc).context("Backup entries are malformed")
}

/// One flattened spreadsheet-style row per project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub id: String,
    pub title: String,
    pub status: String,
    pub progress: u8,
    pub tags: String,
    pub requirement_count: usize,
    pub link_count: usize,
    pub note_count: usize,
    pub due_date: String,
    pub repo_url: String,
}

impl ProjectRow {
    pub const HEADER: [&'static str; 10] = [
        "id",
        "title",
        "status",
        "progress",
        "tags",
        "requirements",
        "links",
        "notes",
        "due_date",
        "repo_url",
    ];

    pub fn tsv(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.title,
            self.status,
            self.progress,
            self.tags,
            self.requirement_count,
            self.link_count,
            self.note_count,
            self.due_date,
            self.repo_url,
        )
    }
}

pub fn flatten_projects(ideas: &[Project], completed: &[Project]) -> Vec<ProjectRow> {
    let row = |project: &Project, status: &str| ProjectRow {
        id: project.id.clone(),
        title: project.title.clone(),
        status: status.to_owned(),
        progress: project.progress,
        tags: project.tags.join(", "),
        requirement_count: project.requirements.len(),
        link_count: project.links.len(),
        note_count: project.notes.len(),
        due_date: project.due_date.clone().unwrap_or_default(),
        repo_url: project.repo_url.clone().unwrap_or_default(),
    };
    ideas
        .iter()
        .map(|p| row(p, "ideas"))
        .chain(completed.iter().map(|p| row(p, "completed")))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
}

impl LinkRow {
    pub const HEADER: [&'static str; 4] = ["id", "title", "url", "description"];

    pub fn tsv(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.id, self.title, self.url, self.description
        )
    }
}

pub fn flatten_links(links: &[Link]) -> Vec<LinkRow> {
    links
        .iter()
        .map(|link| LinkRow {
            id: link.id.clone(),
            title: link.title.clone(),
            url: link.url.clone(),
            description: link.description.clone().unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backup_rejects_missing_sequences() {
        let err = parse_backup(r#"{"ideas": [], "completed": []}"#).unwrap_err();
        assert!(err.to_string().contains("links"));

        let err = parse_backup(r#"{"ideas": {}, "completed": [], "links": []}"#).unwrap_err();
        assert!(err.to_string().contains("ideas"));

        assert!(parse_backup("not json at all").is_err());
    }

    #[test]
    fn parse_backup_accepts_minimal_document() {
        let backup = parse_backup(
            r#"{"ideas": [], "completed": [], "links": [], "exportedAt": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(backup.ideas.is_empty());
        assert_eq!(backup.exported_at, "2024-01-01T00:00:00Z");
    }
}
