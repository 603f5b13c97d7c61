use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::store::{course::Course, link::Link, project::Project};

/// A dated note attached to a project or course. Never listed on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub date: String,
    pub content: String,
}

/// A titled URL embedded in a project or course record (distinct from the
/// global [`Link`] collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub label: String,
    pub value: String,
}

/// Project requirements as stored by the original exporter: either one
/// free-text block or an ordered list of discrete items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirements {
    Text(String),
    List(Vec<String>),
}

impl Default for Requirements {
    fn default() -> Self {
        Requirements::List(Vec::new())
    }
}

impl Requirements {
    pub fn is_empty(&self) -> bool {
        match self {
            Requirements::Text(text) => text.is_empty(),
            Requirements::List(items) => items.is_empty(),
        }
    }

    /// Number of discrete items; a non-empty text block counts as one.
    pub fn len(&self) -> usize {
        match self {
            Requirements::Text(text) => usize::from(!text.is_empty()),
            Requirements::List(items) => items.len(),
        }
    }
}

/// Which of the two mutually-exclusive project buckets a project lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Ideas,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Ideas => "ideas",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn other(self) -> Self {
        match self {
            ProjectStatus::Ideas => ProjectStatus::Completed,
            ProjectStatus::Completed => ProjectStatus::Ideas,
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ideas" => Ok(ProjectStatus::Ideas),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(anyhow::anyhow!("invalid project status: {other:?}")),
        }
    }
}

/// Full board contents as loaded from a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardData {
    pub ideas: Vec<Project>,
    pub completed: Vec<Project>,
    pub courses: Vec<Course>,
    pub links: Vec<Link>,
}

/// Opaque entity id, minted once at creation and never reassigned.
pub(crate) fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("UTC timestamp formats as RFC 3339")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_decode_both_shapes() {
        let text: Requirements = serde_json::from_str("\"write the parser\"").unwrap();
        assert_eq!(text, Requirements::Text("write the parser".into()));

        let list: Requirements = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(list, Requirements::List(vec!["a".into(), "b".into()]));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [ProjectStatus::Ideas, ProjectStatus::Completed] {
            assert_eq!(ProjectStatus::try_from(status.as_str()).unwrap(), status);
        }
        assert!(ProjectStatus::try_from("archived").is_err());
    }
}
