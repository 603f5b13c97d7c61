use std::{path::Path, sync::Arc};

use anyhow::Context;
use serde::de::DeserializeOwned;
use sqlx::{Connection, Row, sqlite::SqliteRow};
use tracing::warn;

use crate::core::store::{
    blob::BlobStore,
    course::{Course, CourseStore},
    link::{Link, LinkStore},
    model::{BoardData, ProjectStatus},
    project::{Project, ProjectStore},
    settings::{Settings, SettingsStore},
    state::StoreState,
};

/// Gateway to the single-file SQLite board store. Structured sub-fields are
/// JSON-encoded TEXT columns; decoding degrades malformed content to a
/// type-appropriate default instead of surfacing it.
#[derive(Debug)]
pub struct DatabaseBackend {
    state: Arc<StoreState>,
    blobs: BlobStore,
}

impl DatabaseBackend {
    pub(super) async fn open<P: AsRef<Path>>(board_file: P) -> anyhow::Result<Self> {
        let state = Arc::new(StoreState::new(board_file).await?);
        let blobs = BlobStore::open(state.blob_dir())?;
        Ok(Self { state, blobs })
    }

    pub(super) fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Checkpoint the database and repack the `.trackboard` archive.
    pub(super) async fn save(&self) -> anyhow::Result<()> {
        self.state.save_board().await
    }

    pub(super) async fn load_board(&self) -> anyhow::Result<BoardData> {
        Ok(BoardData {
            ideas: self.list_projects(ProjectStatus::Ideas).await?,
            completed: self.list_projects(ProjectStatus::Completed).await?,
            courses: self.list_courses().await?,
            links: self.list_links().await?,
        })
    }

    async fn list_projects(&self, status: ProjectStatus) -> anyhow::Result<Vec<Project>> {
        let mut conn = self.state.conn().await?;
        let rows = sqlx::query(
            r#"SELECT id, title, description, requirements, logo, links, notes, progress,
                      tags, repo_url, api_keys, api_key_pin, due_date
               FROM projects
               WHERE status = $1
               ORDER BY position ASC, id ASC"#,
        )
        .bind(status.as_str())
        .fetch_all(&mut **conn)
        .await?;
        Ok(rows.iter().map(project_from_row).collect())
    }

    async fn list_courses(&self) -> anyhow::Result<Vec<Course>> {
        let mut conn = self.state.conn().await?;
        let rows = sqlx::query(
            r#"SELECT id, name, completed, links, logo, notes, reason
               FROM courses
               ORDER BY position ASC, id ASC"#,
        )
        .fetch_all(&mut **conn)
        .await?;
        Ok(rows
            .iter()
            .map(|row| Course {
                id: row.get("id"),
                name: row.get("name"),
                completed: row.get::<i64, _>("completed") != 0,
                links: decode_json(row.get("links"), "courses", "links"),
                logo: row.get("logo"),
                notes: decode_json(row.get("notes"), "courses", "notes"),
                reason: row.get("reason"),
            })
            .collect())
    }

    async fn list_links(&self) -> anyhow::Result<Vec<Link>> {
        let mut conn = self.state.conn().await?;
        let rows = sqlx::query(
            r#"SELECT id, title, url, description
               FROM links
               ORDER BY position ASC, id ASC"#,
        )
        .fetch_all(&mut **conn)
        .await?;
        Ok(rows
            .iter()
            .map(|row| Link {
                id: row.get("id"),
                title: row.get("title"),
                url: row.get("url"),
                description: row.get("description"),
            })
            .collect())
    }

    /// Wholesale replacement of the project and link tables, used by the
    /// import flow. Courses are not part of the backup document and stay put.
    pub(super) async fn replace_board(
        &self,
        ideas: &[Project],
        completed: &[Project],
        links: &[Link],
    ) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin().await?;
        sqlx::query("DELETE FROM projects").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM links").execute(&mut *tx).await?;
        for (bucket, status) in [
            (ideas, ProjectStatus::Ideas),
            (completed, ProjectStatus::Completed),
        ] {
            for (position, project) in bucket.iter().enumerate() {
                sqlx::query(
                    r#"INSERT INTO projects
                       (id, title, description, requirements, logo, links, notes, progress,
                        tags, repo_url, api_keys, api_key_pin, due_date, status, position)
                       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"#,
                )
                .bind(&project.id)
                .bind(&project.title)
                .bind(&project.description)
                .bind(serde_json::to_string(&project.requirements)?)
                .bind(&project.logo)
                .bind(serde_json::to_string(&project.links)?)
                .bind(serde_json::to_string(&project.notes)?)
                .bind(i64::from(project.progress))
                .bind(serde_json::to_string(&project.tags)?)
                .bind(&project.repo_url)
                .bind(encode_opt_json(&project.api_keys)?)
                .bind(&project.api_key_pin)
                .bind(&project.due_date)
                .bind(status.as_str())
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
            }
        }
        for (position, link) in links.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO links (id, title, url, description, position)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(&link.id)
            .bind(&link.title)
            .bind(&link.url)
            .bind(&link.description)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_row(&self, sql: &'static str, id: &str) -> anyhow::Result<bool> {
        let mut conn = self.state.conn().await?;
        let result = sqlx::query(sql).bind(id).execute(&mut **conn).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn persist_order(
        &self,
        sql: &'static str,
        ids: &[String],
        status: Option<ProjectStatus>,
    ) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin().await?;
        for (position, id) in ids.iter().enumerate() {
            let query = sqlx::query(sql).bind(position as i64).bind(id);
            let query = match status {
                Some(status) => query.bind(status.as_str()),
                None => query,
            };
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

impl ProjectStore for DatabaseBackend {
    async fn save_project(&self, project: &Project, status: ProjectStatus) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        // Insert appends at the end of the target bucket; on conflict the row
        // keeps its position unless it changed bucket, in which case it moves
        // to the end of the destination.
        sqlx::query(
            r#"INSERT INTO projects
               (id, title, description, requirements, logo, links, notes, progress,
                tags, repo_url, api_keys, api_key_pin, due_date, status, position)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                       (SELECT COALESCE(MAX(position), -1) + 1 FROM projects WHERE status = $14))
               ON CONFLICT (id) DO UPDATE SET
                   title = excluded.title,
                   description = excluded.description,
                   requirements = excluded.requirements,
                   logo = excluded.logo,
                   links = excluded.links,
                   notes = excluded.notes,
                   progress = excluded.progress,
                   tags = excluded.tags,
                   repo_url = excluded.repo_url,
                   api_keys = excluded.api_keys,
                   api_key_pin = excluded.api_key_pin,
                   due_date = excluded.due_date,
                   position = CASE WHEN projects.status = excluded.status
                                   THEN projects.position ELSE excluded.position END,
                   status = excluded.status"#,
        )
        .bind(&project.id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(serde_json::to_string(&project.requirements)?)
        .bind(&project.logo)
        .bind(serde_json::to_string(&project.links)?)
        .bind(serde_json::to_string(&project.notes)?)
        .bind(i64::from(project.progress))
        .bind(serde_json::to_string(&project.tags)?)
        .bind(&project.repo_url)
        .bind(encode_opt_json(&project.api_keys)?)
        .bind(&project.api_key_pin)
        .bind(&project.due_date)
        .bind(status.as_str())
        .execute(&mut **conn)
        .await
        .with_context(|| format!("Failed to save project {:?}", project.id))?;
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> bool {
        match self.delete_row("DELETE FROM projects WHERE id = $1", id).await {
            Ok(deleted) => deleted,
            Err(err) => {
                warn!(id, %err, "project delete failed");
                false
            }
        }
    }

    async fn persist_project_order(
        &self,
        status: ProjectStatus,
        ids: &[String],
    ) -> anyhow::Result<()> {
        self.persist_order(
            "UPDATE projects SET position = $1 WHERE id = $2 AND status = $3",
            ids,
            Some(status),
        )
        .await
    }
}

impl CourseStore for DatabaseBackend {
    async fn save_course(&self, course: &Course) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO courses (id, name, completed, links, logo, notes, reason, position)
               VALUES ($1, $2, $3, $4, $5, $6, $7,
                       (SELECT COALESCE(MAX(position), -1) + 1 FROM courses))
               ON CONFLICT (id) DO UPDATE SET
                   name = excluded.name,
                   completed = excluded.completed,
                   links = excluded.links,
                   logo = excluded.logo,
                   notes = excluded.notes,
                   reason = excluded.reason"#,
        )
        .bind(&course.id)
        .bind(&course.name)
        .bind(i64::from(course.completed))
        .bind(serde_json::to_string(&course.links)?)
        .bind(&course.logo)
        .bind(serde_json::to_string(&course.notes)?)
        .bind(&course.reason)
        .execute(&mut **conn)
        .await
        .with_context(|| format!("Failed to save course {:?}", course.id))?;
        Ok(())
    }

    async fn delete_course(&self, id: &str) -> bool {
        match self.delete_row("DELETE FROM courses WHERE id = $1", id).await {
            Ok(deleted) => deleted,
            Err(err) => {
                warn!(id, %err, "course delete failed");
                false
            }
        }
    }

    async fn persist_course_order(&self, ids: &[String]) -> anyhow::Result<()> {
        self.persist_order("UPDATE courses SET position = $1 WHERE id = $2", ids, None)
            .await
    }
}

impl LinkStore for DatabaseBackend {
    async fn save_link(&self, link: &Link) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        sqlx::query(
            r#"INSERT INTO links (id, title, url, description, position)
               VALUES ($1, $2, $3, $4,
                       (SELECT COALESCE(MAX(position), -1) + 1 FROM links))
               ON CONFLICT (id) DO UPDATE SET
                   title = excluded.title,
                   url = excluded.url,
                   description = excluded.description"#,
        )
        .bind(&link.id)
        .bind(&link.title)
        .bind(&link.url)
        .bind(&link.description)
        .execute(&mut **conn)
        .await
        .with_context(|| format!("Failed to save link {:?}", link.id))?;
        Ok(())
    }

    async fn delete_link(&self, id: &str) -> bool {
        match self.delete_row("DELETE FROM links WHERE id = $1", id).await {
            Ok(deleted) => deleted,
            Err(err) => {
                warn!(id, %err, "link delete failed");
                false
            }
        }
    }

    async fn persist_link_order(&self, ids: &[String]) -> anyhow::Result<()> {
        self.persist_order("UPDATE links SET position = $1 WHERE id = $2", ids, None)
            .await
    }
}

impl SettingsStore for DatabaseBackend {
    async fn read_settings(&self) -> anyhow::Result<Settings> {
        let mut conn = self.state.conn().await?;
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&mut **conn)
            .await?;
        let mut settings = Settings::default();
        for row in rows {
            let key: String = row.get("key");
            let value: String = row.get("value");
            match key.as_str() {
                "theme" => settings.theme = value,
                "pin" => settings.pin = Some(value),
                "profileName" => settings.profile_name = value,
                _ => {}
            }
        }
        Ok(settings)
    }

    async fn write_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut conn = self.state.conn().await?;
        let mut tx = conn.begin().await?;
        let mut items = vec![
            ("theme", settings.theme.clone()),
            ("profileName", settings.profile_name.clone()),
        ];
        if let Some(pin) = &settings.pin {
            items.push(("pin", pin.clone()));
        } else {
            sqlx::query("DELETE FROM settings WHERE key = 'pin'")
                .execute(&mut *tx)
                .await?;
        }
        for (key, value) in items {
            sqlx::query(
                r#"INSERT INTO settings (key, value) VALUES ($1, $2)
                   ON CONFLICT (key) DO UPDATE SET value = excluded.value"#,
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn project_from_row(row: &SqliteRow) -> Project {
    Project {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        requirements: decode_json(row.get("requirements"), "projects", "requirements"),
        logo: row.get("logo"),
        links: decode_json(row.get("links"), "projects", "links"),
        notes: decode_json(row.get("notes"), "projects", "notes"),
        progress: (row.get::<i64, _>("progress").clamp(0, 100)) as u8,
        tags: decode_json(row.get("tags"), "projects", "tags"),
        repo_url: row.get("repo_url"),
        api_keys: row
            .get::<Option<String>, _>("api_keys")
            .map(|raw| decode_json(raw, "projects", "api_keys")),
        api_key_pin: row.get("api_key_pin"),
        due_date: row.get("due_date"),
    }
}

/// Decode a JSON text column, degrading malformed content to the type's
/// default. The caller never sees the error.
fn decode_json<T: DeserializeOwned + Default>(raw: String, table: &str, column: &str) -> T {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(table, column, %err, "malformed JSON column, using default");
            T::default()
        }
    }
}

fn encode_opt_json<T: serde::Serialize>(value: &Option<T>) -> anyhow::Result<Option<String>> {
    Ok(match value {
        Some(value) => Some(serde_json::to_string(value)?),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::model::{LinkRef, Requirements};

    #[test]
    fn malformed_json_column_degrades_to_default() {
        let links: Vec<LinkRef> = decode_json("{not json".to_owned(), "projects", "links");
        assert!(links.is_empty());

        let requirements: Requirements =
            decode_json("[\"truncated\"".to_owned(), "projects", "requirements");
        assert_eq!(requirements, Requirements::default());

        let tags: Vec<String> = decode_json("[\"ok\"]".to_owned(), "projects", "tags");
        assert_eq!(tags, vec!["ok".to_owned()]);
    }
}
