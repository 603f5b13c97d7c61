use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::core::store::model::{ApiKey, LinkRef, Note, ProjectStatus, Requirements};

/// A tracked project. Lives in exactly one of the ideas/completed buckets.
///
/// Wire names are camelCase to stay compatible with the backup documents the
/// original dashboard produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub links: Vec<LinkRef>,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_keys: Option<Vec<ApiKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_pin: Option<String>,
}

/// Input for creating a project. The id is minted by the store; progress
/// starts at 0 and notes empty.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub requirements: Requirements,
    pub links: Vec<LinkRef>,
    pub logo: String,
    pub tags: Vec<String>,
    pub repo_url: Option<String>,
    pub due_date: Option<String>,
}

/// Partial update; `None` leaves the field untouched. Double-`Option` fields
/// distinguish "leave as is" from "clear".
#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<Requirements>,
    pub links: Option<Vec<LinkRef>>,
    pub logo: Option<String>,
    pub progress: Option<u8>,
    pub tags: Option<Vec<String>>,
    pub repo_url: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub api_keys: Option<Option<Vec<ApiKey>>>,
    pub api_key_pin: Option<Option<String>>,
}

impl Project {
    /// Merge an update into a copy of this project. Progress is clamped to
    /// the 0..=100 range.
    pub(crate) fn merged(&self, update: ProjectUpdate) -> Project {
        let mut next = self.clone();
        if let Some(title) = update.title {
            next.title = title;
        }
        if let Some(description) = update.description {
            next.description = description;
        }
        if let Some(requirements) = update.requirements {
            next.requirements = requirements;
        }
        if let Some(links) = update.links {
            next.links = links;
        }
        if let Some(logo) = update.logo {
            next.logo = logo;
        }
        if let Some(progress) = update.progress {
            next.progress = progress.min(100);
        }
        if let Some(tags) = update.tags {
            next.tags = tags;
        }
        if let Some(repo_url) = update.repo_url {
            next.repo_url = repo_url;
        }
        if let Some(due_date) = update.due_date {
            next.due_date = due_date;
        }
        if let Some(api_keys) = update.api_keys {
            next.api_keys = api_keys;
        }
        if let Some(api_key_pin) = update.api_key_pin {
            next.api_key_pin = api_key_pin;
        }
        next
    }
}

pub trait ProjectStore {
    /// Upsert keyed by id: an existing row is fully overwritten, a new row is
    /// appended at the end of its bucket.
    fn save_project(
        &self,
        project: &Project,
        status: ProjectStatus,
    ) -> impl Future<Output = anyhow::Result<()>>;
    /// Returns false for unknown ids and for internal failures, which are
    /// logged rather than propagated.
    fn delete_project(&self, id: &str) -> impl Future<Output = bool>;
    fn persist_project_order(
        &self,
        status: ProjectStatus,
        ids: &[String],
    ) -> impl Future<Output = anyhow::Result<()>>;
}
