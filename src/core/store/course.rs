use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::core::store::model::{LinkRef, Note};

/// A tracked course. Completion is a flag, not a bucket move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub links: Vec<LinkRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewCourse {
    pub name: String,
    pub links: Vec<LinkRef>,
    pub logo: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub completed: Option<bool>,
    pub links: Option<Vec<LinkRef>>,
    pub logo: Option<Option<String>>,
    pub reason: Option<Option<String>>,
}

impl Course {
    pub(crate) fn merged(&self, update: CourseUpdate) -> Course {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.name = name;
        }
        if let Some(completed) = update.completed {
            next.completed = completed;
        }
        if let Some(links) = update.links {
            next.links = links;
        }
        if let Some(logo) = update.logo {
            next.logo = logo;
        }
        if let Some(reason) = update.reason {
            next.reason = reason;
        }
        next
    }
}

pub trait CourseStore {
    fn save_course(&self, course: &Course) -> impl Future<Output = anyhow::Result<()>>;
    fn delete_course(&self, id: &str) -> impl Future<Output = bool>;
    fn persist_course_order(&self, ids: &[String]) -> impl Future<Output = anyhow::Result<()>>;
}
