use std::future::Future;

use serde::{Deserialize, Serialize};

/// A standalone bookmarked link, independent of any project or course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewLink {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LinkUpdate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<Option<String>>,
}

impl Link {
    pub(crate) fn merged(&self, update: LinkUpdate) -> Link {
        let mut next = self.clone();
        if let Some(title) = update.title {
            next.title = title;
        }
        if let Some(url) = update.url {
            next.url = url;
        }
        if let Some(description) = update.description {
            next.description = description;
        }
        next
    }
}

pub trait LinkStore {
    fn save_link(&self, link: &Link) -> impl Future<Output = anyhow::Result<()>>;
    fn delete_link(&self, id: &str) -> impl Future<Output = bool>;
    fn persist_link_order(&self, ids: &[String]) -> impl Future<Output = anyhow::Result<()>>;
}
