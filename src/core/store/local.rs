use std::path::Path;

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};

use crate::core::store::{
    blob::BlobStore,
    course::{Course, CourseStore},
    kv::KvStore,
    link::{Link, LinkStore},
    model::{BoardData, ProjectStatus},
    project::{Project, ProjectStore},
    settings::{Settings, SettingsStore},
};

const KEY_IDEAS: &str = "ideas";
const KEY_COMPLETED: &str = "completed";
const KEY_COURSES: &str = "courses";
const KEY_LINKS: &str = "links";
const KEY_SETTINGS: &str = "settings";
const BLOB_DIR_NAME: &str = "blobs";

/// Backend storing each collection as one JSON document in a [`KvStore`]
/// directory, with logo payloads in a sibling blob directory. List order in
/// the document is the persisted display order.
#[derive(Debug)]
pub struct LocalBackend {
    kv: KvStore,
    blobs: BlobStore,
}

impl LocalBackend {
    pub(super) fn open<P: AsRef<Path>>(data_dir: P) -> anyhow::Result<Self> {
        let data_dir = data_dir.as_ref();
        Ok(Self {
            kv: KvStore::open(data_dir)?,
            blobs: BlobStore::open(data_dir.join(BLOB_DIR_NAME))?,
        })
    }

    pub(super) fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub(super) fn kv(&self) -> &KvStore {
        &self.kv
    }

    pub(super) async fn load_board(&self) -> anyhow::Result<BoardData> {
        Ok(BoardData {
            ideas: self.kv.read(KEY_IDEAS, Vec::new()).await,
            completed: self.kv.read(KEY_COMPLETED, Vec::new()).await,
            courses: self.kv.read(KEY_COURSES, Vec::new()).await,
            links: self.kv.read(KEY_LINKS, Vec::new()).await,
        })
    }

    pub(super) async fn replace_board(
        &self,
        ideas: &[Project],
        completed: &[Project],
        links: &[Link],
    ) -> anyhow::Result<()> {
        self.kv.write(KEY_IDEAS, &ideas).await?;
        self.kv.write(KEY_COMPLETED, &completed).await?;
        self.kv.write(KEY_LINKS, &links).await?;
        Ok(())
    }

    /// Read-modify-write of one collection document. The disk copy is the
    /// source of truth here, not the facade's optimistic state.
    async fn upsert<T, F>(&self, key: &str, apply: F) -> anyhow::Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>),
    {
        let mut items: Vec<T> = self.kv.read(key, Vec::new()).await;
        apply(&mut items);
        self.kv
            .write(key, &items)
            .await
            .with_context(|| format!("Failed to persist collection {key:?}"))
    }

    async fn remove_by_id<T, F>(&self, key: &str, id: &str, id_of: F) -> anyhow::Result<bool>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> &str,
    {
        let mut items: Vec<T> = self.kv.read(key, Vec::new()).await;
        let before = items.len();
        items.retain(|item| id_of(item) != id);
        if items.len() == before {
            return Ok(false);
        }
        self.kv.write(key, &items).await?;
        Ok(true)
    }

    async fn reorder_by_ids<T, F>(&self, key: &str, ids: &[String], id_of: F) -> anyhow::Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(&T) -> &str,
    {
        let items: Vec<T> = self.kv.read(key, Vec::new()).await;
        let mut remaining: Vec<Option<T>> = items.into_iter().map(Some).collect();
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            if let Some(slot) = remaining
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|item| id_of(item) == *id))
            {
                ordered.extend(slot.take());
            }
        }
        // Ids missing from the requested order keep their relative position
        // at the tail rather than getting dropped.
        ordered.extend(remaining.into_iter().flatten());
        self.kv.write(key, &ordered).await
    }
}

fn status_key(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Ideas => KEY_IDEAS,
        ProjectStatus::Completed => KEY_COMPLETED,
    }
}

impl ProjectStore for LocalBackend {
    async fn save_project(&self, project: &Project, status: ProjectStatus) -> anyhow::Result<()> {
        // Destination first: if this write fails, the source document is
        // still untouched on disk.
        let dest = status_key(status);
        let mut dest_items: Vec<Project> = self.kv.read(dest, Vec::new()).await;
        let dest_snapshot = dest_items.clone();
        match dest_items.iter_mut().find(|p| p.id == project.id) {
            Some(slot) => *slot = project.clone(),
            None => dest_items.push(project.clone()),
        }
        self.kv
            .write(dest, &dest_items)
            .await
            .with_context(|| format!("Failed to persist collection {dest:?}"))?;

        // A bucket move must never leave a copy behind in the source. If the
        // removal cannot be written, put the destination document back so a
        // reload observes exactly one copy.
        let source = status_key(status.other());
        let mut source_items: Vec<Project> = self.kv.read(source, Vec::new()).await;
        let before = source_items.len();
        source_items.retain(|p| p.id != project.id);
        if source_items.len() != before {
            if let Err(err) = self.kv.write(source, &source_items).await {
                if let Err(restore_err) = self.kv.write(dest, &dest_snapshot).await {
                    tracing::warn!(collection = dest, %restore_err, "failed to restore destination after source write failure");
                }
                return Err(err);
            }
        }
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> bool {
        for key in [KEY_IDEAS, KEY_COMPLETED] {
            match self.remove_by_id::<Project, _>(key, id, |p| &p.id).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(id, %err, "project delete failed");
                    return false;
                }
            }
        }
        false
    }

    async fn persist_project_order(
        &self,
        status: ProjectStatus,
        ids: &[String],
    ) -> anyhow::Result<()> {
        self.reorder_by_ids::<Project, _>(status_key(status), ids, |p| &p.id)
            .await
    }
}

impl CourseStore for LocalBackend {
    async fn save_course(&self, course: &Course) -> anyhow::Result<()> {
        self.upsert::<Course, _>(KEY_COURSES, |items| {
            match items.iter_mut().find(|c| c.id == course.id) {
                Some(slot) => *slot = course.clone(),
                None => items.push(course.clone()),
            }
        })
        .await
    }

    async fn delete_course(&self, id: &str) -> bool {
        match self.remove_by_id::<Course, _>(KEY_COURSES, id, |c| &c.id).await {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(id, %err, "course delete failed");
                false
            }
        }
    }

    async fn persist_course_order(&self, ids: &[String]) -> anyhow::Result<()> {
        self.reorder_by_ids::<Course, _>(KEY_COURSES, ids, |c| &c.id)
            .await
    }
}

impl LinkStore for LocalBackend {
    async fn save_link(&self, link: &Link) -> anyhow::Result<()> {
        self.upsert::<Link, _>(KEY_LINKS, |items| {
            match items.iter_mut().find(|l| l.id == link.id) {
                Some(slot) => *slot = link.clone(),
                None => items.push(link.clone()),
            }
        })
        .await
    }

    async fn delete_link(&self, id: &str) -> bool {
        match self.remove_by_id::<Link, _>(KEY_LINKS, id, |l| &l.id).await {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(id, %err, "link delete failed");
                false
            }
        }
    }

    async fn persist_link_order(&self, ids: &[String]) -> anyhow::Result<()> {
        self.reorder_by_ids::<Link, _>(KEY_LINKS, ids, |l| &l.id)
            .await
    }
}

impl SettingsStore for LocalBackend {
    async fn read_settings(&self) -> anyhow::Result<Settings> {
        Ok(self.kv.read(KEY_SETTINGS, Settings::default()).await)
    }

    async fn write_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        self.kv.write(KEY_SETTINGS, settings).await
    }
}
