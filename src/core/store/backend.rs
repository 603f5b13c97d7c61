use std::future::Future;
use std::path::PathBuf;

use crate::core::store::{
    blob::BlobStore,
    course::{Course, CourseStore},
    link::{Link, LinkStore},
    local::LocalBackend,
    model::{BoardData, ProjectStatus},
    project::{Project, ProjectStore},
    relational::DatabaseBackend,
    settings::{Settings, SettingsStore},
};

/// Which storage strategy backs the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// JSON documents plus a blob directory under `data_dir`.
    Local,
    /// Single-file SQLite archive at `board_file`.
    Database,
}

/// Everything a backend needs, injected at construction. Both locations are
/// always present so the store can switch modes without ambient state.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mode: StoreMode,
    pub data_dir: PathBuf,
    pub board_file: PathBuf,
}

/// Operations shared by both storage strategies, on top of the per-entity
/// store traits.
pub trait StorageBackend: ProjectStore + CourseStore + LinkStore + SettingsStore {
    fn load_board(&self) -> impl Future<Output = anyhow::Result<BoardData>>;
    /// Wholesale replacement of the backed-up collections (import flow).
    fn replace_board(
        &self,
        ideas: &[Project],
        completed: &[Project],
        links: &[Link],
    ) -> impl Future<Output = anyhow::Result<()>>;
    fn blobs(&self) -> &BlobStore;
    /// Flush durable state (repack the archive for the database backend; the
    /// local backend writes through on every mutation).
    fn save(&self) -> impl Future<Output = anyhow::Result<()>>;
}

/// Strategy dispatcher. Constructed once from [`StoreConfig`]; call sites
/// never branch on the mode themselves.
#[derive(Debug)]
pub enum Backend {
    Local(LocalBackend),
    Database(DatabaseBackend),
}

impl Backend {
    pub(super) async fn open(config: &StoreConfig, mode: StoreMode) -> anyhow::Result<Self> {
        Ok(match mode {
            StoreMode::Local => Backend::Local(LocalBackend::open(&config.data_dir)?),
            StoreMode::Database => {
                Backend::Database(DatabaseBackend::open(&config.board_file).await?)
            }
        })
    }

    pub(super) fn as_local(&self) -> Option<&LocalBackend> {
        match self {
            Backend::Local(local) => Some(local),
            Backend::Database(_) => None,
        }
    }
}

impl StorageBackend for Backend {
    async fn load_board(&self) -> anyhow::Result<BoardData> {
        match self {
            Backend::Local(b) => b.load_board().await,
            Backend::Database(b) => b.load_board().await,
        }
    }

    async fn replace_board(
        &self,
        ideas: &[Project],
        completed: &[Project],
        links: &[Link],
    ) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.replace_board(ideas, completed, links).await,
            Backend::Database(b) => b.replace_board(ideas, completed, links).await,
        }
    }

    fn blobs(&self) -> &BlobStore {
        match self {
            Backend::Local(b) => b.blobs(),
            Backend::Database(b) => b.blobs(),
        }
    }

    async fn save(&self) -> anyhow::Result<()> {
        match self {
            Backend::Local(_) => Ok(()),
            Backend::Database(b) => b.save().await,
        }
    }
}

impl ProjectStore for Backend {
    async fn save_project(&self, project: &Project, status: ProjectStatus) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.save_project(project, status).await,
            Backend::Database(b) => b.save_project(project, status).await,
        }
    }

    async fn delete_project(&self, id: &str) -> bool {
        match self {
            Backend::Local(b) => b.delete_project(id).await,
            Backend::Database(b) => b.delete_project(id).await,
        }
    }

    async fn persist_project_order(
        &self,
        status: ProjectStatus,
        ids: &[String],
    ) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.persist_project_order(status, ids).await,
            Backend::Database(b) => b.persist_project_order(status, ids).await,
        }
    }
}

impl CourseStore for Backend {
    async fn save_course(&self, course: &Course) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.save_course(course).await,
            Backend::Database(b) => b.save_course(course).await,
        }
    }

    async fn delete_course(&self, id: &str) -> bool {
        match self {
            Backend::Local(b) => b.delete_course(id).await,
            Backend::Database(b) => b.delete_course(id).await,
        }
    }

    async fn persist_course_order(&self, ids: &[String]) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.persist_course_order(ids).await,
            Backend::Database(b) => b.persist_course_order(ids).await,
        }
    }
}

impl LinkStore for Backend {
    async fn save_link(&self, link: &Link) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.save_link(link).await,
            Backend::Database(b) => b.save_link(link).await,
        }
    }

    async fn delete_link(&self, id: &str) -> bool {
        match self {
            Backend::Local(b) => b.delete_link(id).await,
            Backend::Database(b) => b.delete_link(id).await,
        }
    }

    async fn persist_link_order(&self, ids: &[String]) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.persist_link_order(ids).await,
            Backend::Database(b) => b.persist_link_order(ids).await,
        }
    }
}

impl SettingsStore for Backend {
    async fn read_settings(&self) -> anyhow::Result<Settings> {
        match self {
            Backend::Local(b) => b.read_settings().await,
            Backend::Database(b) => b.read_settings().await,
        }
    }

    async fn write_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            Backend::Local(b) => b.write_settings(settings).await,
            Backend::Database(b) => b.write_settings(settings).await,
        }
    }
}
