mod backend;
mod blob;
mod course;
mod kv;
mod link;
mod local;
mod model;
mod project;
mod relational;
mod settings;
mod state;
mod txn;

use anyhow::Context;
use tokio::sync::{broadcast, watch};
use tracing::warn;

pub use backend::{StorageBackend, StoreConfig, StoreMode};
pub use blob::BlobStore;
pub use course::{Course, CourseStore, CourseUpdate, NewCourse};
pub use kv::{KvEvent, KvStore};
pub use link::{Link, LinkStore, LinkUpdate, NewLink};
pub use model::{ApiKey, BoardData, LinkRef, Note, ProjectStatus, Requirements};
pub use project::{NewProject, Project, ProjectStore, ProjectUpdate};
pub use settings::{Settings, SettingsStore, SettingsUpdate};

use crate::core::export::BoardBackup;
use backend::Backend;
use model::{mint_id, now_rfc3339};

/// Unified CRUD + reorder access to the board, abstracting over which storage
/// backend is active.
///
/// Mutating actions are optimistic: the in-memory collection is updated
/// first, the backend call is awaited, and on failure the snapshot captured
/// immediately before the mutation is restored and the error logged. Failures
/// are therefore observable only through the return value, the reverted
/// state and the log. The `&mut self` receivers guarantee two mutations can
/// never overlap between snapshot and rollback.
#[derive(Debug)]
pub struct BoardStore {
    config: StoreConfig,
    backend: Backend,
    board: BoardData,
    settings: Settings,
    revision: watch::Sender<u64>,
}

impl BoardStore {
    /// Open the store with the backend named by `config.mode`. All state the
    /// original kept in ambient providers (mode, theme, PIN, profile) is
    /// carried by the config and the loaded [`Settings`].
    pub async fn open(config: StoreConfig) -> anyhow::Result<Self> {
        let backend = Backend::open(&config, config.mode).await?;
        let board = backend.load_board().await?;
        let settings = backend.read_settings().await?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            config,
            backend,
            board,
            settings,
            revision,
        })
    }

    pub fn mode(&self) -> StoreMode {
        self.config.mode
    }

    pub fn ideas(&self) -> &[Project] {
        &self.board.ideas
    }

    pub fn completed(&self) -> &[Project] {
        &self.board.completed
    }

    pub fn projects(&self, status: ProjectStatus) -> &[Project] {
        match status {
            ProjectStatus::Ideas => &self.board.ideas,
            ProjectStatus::Completed => &self.board.completed,
        }
    }

    pub fn courses(&self) -> &[Course] {
        &self.board.courses
    }

    pub fn links(&self) -> &[Link] {
        &self.board.links
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn blobs(&self) -> &BlobStore {
        self.backend.blobs()
    }

    /// Bumped after every successful mutation; watch it to know when cached
    /// derived views must be recomputed.
    pub fn watch_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Raw change events of the local backend's key-value store, or `None`
    /// in database mode.
    pub fn kv_events(&self) -> Option<broadcast::Receiver<KvEvent>> {
        self.backend.as_local().map(|local| local.kv().subscribe())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Flush durable state. Database mode repacks the board archive; must be
    /// called before dropping the store inside an async runtime.
    pub async fn save(&self) -> anyhow::Result<()> {
        self.backend.save().await
    }

    /// Swap the active backend and reload the whole board from it. In-memory
    /// edits that were already persisted survive; the previous backend is
    /// flushed and then dropped.
    pub async fn switch_mode(&mut self, mode: StoreMode) -> anyhow::Result<()> {
        if mode == self.config.mode {
            return Ok(());
        }
        // The database backend only repacks its archive on save, and its Drop
        // cannot pack inside a runtime; flush now or lose acknowledged
        // mutations with the working dir.
        self.backend
            .save()
            .await
            .context("Failed to flush the current backend before switching")?;
        let backend = Backend::open(&self.config, mode).await?;
        let board = backend.load_board().await?;
        let settings = backend.read_settings().await?;
        self.backend = backend;
        self.board = board;
        self.settings = settings;
        self.config.mode = mode;
        self.bump();
        Ok(())
    }

    // --- Projects ---

    /// Create a project in the ideas bucket. Returns `None` if persistence
    /// failed (the optimistic insert is rolled back).
    pub async fn add_project(&mut self, new: NewProject) -> Option<Project> {
        let project = Project {
            id: mint_id(),
            title: new.title,
            description: new.description,
            requirements: new.requirements,
            links: new.links,
            logo: new.logo,
            progress: 0,
            tags: new.tags,
            repo_url: new.repo_url,
            due_date: new.due_date,
            notes: Vec::new(),
            api_keys: None,
            api_key_pin: None,
        };
        let mut next = self.board.ideas.clone();
        next.push(project.clone());
        match txn::commit(
            &mut self.board.ideas,
            next,
            self.backend.save_project(&project, ProjectStatus::Ideas),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                Some(project)
            }
            Err(err) => {
                warn!(%err, "add_project failed; state reverted");
                None
            }
        }
    }

    pub async fn update_project(&mut self, id: &str, update: ProjectUpdate) -> bool {
        let Some((status, current)) = self.find_project(id) else {
            warn!(id, "update_project: unknown project");
            return false;
        };
        let updated = current.merged(update);
        self.commit_project_bucket(status, updated, "update_project")
            .await
    }

    /// Move a project between the ideas and completed buckets. Completion
    /// sets progress to 100; moving back keeps progress unless it was exactly
    /// 100, which drops to 99. Exactly one copy exists across the two
    /// buckets at every observation point, including after a failed
    /// persistence call (both snapshots are restored together).
    pub async fn move_project(&mut self, id: &str, to: ProjectStatus) -> bool {
        let from = to.other();
        let Some(project) = self.projects(from).iter().find(|p| p.id == id) else {
            warn!(id, to = to.as_str(), "move_project: not found in source bucket");
            return false;
        };
        let mut moved = project.clone();
        match to {
            ProjectStatus::Completed => moved.progress = 100,
            ProjectStatus::Ideas => {
                if moved.progress == 100 {
                    moved.progress = 99;
                }
            }
        }
        let next_from: Vec<Project> = self
            .projects(from)
            .iter()
            .filter(|p| p.id != id)
            .cloned()
            .collect();
        let mut next_to = self.projects(to).to_vec();
        next_to.push(moved.clone());
        let (next_ideas, next_completed) = match to {
            ProjectStatus::Completed => (next_from, next_to),
            ProjectStatus::Ideas => (next_to, next_from),
        };
        match txn::commit2(
            &mut self.board.ideas,
            next_ideas,
            &mut self.board.completed,
            next_completed,
            self.backend.save_project(&moved, to),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(id, %err, "move_project failed; both buckets reverted");
                false
            }
        }
    }

    pub async fn delete_project(&mut self, id: &str) -> bool {
        let Some((status, _)) = self.find_project(id) else {
            return false;
        };
        let next: Vec<Project> = self
            .projects(status)
            .iter()
            .filter(|p| p.id != id)
            .cloned()
            .collect();
        let slot = match status {
            ProjectStatus::Ideas => &mut self.board.ideas,
            ProjectStatus::Completed => &mut self.board.completed,
        };
        let deleted = txn::commit_checked(slot, next, self.backend.delete_project(id)).await;
        if deleted {
            self.bump();
        }
        deleted
    }

    pub async fn add_project_note(&mut self, project_id: &str, content: String) -> Option<Note> {
        let (status, current) = self.find_project(project_id)?;
        let note = Note {
            id: mint_id(),
            date: now_rfc3339(),
            content,
        };
        let mut updated = current.clone();
        updated.notes.push(note.clone());
        self.commit_project_bucket(status, updated, "add_project_note")
            .await
            .then_some(note)
    }

    pub async fn delete_project_note(&mut self, project_id: &str, note_id: &str) -> bool {
        let Some((status, current)) = self.find_project(project_id) else {
            return false;
        };
        let mut updated = current.clone();
        let before = updated.notes.len();
        updated.notes.retain(|n| n.id != note_id);
        if updated.notes.len() == before {
            return false;
        }
        self.commit_project_bucket(status, updated, "delete_project_note")
            .await
    }

    pub async fn reorder_projects(&mut self, status: ProjectStatus, order: Vec<Project>) -> bool {
        if !same_id_set(self.projects(status), &order, |p: &Project| &p.id) {
            warn!(status = status.as_str(), "reorder_projects rejected: id set mismatch");
            return false;
        }
        let ids: Vec<String> = order.iter().map(|p| p.id.clone()).collect();
        let slot = match status {
            ProjectStatus::Ideas => &mut self.board.ideas,
            ProjectStatus::Completed => &mut self.board.completed,
        };
        match txn::commit(slot, order, self.backend.persist_project_order(status, &ids)).await {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(%err, "reorder_projects failed; state reverted");
                false
            }
        }
    }

    pub async fn reorder_projects_with<F>(&mut self, status: ProjectStatus, transform: F) -> bool
    where
        F: FnOnce(Vec<Project>) -> Vec<Project>,
    {
        let next = transform(self.projects(status).to_vec());
        self.reorder_projects(status, next).await
    }

    fn find_project(&self, id: &str) -> Option<(ProjectStatus, &Project)> {
        for status in [ProjectStatus::Ideas, ProjectStatus::Completed] {
            if let Some(project) = self.projects(status).iter().find(|p| p.id == id) {
                return Some((status, project));
            }
        }
        None
    }

    /// Upsert `updated` into its bucket with the usual optimistic protocol.
    async fn commit_project_bucket(
        &mut self,
        status: ProjectStatus,
        updated: Project,
        action: &str,
    ) -> bool {
        let next: Vec<Project> = self
            .projects(status)
            .iter()
            .map(|p| {
                if p.id == updated.id {
                    updated.clone()
                } else {
                    p.clone()
                }
            })
            .collect();
        let slot = match status {
            ProjectStatus::Ideas => &mut self.board.ideas,
            ProjectStatus::Completed => &mut self.board.completed,
        };
        match txn::commit(slot, next, self.backend.save_project(&updated, status)).await {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(action, %err, "project mutation failed; state reverted");
                false
            }
        }
    }

    // --- Courses ---

    pub async fn add_course(&mut self, new: NewCourse) -> Option<Course> {
        let course = Course {
            id: mint_id(),
            name: new.name,
            completed: false,
            links: new.links,
            logo: new.logo,
            notes: Vec::new(),
            reason: new.reason,
        };
        let mut next = self.board.courses.clone();
        next.push(course.clone());
        match txn::commit(
            &mut self.board.courses,
            next,
            self.backend.save_course(&course),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                Some(course)
            }
            Err(err) => {
                warn!(%err, "add_course failed; state reverted");
                None
            }
        }
    }

    pub async fn update_course(&mut self, id: &str, update: CourseUpdate) -> bool {
        let Some(current) = self.board.courses.iter().find(|c| c.id == id) else {
            warn!(id, "update_course: unknown course");
            return false;
        };
        let updated = current.merged(update);
        self.commit_course(updated, "update_course").await
    }

    pub async fn delete_course(&mut self, id: &str) -> bool {
        if !self.board.courses.iter().any(|c| c.id == id) {
            return false;
        }
        let next: Vec<Course> = self
            .board
            .courses
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        let deleted = txn::commit_checked(
            &mut self.board.courses,
            next,
            self.backend.delete_course(id),
        )
        .await;
        if deleted {
            self.bump();
        }
        deleted
    }

    pub async fn add_course_note(&mut self, course_id: &str, content: String) -> Option<Note> {
        let current = self.board.courses.iter().find(|c| c.id == course_id)?;
        let note = Note {
            id: mint_id(),
            date: now_rfc3339(),
            content,
        };
        let mut updated = current.clone();
        updated.notes.push(note.clone());
        self.commit_course(updated, "add_course_note")
            .await
            .then_some(note)
    }

    pub async fn delete_course_note(&mut self, course_id: &str, note_id: &str) -> bool {
        let Some(current) = self.board.courses.iter().find(|c| c.id == course_id) else {
            return false;
        };
        let mut updated = current.clone();
        let before = updated.notes.len();
        updated.notes.retain(|n| n.id != note_id);
        if updated.notes.len() == before {
            return false;
        }
        self.commit_course(updated, "delete_course_note").await
    }

    pub async fn reorder_courses(&mut self, order: Vec<Course>) -> bool {
        if !same_id_set(&self.board.courses, &order, |c: &Course| &c.id) {
            warn!("reorder_courses rejected: id set mismatch");
            return false;
        }
        let ids: Vec<String> = order.iter().map(|c| c.id.clone()).collect();
        match txn::commit(
            &mut self.board.courses,
            order,
            self.backend.persist_course_order(&ids),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(%err, "reorder_courses failed; state reverted");
                false
            }
        }
    }

    async fn commit_course(&mut self, updated: Course, action: &str) -> bool {
        let next: Vec<Course> = self
            .board
            .courses
            .iter()
            .map(|c| {
                if c.id == updated.id {
                    updated.clone()
                } else {
                    c.clone()
                }
            })
            .collect();
        match txn::commit(
            &mut self.board.courses,
            next,
            self.backend.save_course(&updated),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(action, %err, "course mutation failed; state reverted");
                false
            }
        }
    }

    // --- Links ---

    pub async fn add_link(&mut self, new: NewLink) -> Option<Link> {
        let link = Link {
            id: mint_id(),
            title: new.title,
            url: new.url,
            description: new.description,
        };
        let mut next = self.board.links.clone();
        next.push(link.clone());
        match txn::commit(&mut self.board.links, next, self.backend.save_link(&link)).await {
            Ok(()) => {
                self.bump();
                Some(link)
            }
            Err(err) => {
                warn!(%err, "add_link failed; state reverted");
                None
            }
        }
    }

    pub async fn update_link(&mut self, id: &str, update: LinkUpdate) -> bool {
        let Some(current) = self.board.links.iter().find(|l| l.id == id) else {
            warn!(id, "update_link: unknown link");
            return false;
        };
        let updated = current.merged(update);
        let next: Vec<Link> = self
            .board
            .links
            .iter()
            .map(|l| if l.id == id { updated.clone() } else { l.clone() })
            .collect();
        match txn::commit(&mut self.board.links, next, self.backend.save_link(&updated)).await {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(id, %err, "update_link failed; state reverted");
                false
            }
        }
    }

    /// Removes exactly one record; an unknown id is a no-op returning false.
    pub async fn delete_link(&mut self, id: &str) -> bool {
        if !self.board.links.iter().any(|l| l.id == id) {
            return false;
        }
        let next: Vec<Link> = self
            .board
            .links
            .iter()
            .filter(|l| l.id != id)
            .cloned()
            .collect();
        let deleted =
            txn::commit_checked(&mut self.board.links, next, self.backend.delete_link(id)).await;
        if deleted {
            self.bump();
        }
        deleted
    }

    pub async fn reorder_links(&mut self, order: Vec<Link>) -> bool {
        if !same_id_set(&self.board.links, &order, |l: &Link| &l.id) {
            warn!("reorder_links rejected: id set mismatch");
            return false;
        }
        let ids: Vec<String> = order.iter().map(|l| l.id.clone()).collect();
        match txn::commit(
            &mut self.board.links,
            order,
            self.backend.persist_link_order(&ids),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(%err, "reorder_links failed; state reverted");
                false
            }
        }
    }

    pub async fn reorder_links_with<F>(&mut self, transform: F) -> bool
    where
        F: FnOnce(Vec<Link>) -> Vec<Link>,
    {
        let next = transform(self.board.links.clone());
        self.reorder_links(next).await
    }

    // --- Settings ---

    pub async fn update_settings(&mut self, update: SettingsUpdate) -> bool {
        let next = self.settings.merged(update);
        match txn::commit(
            &mut self.settings,
            next.clone(),
            self.backend.write_settings(&next),
        )
        .await
        {
            Ok(()) => {
                self.bump();
                true
            }
            Err(err) => {
                warn!(%err, "update_settings failed; state reverted");
                false
            }
        }
    }

    // --- Import / export ---

    /// Snapshot of the backed-up collections (courses are not part of the
    /// backup document).
    pub fn export_backup(&self) -> BoardBackup {
        BoardBackup {
            ideas: self.board.ideas.clone(),
            completed: self.board.completed.clone(),
            links: self.board.links.clone(),
            exported_at: now_rfc3339(),
        }
    }

    /// Replace the backed-up collections wholesale, persisted first so a
    /// failure leaves both memory and storage untouched. No merge semantics.
    pub async fn import_backup(&mut self, backup: BoardBackup) -> anyhow::Result<()> {
        self.backend
            .replace_board(&backup.ideas, &backup.completed, &backup.links)
            .await
            .context("Failed to persist imported backup")?;
        self.board.ideas = backup.ideas;
        self.board.completed = backup.completed;
        self.board.links = backup.links;
        self.bump();
        Ok(())
    }
}

fn same_id_set<T, F>(current: &[T], order: &[T], id_of: F) -> bool
where
    F: Fn(&T) -> &str,
{
    current.len() == order.len()
        && current
            .iter()
            .all(|item| order.iter().any(|other| id_of(other) == id_of(item)))
}
