use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::fs as async_fs;
use uuid::Uuid;

const HANDLE_PREFIX: &str = "blob:";

/// Out-of-line storage for binary payloads (logo images). Entities hold an
/// opaque `blob:<uuid>` handle, never the payload itself.
///
/// Lifecycle is caller-owned: deleting the entity that references a handle
/// does not remove the payload, and resolved paths are only valid while the
/// owning store is open (for the database backend they point into its
/// temporary working directory).
#[derive(Debug)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create blob dir {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn is_handle(value: &str) -> bool {
        value.starts_with(HANDLE_PREFIX)
    }

    fn payload_path(&self, handle: &str) -> Option<PathBuf> {
        let id = handle.strip_prefix(HANDLE_PREFIX)?;
        // Handles are minted from UUIDs; anything else is rejected rather
        // than used as a path fragment.
        let id = Uuid::parse_str(id).ok()?;
        Some(self.dir.join(id.to_string()))
    }

    /// Persist a payload and return its freshly minted handle.
    pub async fn store(&self, bytes: &[u8]) -> anyhow::Result<String> {
        let id = Uuid::new_v4();
        let path = self.dir.join(id.to_string());
        async_fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write blob {:?}", path))?;
        Ok(format!("{HANDLE_PREFIX}{id}"))
    }

    /// Resolve a handle to an on-disk path for display, or `None` if the
    /// handle is unknown or not a handle at all.
    pub async fn resolve(&self, handle: &str) -> Option<PathBuf> {
        let path = self.payload_path(handle)?;
        async_fs::try_exists(&path).await.ok()?.then_some(path)
    }

    pub async fn remove(&self, handle: &str) -> anyhow::Result<()> {
        let Some(path) = self.payload_path(handle) else {
            anyhow::bail!("not a blob handle: {handle:?}");
        };
        async_fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete blob {:?}", path))?;
        Ok(())
    }
}
