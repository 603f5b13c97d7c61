use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};
use tokio::{fs as async_fs, sync::broadcast};
use tracing::warn;

/// Change notification emitted after every successful [`KvStore::write`].
#[derive(Debug, Clone)]
pub struct KvEvent {
    pub key: String,
}

/// Durable key-value store: one JSON document per key under a directory.
///
/// Writes broadcast a same-process change event so independent consumers of
/// the same key stay consistent without sharing an in-memory cache.
#[derive(Debug)]
pub struct KvStore {
    dir: PathBuf,
    events: broadcast::Sender<KvEvent>,
}

impl KvStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create key-value dir {:?}", dir))?;
        let (events, _) = broadcast::channel(64);
        Ok(Self { dir, events })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read and decode the value under `key`. Absence and malformed content
    /// both degrade to `fallback`; neither is an error to the caller.
    pub async fn read<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let path = self.key_path(key);
        let raw = match async_fs::read(&path).await {
            Ok(raw) => raw,
            Err(_) => return fallback,
        };
        match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "malformed stored JSON, using fallback");
                fallback
            }
        }
    }

    /// Encode and persist `value` under `key`, then notify subscribers.
    pub async fn write<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_vec(value)
            .with_context(|| format!("Failed to encode value for key {key:?}"))?;
        let path = self.key_path(key);
        async_fs::write(&path, raw)
            .await
            .with_context(|| format!("Failed to write key file {:?}", path))?;
        // Nobody listening is fine; the send error carries no information.
        let _ = self.events.send(KvEvent { key: key.to_owned() });
        Ok(())
    }

    /// Subscribe to change events for the whole store. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<KvEvent> {
        self.events.subscribe()
    }
}
