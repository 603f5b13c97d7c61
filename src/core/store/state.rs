use sqlx::{
    Sqlite,
    pool::PoolConnection,
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    },
};
use tempdir::TempDir;
use tokio::sync::{RwLock, RwLockReadGuard};

use std::{
    fs::{self, File},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

use anyhow::Context;
use tar::{Archive, Builder};
use tracing::warn;
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

const DB_FILE_NAME: &str = "board.db";
const BLOB_DIR_NAME: &str = "blobs";
const ZSTD_LEVEL: i32 = 3;

/// Backing state of the database backend: a `.trackboard` archive (tar+zstd)
/// holding the SQLite database and the blob directory, unpacked into a
/// temporary working directory while open.
pub(super) struct StoreState {
    board_file: PathBuf,
    working_dir: TempDir,
    pool: RwLock<SqlitePool>,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("board_file", &self.board_file)
            .field("working_dir", &self.working_dir.path())
            .finish()
    }
}

impl StoreState {
    /// Acquire a pooled connection and hold the pool read lock for the entire
    /// lifetime of the returned guard, so `save_board` cannot repack the
    /// archive under an in-flight query.
    pub(super) async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;
        let conn = pool_guard.acquire().await?;
        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    pub(super) fn blob_dir(&self) -> PathBuf {
        self.working_dir.path().join(BLOB_DIR_NAME)
    }

    /// Create a tar.zst archive of the working directory at the board file.
    fn pack_archive(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.board_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let out = File::create(&self.board_file)
            .with_context(|| format!("Failed to create board archive {:?}", self.board_file))?;
        let encoder = ZstdEncoder::new(out, ZSTD_LEVEL)
            .with_context(|| format!("Failed to create zstd encoder for {:?}", self.board_file))?;

        let mut tar = Builder::new(encoder);
        tar.append_dir_all(".", self.working_dir.path())
            .with_context(|| format!("Failed to add {:?} to tar", self.working_dir.path()))?;

        let encoder = tar
            .into_inner()
            .with_context(|| format!("Failed to finalize tar for {:?}", self.board_file))?;
        encoder
            .finish()
            .with_context(|| format!("Failed to finalize zstd stream for {:?}", self.board_file))?;
        Ok(())
    }

    /// Exclusive checkpoint + close + pack. Takes the pool write lock so all
    /// in-flight queries finish first, flushes the WAL so the database file
    /// is current, releases file handles, archives the working dir and
    /// optionally reopens the pool for further use.
    pub(super) async fn save_board(&self) -> anyhow::Result<()> {
        self.internal_close_and_pack(true).await
    }

    async fn internal_close_and_pack(&self, reopen: bool) -> anyhow::Result<()> {
        let mut pool_guard = self.pool.write().await;

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&*pool_guard)
            .await?;
        pool_guard.close().await;

        self.pack_archive()?;

        if reopen {
            let pool = open_pool(&self.working_dir.path().join(DB_FILE_NAME)).await?;
            *pool_guard = pool;
        }
        Ok(())
    }

    pub(super) async fn new<P: AsRef<Path>>(board_file: P) -> anyhow::Result<Self> {
        let board_file = board_file.as_ref().to_path_buf();

        // A missing board file becomes an empty archive, so first open and
        // open-existing share one path below.
        if !board_file.is_file() {
            if board_file.parent().map(|p| p.is_dir()).unwrap_or(false) {
                let out = File::create(&board_file)
                    .with_context(|| format!("Failed to create board archive {:?}", board_file))?;
                let encoder = ZstdEncoder::new(out, ZSTD_LEVEL)
                    .with_context(|| format!("Failed to create zstd encoder for {:?}", board_file))?;
                let tar = Builder::new(encoder);
                let encoder = tar
                    .into_inner()
                    .with_context(|| format!("Failed to finalize empty tar {:?}", board_file))?;
                encoder.finish().with_context(|| {
                    format!("Failed to finalize empty zstd stream {:?}", board_file)
                })?;
            } else {
                anyhow::bail!("Board file parent does not exist: {:?}", board_file);
            }
        }

        let working_dir = TempDir::new("trackboard")?;

        {
            let f = File::open(&board_file)
                .with_context(|| format!("Failed to open board archive {:?}", board_file))?;
            let decoder = ZstdDecoder::new(f)
                .with_context(|| format!("Invalid zstd stream in {:?}", board_file))?;
            let mut archive = Archive::new(decoder);
            archive.unpack(working_dir.path()).with_context(|| {
                format!(
                    "Failed to extract archive {:?} into {:?}",
                    board_file,
                    working_dir.path()
                )
            })?;
        }

        let db_file = working_dir.path().join(DB_FILE_NAME);
        let blob_dir = working_dir.path().join(BLOB_DIR_NAME);

        match (db_file.is_file(), blob_dir.is_dir()) {
            (true, true) => {}
            (false, false) => {
                fs::create_dir_all(&blob_dir)?;
                File::create(&db_file)?;
            }
            (true, false) => anyhow::bail!(
                "Corrupt board file: database exists ({:?}) but blob dir missing ({:?})",
                db_file,
                blob_dir
            ),
            (false, true) => anyhow::bail!(
                "Corrupt board file: blob dir exists ({:?}) but database missing ({:?})",
                blob_dir,
                db_file
            ),
        }

        let pool = open_pool(&db_file).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            board_file,
            working_dir,
            pool: RwLock::new(pool),
        })
    }
}

async fn open_pool(db_file: &Path) -> anyhow::Result<SqlitePool> {
    let connect_opts = SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true);

    Ok(SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_opts)
        .await?)
}

pub(super) struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for StoreState {
    fn drop(&mut self) {
        // Inside a runtime we cannot block on the async close; callers must
        // save explicitly (tests and the CLI do). Outside a runtime, spin one
        // up so the archive still reflects the latest state.
        if tokio::runtime::Handle::try_current().is_ok() {
            return;
        }
        let result = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(self.internal_close_and_pack(false)),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("failed to pack board archive on drop: {e}");
        }
    }
}
