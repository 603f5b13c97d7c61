use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;
use trackboard::{
    BoardStore, NewProject, ProjectStatus, ProjectUpdate, StoreConfig, StoreMode,
};

fn config(dir: &TempDir, mode: StoreMode) -> StoreConfig {
    StoreConfig {
        mode,
        data_dir: dir.path().join("data"),
        board_file: dir.path().join("board.trackboard"),
    }
}

fn copies(store: &BoardStore, id: &str) -> usize {
    store.ideas().iter().filter(|p| p.id == id).count()
        + store.completed().iter().filter(|p| p.id == id).count()
}

async fn complete_then_reopen(mode: StoreMode) -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(config(&dir, mode)).await?;
    let project = store
        .add_project(NewProject {
            title: "X".into(),
            ..NewProject::default()
        })
        .await
        .unwrap();
    assert_eq!(project.progress, 0);

    assert!(store.move_project(&project.id, ProjectStatus::Completed).await);
    assert!(store.ideas().iter().all(|p| p.id != project.id));
    let done = store
        .completed()
        .iter()
        .find(|p| p.id == project.id)
        .expect("present in completed");
    assert_eq!(done.progress, 100);
    assert_eq!(copies(&store, &project.id), 1);

    assert!(store.move_project(&project.id, ProjectStatus::Ideas).await);
    let back = store
        .ideas()
        .iter()
        .find(|p| p.id == project.id)
        .expect("present in ideas");
    assert_eq!(back.progress, 99);
    assert_eq!(copies(&store, &project.id), 1);

    // Already in ideas: nothing to move.
    assert!(!store.move_project(&project.id, ProjectStatus::Ideas).await);
    assert_eq!(copies(&store, &project.id), 1);
    Ok(())
}

#[tokio::test]
async fn complete_then_reopen_local() -> anyhow::Result<()> {
    complete_then_reopen(StoreMode::Local).await
}

#[tokio::test]
async fn complete_then_reopen_database() -> anyhow::Result<()> {
    complete_then_reopen(StoreMode::Database).await
}

#[tokio::test]
async fn reopen_keeps_progress_below_one_hundred() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(config(&dir, StoreMode::Local)).await?;
    let project = store
        .add_project(NewProject {
            title: "partial".into(),
            ..NewProject::default()
        })
        .await
        .unwrap();
    assert!(store.move_project(&project.id, ProjectStatus::Completed).await);
    // Progress edited while completed is not clamped on reversion.
    assert!(
        store
            .update_project(
                &project.id,
                ProjectUpdate {
                    progress: Some(80),
                    ..ProjectUpdate::default()
                },
            )
            .await
    );
    assert!(store.move_project(&project.id, ProjectStatus::Ideas).await);
    assert_eq!(store.ideas()[0].progress, 80);
    Ok(())
}

#[tokio::test]
async fn failed_move_restores_both_buckets() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(config(&dir, StoreMode::Local)).await?;
    let project = store
        .add_project(NewProject {
            title: "stuck".into(),
            ..NewProject::default()
        })
        .await
        .unwrap();

    // Wedge the destination document so the move cannot persist.
    std::fs::create_dir(dir.path().join("data").join("completed.json"))?;

    assert!(!store.move_project(&project.id, ProjectStatus::Completed).await);
    assert_eq!(store.ideas(), &[project.clone()]);
    assert!(store.completed().is_empty());
    assert_eq!(store.ideas()[0].progress, 0);
    assert_eq!(copies(&store, &project.id), 1);
    drop(store);

    // The failed move must not have dirtied either document: a reload still
    // observes exactly one copy, in the source bucket.
    std::fs::remove_dir(dir.path().join("data").join("completed.json"))?;
    let store = BoardStore::open(config(&dir, StoreMode::Local)).await?;
    assert_eq!(store.ideas(), &[project]);
    assert!(store.completed().is_empty());
    Ok(())
}

#[tokio::test]
async fn database_failure_restores_both_buckets() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(config(&dir, StoreMode::Database)).await?;
    let project = store
        .add_project(NewProject {
            title: "wedged".into(),
            ..NewProject::default()
        })
        .await
        .unwrap();

    // Locate the backend's working database through a resolved blob path,
    // then block project writes from a second connection.
    let marker = store.blobs().store(b"marker").await?;
    let blob_path = store.blobs().resolve(&marker).await.expect("blob resolves");
    let db_file = blob_path
        .parent()
        .and_then(Path::parent)
        .expect("blob dir sits inside the working dir")
        .join("board.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(&db_file))
        .await?;
    for trigger in [
        "CREATE TRIGGER block_project_insert BEFORE INSERT ON projects \
         BEGIN SELECT RAISE(ABORT, 'project writes disabled'); END",
        "CREATE TRIGGER block_project_update BEFORE UPDATE ON projects \
         BEGIN SELECT RAISE(ABORT, 'project writes disabled'); END",
    ] {
        sqlx::query(trigger).execute(&pool).await?;
    }

    assert!(!store.move_project(&project.id, ProjectStatus::Completed).await);
    assert_eq!(store.ideas(), &[project.clone()]);
    assert!(store.completed().is_empty());
    assert_eq!(copies(&store, &project.id), 1);

    // With the fault lifted the same move goes through.
    sqlx::query("DROP TRIGGER block_project_insert")
        .execute(&pool)
        .await?;
    sqlx::query("DROP TRIGGER block_project_update")
        .execute(&pool)
        .await?;
    pool.close().await;
    assert!(store.move_project(&project.id, ProjectStatus::Completed).await);
    assert_eq!(copies(&store, &project.id), 1);
    Ok(())
}

#[tokio::test]
async fn move_between_buckets_survives_reopen() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(config(&dir, StoreMode::Database)).await?;
    let project = store
        .add_project(NewProject {
            title: "shipped".into(),
            ..NewProject::default()
        })
        .await
        .unwrap();
    assert!(store.move_project(&project.id, ProjectStatus::Completed).await);
    store.save().await?;
    drop(store);

    let store = BoardStore::open(config(&dir, StoreMode::Database)).await?;
    assert!(store.ideas().is_empty());
    assert_eq!(store.completed().len(), 1);
    assert_eq!(store.completed()[0].progress, 100);
    Ok(())
}
