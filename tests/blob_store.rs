use tempfile::TempDir;
use trackboard::{BlobStore, BoardStore, StoreConfig, StoreMode};

#[tokio::test]
async fn store_resolve_remove_lifecycle() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let blobs = BlobStore::open(dir.path())?;

    let handle = blobs.store(b"\x89PNG fake logo").await?;
    assert!(BlobStore::is_handle(&handle));

    let path = blobs.resolve(&handle).await.expect("handle resolves");
    assert_eq!(std::fs::read(&path)?, b"\x89PNG fake logo");

    blobs.remove(&handle).await?;
    assert!(blobs.resolve(&handle).await.is_none());
    assert!(blobs.remove(&handle).await.is_err());
    Ok(())
}

#[tokio::test]
async fn non_handles_never_resolve() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let blobs = BlobStore::open(dir.path())?;
    assert!(blobs.resolve("https://example.org/logo.png").await.is_none());
    assert!(blobs.resolve("blob:not-a-uuid").await.is_none());
    assert!(blobs.resolve("blob:../../etc/passwd").await.is_none());
    Ok(())
}

#[tokio::test]
async fn board_store_exposes_backend_blobs() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = BoardStore::open(StoreConfig {
        mode: StoreMode::Local,
        data_dir: dir.path().join("data"),
        board_file: dir.path().join("board.trackboard"),
    })
    .await?;

    let handle = store.blobs().store(b"logo bytes").await?;
    let path = store.blobs().resolve(&handle).await.expect("resolves");
    assert!(path.starts_with(dir.path().join("data")));
    Ok(())
}
