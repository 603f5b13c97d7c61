use serde_json::{Value, json};
use tempfile::TempDir;
use trackboard::KvStore;

#[tokio::test]
async fn read_falls_back_on_absence_and_malformed_content() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = KvStore::open(dir.path())?;

    let missing: Vec<String> = store.read("nothing", Vec::new()).await;
    assert!(missing.is_empty());

    std::fs::write(dir.path().join("broken.json"), b"{definitely not json")?;
    let broken: Vec<String> = store.read("broken", vec!["fallback".into()]).await;
    assert_eq!(broken, vec!["fallback".to_owned()]);
    Ok(())
}

#[tokio::test]
async fn write_then_read_round_trips() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = KvStore::open(dir.path())?;
    store.write("k", &json!({"a": 1})).await?;
    let value: Value = store.read("k", Value::Null).await;
    assert_eq!(value, json!({"a": 1}));
    Ok(())
}

#[tokio::test]
async fn every_subscriber_observes_a_write() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = KvStore::open(dir.path())?;
    let mut first = store.subscribe();
    let mut second = store.subscribe();

    store.write("k", &json!({"a": 1})).await?;

    assert_eq!(first.recv().await?.key, "k");
    // An independent consumer of the same store sees the change and reads
    // the fresh value without any shared in-memory state.
    assert_eq!(second.recv().await?.key, "k");
    let observed: Value = store.read("k", Value::Null).await;
    assert_eq!(observed, json!({"a": 1}));
    Ok(())
}

#[tokio::test]
async fn write_failure_surfaces_as_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = KvStore::open(dir.path())?;
    std::fs::create_dir(dir.path().join("wedged.json"))?;

    let mut events = store.subscribe();
    assert!(store.write("wedged", &json!(1)).await.is_err());
    // No change event is broadcast for a failed write.
    assert!(events.try_recv().is_err());
    Ok(())
}
