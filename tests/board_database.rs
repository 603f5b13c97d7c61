use tempfile::TempDir;
use trackboard::{
    ApiKey, BoardStore, CourseUpdate, LinkRef, NewCourse, NewLink, NewProject, ProjectUpdate,
    Requirements, SettingsUpdate, StoreConfig, StoreMode,
};

fn database_config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        mode: StoreMode::Database,
        data_dir: dir.path().join("data"),
        board_file: dir.path().join("test.trackboard"),
    }
}

#[tokio::test]
async fn opens_empty_board() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = BoardStore::open(database_config(&dir)).await?;
    assert!(store.ideas().is_empty());
    assert!(store.completed().is_empty());
    assert!(store.courses().is_empty());
    assert!(store.links().is_empty());
    Ok(())
}

#[tokio::test]
async fn project_sub_fields_round_trip() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(database_config(&dir)).await?;

    let project = store
        .add_project(NewProject {
            title: "Home server".into(),
            description: "self-hosted box".into(),
            requirements: Requirements::List(vec!["pick hardware".into(), "install os".into()]),
            links: vec![LinkRef {
                title: "wiki".into(),
                url: "https://example.org/wiki".into(),
            }],
            tags: vec!["infra".into(), "rust".into()],
            repo_url: Some("https://example.org/repo.git".into()),
            due_date: Some("2026-01-31".into()),
            ..NewProject::default()
        })
        .await
        .expect("project should persist");
    let note = store
        .add_project_note(&project.id, "ordered parts".into())
        .await
        .expect("note should persist");
    assert!(
        store
            .update_project(
                &project.id,
                ProjectUpdate {
                    progress: Some(40),
                    api_keys: Some(Some(vec![ApiKey {
                        label: "grafana".into(),
                        value: "secret".into(),
                    }])),
                    ..ProjectUpdate::default()
                },
            )
            .await
    );
    store.save().await?;
    drop(store);

    let store = BoardStore::open(database_config(&dir)).await?;
    assert_eq!(store.ideas().len(), 1);
    let loaded = &store.ideas()[0];
    assert_eq!(loaded.id, project.id);
    assert_eq!(loaded.title, "Home server");
    assert_eq!(loaded.requirements, project.requirements);
    assert_eq!(loaded.links, project.links);
    assert_eq!(loaded.tags, project.tags);
    assert_eq!(loaded.notes, vec![note]);
    assert_eq!(loaded.progress, 40);
    assert_eq!(
        loaded.api_keys,
        Some(vec![ApiKey {
            label: "grafana".into(),
            value: "secret".into(),
        }])
    );
    assert_eq!(loaded.repo_url.as_deref(), Some("https://example.org/repo.git"));
    assert_eq!(loaded.due_date.as_deref(), Some("2026-01-31"));
    Ok(())
}

#[tokio::test]
async fn save_is_an_upsert_keyed_by_id() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(database_config(&dir)).await?;
    let project = store
        .add_project(NewProject {
            title: "draft".into(),
            ..NewProject::default()
        })
        .await
        .unwrap();
    assert!(
        store
            .update_project(
                &project.id,
                ProjectUpdate {
                    title: Some("final".into()),
                    ..ProjectUpdate::default()
                },
            )
            .await
    );
    store.save().await?;
    drop(store);

    let store = BoardStore::open(database_config(&dir)).await?;
    assert_eq!(store.ideas().len(), 1);
    assert_eq!(store.ideas()[0].title, "final");
    Ok(())
}

#[tokio::test]
async fn link_delete_removes_exactly_one() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(database_config(&dir)).await?;
    let first = store
        .add_link(NewLink {
            title: "docs".into(),
            url: "https://example.org/docs".into(),
            description: None,
        })
        .await
        .unwrap();
    let second = store
        .add_link(NewLink {
            title: "blog".into(),
            url: "https://example.org/blog".into(),
            description: Some("reading list".into()),
        })
        .await
        .unwrap();

    assert!(store.delete_link(&first.id).await);
    assert_eq!(store.links().len(), 1);
    assert_eq!(store.links()[0].id, second.id);

    // Unknown and already-deleted ids are no-ops reporting failure.
    assert!(!store.delete_link("no-such-id").await);
    assert!(!store.delete_link(&first.id).await);
    assert_eq!(store.links().len(), 1);
    Ok(())
}

#[tokio::test]
async fn link_reorder_survives_reopen() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(database_config(&dir)).await?;
    for title in ["a", "b", "c"] {
        store
            .add_link(NewLink {
                title: title.into(),
                url: format!("https://example.org/{title}"),
                description: None,
            })
            .await
            .unwrap();
    }
    assert!(
        store
            .reorder_links_with(|mut links| {
                links.reverse();
                links
            })
            .await
    );
    // A replacement sequence with a different id set is rejected.
    assert!(!store.reorder_links(Vec::new()).await);
    store.save().await?;
    drop(store);

    let store = BoardStore::open(database_config(&dir)).await?;
    let titles: Vec<&str> = store.links().iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["c", "b", "a"]);
    Ok(())
}

#[tokio::test]
async fn course_lifecycle_round_trips() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(database_config(&dir)).await?;
    let course = store
        .add_course(NewCourse {
            name: "Advanced SQL".into(),
            links: vec![LinkRef {
                title: "syllabus".into(),
                url: "https://example.org/sql".into(),
            }],
            reason: Some("query planner internals".into()),
            ..NewCourse::default()
        })
        .await
        .unwrap();
    let note = store
        .add_course_note(&course.id, "week 1 done".into())
        .await
        .unwrap();
    assert!(
        store
            .update_course(
                &course.id,
                CourseUpdate {
                    completed: Some(true),
                    ..CourseUpdate::default()
                },
            )
            .await
    );
    store.save().await?;
    drop(store);

    let mut store = BoardStore::open(database_config(&dir)).await?;
    assert_eq!(store.courses().len(), 1);
    let loaded = store.courses()[0].clone();
    assert!(loaded.completed);
    assert_eq!(loaded.links, course.links);
    assert_eq!(loaded.notes, vec![note.clone()]);
    assert_eq!(loaded.reason.as_deref(), Some("query planner internals"));

    assert!(store.delete_course_note(&course.id, &note.id).await);
    assert!(store.courses()[0].notes.is_empty());
    assert!(store.delete_course(&course.id).await);
    assert!(store.courses().is_empty());
    assert!(!store.delete_course(&course.id).await);
    Ok(())
}

#[tokio::test]
async fn settings_persist_in_settings_table() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let mut store = BoardStore::open(database_config(&dir)).await?;
    assert!(
        store
            .update_settings(SettingsUpdate {
                theme: Some("dark".into()),
                pin: Some(Some("4242".into())),
                profile_name: Some("sam".into()),
            })
            .await
    );
    store.save().await?;
    drop(store);

    let mut store = BoardStore::open(database_config(&dir)).await?;
    assert_eq!(store.settings().theme, "dark");
    assert_eq!(store.settings().pin.as_deref(), Some("4242"));
    assert_eq!(store.settings().profile_name, "sam");

    assert!(
        store
            .update_settings(SettingsUpdate {
                pin: Some(None),
                ..SettingsUpdate::default()
            })
            .await
    );
    store.save().await?;
    drop(store);

    let store = BoardStore::open(database_config(&dir)).await?;
    assert_eq!(store.settings().pin, None);
    Ok(())
}
