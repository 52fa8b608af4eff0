#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use rocket::tokio;
    use serde_json::{Map, Value, json};

    use crate::catalog::{CatalogDocument, CatalogStore, EntityId, TableName, coerce_form};
    use crate::error::AppError;
    use crate::store::keys;
    use crate::test::utils::test_utils::{TestStateBuilder, standard_catalog};

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    fn temp_catalog_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dm-handbook-{}-{}.json", name, std::process::id()))
    }

    #[tokio::test]
    async fn test_load_reads_catalog_file() {
        let path = temp_catalog_path("load");
        tokio::fs::write(&path, standard_catalog().to_string())
            .await
            .expect("write fixture");

        let document = CatalogStore::load(&path, Duration::from_secs(5))
            .await
            .expect("Failed to load catalog");
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(document.table(TableName::Races).len(), 3);
        assert_eq!(document.total_items(), 23);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_catalog_is_a_load_error() {
        let missing = temp_catalog_path("missing");
        let result = CatalogStore::load(&missing, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(AppError::Load(_))));

        let malformed = temp_catalog_path("malformed");
        tokio::fs::write(&malformed, "[1, 2, 3]").await.expect("write");
        let result = CatalogStore::load(&malformed, Duration::from_secs(5)).await;
        let _ = tokio::fs::remove_file(&malformed).await;

        match result {
            Err(AppError::Load(msg)) => assert!(msg.contains("malformed")),
            other => panic!("Expected Load error, got {:?}", other.map(|d| d.total_items())),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_catalog_source_that_never_answers_times_out() {
        let fifo = temp_catalog_path("stalled");
        let _ = std::fs::remove_file(&fifo);
        let created = std::process::Command::new("mkfifo")
            .arg(&fifo)
            .status()
            .expect("run mkfifo");
        assert!(created.success());

        let result = CatalogStore::load(&fifo, Duration::from_millis(50)).await;

        // Let the blocked reader finish so the runtime can shut down.
        drop(
            std::fs::OpenOptions::new()
                .write(true)
                .open(&fifo)
                .expect("open fifo writer"),
        );
        let _ = std::fs::remove_file(&fifo);

        match result {
            Err(AppError::Load(msg)) => assert!(msg.contains("timed out"), "{msg}"),
            other => panic!("Expected timeout, got {:?}", other.map(|d| d.total_items())),
        }
    }

    #[tokio::test]
    async fn test_add_update_delete_round_trip() {
        let state = TestStateBuilder::new()
            .standard_catalog()
            .build()
            .await
            .expect("Failed to build test state");
        let catalog = &state.catalog;

        let id = catalog
            .add(
                TableName::Monsters,
                attributes(json!({ "название": "Бехолдер", "рейтинг_сложности": 13 })),
            )
            .await
            .expect("Failed to add");

        let added = catalog
            .entities(TableName::Monsters)
            .into_iter()
            .find(|entity| entity.id().as_ref() == Some(&id))
            .expect("added entity present");
        assert_eq!(added.name(), Some("Бехолдер"));

        let updated = catalog
            .update(
                TableName::Monsters,
                &id,
                attributes(json!({ "id": 1, "описание": "Глаз тирании" })),
            )
            .await
            .expect("Failed to update");
        assert!(updated);

        let merged = catalog
            .entities(TableName::Monsters)
            .into_iter()
            .find(|entity| entity.id().as_ref() == Some(&id))
            .expect("updated entity present");
        assert_eq!(merged.text("описание"), Some("Глаз тирании"));
        assert_eq!(merged.name(), Some("Бехолдер"));

        assert!(catalog.delete(TableName::Monsters, &id).await.unwrap());
        assert!(!catalog.delete(TableName::Monsters, &id).await.unwrap());
        assert_eq!(catalog.entities(TableName::Monsters).len(), 3);
    }

    #[tokio::test]
    async fn test_update_of_missing_entity_changes_nothing() {
        let state = TestStateBuilder::new()
            .standard_catalog()
            .build()
            .await
            .expect("Failed to build test state");

        let before = state.catalog.snapshot();
        let updated = state
            .catalog
            .update(
                TableName::Items,
                &EntityId::from(404),
                attributes(json!({ "название": "Пусто" })),
            )
            .await
            .unwrap();

        assert!(!updated);
        assert_eq!(*state.catalog.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_mutations_persist_admin_snapshot() {
        let state = TestStateBuilder::new()
            .standard_catalog()
            .build()
            .await
            .expect("Failed to build test state");

        let form = [
            ("название".to_string(), "Мифриловая кольчуга".to_string()),
            ("редкость".to_string(), "Необычный".to_string()),
            ("вес".to_string(), "20".to_string()),
        ]
        .into_iter()
        .collect();

        state
            .catalog
            .add(TableName::Items, coerce_form(form))
            .await
            .unwrap();

        let stored: CatalogDocument = state
            .kv
            .get(keys::ADMIN_DATABASE)
            .await
            .unwrap()
            .expect("snapshot written");
        assert_eq!(stored.table(TableName::Items).len(), 4);
        assert_eq!(
            stored.table(TableName::Items)[3].get("вес"),
            Some(&json!(20))
        );
    }

    #[tokio::test]
    async fn test_invalid_import_keeps_catalog() {
        let state = TestStateBuilder::new()
            .standard_catalog()
            .build()
            .await
            .expect("Failed to build test state");

        let result = state.catalog.import("not json at all").await;
        assert!(matches!(result, Err(AppError::Import(_))));

        let result = state.catalog.import("[]").await;
        assert!(matches!(result, Err(AppError::Import(_))));

        assert_eq!(state.catalog.total_items(), 23);
        assert_eq!(state.catalog.entities(TableName::Classes).len(), 2);
    }

    #[tokio::test]
    async fn test_export_then_import_restores_catalog() {
        let state = TestStateBuilder::new()
            .standard_catalog()
            .build()
            .await
            .expect("Failed to build test state");

        let exported = state.catalog.export().expect("Failed to export");
        let original = state.catalog.snapshot();

        state
            .catalog
            .import(r#"{"расы": []}"#)
            .await
            .expect("Failed to import");
        assert_eq!(state.catalog.total_items(), 0);

        let items = state.catalog.import(&exported).await.expect("re-import");
        assert_eq!(items, 23);
        assert_eq!(*state.catalog.snapshot(), *original);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_persist_the_final_catalog() {
        let state = TestStateBuilder::new()
            .standard_catalog()
            .build()
            .await
            .expect("Failed to build test state");

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let catalog = std::sync::Arc::clone(&state.catalog);
                tokio::spawn(async move {
                    catalog
                        .add(
                            TableName::Items,
                            attributes(json!({ "название": format!("Свиток {i}") })),
                        )
                        .await
                        .expect("add")
                })
            })
            .collect();
        for writer in writers {
            writer.await.expect("writer task");
        }

        assert_eq!(state.catalog.entities(TableName::Items).len(), 11);

        let stored: CatalogDocument = state
            .kv
            .get(keys::ADMIN_DATABASE)
            .await
            .unwrap()
            .expect("snapshot written");
        assert_eq!(stored, *state.catalog.snapshot());
    }

    #[tokio::test]
    async fn test_ids_are_unique_within_table() {
        let state = TestStateBuilder::new()
            .build()
            .await
            .expect("Failed to build test state");

        let mut ids = Vec::new();
        for name in ["Кинжал", "Лук", "Посох"] {
            let id = state
                .catalog
                .add(TableName::Items, attributes(json!({ "название": name })))
                .await
                .unwrap();
            ids.push(id);
        }

        ids.sort_by_key(|id| id.as_number());
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
