//! Entry manager in cloud mode against a live server

use fjalor_core::{
    CloudConfig, EntryDraft, EntryError, EntryManager, LocalStore, RemoteEntryStore, SyncStatus,
};
use fjalor_server::{build_router, AppState, Database, ServerConfig};
use tempfile::TempDir;

async fn spawn_test_server(config: ServerConfig) -> String {
    let app = build_router(AppState::new(Database::open_in_memory().unwrap(), config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn cloud_manager(temp_dir: &TempDir, cloud: &CloudConfig) -> EntryManager {
    let local = LocalStore::new(temp_dir.path().join("digital_dictionary_v1.json"));
    let store = RemoteEntryStore::connect(cloud).unwrap();
    EntryManager::with_store(local, Box::new(store))
}

fn draft(word: &str) -> EntryDraft {
    EntryDraft::new(word, "definition", "illustration")
}

#[tokio::test]
async fn add_uses_server_record_and_persists_locally() {
    let base = spawn_test_server(ServerConfig::default()).await;
    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &CloudConfig::new(&base));

    assert!(manager.is_cloud());
    assert_eq!(manager.sync_status(), &SyncStatus::Ready);

    let entry = manager.add(draft("  mace ")).await.unwrap();
    assert_eq!(entry.word, "mace");
    assert_eq!(manager.selected_id(), Some(&entry.id));

    // A second manager over the same blob sees the cached server record
    let reopened = cloud_manager(&temp_dir, &CloudConfig::new(&base));
    assert_eq!(reopened.get(&entry.id), Some(&entry));
}

#[tokio::test]
async fn server_conflict_becomes_duplicate() {
    let base = spawn_test_server(ServerConfig::default()).await;
    let cloud = CloudConfig::new(&base);

    // Another client added the word first
    let other_dir = TempDir::new().unwrap();
    let mut other = cloud_manager(&other_dir, &cloud);
    other.add(draft("Mace")).await.unwrap();

    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &cloud);
    let err = manager.add(draft("mace")).await.unwrap_err();

    assert_eq!(
        err,
        EntryError::Duplicate {
            word: "mace".to_string()
        }
    );
    assert!(manager.is_empty());
}

#[tokio::test]
async fn delete_of_entry_gone_on_server_leaves_local_untouched() {
    let base = spawn_test_server(ServerConfig::default()).await;
    let cloud = CloudConfig::new(&base);

    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &cloud);
    let entry = manager.add(draft("mace")).await.unwrap();

    // Removed by another client
    let other_dir = TempDir::new().unwrap();
    let mut other = cloud_manager(&other_dir, &cloud);
    other.sync_from_cloud().await.unwrap();
    other.remove(&entry.id).await.unwrap();

    let err = manager.remove(&entry.id).await.unwrap_err();
    assert!(matches!(err, EntryError::NotFound { .. }));
    assert!(manager.get(&entry.id).is_some());

    let err = manager.update(&entry.id, draft("Mace")).await.unwrap_err();
    assert!(matches!(err, EntryError::NotFound { .. }));
    assert_eq!(manager.get(&entry.id).unwrap().word, "mace");
}

#[tokio::test]
async fn sync_replaces_local_collection() {
    let base = spawn_test_server(ServerConfig::default()).await;
    let cloud = CloudConfig::new(&base);

    let writer_dir = TempDir::new().unwrap();
    let mut writer = cloud_manager(&writer_dir, &cloud);
    writer.add(draft("qen")).await.unwrap();
    writer.add(draft("mace")).await.unwrap();

    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &cloud);
    // Local-only leftovers are dropped by the pull
    manager.import_batch(
        vec![serde_json::from_str(r#"{"word": "lule", "definition": "flower"}"#).unwrap()],
        fjalor_core::ImportStrategy::Skip,
    );
    assert_eq!(manager.len(), 1);

    let count = manager.sync_from_cloud().await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(manager.sync_status(), &SyncStatus::Ready);

    let words: Vec<_> = manager.visible_entries().iter().map(|e| e.word.clone()).collect();
    assert_eq!(words, vec!["mace", "qen"]);
    assert!(manager.find_by_word("lule").is_none());
}

#[tokio::test]
async fn wrong_passphrase_is_unauthorized() {
    let base = spawn_test_server(ServerConfig {
        passphrase: Some("sekret".to_string()),
        ..Default::default()
    })
    .await;

    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &CloudConfig::new(&base).with_passphrase("nope"));
    let err = manager.add(draft("mace")).await.unwrap_err();
    assert!(matches!(err, EntryError::Unauthorized(_)));
    assert!(manager.is_empty());

    let mut manager = cloud_manager(&temp_dir, &CloudConfig::new(&base).with_passphrase("sekret"));
    manager.add(draft("mace")).await.unwrap();
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn unreachable_server_keeps_cached_copy() {
    let base = spawn_test_server(ServerConfig::default()).await;
    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &CloudConfig::new(&base));
    manager.add(draft("mace")).await.unwrap();

    // Nothing listens on port 9 of localhost
    let mut offline = cloud_manager(&temp_dir, &CloudConfig::new("http://127.0.0.1:9"));
    let err = offline.sync_from_cloud().await.unwrap_err();

    assert!(matches!(err, EntryError::Network(_)));
    assert!(matches!(offline.sync_status(), SyncStatus::Error(_)));
    assert_eq!(offline.len(), 1);
}

#[tokio::test]
async fn oversized_recording_is_a_validation_error() {
    let base = spawn_test_server(ServerConfig {
        max_body_bytes: 1024,
        ..Default::default()
    })
    .await;
    let temp_dir = TempDir::new().unwrap();
    let mut manager = cloud_manager(&temp_dir, &CloudConfig::new(&base));

    let recording = format!("data:audio/webm;base64,{}", "A".repeat(2048));
    let err = manager
        .add(draft("mace").with_recording(Some(recording)))
        .await
        .unwrap_err();

    assert!(matches!(err, EntryError::Validation(_)));
    assert!(manager.is_empty());
}
