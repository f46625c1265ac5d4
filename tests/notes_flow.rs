use std::{sync::Arc, time::Duration};

use prepase::{
    AccountService, Config, DocumentStore, FileStore, MemoryStore, NewNote, NoteQuery,
    NoteStorage, PrepaseError, Services, SharingDesk, SortOrder,
};
use tempfile::TempDir;

async fn pause() {
    // Notes are ordered by millisecond timestamps
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn account_notes_and_sharing_flow() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let accounts = AccountService::new(Arc::clone(&store));
    let notes = NoteStorage::new(Arc::clone(&store));
    let sharing = SharingDesk::new(notes.clone());

    let alice = accounts.register(" alice ", "secret", "secret").await.unwrap();
    assert_eq!(alice, "alice");
    accounts.register("bob", "hunter2", "hunter2").await.unwrap();
    assert!(matches!(
        accounts.register("alice", "x", "x").await,
        Err(PrepaseError::UsernameOccupied { .. })
    ));
    assert!(matches!(
        accounts.login("alice", "wrong").await,
        Err(PrepaseError::WrongPassword)
    ));
    assert_eq!(accounts.login("alice", " secret ").await.unwrap(), "alice");

    let groceries = notes
        .add_note(&alice, NewNote::manual("Groceries", "milk, eggs").unwrap())
        .await
        .unwrap();
    pause().await;
    let lecture = notes
        .add_note(
            &alice,
            NewNote::imported("", "Entropy never decreases", Some("physics.txt")).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(lecture.source.as_deref(), Some("physics.txt"));

    let newest = notes
        .list_notes(&alice, &NoteQuery::ordered(SortOrder::Newest))
        .await
        .unwrap();
    let ids: Vec<_> = newest.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![lecture.id.as_str(), groceries.id.as_str()]);

    let found = notes
        .list_notes(&alice, &NoteQuery::default().search("GROC"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, groceries.id);

    let updated = notes
        .update_note(&alice, &groceries.id, " Shopping ", "milk, eggs, bread")
        .await
        .unwrap();
    assert_eq!(updated.title, "Shopping");
    assert_eq!(updated.timestamp, groceries.timestamp);

    let code = sharing.generate(&alice, &lecture.id).await.unwrap();
    let shared = sharing.access(&code.to_string()).await.unwrap();
    assert_eq!(shared.owner, "alice");
    assert_eq!(shared.note.content, "Entropy never decreases");

    let copy = sharing.adopt("bob", &shared).await.unwrap();
    assert_ne!(copy.id, lecture.id);
    assert_eq!(notes.count_notes("bob").await.unwrap(), 1);

    notes.delete_note(&alice, &lecture.id).await.unwrap();
    assert!(matches!(
        notes.get_note(&alice, &lecture.id).await,
        Err(PrepaseError::NoteNotFound { .. })
    ));
    // Bob keeps his copy after the original is gone
    assert_eq!(notes.get_note("bob", &copy.id).await.unwrap().title, copy.title);
    assert!(matches!(
        sharing.access(&code.to_string()).await,
        Err(PrepaseError::NoteNotFound { .. })
    ));
}

#[tokio::test]
async fn notes_survive_reopening_a_file_store() {
    let dir = TempDir::new().unwrap();
    let note_id = {
        let notes = NoteStorage::new(Arc::new(FileStore::open(dir.path()).unwrap()));
        notes
            .add_note("carol", NewNote::manual("Persisted", "still here").unwrap())
            .await
            .unwrap()
            .id
    };

    let reopened = NoteStorage::new(Arc::new(FileStore::open(dir.path()).unwrap()));
    let note = reopened.get_note("carol", &note_id).await.unwrap();
    assert_eq!(note.content, "still here");
}

#[tokio::test]
async fn ephemeral_services_start_empty() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.set_data_dir(dir.path().to_path_buf());

    let services = Services::ephemeral(&config).unwrap();
    assert!(!services.accounts.exists("alice").await.unwrap());
    assert_eq!(services.notes.count_notes("alice").await.unwrap(), 0);
    assert!(services.fonts.list_fonts("alice").await.unwrap().is_empty());
}
