use super::*;
use crate::{
    gateway::HttpApiClient,
    mock_server::{self, seeded_state, TOKEN},
};

async fn store_with(storage: Arc<dyn SessionStorage>) -> (SessionStore, mock_server::MockServer) {
    let server = mock_server::spawn(seeded_state()).await;
    let api: Arc<dyn KanbanApi> = Arc::new(HttpApiClient::new(server.api_base.clone()));
    (SessionStore::new(api, storage), server)
}

#[tokio::test]
async fn stored_token_wins_over_launch_token() {
    let storage = Arc::new(MemorySessionStorage::with_token("stored"));
    let (store, _server) = store_with(storage).await;
    let store = store.with_launch_token(Some("from-url".into()));

    assert_eq!(store.token().as_deref(), Some("stored"));
}

#[tokio::test]
async fn launch_token_is_used_when_nothing_is_stored() {
    let (store, _server) = store_with(Arc::new(MemorySessionStorage::new())).await;
    assert_eq!(store.token(), None);
    assert!(!store.is_signed_in());

    let store = store.with_launch_token(Some("from-url".into()));
    assert_eq!(store.token().as_deref(), Some("from-url"));
}

#[tokio::test]
async fn login_persists_token_and_logout_clears_it() {
    let storage = Arc::new(MemorySessionStorage::new());
    let (store, _server) = store_with(storage.clone()).await;
    let mut store = store.with_launch_token(Some("from-url".into()));

    let token = store
        .login("ana@example.com", "secret")
        .await
        .expect("login");
    assert_eq!(token, TOKEN);
    assert_eq!(
        storage.get(TOKEN_STORAGE_KEY).expect("get").as_deref(),
        Some(TOKEN)
    );

    store.logout().expect("logout");
    assert_eq!(storage.get(TOKEN_STORAGE_KEY).expect("get"), None);
    assert_eq!(store.token(), None);
}

#[tokio::test]
async fn failed_login_reports_status_and_stores_nothing() {
    let storage = Arc::new(MemorySessionStorage::new());
    let (mut store, _server) = store_with(storage.clone()).await;

    let err = store
        .login("ana@example.com", "nope")
        .await
        .expect_err("bad credentials");

    assert_eq!(err.status(), Some(400));
    assert!(matches!(err, ClientError::Auth { .. }));
    assert_eq!(storage.get(TOKEN_STORAGE_KEY).expect("get"), None);
}

#[tokio::test]
async fn register_with_empty_password_makes_no_request() {
    let (store, server) = store_with(Arc::new(MemorySessionStorage::new())).await;

    let err = store
        .register("new@example.com", "")
        .await
        .expect_err("empty password");

    assert!(err.is_validation());
    assert_eq!(server.state.lock().await.request_count(), 0);
}

#[test]
fn file_storage_round_trips_and_creates_parent_dirs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FileSessionStorage::new(dir.path().join("nested").join("session.json"));

    assert_eq!(storage.get(TOKEN_STORAGE_KEY).expect("empty get"), None);
    storage.set(TOKEN_STORAGE_KEY, "abc").expect("set");
    storage.set("other", "kept").expect("set other");
    assert!(storage.path().exists());
    assert_eq!(
        storage.get(TOKEN_STORAGE_KEY).expect("get").as_deref(),
        Some("abc")
    );

    storage.remove(TOKEN_STORAGE_KEY).expect("remove");
    assert_eq!(storage.get(TOKEN_STORAGE_KEY).expect("get"), None);
    assert_eq!(storage.get("other").expect("get").as_deref(), Some("kept"));
}

#[test]
fn corrupt_session_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    fs::write(&path, "{not json").expect("write");

    let storage = FileSessionStorage::new(&path);
    assert!(storage.get(TOKEN_STORAGE_KEY).is_err());
}
