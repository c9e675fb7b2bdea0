//! Behavior of the directory and session store

use std::sync::Arc;
use std::time::{Duration, Instant};
use stressviz_auth::{AuthError, AuthOptions, AuthService, FileStore, MemoryStore};
use stressviz_core::{
    AuthState, EmailMatch, KeyValueStore, UserRecord, CURRENT_USER_KEY, USERS_KEY,
};

fn memory_service() -> (Arc<MemoryStore>, AuthService) {
    let store = Arc::new(MemoryStore::new());
    let service = AuthService::new(store.clone(), AuthOptions::instant());
    (store, service)
}

fn stored_users(store: &dyn KeyValueStore) -> Vec<UserRecord> {
    let raw = store.get(USERS_KEY).unwrap().unwrap_or_else(|| "[]".to_string());
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_register_unseen_email_creates_single_session() {
    let (store, auth) = memory_service();

    let user = auth
        .register("Ada Lovelace", "ada@example.com", "engine1")
        .await
        .unwrap();

    assert_eq!(user.name, "Ada Lovelace");
    assert_eq!(user.email, "ada@example.com");
    assert!(uuid::Uuid::parse_str(&user.id).is_ok());
    assert_eq!(auth.get_current_user(), Some(user.clone()));
    assert!(auth.is_authenticated());

    let users = stored_users(store.as_ref());
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, user.id);
    assert_eq!(users[0].password, "engine1");

    let session: serde_json::Value =
        serde_json::from_str(&store.get(CURRENT_USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(
        session,
        serde_json::json!({
            "id": user.id,
            "name": "Ada Lovelace",
            "email": "ada@example.com"
        })
    );
}

#[tokio::test]
async fn test_duplicate_email_fails_and_keeps_users() {
    let (store, auth) = memory_service();
    let first = auth
        .register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    let before = store.get(USERS_KEY).unwrap();

    let err = auth
        .register("Impostor", "ada@example.com", "other12")
        .await
        .unwrap_err();

    assert!(err.is_duplicate_email());
    assert_eq!(err.to_string(), "User with this email already exists");
    assert_eq!(store.get(USERS_KEY).unwrap(), before);
    // Session still belongs to the first account
    assert_eq!(auth.get_current_user(), Some(first));
}

#[tokio::test]
async fn test_email_uniqueness_is_case_sensitive_by_default() {
    let (store, auth) = memory_service();
    auth.register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    auth.register("Ada Upper", "ADA@example.com", "engine1")
        .await
        .unwrap();

    assert_eq!(stored_users(store.as_ref()).len(), 2);
}

#[tokio::test]
async fn test_case_insensitive_matching_when_configured() {
    let store = Arc::new(MemoryStore::new());
    let auth = AuthService::new(
        store.clone(),
        AuthOptions::instant().with_email_match(EmailMatch::CaseInsensitive),
    );

    let user = auth
        .register("Ada", "Ada@Example.com", "engine1")
        .await
        .unwrap();
    let err = auth
        .register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap_err();
    assert!(err.is_duplicate_email());

    auth.logout().unwrap();
    let again = auth.login("ADA@EXAMPLE.COM", "engine1").await.unwrap();
    assert_eq!(again, user);
}

#[tokio::test]
async fn test_login_returns_stored_record_without_password() {
    let (store, auth) = memory_service();
    auth.register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    auth.logout().unwrap();

    let user = auth.login("ada@example.com", "engine1").await.unwrap();
    let record = &stored_users(store.as_ref())[0];

    assert_eq!(user.id, record.id);
    assert_eq!(user.name, record.name);
    assert_eq!(user.email, record.email);
    assert_eq!(auth.get_current_user(), Some(user));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
    let (_store, auth) = memory_service();
    auth.register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    auth.logout().unwrap();

    let wrong_password = auth.login("ada@example.com", "engine2").await.unwrap_err();
    let unknown_email = auth
        .login("babbage@example.com", "engine1")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(wrong_password.to_string(), "Invalid email or password");
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_logout_always_clears_session() {
    let (_store, auth) = memory_service();

    auth.logout().unwrap();
    assert_eq!(auth.get_current_user(), None);

    auth.register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    auth.logout().unwrap();
    assert_eq!(auth.get_current_user(), None);
    assert_eq!(auth.auth_state(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_logout_twice_is_not_an_error() {
    let (store, auth) = memory_service();
    auth.register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();

    auth.logout().unwrap();
    auth.logout().unwrap();

    assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_register_logout_login_round_trip() {
    let (_store, auth) = memory_service();

    let registered = auth
        .register("Grace", "grace@example.com", "cobol60")
        .await
        .unwrap();
    auth.logout().unwrap();
    let logged_in = auth.login("grace@example.com", "cobol60").await.unwrap();

    assert_eq!(logged_in, registered);
}

#[tokio::test]
async fn test_corrupted_session_reads_as_absent() {
    let (store, auth) = memory_service();

    store.set(CURRENT_USER_KEY, "{\"id\": \"trunc").unwrap();
    assert_eq!(auth.get_current_user(), None);
    assert!(!auth.is_authenticated());

    store.set(CURRENT_USER_KEY, "").unwrap();
    assert_eq!(auth.get_current_user(), None);

    // Logging out clears the garbage
    auth.logout().unwrap();
    assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_corrupted_users_slot_rejects_register_and_login() {
    let (store, auth) = memory_service();
    store.set(USERS_KEY, "definitely not json").unwrap();

    let err = auth
        .register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Serialization(_)));

    let err = auth.login("ada@example.com", "engine1").await.unwrap_err();
    assert!(err.is_storage_failure());
    assert!(!auth.is_authenticated());
}

#[tokio::test]
async fn test_session_survives_users_slot_removal() {
    let (store, auth) = memory_service();
    let user = auth
        .register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();

    store.remove(USERS_KEY).unwrap();

    assert_eq!(auth.get_current_user(), Some(user));
}

#[tokio::test]
async fn test_store_accepts_unvalidated_input() {
    let (_store, auth) = memory_service();

    // Format rules belong to the forms, not the store
    let user = auth.register("", "not-an-email", "1").await.unwrap();
    assert_eq!(user.email, "not-an-email");
}

#[tokio::test]
async fn test_simulated_latency_applies_to_register_and_login() {
    let store = Arc::new(MemoryStore::new());
    let auth = AuthService::new(
        store,
        AuthOptions::instant().with_latency(Duration::from_millis(30)),
    );

    let start = Instant::now();
    auth.register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(30));

    let start = Instant::now();
    auth.login("ada@example.com", "wrong").await.unwrap_err();
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_file_backed_accounts_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let user = {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let auth = AuthService::new(store, AuthOptions::instant());
        auth.register("Ada", "ada@example.com", "engine1")
            .await
            .unwrap()
    };

    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let auth = AuthService::new(store, AuthOptions::instant());
    assert_eq!(auth.get_current_user(), Some(user.clone()));

    auth.logout().unwrap();
    assert_eq!(
        auth.login("ada@example.com", "engine1").await.unwrap(),
        user
    );
}

#[tokio::test]
async fn test_reads_users_written_by_earlier_versions() {
    let (store, auth) = memory_service();
    store
        .set(
            USERS_KEY,
            r#"[{"id":"5f0c6c3e-1111-4222-8333-944455556666","name":"Ada","email":"ada@example.com","password":"engine1"}]"#,
        )
        .unwrap();

    let user = auth.login("ada@example.com", "engine1").await.unwrap();
    assert_eq!(user.id, "5f0c6c3e-1111-4222-8333-944455556666");

    let err = auth
        .register("Other", "ada@example.com", "engine1")
        .await
        .unwrap_err();
    assert!(err.is_duplicate_email());
}

#[tokio::test]
async fn test_register_rolls_back_account_when_session_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let auth = AuthService::new(store.clone(), AuthOptions::instant());

    // A directory where the session file belongs makes the session write fail
    let blocker = dir.path().join(format!("{}.json", CURRENT_USER_KEY));
    std::fs::create_dir(&blocker).unwrap();

    let err = auth
        .register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap_err();
    assert!(err.is_storage_failure());
    assert!(err.to_string().starts_with("Storage error: "));
    assert!(!err.to_string().contains("Storage error: Storage error"));
    assert!(stored_users(store.as_ref()).is_empty());
    assert!(!auth.is_authenticated());

    std::fs::remove_dir(&blocker).unwrap();
    let user = auth
        .register("Ada", "ada@example.com", "engine1")
        .await
        .unwrap();
    assert_eq!(auth.get_current_user(), Some(user));
    assert_eq!(stored_users(store.as_ref()).len(), 1);
}
