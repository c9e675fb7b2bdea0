//! User workflow scenarios
//!
//! Walks through what a visitor does across the sign-up, sign-in and
//! navigation screens, against a file-backed partition.

use std::time::Duration;
use stressviz_auth::{FormError, LoginForm, RegistrationForm, SessionChangeKind};
use tokio::time::timeout;

mod common;
use common::TestPartition;

#[tokio::test]
async fn test_new_visitor_signs_up_and_returns_later() {
    let partition = TestPartition::new();
    let auth = partition.open_tab();

    println!("🧪 Scenario: new visitor signs up, leaves, and signs back in");

    println!("📝 Step 1: sign-up form with a typo in the confirmation");
    let err = RegistrationForm::new("Marie Curie", "marie@example.com", "radium88", "radium89")
        .submit(&auth, 6)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), FormError::PasswordMismatch.to_string());
    assert!(!auth.is_authenticated());

    println!("📝 Step 2: corrected sign-up");
    let user = RegistrationForm::new("Marie Curie", "marie@example.com", "radium88", "radium88")
        .submit(&auth, 6)
        .await
        .unwrap();
    assert!(auth.is_authenticated());
    println!("   ✅ Registered: {}", user.id);

    println!("📝 Step 3: sign out from the navigation bar");
    auth.logout().unwrap();
    assert!(!auth.is_authenticated());

    println!("📝 Step 4: come back after a restart");
    let later = partition.reopen();
    assert_eq!(later.get_current_user(), None);

    let err = LoginForm::new("marie@example.com", "polonium")
        .submit(&later)
        .await
        .unwrap_err();
    assert!(err.is_invalid_credentials());

    let again = LoginForm::new("marie@example.com", "radium88")
        .submit(&later)
        .await
        .unwrap();
    assert_eq!(again, user);
    println!("   ✅ Signed back in as {}", again.email);
}

#[tokio::test]
async fn test_second_visitor_cannot_take_an_email() {
    let partition = TestPartition::new();
    let first = partition.open_tab();
    let second = partition.open_tab();

    println!("🧪 Scenario: two visitors, one email");

    let owner = RegistrationForm::new("Ada", "ada@example.com", "engine1", "engine1")
        .submit(&first, 6)
        .await
        .unwrap();

    let err = RegistrationForm::new("Someone", "ada@example.com", "other12", "other12")
        .submit(&second, 6)
        .await
        .unwrap_err();
    assert!(err.is_duplicate_email());

    // Both handles read the same session slot
    assert_eq!(second.get_current_user(), Some(owner));
}

#[tokio::test]
async fn test_sign_out_in_one_tab_reaches_the_other() {
    let partition = TestPartition::new();
    let tab_a = partition.open_tab();
    let tab_b = partition.open_tab();

    println!("🧪 Scenario: sign out in one tab while another is open");

    RegistrationForm::new("Ada", "ada@example.com", "engine1", "engine1")
        .submit(&tab_a, 6)
        .await
        .unwrap();

    let mut b_changes = tab_b.subscribe();
    let relay = tab_b.spawn_storage_relay();

    tab_a.logout().unwrap();

    let change = timeout(Duration::from_secs(1), b_changes.recv())
        .await
        .expect("tab B should hear about the sign-out")
        .unwrap();
    assert_eq!(change.kind, SessionChangeKind::External);
    assert!(!change.is_signed_in());
    assert!(!tab_b.is_authenticated());
    println!("   ✅ Tab B shows the visitor signed out");

    relay.abort();
}
