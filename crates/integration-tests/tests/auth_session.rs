//! Customer authentication across whole storefront sessions.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use ilyo_core::{Email, VariantId};
use ilyo_integration_tests::{
    CUSTOMER_EMAIL, CUSTOMER_PASSWORD, ROSE_50ML, boutique, session, session_with,
};
use ilyo_storefront::medusa::CustomerUpdate;
use ilyo_storefront::medusa::fake::ops;
use ilyo_storefront::session::{AuthRedirect, ErrorKind};
use ilyo_storefront::slots::{MemorySlots, SlotKey, SlotStore};
use secrecy::SecretString;

fn email() -> Email {
    Email::parse(CUSTOMER_EMAIL).unwrap()
}

fn password(raw: &str) -> SecretString {
    SecretString::from(raw.to_string())
}

// ============================================================================
// Login & Registration
// ============================================================================

#[tokio::test]
async fn test_login_persists_token() {
    let backend = Arc::new(boutique());
    let slots = Arc::new(MemorySlots::new());
    let session = session_with(&backend, &slots);

    let customer = session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();

    assert_eq!(customer.email, CUSTOMER_EMAIL);
    assert!(session.auth().is_authenticated());
    let token = slots.get(SlotKey::AuthToken).await.unwrap();
    assert!(backend.token_is_valid(&token));
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let backend = Arc::new(boutique());
    let session = session(&backend);

    let err = session
        .auth()
        .login(&email(), &password("nope"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert!(!session.auth().is_authenticated());
    assert!(session.auth().error().is_some());
}

#[tokio::test]
async fn test_register_sets_profile_names() {
    let backend = Arc::new(boutique());
    let session = session(&backend);

    let customer = session
        .auth()
        .register(
            &Email::parse("new@example.com").unwrap(),
            &password("s3cret-pass"),
            "Ada",
            "Lovelace",
        )
        .await
        .unwrap();

    assert_eq!(customer.first_name.as_deref(), Some("Ada"));
    assert_eq!(customer.last_name.as_deref(), Some("Lovelace"));
    assert!(session.auth().is_authenticated());
}

#[tokio::test]
async fn test_register_existing_email_fails() {
    let backend = Arc::new(boutique());
    let session = session(&backend);

    let result = session
        .auth()
        .register(&email(), &password("whatever"), "Jane", "Doe")
        .await;

    assert!(result.is_err());
    assert!(!session.auth().is_authenticated());
}

// ============================================================================
// Session Restore
// ============================================================================

#[tokio::test]
async fn test_token_restores_customer_in_new_session() {
    let backend = Arc::new(boutique());
    let slots = Arc::new(MemorySlots::new());
    session_with(&backend, &slots)
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();

    let restored = session_with(&backend, &slots);
    let customer = restored.auth().current_customer().await.unwrap();

    assert_eq!(customer.email, CUSTOMER_EMAIL);
}

#[tokio::test]
async fn test_revoked_token_is_forgotten() {
    let backend = Arc::new(boutique());
    let slots = Arc::new(MemorySlots::new());
    let session = session_with(&backend, &slots);
    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();

    backend.revoke_tokens();

    assert!(session.auth().current_customer().await.is_none());
    assert!(!session.auth().is_authenticated());
    assert_eq!(slots.get(SlotKey::AuthToken).await, None);
}

#[tokio::test]
async fn test_anonymous_current_customer_makes_no_call() {
    let backend = Arc::new(boutique());
    let session = session(&backend);

    assert!(session.auth().current_customer().await.is_none());
    assert_eq!(backend.calls(ops::RETRIEVE_CUSTOMER), 0);
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_forgets_customer_and_cart() {
    let backend = Arc::new(boutique());
    let slots = Arc::new(MemorySlots::new());
    let session = session_with(&backend, &slots);
    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    session
        .cart()
        .add_item(&VariantId::new(ROSE_50ML), 1)
        .await
        .unwrap();

    session.logout().await;

    assert!(!session.auth().is_authenticated());
    assert!(session.cart().cart().is_none());
    assert_eq!(slots.get(SlotKey::AuthToken).await, None);
    assert_eq!(slots.get(SlotKey::CartId).await, None);
}

#[tokio::test]
async fn test_logout_clears_locally_when_remote_fails() {
    let backend = Arc::new(boutique());
    let slots = Arc::new(MemorySlots::new());
    let session = session_with(&backend, &slots);
    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    backend.fail(ops::LOGOUT);

    session.auth().logout().await;

    assert!(!session.auth().is_authenticated());
    assert_eq!(slots.get(SlotKey::AuthToken).await, None);
    assert_eq!(session.auth().error().unwrap().kind, ErrorKind::Remote);
}

// ============================================================================
// Account
// ============================================================================

#[tokio::test]
async fn test_update_customer_requires_login() {
    let backend = Arc::new(boutique());
    let session = session(&backend);

    let err = session
        .auth()
        .update_customer(&CustomerUpdate::default())
        .await
        .unwrap_err();

    assert!(err.is_benign());
    assert_eq!(backend.calls(ops::UPDATE_CUSTOMER), 0);
}

#[tokio::test]
async fn test_update_customer_refreshes_profile() {
    let backend = Arc::new(boutique());
    let session = session(&backend);
    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();

    let update = CustomerUpdate {
        phone: Some("+33 1 23 45 67 89".to_string()),
        ..CustomerUpdate::default()
    };
    session.auth().update_customer(&update).await.unwrap();

    assert_eq!(
        session.auth().customer().unwrap().phone.as_deref(),
        Some("+33 1 23 45 67 89")
    );
}

#[tokio::test]
async fn test_orders_lists_confirmed_orders() {
    let backend = Arc::new(boutique());
    let session = session(&backend);
    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    assert!(session.auth().orders().await.is_empty());

    session
        .cart()
        .add_item(&VariantId::new(ROSE_50ML), 1)
        .await
        .unwrap();
    session.checkout().update_email(&email()).await.unwrap();
    session.checkout().initialize_payment().await.unwrap();
    session.confirm_order().await.unwrap();

    let orders = session.auth().orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total, 8500);
}

#[tokio::test]
async fn test_orders_failure_is_swallowed() {
    let backend = Arc::new(boutique());
    let session = session(&backend);
    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();
    backend.fail(ops::LIST_ORDERS);

    assert!(session.auth().orders().await.is_empty());
}

// ============================================================================
// Route Guards
// ============================================================================

#[tokio::test]
async fn test_route_guards() {
    let backend = Arc::new(boutique());
    let session = session(&backend);

    assert_eq!(
        session.auth().require_customer("/account").await.unwrap_err(),
        AuthRedirect::to_login("/account")
    );
    assert!(session.auth().guest_only().await.is_ok());

    session
        .auth()
        .login(&email(), &password(CUSTOMER_PASSWORD))
        .await
        .unwrap();

    assert!(session.auth().require_customer("/account").await.is_ok());
    assert_eq!(
        session.auth().guest_only().await.unwrap_err(),
        AuthRedirect::to_account()
    );
}
