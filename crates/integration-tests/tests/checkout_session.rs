//! Checkout flow across whole storefront sessions.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use ilyo_core::{CheckoutStep, Email, ShippingOptionId, VariantId};
use ilyo_integration_tests::{ROSE_50ML, boutique, session_with};
use ilyo_storefront::medusa::Address;
use ilyo_storefront::medusa::fake::{FakeBackend, ops};
use ilyo_storefront::session::{CheckoutState, ErrorKind, StorefrontSession};
use ilyo_storefront::slots::{MemorySlots, SlotKey, SlotStore};

fn address() -> Address {
    Address {
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        address_1: Some("12 Rue des Parfums".to_string()),
        city: Some("Paris".to_string()),
        postal_code: Some("75001".to_string()),
        country_code: Some("FR".to_string()),
        ..Address::default()
    }
}

/// Walk the session through contact, shipping and payment.
async fn ready_to_pay(session: &StorefrontSession) {
    session
        .cart()
        .add_item(&VariantId::new(ROSE_50ML), 1)
        .await
        .unwrap();

    let checkout = session.checkout();
    checkout
        .update_email(&Email::parse("jane@example.com").unwrap())
        .await
        .unwrap();
    checkout.update_shipping_address(&address()).await.unwrap();
    checkout.update_billing_address(&address()).await.unwrap();
    checkout.next_step();

    let options = checkout.fetch_shipping_options().await.unwrap();
    checkout.select_shipping_option(&options[0].id).await.unwrap();
    checkout.next_step();

    checkout.initialize_payment().await.unwrap();
}

fn setup() -> (Arc<FakeBackend>, Arc<MemorySlots>, StorefrontSession) {
    let backend = Arc::new(boutique());
    let slots = Arc::new(MemorySlots::new());
    let session = session_with(&backend, &slots);
    (backend, slots, session)
}

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_full_checkout_places_order_and_clears_cart() {
    let (backend, slots, session) = setup();
    ready_to_pay(&session).await;
    assert_eq!(session.checkout().step(), CheckoutStep::Payment);
    assert_eq!(session.cart().total(), 8500 + 500);

    let order = session.confirm_order().await.unwrap();

    assert_eq!(order.total, 9000);
    assert_eq!(order.email.as_deref(), Some("jane@example.com"));
    assert_eq!(session.checkout().step(), CheckoutStep::Confirmation);
    assert!(session.cart().cart().is_none());
    assert_eq!(slots.get(SlotKey::CartId).await, None);
    assert_eq!(backend.calls(ops::COMPLETE_CART), 1);
}

#[tokio::test]
async fn test_complete_checkout_alone_keeps_cart() {
    let (_backend, slots, session) = setup();
    ready_to_pay(&session).await;
    let cart_id = session.cart().cart_id().unwrap();

    session.checkout().complete_checkout().await.unwrap();

    assert_eq!(session.checkout().step(), CheckoutStep::Confirmation);
    assert_eq!(session.cart().cart_id(), Some(cart_id.clone()));
    assert_eq!(
        slots.get(SlotKey::CartId).await.as_deref(),
        Some(cart_id.as_str())
    );
}

#[tokio::test]
async fn test_checkout_state_mirrors_inputs() {
    let (_backend, _slots, session) = setup();
    ready_to_pay(&session).await;

    let state = session.checkout().state();
    assert_eq!(state.email, "jane@example.com");
    assert_eq!(state.shipping_address, Some(address()));
    assert_eq!(
        state.shipping_method_id,
        Some(ShippingOptionId::new("so_standard"))
    );
    assert_eq!(state.shipping_options.len(), 1);

    // The cart reflects the server's normalization
    let cart = session.cart().cart().unwrap();
    assert_eq!(
        cart.shipping_address.unwrap().country_code.as_deref(),
        Some("fr")
    );
    assert!(cart.payment_collection.is_some());
}

#[tokio::test]
async fn test_email_update_creates_cart_when_missing() {
    let (backend, _slots, session) = setup();

    session
        .checkout()
        .update_email(&Email::parse("guest@example.com").unwrap())
        .await
        .unwrap();

    assert_eq!(backend.calls(ops::CREATE_CART), 1);
    assert_eq!(
        session.cart().cart().unwrap().email.as_deref(),
        Some("guest@example.com")
    );
}

// ============================================================================
// Payment Sessions
// ============================================================================

#[tokio::test]
async fn test_payment_session_selection() {
    let backend = Arc::new(boutique().with_payment_sessions_per_init(2));
    let session = session_with(&backend, &Arc::new(MemorySlots::new()));
    ready_to_pay(&session).await;

    let checkout = session.checkout();
    let collection = checkout.state().payment_collection.unwrap();
    assert_eq!(collection.payment_sessions.len(), 2);
    assert_eq!(
        checkout.payment_session().unwrap().id,
        collection.payment_sessions[0].id
    );

    assert!(checkout.select_payment_session(&collection.payment_sessions[1].id));
    assert_eq!(
        checkout.payment_session().unwrap().id,
        collection.payment_sessions[1].id
    );
    assert!(!checkout.select_payment_session(&ilyo_core::PaymentSessionId::new("payses_x")));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_completion_keeps_step_and_cart() {
    let (backend, _slots, session) = setup();
    ready_to_pay(&session).await;
    backend.fail(ops::COMPLETE_CART);

    let err = session.confirm_order().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(session.checkout().step(), CheckoutStep::Payment);
    assert!(session.cart().cart().is_some());
    assert!(session.checkout().error().is_some());
}

#[tokio::test]
async fn test_completion_without_payment_is_rejected() {
    let (_backend, _slots, session) = setup();
    session
        .cart()
        .add_item(&VariantId::new(ROSE_50ML), 1)
        .await
        .unwrap();

    let err = session.checkout().complete_checkout().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(session.checkout().step(), CheckoutStep::Information);
}

#[tokio::test]
async fn test_shipping_without_cart_is_benign() {
    let (backend, _slots, session) = setup();

    let err = session
        .checkout()
        .fetch_shipping_options()
        .await
        .unwrap_err();

    assert!(err.is_benign());
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_reset_returns_to_information() {
    let (_backend, _slots, session) = setup();
    ready_to_pay(&session).await;

    session.checkout().reset_checkout();

    assert_eq!(session.checkout().state(), CheckoutState::default());
    // The cart itself is untouched
    assert!(session.cart().cart().is_some());
}
