//! Checkout from session cart to recorded order.

#![allow(clippy::unwrap_used)]

use clothaura_core::{Currency, OrderStatus};
use clothaura_integration_tests::{TestApp, dec, email};
use clothaura_storefront::db::{OrderStore, UserStore};
use clothaura_storefront::gateway::PaymentProof;
use clothaura_storefront::models::{NewUser, Quantity, User};
use clothaura_storefront::services::auth::hash_password;
use clothaura_storefront::services::cart::CartService;
use clothaura_storefront::services::checkout::{CheckoutError, CheckoutService};
use clothaura_storefront::session::SessionContext;

async fn shopper(app: &TestApp, address: &str) -> User {
    UserStore::create(
        app.store.as_ref(),
        NewUser {
            name: "Asha".to_string(),
            email: email(address),
            password_hash: hash_password("correct horse").unwrap(),
            mobile: None,
        },
    )
    .await
    .unwrap()
}

fn checkout(app: &TestApp) -> CheckoutService<'_> {
    CheckoutService::new(app.state.gateway(), app.state.orders(), Currency::Inr)
}

/// Signed-in session holding {A: 250.00 x2, B: 99.50 x1}.
async fn filled_session(app: &TestApp) -> SessionContext {
    let a = app.product("Linen Shirt", "250.00").await;
    let b = app.product("Cotton Socks", "99.50").await;
    let session = app.session();
    let user = shopper(app, "asha@example.com").await;
    session.sign_in(&user).await.unwrap();

    let cart = CartService::new(app.state.catalog());
    cart.add(&session, a, Quantity::coerce(Some("2"))).await.unwrap();
    cart.add(&session, b, Quantity::ONE).await.unwrap();
    session
}

#[tokio::test]
async fn test_empty_cart_never_reaches_gateway() {
    let app = TestApp::new();
    let session = app.session();

    let err = checkout(&app).initiate(&session).await.unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(app.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_gateway_amount_is_grand_total_in_minor_units() {
    let app = TestApp::new();
    let session = filled_session(&app).await;

    let order = checkout(&app).initiate(&session).await.unwrap();

    assert_eq!(order.total, dec("599.50"));
    assert_eq!(order.amount_minor, 59_950);
    let requests = app.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 59_950);
    assert_eq!(requests[0].currency, Currency::Inr);
    assert!(requests[0].auto_capture);
}

#[tokio::test]
async fn test_tampered_signature_writes_nothing() {
    let app = TestApp::new();
    let session = filled_session(&app).await;
    let service = checkout(&app);
    let order = service.initiate(&session).await.unwrap();

    // Signature for a different payment, presented with this payment's id.
    let mut proof = app.gateway.proof(&order.gateway_order_id, "pay_001");
    proof.signature = app.gateway.proof(&order.gateway_order_id, "pay_999").signature;

    let before = app.state.orders().count().await.unwrap();
    let err = service.confirm(Some(proof)).unwrap_err();

    assert!(matches!(err, CheckoutError::VerificationFailed));
    assert_eq!(app.state.orders().count().await.unwrap(), before);
    assert_eq!(app.store.item_count(), 0);
    assert_eq!(session.cart().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_incomplete_callback_is_rejected() {
    let app = TestApp::new();

    let proof = PaymentProof::from_callback(Some("pay_001".to_string()), None, None);
    let err = checkout(&app).confirm(proof).unwrap_err();

    assert!(matches!(err, CheckoutError::MissingProof));
}

#[tokio::test]
async fn test_persist_records_one_order_and_empties_cart() {
    let app = TestApp::new();
    let session = filled_session(&app).await;
    let service = checkout(&app);
    let order = service.initiate(&session).await.unwrap();

    let proof = app.gateway.proof(&order.gateway_order_id, "pay_001");
    let payment = service.confirm(Some(proof)).unwrap();
    let receipt = service
        .persist(&session, payment, Some("12 MG Road, Pune"))
        .await
        .unwrap();

    assert!(!receipt.replayed);
    assert_eq!(receipt.item_count, 2);
    assert_eq!(receipt.total, dec("599.50"));
    assert_eq!(app.state.orders().count().await.unwrap(), 1);
    assert_eq!(app.store.item_count(), 2);
    assert!(session.cart().await.unwrap().is_empty());

    let stored = app
        .state
        .orders()
        .find_by_gateway_order_id(&order.gateway_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, OrderStatus::Paid);
    assert_eq!(stored.address, "12 MG Road, Pune");
    assert_eq!(stored.payment_id.as_deref(), Some("pay_001"));
}

#[tokio::test]
async fn test_blank_address_is_recorded_as_not_provided() {
    let app = TestApp::new();
    let session = filled_session(&app).await;
    let service = checkout(&app);
    let order = service.initiate(&session).await.unwrap();

    let payment = service
        .confirm(Some(app.gateway.proof(&order.gateway_order_id, "pay_002")))
        .unwrap();
    let receipt = service.persist(&session, payment, Some("   ")).await.unwrap();

    let items = app.state.orders().items(receipt.order_id).await.unwrap();
    assert_eq!(items.len(), 2);
    let stored = app
        .state
        .orders()
        .find_by_gateway_order_id(&order.gateway_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.address, "Not Provided");
}

#[tokio::test]
async fn test_replayed_callback_returns_existing_order() {
    let app = TestApp::new();
    let session = filled_session(&app).await;
    let service = checkout(&app);
    let order = service.initiate(&session).await.unwrap();
    let proof = app.gateway.proof(&order.gateway_order_id, "pay_003");

    let first = service
        .persist(&session, service.confirm(Some(proof.clone())).unwrap(), None)
        .await
        .unwrap();
    let second = service
        .persist(&session, service.confirm(Some(proof)).unwrap(), None)
        .await
        .unwrap();

    assert!(second.replayed);
    assert_eq!(second.order_id, first.order_id);
    assert_eq!(second.item_count, 2);
    assert_eq!(app.state.orders().count().await.unwrap(), 1);
    assert_eq!(app.store.item_count(), 2);
}

#[tokio::test]
async fn test_persist_without_login_keeps_cart() {
    let app = TestApp::new();
    let tee = app.product("Tee", "10.00").await;
    let session = app.session();
    CartService::new(app.state.catalog())
        .add(&session, tee, Quantity::ONE)
        .await
        .unwrap();
    let service = checkout(&app);
    let order = service.initiate(&session).await.unwrap();

    let payment = service
        .confirm(Some(app.gateway.proof(&order.gateway_order_id, "pay_004")))
        .unwrap();
    let err = service.persist(&session, payment, None).await.unwrap_err();

    assert!(matches!(err, CheckoutError::SessionLost));
    assert_eq!(app.state.orders().count().await.unwrap(), 0);
    assert_eq!(session.cart().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleted_product_rolls_back_whole_order() {
    let app = TestApp::new();
    let session = filled_session(&app).await;
    let service = checkout(&app);
    let order = service.initiate(&session).await.unwrap();
    let payment = service
        .confirm(Some(app.gateway.proof(&order.gateway_order_id, "pay_005")))
        .unwrap();

    // One line's product disappears between payment and persist.
    let cart = session.cart().await.unwrap();
    let (last_key, _) = cart.entries().last().unwrap();
    let gone = last_key.parse().unwrap();
    assert!(app.store.delete_product(gone));

    let err = service.persist(&session, payment, None).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Persist(_)));
    assert_eq!(app.state.orders().count().await.unwrap(), 0);
    assert_eq!(app.store.item_count(), 0);
    assert_eq!(session.cart().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_gateway_outage_is_reported() {
    let app = TestApp::new();
    let session = filled_session(&app).await;
    app.gateway.set_unavailable(true);

    let err = checkout(&app).initiate(&session).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Gateway(_)));
}
