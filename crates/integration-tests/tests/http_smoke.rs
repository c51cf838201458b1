//! The full router driven request by request, with a cookie-carrying client.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use clothaura_integration_tests::{TestApp, body_text, location};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let response = browser.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let response = browser.get("/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_pages_render_with_security_headers() {
    let app = TestApp::new();
    app.product("Linen Shirt", "1299.00").await;
    let mut browser = app.browser();

    let response = browser.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(
        headers
            .get("content-security-policy")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("https://checkout.razorpay.com")
    );
    assert!(headers.get("x-request-id").is_some());
    assert!(body_text(response).await.contains("Linen Shirt"));

    for page in ["/about", "/contact", "/products", "/login", "/register", "/cart"] {
        let response = browser.get(page).await;
        assert_eq!(response.status(), StatusCode::OK, "{page}");
    }
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let request = Request::get("/health")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .unwrap();
    let response = browser.send(request).await;

    assert_eq!(response.headers().get("x-request-id").unwrap(), "req-abc-123");
}

#[tokio::test]
async fn test_unknown_products_are_not_found() {
    let app = TestApp::new();
    let mut browser = app.browser();

    assert_eq!(browser.get("/products/999").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(browser.get("/products/shirt").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        browser.post_form("/add-to-cart/999", "qty=1").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_cart_actions_redirect_back_to_cart() {
    let app = TestApp::new();
    let shirt = app.product("Linen Shirt", "250.00").await;
    let mut browser = app.browser();

    let response = browser
        .post_form(&format!("/add-to-cart/{shirt}"), "qty=2")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    assert!(browser.has_session());

    browser
        .post_form(&format!("/cart/increase/{shirt}"), "")
        .await;
    let body = body_text(browser.get("/cart").await).await;
    assert!(body.contains("750.00"));

    browser
        .post_form(&format!("/cart/remove/{shirt}"), "")
        .await;
    let body = body_text(browser.get("/cart").await).await;
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_account_pages_require_login() {
    let app = TestApp::new();
    let mut browser = app.browser();

    for page in ["/profile", "/orders", "/admin-dashboard"] {
        let response = browser.get(page).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{page}");
        assert_eq!(location(&response), "/login");
    }
}

#[tokio::test]
async fn test_checkout_with_empty_cart_goes_back_to_cart() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let response = browser.get("/checkout").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart?error=empty_cart");
    assert!(app.gateway.requests().is_empty());
}

#[tokio::test]
async fn test_failed_login_redirects_with_error() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let response = browser
        .post_form("/login", "email=nobody%40example.com&password=whatever123")
        .await;

    // Unknown email is reported on the form, not as a 404 page.
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?error=user_not_found");
}

#[tokio::test]
async fn test_auth_posts_are_rate_limited() {
    let app = TestApp::new();
    let mut browser = app.browser();

    let mut statuses = Vec::new();
    for _ in 0..8 {
        let response = browser
            .post_form("/login", "email=nobody%40example.com&password=whatever123")
            .await;
        statuses.push(response.status());
    }

    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
    assert_eq!(statuses[0], StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_forged_payment_callback_is_rejected() {
    let app = TestApp::new();
    let shirt = app.product("Linen Shirt", "250.00").await;
    let mut browser = app.browser();
    browser.get(&format!("/add-to-cart/{shirt}")).await;
    let response = browser.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = browser
        .get("/payment-success?payment_id=pay_1&order_id=order_fake000001&signature=deadbeef")
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/checkout?error=payment_verification_failed");
    assert_eq!(app.store.item_count(), 0);
}

#[tokio::test]
async fn test_shopper_journey_from_cart_to_order() {
    let app = TestApp::new();
    let shirt = app.product("Linen Shirt", "250.00").await;
    let socks = app.product("Cotton Socks", "99.50").await;
    let mut browser = app.browser();

    // Anonymous cart
    browser
        .post_form(&format!("/add-to-cart/{shirt}"), "qty=2")
        .await;
    browser.get(&format!("/add-to-cart/{socks}")).await;
    let body = body_text(browser.get("/cart").await).await;
    assert!(body.contains("599.50"));

    // Register with the emailed code
    let response = browser
        .post_form(
            "/register",
            "name=Ravi+Kumar&email=ravi%40example.com&password=s3cure-passphrase",
        )
        .await;
    assert_eq!(location(&response), "/verify-otp");
    let body = body_text(browser.get("/verify-otp").await).await;
    assert!(body.contains("ravi@example.com"));

    let code = app.code_sent_to("ravi@example.com").unwrap();
    let response = browser.post_form("/verify-otp", &format!("otp={code}")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?success=registered");

    // The cart survives the session id change at sign-in
    let response = browser.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("order_fake000001"));
    assert!(body.contains("data-amount=\"59950\""));
    assert!(body.contains("ravi@example.com"));

    // Gateway callback
    let proof = app.gateway.proof("order_fake000001", "pay_001");
    let response = browser
        .get(&format!(
            "/payment-success?payment_id=pay_001&order_id=order_fake000001&signature={}&address=12+MG+Road",
            proof.signature
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("pay_001"));
    assert_eq!(app.store.item_count(), 2);

    let body = body_text(browser.get("/cart").await).await;
    assert!(body.contains("Your cart is empty"));

    let body = body_text(browser.get("/orders").await).await;
    assert!(body.contains("Linen Shirt"));
    assert!(body.contains("599.50"));

    // Logout clears everything
    let response = browser.post_form("/logout", "").await;
    assert_eq!(location(&response), "/?success=logged_out");
    let response = browser.get("/profile").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_register_rejects_taken_email_without_sending_code() {
    let app = TestApp::new();
    let mut first = app.browser();
    first
        .post_form(
            "/register",
            "name=Ravi&email=ravi%40example.com&password=s3cure-passphrase",
        )
        .await;
    let code = app.code_sent_to("ravi@example.com").unwrap();
    first.post_form("/verify-otp", &format!("otp={code}")).await;
    let sent = app.notifier.sent().len();

    let mut second = app.browser();
    let response = second
        .post_form(
            "/register",
            "name=Impostor&email=ravi%40example.com&password=another-pass",
        )
        .await;

    assert_eq!(location(&response), "/register?error=email_taken");
    assert_eq!(app.notifier.sent().len(), sent);
}

#[tokio::test]
async fn test_static_files_missing_are_not_found() {
    let app = TestApp::new();
    let request = Request::get("/static/none.css")
        .header(header::ACCEPT, "text/css")
        .body(Body::empty())
        .unwrap();

    let response = app.browser().send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
