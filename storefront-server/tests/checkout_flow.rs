//! End-to-end checkout: order creation, hosted payment initialization and
//! reconciliation through the full router with the in-process gateway.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use shared::ErrorCode;
use storefront_server::auth::TokenSubject;
use storefront_server::payment::mock::{MockInit, MockVerify};
use storefront_server::payment::GatewayError;
use storefront_server::{Config, MockGateway, OrderStore, ServerState, build_app};

struct TestApp {
    app: Router,
    state: ServerState,
    gateway: Arc<MockGateway>,
}

impl TestApp {
    fn new() -> Self {
        let store = OrderStore::open_in_memory().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let mut config = Config::for_testing("unused");
        config.gateway.init_max_retries = 1;
        config.gateway.timeout = std::time::Duration::from_millis(500);
        let state = ServerState::with_gateway(config, store, gateway.clone());
        Self {
            app: build_app(state.clone()),
            state,
            gateway,
        }
    }

    fn token(&self, id: &str, role: &str) -> String {
        self.state
            .jwt_service()
            .generate_token(&TokenSubject {
                id,
                name: "Abebe Kebede",
                email: Some("abebe@example.com"),
                phone: Some("0911223344"),
                role,
            })
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn place_order(&self, token: &str) -> Value {
        let (status, order) = self
            .send(Method::POST, "/orders", Some(token), Some(cart()))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        order
    }

    async fn initialize(&self, token: &str, order_id: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/payment/initialize",
            Some(token),
            Some(json!({ "orderId": order_id })),
        )
        .await
    }
}

fn cart() -> Value {
    json!({
        "orderItems": [
            { "product": "p-injera", "name": "Injera", "image": "/img/injera.png", "price": 100, "qty": 2 },
            { "product": "p-coffee", "name": "Coffee", "image": "", "price": 12.5, "qty": 1 }
        ],
        "shippingAddress": "Bole, Addis Ababa",
        "paymentMethod": "Chapa",
        "totalPrice": 217.5
    })
}

fn error_code(body: &Value) -> u16 {
    body["code"].as_u64().unwrap_or_default() as u16
}

#[tokio::test]
async fn test_checkout_pay_and_verify() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");

    let order = t.place_order(&token).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["isPaid"], false);
    assert_eq!(order["totalPrice"], 217.5);
    assert!(order.get("paymentResult").is_none());

    let (status, init) = t.initialize(&token, &order_id).await;
    assert_eq!(status, StatusCode::OK, "{init}");
    let tx_ref = init["tx_ref"].as_str().unwrap().to_string();
    assert!(tx_ref.starts_with("TX-"));
    assert!(init["checkout_url"].as_str().unwrap().ends_with(&tx_ref));

    let session = t.gateway.session(&tx_ref).unwrap();
    assert_eq!(session.amount, 217.5);
    assert_eq!(session.currency, "ETB");
    assert_eq!(
        session.return_url,
        format!("http://localhost:5173/payment-result?tx_ref={tx_ref}")
    );

    t.gateway.complete_payment(&tx_ref);

    // Public: the provider redirect carries no token
    let uri = format!("/payment/verify/{tx_ref}");
    let (status, verified) = t.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK, "{verified}");
    assert_eq!(verified["status"], "success");
    assert_eq!(verified["order"]["isPaid"], true);
    assert_eq!(verified["order"]["status"], "Preparing");
    assert_eq!(verified["order"]["paymentResult"]["transactionRef"], tx_ref.as_str());
    let paid_at = verified["order"]["paidAt"].clone();
    assert!(paid_at.is_i64());

    // Second verification answers from the store
    let (status, again) = t.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "success");
    assert_eq!(again["order"]["paidAt"], paid_at);
    assert_eq!(t.gateway.verify_calls(), 1);

    let (status, mine) = t
        .send(Method::GET, "/orders/myorders", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["isPaid"], true);

    // Paid orders cannot be paid again
    let (status, body) = t.initialize(&token, &order_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), ErrorCode::OrderAlreadyPaid as u16);
}

#[tokio::test]
async fn test_orders_require_authentication() {
    let t = TestApp::new();

    let (status, body) = t.send(Method::POST, "/orders", None, Some(cart())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), ErrorCode::NotAuthenticated as u16);

    let (status, body) = t
        .send(Method::GET, "/orders/myorders", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), ErrorCode::TokenInvalid as u16);

    let (status, _) = t.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");

    let body = json!({ "orderItems": [], "shippingAddress": "Bole", "paymentMethod": "Chapa" });
    let (status, resp) = t
        .send(Method::POST, "/orders", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&resp), ErrorCode::OrderEmpty as u16);

    let (_, mine) = t
        .send(Method::GET, "/orders/myorders", Some(&token), None)
        .await;
    assert_eq!(mine, json!([]));
}

#[tokio::test]
async fn test_tampered_total_is_rejected() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");

    let mut body = cart();
    body["totalPrice"] = json!(1.0);
    let (status, resp) = t
        .send(Method::POST, "/orders", Some(&token), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&resp), ErrorCode::OrderTotalMismatch as u16);
}

#[tokio::test]
async fn test_gateway_outage_leaves_order_pending() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");
    let order = t.place_order(&token).await;
    let order_id = order["id"].as_str().unwrap();

    t.gateway.push_init(MockInit::Error(GatewayError::Transport("connection refused".into())));
    t.gateway.push_init(MockInit::Error(GatewayError::Transport("connection refused".into())));

    let (status, body) = t.initialize(&token, order_id).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert_eq!(error_code(&body), ErrorCode::PaymentGatewayError as u16);
    // One retry configured
    assert_eq!(t.gateway.initialize_calls(), 2);

    let (_, stored) = t
        .send(Method::GET, &format!("/orders/{order_id}"), Some(&token), None)
        .await;
    assert_eq!(stored["status"], "Pending");
    assert_eq!(stored["isPaid"], false);

    // Checkout can be retried from the same order
    let (status, init) = t.initialize(&token, order_id).await;
    assert_eq!(status, StatusCode::OK, "{init}");
}

#[tokio::test]
async fn test_provider_rejection_is_bad_gateway() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");
    let order = t.place_order(&token).await;

    t.gateway.push_init(MockInit::Failure("Invalid currency".into()));
    let (status, body) = t.initialize(&token, order["id"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("Invalid currency"));
    assert_eq!(t.gateway.initialize_calls(), 1);
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let t = TestApp::new();

    let (status, body) = t
        .send(Method::GET, "/payment/verify/TX-0000deadbeef", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), ErrorCode::PaymentNotFound as u16);
    assert_eq!(t.gateway.verify_calls(), 0);
}

#[tokio::test]
async fn test_declined_payment_reports_failed() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");
    let order = t.place_order(&token).await;
    let (_, init) = t.initialize(&token, order["id"].as_str().unwrap()).await;
    let tx_ref = init["tx_ref"].as_str().unwrap();

    t.gateway
        .set_verify(tx_ref, MockVerify::Failure("Payment declined".into()));
    let (status, body) = t
        .send(Method::GET, &format!("/payment/verify/{tx_ref}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(error_code(&body), ErrorCode::PaymentFailed.code());
    assert_eq!(body["order"]["isPaid"], false);
    assert_eq!(body["order"]["status"], "Pending");
    assert_eq!(body["order"]["paymentResult"]["status"], "failed");
}

#[tokio::test]
async fn test_underpaid_session_is_not_accepted() {
    let t = TestApp::new();
    let token = t.token("cust-1", "customer");
    let order = t.place_order(&token).await;
    let (_, init) = t.initialize(&token, order["id"].as_str().unwrap()).await;
    let tx_ref = init["tx_ref"].as_str().unwrap();

    t.gateway.set_verify(
        tx_ref,
        MockVerify::Paid {
            amount: 17.5,
            currency: "ETB".into(),
        },
    );
    let (status, body) = t
        .send(Method::GET, &format!("/payment/verify/{tx_ref}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
    assert_eq!(error_code(&body), ErrorCode::PaymentAmountMismatch.code());
    assert_eq!(body["order"]["isPaid"], false);
}

#[tokio::test]
async fn test_orders_are_private_to_their_owner() {
    let t = TestApp::new();
    let owner = t.token("cust-1", "customer");
    let other = t.token("cust-2", "customer");
    let order = t.place_order(&owner).await;
    let order_id = order["id"].as_str().unwrap();

    let (status, _) = t
        .send(Method::GET, &format!("/orders/{order_id}"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t.initialize(&other, order_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(t.gateway.initialize_calls(), 0);

    let (status, body) = t.initialize(&owner, "no-such-order").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), ErrorCode::OrderNotFound as u16);
}

#[tokio::test]
async fn test_admin_fulfillment_flow() {
    let t = TestApp::new();
    let customer = t.token("cust-1", "customer");
    let admin = t.token("admin-1", "admin");
    let order = t.place_order(&customer).await;
    let order_id = order["id"].as_str().unwrap();

    // Customers cannot see the back office
    let (status, body) = t.send(Method::GET, "/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), ErrorCode::AdminRequired as u16);
    let (status, _) = t
        .send(
            Method::PUT,
            &format!("/orders/{order_id}/status"),
            Some(&customer),
            Some(json!({ "status": "Delivered" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, all) = t.send(Method::GET, "/orders", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, updated) = t
        .send(
            Method::PUT,
            &format!("/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "On the way" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["status"], "On the way");

    let (status, body) = t
        .send(
            Method::PUT,
            &format!("/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "Confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(&body), ErrorCode::InvalidStatusTransition as u16);

    let (status, updated) = t
        .send(
            Method::PUT,
            &format!("/orders/{order_id}/driver"),
            Some(&admin),
            Some(json!({ "driver": "  Dawit  " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["driver"], "Dawit");
}

#[tokio::test]
async fn test_transaction_ledger() {
    let t = TestApp::new();
    let customer = t.token("cust-1", "customer");
    let admin = t.token("admin-1", "admin");

    let first = t.place_order(&customer).await;
    let _unpaid = t.place_order(&customer).await;
    let (_, init) = t.initialize(&customer, first["id"].as_str().unwrap()).await;
    let tx_ref = init["tx_ref"].as_str().unwrap();
    t.gateway.complete_payment(tx_ref);
    t.send(Method::GET, &format!("/payment/verify/{tx_ref}"), None, None)
        .await;

    let (status, _) = t
        .send(Method::GET, "/payment/transactions", Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, rows) = t
        .send(Method::GET, "/payment/transactions", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    // Orders without a payment record are not listed
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["tx_ref"], tx_ref);
    assert_eq!(rows[0]["status"], "success");
    assert_eq!(rows[0]["is_paid"], true);
}
