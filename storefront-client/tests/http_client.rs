//! HttpClient against a live in-process storefront server

use std::net::SocketAddr;
use std::sync::Arc;

use rust_decimal::Decimal;
use shared::ErrorCode;
use shared::client::UserInfo;
use shared::models::{OrderStatus, PaymentStatus};
use storefront_client::{
    Cart, CartItem, CheckoutOrchestrator, ClientConfig, ClientError, HttpClient,
    PaymentResultPage, PaymentView, SessionCache, StorefrontApi,
};
use storefront_server::auth::TokenSubject;
use storefront_server::{Config, MockGateway, OrderStore, ServerState, build_app};

struct LiveServer {
    addr: SocketAddr,
    state: ServerState,
    gateway: Arc<MockGateway>,
}

impl LiveServer {
    async fn start() -> Self {
        Self::start_with(Config::for_testing("unused")).await
    }

    async fn start_with(config: Config) -> Self {
        let store = OrderStore::open_in_memory().unwrap();
        let gateway = Arc::new(MockGateway::default());
        let state = ServerState::with_gateway(config, store, gateway.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            gateway,
        }
    }

    fn client(&self, id: &str, role: &str) -> HttpClient {
        let token = self
            .state
            .jwt_service()
            .generate_token(&TokenSubject {
                id,
                name: "Hana Girma",
                email: Some("hana@example.com"),
                phone: None,
                role,
            })
            .unwrap();
        let user = UserInfo {
            id: id.to_string(),
            name: "Hana Girma".to_string(),
            email: Some("hana@example.com".to_string()),
            phone: None,
            role: role.to_string(),
        };
        ClientConfig::new(format!("http://{}", self.addr))
            .with_timeout(5)
            .build_http_client_with_sessions(Arc::new(SessionCache::new()))
            .unwrap()
            .with_session(token, user)
    }
}

fn cart() -> Cart {
    let mut cart = Cart::new();
    cart.add(CartItem {
        product_id: "p1".to_string(),
        name: "Injera".to_string(),
        image: String::new(),
        price: 100.0,
        quantity: 2,
    });
    cart
}

#[tokio::test]
async fn test_full_checkout_over_http() {
    let server = LiveServer::start().await;
    let orchestrator = CheckoutOrchestrator::new(server.client("cust-1", "customer"));
    let mut cart = cart();

    let redirect = orchestrator.checkout(&cart, "Bole").await.unwrap();
    assert!(redirect.checkout_url.ends_with(&redirect.tx_ref));

    let orders = orchestrator.api().my_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_price, 205.0);
    assert_eq!(orders[0].payment_status(), Some(PaymentStatus::Pending));

    // Customer pays on the hosted page and comes back
    assert!(server.gateway.complete_payment(&redirect.tx_ref));
    let return_url = format!("http://localhost:5173/payment-result?tx_ref={}", redirect.tx_ref);
    let mut page = PaymentResultPage::from_return_url(&return_url);
    let view = page.on_mount(orchestrator.api(), &mut cart).await.clone();

    match view {
        PaymentView::Success { order: Some(order) } => {
            assert!(order.is_paid);
            assert_eq!(order.status, OrderStatus::Preparing);
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_checkout_with_configured_delivery_fee() {
    let mut config = Config::for_testing("unused");
    config.delivery_fee = Decimal::new(10, 0);
    let server = LiveServer::start_with(config).await;
    let orchestrator = CheckoutOrchestrator::new(server.client("cust-1", "customer"));

    orchestrator.checkout(&cart(), "Bole").await.unwrap();

    let orders = orchestrator.api().my_orders().await.unwrap();
    assert_eq!(orders[0].total_price, 210.0);
    assert_eq!(orders[0].delivery_fee, 10.0);
}

#[tokio::test]
async fn test_checkout_with_midpoint_total() {
    let server = LiveServer::start().await;
    let orchestrator = CheckoutOrchestrator::new(server.client("cust-1", "customer"));
    let mut cart = Cart::new();
    cart.add(CartItem {
        product_id: "p2".to_string(),
        name: "Salt".to_string(),
        image: String::new(),
        price: 0.125,
        quantity: 1,
    });

    orchestrator.checkout(&cart, "Bole").await.unwrap();

    let orders = orchestrator.api().my_orders().await.unwrap();
    assert_eq!(orders[0].total_price, 5.13);
    assert_eq!(orders[0].total_price, cart.total_f64());
}

#[tokio::test]
async fn test_admin_calls() {
    let server = LiveServer::start().await;
    let customer = server.client("cust-1", "customer");
    let admin = server.client("admin-1", "admin");

    let orchestrator = CheckoutOrchestrator::new(customer.clone());
    let redirect = orchestrator.checkout(&cart(), "Bole").await.unwrap();

    let err = customer.list_orders().await.unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::AdminRequired));

    let order = admin
        .update_status(&redirect.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);

    let order = admin.update_driver(&redirect.order_id, "Dawit").await.unwrap();
    assert_eq!(order.driver.as_deref(), Some("Dawit"));

    let rows = admin.transactions().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tx_ref, redirect.tx_ref);
}

#[tokio::test]
async fn test_rejected_token_invalidates_session() {
    let server = LiveServer::start().await;
    let sessions = Arc::new(SessionCache::new());
    let user = UserInfo {
        id: "cust-1".to_string(),
        name: "Hana".to_string(),
        email: None,
        phone: None,
        role: "customer".to_string(),
    };
    let client = ClientConfig::new(format!("http://{}", server.addr))
        .build_http_client_with_sessions(sessions.clone())
        .unwrap()
        .with_session("forged-token", user);
    assert!(client.current_user().is_some());

    let err = client.my_orders().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(client.current_user().is_none());
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let server = LiveServer::start().await;
    let client = server.client("cust-1", "customer");

    let err = client.verify_payment("TX-0000").await.unwrap_err();
    assert_eq!(err.error_code(), Some(ErrorCode::PaymentNotFound));
    assert!(matches!(err, ClientError::Api { status: 404, .. }));
}
