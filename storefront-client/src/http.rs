//! HTTP client for the storefront API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{ClientConfig, ClientError, ClientResult, SessionCache};
use shared::client::{
    CreateOrderRequest, InitializePaymentRequest, InitializePaymentResponse, PaymentTransaction,
    UpdateDriverRequest, UpdateStatusRequest, UserInfo, VerifyPaymentResponse,
};
use shared::models::{Order, OrderStatus};

/// Error body the server sends with every non-2xx answer
#[derive(serde::Deserialize)]
struct ApiErrorResponse {
    code: u16,
    message: String,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

/// Calls the checkout flow needs
///
/// Implemented by [`HttpClient`]; tests substitute an in-memory fake.
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Logged-in user, if the session is still valid
    fn current_user(&self) -> Option<UserInfo>;

    async fn create_order(&self, req: &CreateOrderRequest) -> ClientResult<Order>;

    async fn initialize_payment(&self, order_id: &str) -> ClientResult<InitializePaymentResponse>;

    async fn verify_payment(&self, tx_ref: &str) -> ClientResult<VerifyPaymentResponse>;

    async fn my_orders(&self) -> ClientResult<Vec<Order>>;
}

/// Network client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    sessions: Arc<SessionCache>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, sessions: Arc<SessionCache>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            sessions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Adopt a token issued elsewhere and cache its user
    pub fn with_session(mut self, token: impl Into<String>, user: UserInfo) -> Self {
        let token = token.into();
        self.sessions.insert(token.clone(), user);
        self.token = Some(token);
        self
    }

    /// Forget the token locally
    pub fn logout(&mut self) {
        if let Some(token) = self.token.take() {
            self.sessions.invalidate(&token);
        }
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = self.client.request(method, &url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            let text = response.text().await?;
            return serde_json::from_str(&text).map_err(Into::into);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Some(token) = &self.token {
                self.sessions.invalidate(token);
            }
            tracing::warn!("Server rejected the session token");
            return Err(ClientError::Unauthorized);
        }

        let text = response.text().await?;
        match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(api_err) => Err(ClientError::Api {
                code: api_err.code,
                status: status.as_u16(),
                message: api_err.message,
                details: api_err.details,
            }),
            Err(_) => Err(ClientError::Server {
                status: status.as_u16(),
                body: text,
            }),
        }
    }

    // ========== Admin API ==========

    pub async fn list_orders(&self) -> ClientResult<Vec<Order>> {
        self.get("orders").await
    }

    pub async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        self.get(&format!("orders/{order_id}")).await
    }

    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<Order> {
        let body = UpdateStatusRequest { status };
        self.request(Method::PUT, &format!("orders/{order_id}/status"), Some(&body))
            .await
    }

    pub async fn update_driver(&self, order_id: &str, driver: &str) -> ClientResult<Order> {
        let body = UpdateDriverRequest {
            driver: driver.to_string(),
        };
        self.request(Method::PUT, &format!("orders/{order_id}/driver"), Some(&body))
            .await
    }

    pub async fn transactions(&self) -> ClientResult<Vec<PaymentTransaction>> {
        self.get("payment/transactions").await
    }
}

#[async_trait]
impl StorefrontApi for HttpClient {
    fn current_user(&self) -> Option<UserInfo> {
        self.token.as_deref().and_then(|t| self.sessions.get(t))
    }

    async fn create_order(&self, req: &CreateOrderRequest) -> ClientResult<Order> {
        self.request(Method::POST, "orders", Some(req)).await
    }

    async fn initialize_payment(&self, order_id: &str) -> ClientResult<InitializePaymentResponse> {
        let body = InitializePaymentRequest {
            order_id: order_id.to_string(),
        };
        self.request(Method::POST, "payment/initialize", Some(&body))
            .await
    }

    async fn verify_payment(&self, tx_ref: &str) -> ClientResult<VerifyPaymentResponse> {
        self.get(&format!("payment/verify/{tx_ref}")).await
    }

    async fn my_orders(&self) -> ClientResult<Vec<Order>> {
        self.get("orders/myorders").await
    }
}
