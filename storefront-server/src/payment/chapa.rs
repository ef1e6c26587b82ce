//! Chapa hosted checkout adapter
//!
//! - `POST {base}/v1/transaction/initialize` -> `data.checkout_url`
//! - `GET {base}/v1/transaction/verify/{tx_ref}` -> `data.amount`, `data.currency`
//!
//! Both use `Authorization: Bearer <CHAPA_SECRET_KEY>`. The envelope's
//! `status` field is mapped to [`GatewayOutcome`] here and nowhere else.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::gateway::{
    CheckoutSession, GatewayError, GatewayOutcome, InitializeParams, PaymentGateway,
    ProviderFailure, VerifiedPayment,
};
use crate::core::config::GatewayConfig;

/// Longest provider body excerpt kept in error messages
const MAX_BODY_EXCERPT: usize = 300;

#[derive(Debug, Clone)]
pub struct ChapaGateway {
    client: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl ChapaGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn auth_header(&self) -> Result<String, GatewayError> {
        self.secret_key
            .as_ref()
            .map(|key| format!("Bearer {key}"))
            .ok_or_else(|| GatewayError::NotConfigured("CHAPA_SECRET_KEY is not set".to_string()))
    }

    async fn read(response: reqwest::Response) -> Result<(StatusCode, String), GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentGateway for ChapaGateway {
    fn name(&self) -> &'static str {
        "chapa"
    }

    async fn initialize(
        &self,
        params: &InitializeParams,
    ) -> Result<GatewayOutcome<CheckoutSession>, GatewayError> {
        let url = format!("{}/v1/transaction/initialize", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header()?)
            .json(&InitializeBody::from(params))
            .send()
            .await?;

        let (status, body) = Self::read(response).await?;
        tracing::debug!(tx_ref = %params.tx_ref, status = status.as_u16(), "Chapa initialize response");
        parse_initialize(status, &body)
    }

    async fn verify(&self, tx_ref: &str) -> Result<GatewayOutcome<VerifiedPayment>, GatewayError> {
        let url = format!("{}/v1/transaction/verify/{}", self.base_url, tx_ref);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header()?)
            .send()
            .await?;

        let (status, body) = Self::read(response).await?;
        tracing::debug!(tx_ref = %tx_ref, status = status.as_u16(), "Chapa verify response");
        parse_verify(status, &body, tx_ref)
    }
}

// ========== Wire format ==========

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    amount: String,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    first_name: &'a str,
    last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    tx_ref: &'a str,
    callback_url: &'a str,
    return_url: &'a str,
    customization: Customization<'a>,
}

#[derive(Debug, Serialize)]
struct Customization<'a> {
    title: &'a str,
    description: &'a str,
}

impl<'a> From<&'a InitializeParams> for InitializeBody<'a> {
    fn from(p: &'a InitializeParams) -> Self {
        Self {
            amount: format!("{:.2}", p.amount),
            currency: &p.currency,
            email: p.email.as_deref(),
            first_name: &p.first_name,
            last_name: &p.last_name,
            phone_number: p.phone_number.as_deref(),
            tx_ref: &p.tx_ref,
            callback_url: &p.callback_url,
            return_url: &p.return_url,
            customization: Customization {
                title: &p.title,
                description: &p.description,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    fn message_text(&self) -> String {
        match &self.message {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "no message".to_string(),
        }
    }

    fn failure(&self) -> ProviderFailure {
        ProviderFailure {
            status: self.status.clone(),
            message: self.message_text(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    checkout_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    #[serde(default)]
    tx_ref: Option<String>,
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Errors that say nothing about the payment itself
fn check_http_status(status: StatusCode, body: &str) -> Result<(), GatewayError> {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return Err(GatewayError::Provider {
            status: status.as_u16(),
            message: excerpt(body),
        });
    }
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(status: StatusCode, body: &str) -> Result<Envelope<T>, GatewayError> {
    serde_json::from_str(body).map_err(|e| {
        if status.is_success() {
            GatewayError::Decode(format!("{e}: {}", excerpt(body)))
        } else {
            GatewayError::Provider {
                status: status.as_u16(),
                message: excerpt(body),
            }
        }
    })
}

fn parse_initialize(
    status: StatusCode,
    body: &str,
) -> Result<GatewayOutcome<CheckoutSession>, GatewayError> {
    check_http_status(status, body)?;
    let envelope: Envelope<InitializeData> = decode(status, body)?;

    if !(status.is_success() && envelope.is_success()) {
        return Ok(GatewayOutcome::Failure(envelope.failure()));
    }

    match envelope.data {
        Some(data) if !data.checkout_url.is_empty() => Ok(GatewayOutcome::Success(CheckoutSession {
            checkout_url: data.checkout_url,
        })),
        _ => Err(GatewayError::Decode("missing data.checkout_url".to_string())),
    }
}

fn parse_verify(
    status: StatusCode,
    body: &str,
    tx_ref: &str,
) -> Result<GatewayOutcome<VerifiedPayment>, GatewayError> {
    check_http_status(status, body)?;
    let envelope: Envelope<VerifyData> = decode(status, body)?;

    if !(status.is_success() && envelope.is_success()) {
        return Ok(GatewayOutcome::Failure(envelope.failure()));
    }

    let Some(data) = envelope.data else {
        return Err(GatewayError::Decode("missing data".to_string()));
    };

    // The envelope can say "success" for a transaction that is still pending
    if let Some(payment_status) = data.status.as_deref()
        && payment_status != "success"
    {
        return Ok(GatewayOutcome::Failure(ProviderFailure::with_status(
            payment_status,
            format!("Payment {payment_status}"),
        )));
    }

    if let Some(reported) = data.tx_ref.as_deref()
        && reported != tx_ref
    {
        return Err(GatewayError::Decode(format!(
            "verify returned tx_ref {reported}, expected {tx_ref}"
        )));
    }

    let amount = parse_amount(&data.amount)
        .ok_or_else(|| GatewayError::Decode(format!("invalid amount: {}", data.amount)))?;
    let currency = data
        .currency
        .ok_or_else(|| GatewayError::Decode("missing currency".to_string()))?;

    Ok(GatewayOutcome::Success(VerifiedPayment {
        tx_ref: tx_ref.to_string(),
        amount,
        currency,
    }))
}

/// Chapa sends amounts as numbers or numeric strings
fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    amount.is_finite().then_some(amount)
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
