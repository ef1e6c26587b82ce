use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::auth::JwtConfig;
use crate::core::ServerError;
use crate::payment::{PaymentSettings, RetryPolicy};

/// Which payment gateway implementation to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Chapa,
    /// In-process gateway, local development only
    Mock,
}

impl FromStr for PaymentProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chapa" => Ok(PaymentProvider::Chapa),
            "mock" => Ok(PaymentProvider::Mock),
            other => Err(format!("unknown payment provider: {other}")),
        }
    }
}

/// Hosted payment gateway settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub provider: PaymentProvider,
    /// Chapa bearer token
    pub secret_key: Option<String>,
    pub base_url: String,
    pub currency: String,
    /// Per-call timeout
    pub timeout: Duration,
    /// Retries for `initialize` after the first attempt
    pub init_max_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: PaymentProvider::Mock,
            secret_key: None,
            base_url: "https://api.chapa.co".to_string(),
            currency: "ETB".to_string(),
            timeout: Duration::from_millis(15_000),
            init_max_retries: 2,
        }
    }
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./work_dir | Database and log root |
/// | HTTP_PORT | 5000 | Listen port |
/// | ENVIRONMENT | development | development / production |
/// | LOG_LEVEL | info | Default log filter |
/// | LOG_DIR | unset | Enables rolling log files |
/// | FRONTEND_URL | http://localhost:5173 | CORS origin and provider return URL |
/// | DELIVERY_FEE | 5.00 | Fixed fee added to every order |
/// | PAYMENT_PROVIDER | chapa | chapa / mock |
/// | CHAPA_SECRET_KEY | required for chapa | Provider bearer token |
/// | CHAPA_BASE_URL | https://api.chapa.co | Provider base URL |
/// | PAYMENT_CURRENCY | ETB | Order and payment currency |
/// | GATEWAY_TIMEOUT_MS | 15000 | Per-call provider timeout |
/// | GATEWAY_INIT_MAX_RETRIES | 2 | Bounded retries for initialize |
/// | PENDING_ORDER_TTL_MINUTES | unset | Enables the abandoned order sweeper |
/// | JWT_SECRET | generated in development | Token signing secret |
///
/// ```ignore
/// PAYMENT_PROVIDER=mock HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    /// development | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Storefront origin, without trailing slash
    pub frontend_url: String,
    pub delivery_fee: Decimal,
    pub gateway: GatewayConfig,
    /// Unpaid pending orders older than this are cancelled; `None` disables
    pub pending_order_ttl: Option<Duration>,
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// Unset variables fall back to defaults; malformed values and missing
    /// production secrets are errors.
    pub fn from_env() -> Result<Self, ServerError> {
        let environment = env_or("ENVIRONMENT", "development");
        let is_production = environment == "production";

        let provider = env_parse("PAYMENT_PROVIDER", PaymentProvider::Chapa)?;
        let gateway = GatewayConfig {
            provider,
            secret_key: std::env::var("CHAPA_SECRET_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: env_or("CHAPA_BASE_URL", "https://api.chapa.co"),
            currency: env_or("PAYMENT_CURRENCY", "ETB"),
            timeout: Duration::from_millis(env_parse("GATEWAY_TIMEOUT_MS", 15_000u64)?),
            init_max_retries: env_parse("GATEWAY_INIT_MAX_RETRIES", 2u32)?,
        };

        let pending_order_ttl = match std::env::var("PENDING_ORDER_TTL_MINUTES") {
            Ok(v) => Some(parse_ttl_minutes("PENDING_ORDER_TTL_MINUTES", &v)?),
            Err(_) => None,
        };

        let jwt = JwtConfig::from_env(!is_production)
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let config = Self {
            work_dir: env_or("WORK_DIR", "./work_dir"),
            http_port: env_parse("HTTP_PORT", 5000u16)?,
            environment,
            log_level: env_or("LOG_LEVEL", "info"),
            log_dir: std::env::var("LOG_DIR").ok(),
            frontend_url: env_or("FRONTEND_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            delivery_fee: env_parse("DELIVERY_FEE", Decimal::new(500, 2))?,
            gateway,
            pending_order_ttl,
            jwt,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests: mock gateway, fixed secret, no sweeper
    pub fn for_testing(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            http_port: 0,
            environment: "test".to_string(),
            log_level: "debug".to_string(),
            log_dir: None,
            frontend_url: "http://localhost:5173".to_string(),
            delivery_fee: Decimal::new(500, 2),
            gateway: GatewayConfig::default(),
            pending_order_ttl: None,
            jwt: JwtConfig::for_testing("storefront-test-secret-0123456789abcdef"),
        }
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.delivery_fee.is_sign_negative() {
            return Err(ServerError::Config("DELIVERY_FEE must not be negative".into()));
        }
        if self.gateway.provider == PaymentProvider::Chapa && self.gateway.secret_key.is_none() {
            if self.is_production() {
                return Err(ServerError::Config(
                    "CHAPA_SECRET_KEY must be set in production".into(),
                ));
            }
            tracing::warn!("CHAPA_SECRET_KEY not set, payment initialization will fail");
        }
        if self.is_production() && self.gateway.provider == PaymentProvider::Mock {
            return Err(ServerError::Config(
                "PAYMENT_PROVIDER=mock is not allowed in production".into(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database").join("orders.redb")
    }

    /// Payment service settings derived from the gateway section
    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            frontend_url: self.frontend_url.trim_end_matches('/').to_string(),
            call_timeout: self.gateway.timeout,
            init_retry: RetryPolicy::new(self.gateway.init_max_retries, self.gateway.timeout),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, ServerError> {
    match std::env::var(key) {
        Ok(v) => parse_value(key, &v),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ServerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::Config(format!("{key} has an invalid value: {value}")))
}

/// Minutes as a `Duration` whose millisecond count fits an `i64` timestamp
fn parse_ttl_minutes(key: &str, value: &str) -> Result<Duration, ServerError> {
    let minutes: u64 = parse_value(key, value)?;
    minutes
        .checked_mul(60_000)
        .filter(|ms| i64::try_from(*ms).is_ok())
        .map(Duration::from_millis)
        .ok_or_else(|| ServerError::Config(format!("{key} is out of range: {value}")))
}
