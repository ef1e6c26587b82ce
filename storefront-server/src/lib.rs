//! Storefront server - checkout, hosted payment and reconciliation
//!
//! ```text
//! storefront-server/src/
//! ├── core/          # config, state, server, background tasks
//! ├── auth/          # JWT validation, CurrentUser, guards
//! ├── store/         # redb order store
//! ├── orders/        # order creation, status rules, sweeper
//! ├── payment/       # gateway adapters, initialization, reconciliation
//! ├── services/      # axum app and tower middleware
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logging, validation
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod orders;
pub mod payment;
pub mod services;
pub mod store;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::OrderService;
pub use payment::{MockGateway, PaymentGateway, PaymentService};
pub use services::build_app;
pub use store::OrderStore;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Load `.env`, make sure `WORK_DIR` exists and start logging
///
/// Must run before [`Config::from_env`].
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".to_string());
    std::fs::create_dir_all(&work_dir)?;

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let json_format = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(&level, json_format, log_dir.as_deref())?;

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   _____ __                  ____                 __
  / ___// /_____  ________  / __/________  ____  / /_
  \__ \/ __/ __ \/ ___/ _ \/ /_/ ___/ __ \/ __ \/ __/
 ___/ / /_/ /_/ / /  /  __/ __/ /  / /_/ / / / / /_
/____/\__/\____/_/   \___/_/ /_/   \____/_/ /_/\__/
    "#
    );
}
