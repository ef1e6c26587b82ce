use std::sync::Arc;

use crate::auth::JwtService;
use crate::core::config::PaymentProvider;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result, ServerError};
use crate::orders::OrderService;
use crate::orders::sweeper::run_sweeper;
use crate::payment::{ChapaGateway, MockGateway, PaymentGateway, PaymentService};
use crate::store::OrderStore;

/// Shared server state, cloned into every handler
///
/// | Field | Purpose |
/// |-------|---------|
/// | config | Immutable settings |
/// | store | Order database (redb) |
/// | jwt_service | Bearer token validation |
/// | orders | Order creation and lifecycle |
/// | payments | Payment initialization and reconciliation |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub store: OrderStore,
    pub jwt_service: Arc<JwtService>,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl ServerState {
    /// Open the database under `work_dir` and build the configured gateway
    pub fn initialize(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let store = OrderStore::open(&db_path)?;
        tracing::info!(path = %db_path.display(), orders = store.count()?, "Order database opened");

        let gateway: Arc<dyn PaymentGateway> = match config.gateway.provider {
            PaymentProvider::Chapa => Arc::new(
                ChapaGateway::new(&config.gateway)
                    .map_err(|e| ServerError::Config(format!("Chapa client: {e}")))?,
            ),
            PaymentProvider::Mock => {
                tracing::warn!("Using the mock payment gateway");
                Arc::new(MockGateway::default())
            }
        };

        Ok(Self::with_gateway(config.clone(), store, gateway))
    }

    /// Assemble state from parts; tests pass a [`MockGateway`] here
    pub fn with_gateway(config: Config, store: OrderStore, gateway: Arc<dyn PaymentGateway>) -> Self {
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let orders = OrderService::new(
            store.clone(),
            config.delivery_fee,
            config.gateway.currency.clone(),
        );
        let payments = PaymentService::new(store.clone(), gateway, config.payment_settings());
        Self {
            config,
            store,
            jwt_service,
            orders,
            payments,
        }
    }

    /// Register background jobs; call before serving
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        if let Some(ttl) = self.config.pending_order_ttl {
            let store = self.store.clone();
            let token = tasks.shutdown_token();
            tasks.spawn("order_sweeper", async move {
                run_sweeper(store, ttl, token).await;
            });
        }
        tasks.log_summary();
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }
}
