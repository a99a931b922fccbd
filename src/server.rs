//! Gateway server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: store connection, migrations,
//! the REST API, the rate-window pruner, metrics and graceful shutdown.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::RateBudget;
use crate::config::AppConfig;
use crate::infrastructure::{init_database, run_migrations, Store};
use crate::interfaces::http::{create_api_router, AppState};
use crate::support::{ShutdownCoordinator, ShutdownSignal};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Options for starting the gateway.
pub struct ServerOptions {
    pub config: AppConfig,
    /// Run directory and ledger migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

/// The global metrics recorder can only be installed once per process, so
/// a restart within the same process reuses the first handle.
fn prometheus_handle() -> Result<PrometheusHandle, BoxError> {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics recorder installed");
    Ok(HANDLE.get_or_init(|| handle).clone())
}

/// Handle to a running gateway.
pub struct ServerHandle {
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the API is bound to.
    pub local_addr: std::net::SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    pruner_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Connect, migrate, bind and serve.
    pub async fn start(opts: ServerOptions) -> Result<Self, BoxError> {
        let app_cfg = opts.config;
        app_cfg.validate()?;
        info!("Starting LinkDB gateway...");

        let metrics = prometheus_handle()?;

        let db = init_database(&app_cfg.database).await?;
        if opts.auto_migrate {
            info!("Running database migrations...");
            run_migrations(&db).await?;
        }
        let store = Store::new(db.clone(), app_cfg.database.statement_timeout())?;
        info!(
            dialect = ?store.dialect(),
            deadline_ms = app_cfg.database.statement_timeout_ms,
            "Store ready"
        );

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let budget = RateBudget::new(app_cfg.rate_limit);
        if app_cfg.rate_limit.requests_per_window == 0 {
            warn!("Rate budget disabled (requests_per_window = 0)");
        } else {
            info!(
                requests = app_cfg.rate_limit.requests_per_window,
                window_secs = app_cfg.rate_limit.window_secs,
                "Rate budget configured"
            );
        }
        let pruner_task = budget.spawn_pruner(shutdown_signal.clone());

        let state = AppState::new(
            store,
            app_cfg.query,
            budget,
            app_cfg.usage.rate()?,
            metrics,
        );
        let router = create_api_router(state);

        let addr = app_cfg.server.address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API listening on http://{}", local_addr);
        info!("OpenAPI document at http://{}/api-doc/openapi.json", local_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
            pruner_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install SIGINT/SIGTERM listeners that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for shutdown to be triggered, then drain in-flight requests
    /// within the configured timeout and close the pool.
    pub async fn wait(self) {
        let ServerHandle {
            db,
            shutdown,
            api_task,
            pruner_task,
            ..
        } = self;

        let drained = shutdown
            .shutdown_with_cleanup(async move {
                if let Err(e) = api_task.await {
                    error!("REST API task panicked: {}", e);
                }
                if let Err(e) = pruner_task.await {
                    error!("Rate window pruner panicked: {}", e);
                }
            })
            .await;
        if !drained {
            warn!("Shutdown timed out with requests still in flight");
        }

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }
        info!("LinkDB gateway stopped");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the application config. `RUST_LOG` overrides
/// `[logging] level`.
///
/// Call this once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
