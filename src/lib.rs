pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod payments;
pub mod seed;
pub mod serializers;
pub mod tasks;
pub mod telemetry;

use actix_web::{http::header, web, HttpResponse};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::AuthService;
pub use db::{DbOperations, MemoryStore, Repository};
pub use payments::ChapaClient;
pub use tasks::{MemoryQueue, RedisQueue, TaskQueue};

const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health check endpoint handler
/// Returns server status and timestamp, plus pool figures when backed by Postgres
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let mut body = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    });
    if let Some(db) = state.database() {
        body["database"] = serde_json::json!(db.get_pool_status());
    }
    HttpResponse::Ok().json(body)
}

async fn swagger_redirect() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/swagger/index.html"))
        .finish()
}

/// Every route the server exposes: health, `/api`, and the API docs.
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .configure(api::configure)
        // trailing slashes are trimmed before routing, so `/swagger/` lands here
        .route("/swagger", web::get().to(swagger_redirect))
        .service(api::docs::swagger_ui());
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub repo: Arc<dyn Repository>,
    pub queue: Arc<dyn TaskQueue>,
    pub auth_service: Arc<AuthService>,
    pub payments: Arc<ChapaClient>,
    db: Option<DbOperations>,
}

impl AppState {
    /// Connects to Postgres (applying migrations) and the Redis broker.
    pub async fn new(config: Settings) -> Result<Self> {
        let db = DbOperations::new_with_options(
            &config.database.url,
            config.database.max_connections,
            DB_ACQUIRE_TIMEOUT,
        )
        .await?;
        db.migrate().await?;
        info!("Database migrations applied");

        let queue = RedisQueue::new(&config.broker.url, &config.broker.queue_name)?;

        let mut state = Self::from_parts(config, Arc::new(db.clone()), Arc::new(queue))?;
        state.db = Some(db);
        Ok(state)
    }

    /// Builds state over arbitrary storage and broker implementations.
    pub fn from_parts(
        config: Settings,
        repo: Arc<dyn Repository>,
        queue: Arc<dyn TaskQueue>,
    ) -> Result<Self> {
        let auth_service = AuthService::new(
            repo.clone(),
            config.auth.jwt_secret.clone(),
            config.auth.token_expiry_hours,
        );
        let payments = ChapaClient::new(&config.payments)?;

        Ok(Self {
            config: Arc::new(config),
            repo,
            queue,
            auth_service: Arc::new(auth_service),
            payments: Arc::new(payments),
            db: None,
        })
    }

    pub fn database(&self) -> Option<&DbOperations> {
        self.db.as_ref()
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(db) = &self.db {
            db.close().await;
        }
        Ok(())
    }
}
