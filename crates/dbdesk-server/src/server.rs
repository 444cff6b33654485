use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bson::Document;
use dbdesk_config::{Config, MongoConfig};
use dbdesk_security::Redactor;
use mongodb::{Collection, Database};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ai::{self, AiProxy};
use crate::error::{ApiError, ApiResult};
use crate::executor;
use crate::handlers;
use crate::pool::ClientPool;

/// Bulk inserts of up to 10k documents need more than axum's 2 MiB default
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ClientPool>,
    pub ai: Arc<AiProxy>,
    pub mongo: Arc<MongoConfig>,
    pub read_only: bool,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let redactor =
            Redactor::new().with_dropped_fields(config.redaction.extra_dropped_fields.iter().cloned());

        Self {
            pool: Arc::new(ClientPool::new(&config.mongo)),
            ai: Arc::new(AiProxy::new(config.ai.clone(), redactor)),
            mongo: Arc::new(config.mongo.clone()),
            read_only: config.server.read_only,
        }
    }

    pub fn ensure_writable(&self) -> ApiResult<()> {
        if self.read_only {
            Err(ApiError::ReadOnly)
        } else {
            Ok(())
        }
    }

    pub async fn database(&self, conn_str: &str, db: &str) -> ApiResult<Database> {
        Ok(self.pool.client(conn_str).await?.database(db))
    }

    pub async fn collection(&self, conn_str: &str, db: &str, coll: &str) -> ApiResult<Collection<Document>> {
        Ok(self.database(conn_str, db).await?.collection(coll))
    }
}

/// All routes, without binding a socket
pub fn router(state: AppState) -> Router {
    // The console runs in a browser on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/databases", post(handlers::list_databases))
        .route("/databases/drop", post(handlers::drop_database))
        .route("/collections", post(handlers::list_collections))
        .route("/collections/create", post(handlers::create_collection))
        .route("/collections/drop", post(handlers::drop_collection))
        .route("/find", post(handlers::find))
        .route("/count", post(handlers::count))
        .route("/aggregate", post(handlers::aggregate))
        .route("/insertOne", post(handlers::insert_one))
        .route("/insertMany", post(handlers::insert_many))
        .route("/updateOne", post(handlers::update_one))
        .route("/updateMany", post(handlers::update_many))
        .route("/deleteOne", post(handlers::delete_one))
        .route("/deleteMany", post(handlers::delete_many))
        .route("/command", post(handlers::command))
        .route("/indexes/list", post(handlers::list_indexes))
        .route("/indexes/create", post(handlers::create_index))
        .route("/indexes/drop", post(handlers::drop_index))
        .route("/dbStats", post(handlers::db_stats))
        .route("/collStats", post(handlers::coll_stats))
        .route("/serverInfo", post(handlers::server_info))
        .route("/ai/gemini", post(ai::gemini))
        .route("/plan/execute", post(executor::execute_plan));

    Router::new()
        .route("/", get(handle_info))
        .route("/health", get(handle_health))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub struct DbdeskServer;

impl DbdeskServer {
    pub async fn serve(config: Config) -> anyhow::Result<()> {
        let state = AppState::new(&config);
        let app = router(state);

        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await?;

        info!(
            "dbdesk listening on {}{}",
            addr,
            if config.server.read_only { " (read-only)" } else { "" }
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("dbdesk stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// GET handler for server info
async fn handle_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "dbdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "readOnly": state.read_only,
    }))
}

/// GET /health
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
