//! HTTP surface of the query engine.
//!
//! | Route          | Operation                       |
//! |----------------|---------------------------------|
//! | `/stats`       | dataset statistics              |
//! | `/time_range`  | first and last timestamp        |
//! | `/locations`   | distinct locations              |
//! | `/weather`     | distinct weather conditions     |
//! | `/fokusfrage`  | focus report (also `/focus`)    |
//! | `/aggregate`   | bucketed sums                   |
//! | `/data`        | filtered rows                   |

mod handlers;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::QueryError;
use crate::query::QueryEngine;

impl QueryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::BadRequest(_) => StatusCode::BAD_REQUEST,
            QueryError::NotFound(_) => StatusCode::NOT_FOUND,
            QueryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(status = status.as_u16(), error = %self, "Query rejected");
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Builds the router with the engine as shared state.
pub fn router(engine: QueryEngine) -> Router {
    Router::new()
        .route("/stats", get(handlers::stats))
        .route("/time_range", get(handlers::time_range))
        .route("/locations", get(handlers::locations))
        .route("/weather", get(handlers::weather))
        .route("/fokusfrage", get(handlers::focus))
        .route("/focus", get(handlers::focus))
        .route("/aggregate", get(handlers::aggregate))
        .route("/data", get(handlers::data))
        .with_state(engine)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serves the API on `addr` until Ctrl-C.
pub async fn serve(engine: QueryEngine, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, rows = engine.dataset().len(), "Listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
