//! Health check endpoint
//!
//! `/health` and `/healthz` always answer 200 while the process runs; the
//! body reports whether MongoDB currently answers a ping.

use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub timestamp: String,
    pub mode: &'static str,
    pub database: DatabaseHealth,
    pub mailer: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub name: String,
    pub connected: bool,
}

fn build_health_response(dev_mode: bool, db_name: &str, connected: bool, mailer: &'static str) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if dev_mode { "development" } else { "production" },
        database: DatabaseHealth {
            name: db_name.to_string(),
            connected,
        },
        mailer,
        error: (!connected).then(|| "MongoDB is not answering pings".to_string()),
    }
}

/// Handle liveness probe (/health, /healthz)
pub async fn health_check(state: &AppState) -> Response<BoxBody> {
    let connected = state.mongo.ping().await;
    let response = build_health_response(
        state.args.dev_mode,
        state.mongo.db_name(),
        connected,
        state.mailer.name(),
    );
    json_response(StatusCode::OK, &response)
}
