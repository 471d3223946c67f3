use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, post, routes, Build, Rocket, State};
use serde::{Deserialize, Serialize};

use common::ServerConfig;

use crate::pipeline::{Pipeline, PipelineError, GENERIC_ERROR_MESSAGE};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            started_at: Utc::now(),
            pipeline,
        }
    }
}

/// Body accepted by `/api/summarize`.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub url: Option<String>,
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    strategy: &'static str,
    max_sentences: usize,
    echo_source_url: bool,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning uptime and the active deployment variant.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        strategy: state.pipeline.strategy(),
        max_sentences: state.pipeline.max_sentences(),
        echo_source_url: state.pipeline.echoes_source_url(),
    })
}

/// Summarize the article at `url` and push it.
///
/// A missing, unparsable or url-less body is a 400. Success returns the
/// push provider's JSON response serialized as a string.
#[post("/api/summarize", data = "<body>")]
async fn summarize(state: &State<AppState>, body: Option<Json<SummarizeRequest>>) -> Custom<String> {
    tracing::info!("summarize request received");

    let url = body
        .and_then(|b| b.into_inner().url)
        .filter(|u| !u.trim().is_empty());

    let result = match url {
        Some(url) => state.pipeline.run(&url).await,
        None => Err(PipelineError::MissingUrl),
    };

    match result {
        Ok(value) => Custom(Status::Ok, value.to_string()),
        Err(e) => {
            if matches!(e, PipelineError::MissingUrl) {
                tracing::warn!("summarize request without url");
            }
            let status = Status::from_code(e.status()).unwrap_or(Status::InternalServerError);
            Custom(status, e.public_message().to_string())
        }
    }
}

#[catch(500)]
fn internal_error() -> &'static str {
    GENERIC_ERROR_MESSAGE
}

/// Build a Rocket instance with managed state and every route mounted.
pub fn build_rocket(state: AppState, server: &ServerConfig) -> Rocket<Build> {
    let fig = rocket::Config::figment()
        .merge(("address", server.bind.clone()))
        .merge(("port", server.port));

    rocket::custom(fig)
        .manage(state)
        .mount("/", routes![health, status, summarize])
        .register("/", catchers![internal_error])
}

/// Build and launch the Rocket server.
///
/// This function blocks until the Rocket server shuts down (it awaits `rocket.launch().await`)
/// and returns an error if Rocket fails to start.
pub async fn launch_rocket(state: AppState, server: &ServerConfig) -> Result<()> {
    tracing::info!(bind = %server.bind, port = server.port, "Starting Rocket HTTP server");
    build_rocket(state, server)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
