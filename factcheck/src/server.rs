use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::fairing::AdHoc;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{get, options, post, routes, Build, FromForm, Rocket, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use common::Config;

use crate::headlines::{HeadlinesPage, HeadlinesQuery, NewsClient, ProviderError};
use crate::pipeline::FactChecker;
use crate::verdict::VerdictResult;

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub config: Arc<Config>,
    pub checker: FactChecker,
    /// `None` when no NewsAPI key is configured
    pub news: Option<Arc<NewsClient>>,
}

/// Query string accepted by `/api/news`
#[derive(Debug, FromForm)]
struct NewsParams {
    country: Option<String>,
    category: Option<String>,
    page: Option<u32>,
    #[field(name = "pageSize")]
    page_size: Option<u32>,
}

/// Request body for `/api/factcheck`
#[derive(Deserialize)]
struct FactCheckRequest {
    claim: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    uptime_seconds: i64,
}

type ApiError = (Status, Json<Value>);

#[get("/health")]
async fn health(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// Proxy for top headlines, so the NewsAPI key stays server-side.
#[get("/api/news?<params..>")]
async fn news(state: &State<AppState>, params: NewsParams) -> Result<Json<HeadlinesPage>, ApiError> {
    let failed = || (Status::InternalServerError, Json(json!({ "error": "Failed to fetch news" })));

    let Some(client) = state.news.as_ref() else {
        tracing::warn!("news requested but no NewsAPI key is configured");
        return Err(failed());
    };

    let cfg = &state.config.news;
    let query = HeadlinesQuery {
        country: params.country.unwrap_or_else(|| cfg.country().to_string()),
        category: params.category.unwrap_or_else(|| cfg.category().to_string()),
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or_else(|| cfg.page_size()),
    };

    match client.top_headlines(&query).await {
        Ok(page) => Ok(Json(page)),
        Err(e) => match e.downcast_ref::<ProviderError>() {
            Some(provider) => Err((Status::BadRequest, Json(json!({ "error": provider.message })))),
            None => {
                tracing::error!("Error fetching news: {:#}", e);
                Err(failed())
            }
        },
    }
}

/// Fact-check a claim. Always 200: failures are carried in the verdict itself.
#[post("/api/factcheck", data = "<body>")]
async fn factcheck(state: &State<AppState>, body: Json<FactCheckRequest>) -> Json<VerdictResult> {
    Json(state.checker.check(&body.claim).await)
}

#[options("/<_..>")]
async fn preflight() -> Status {
    Status::NoContent
}

/// Assemble the Rocket instance (routes, state, CORS) without launching it.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let fig = rocket::Config::figment()
        .merge(("address", state.config.server.bind().to_string()))
        .merge(("port", state.config.server.port()));

    rocket::custom(fig)
        .manage(state)
        .attach(AdHoc::on_response("CORS", |_req, res| {
            Box::pin(async move {
                res.set_header(Header::new("Access-Control-Allow-Origin", "*"));
                res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
                res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
            })
        }))
        .mount("/", routes![health, news, factcheck, preflight])
}

/// Launch Rocket - this will run until shutdown (SIGINT/SIGTERM etc.)
pub async fn launch_rocket(state: AppState) -> Result<()> {
    tracing::info!(
        "Starting Rocket HTTP server on {}:{}",
        state.config.server.bind(),
        state.config.server.port()
    );
    build_rocket(state)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
