use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Redirect},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

mod args;
mod capabilities;
mod chart;
mod client;
mod directory;
mod error;
mod interval;
mod logging;
mod models;
mod page;
mod selection;

#[cfg(test)]
mod fakes;
#[cfg(test)]
mod tests;

use args::Args;
use capabilities::{ChartLibrary, HttpClient};
use chart::{ChartRenderer, SvgCharts};
use client::ReqwestClient;
use directory::UserDirectoryLoader;
use models::{PageSnapshot, SelectParams};
use page::Page;
use selection::UserSelectionController;

/// Dashboard host.
/// The page model is the only DOM; the browser renders snapshots of it
/// and reports selection changes back through `/select`.
#[derive(Clone)]
struct AppState {
    page: Arc<Page>,
    directory: Arc<UserDirectoryLoader>,
    title: Arc<str>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging();

    let http: Arc<dyn HttpClient> = Arc::new(
        ReqwestClient::new(&args.api_base, args.timeout()).context("failed to create HTTP client")?,
    );
    let page = Arc::new(Page::new());

    // Chart drawing is set up once here and handed to the renderer
    let charts: Arc<dyn ChartLibrary> = Arc::new(SvgCharts::new());
    let renderer = ChartRenderer::new(charts, args.chart).with_options(args.chart_options());

    let controller = Arc::new(UserSelectionController::new(
        http.clone(),
        page.clone(),
        args.data_prefix.clone(),
        renderer.into_callback(),
    ));
    controller.attach();

    let directory = Arc::new(
        UserDirectoryLoader::new(http, page.clone()).with_endpoint(args.users_endpoint.clone()),
    );
    spawn_directory_load(directory.clone());

    let state = AppState {
        page,
        directory,
        title: Arc::from(args.title.as_str()),
    };

    info!(addr = %args.listen, api = %args.api_base, chart = ?args.chart, "dashboard running");

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/select", get(select_user))
        .route("/reload", get(reload_directory))
        .route("/api/page", get(page_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(state.page.render_html(&state.title))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Selection control changed; an empty id is the placeholder
async fn select_user(
    State(state): State<AppState>,
    Query(params): Query<SelectParams>,
) -> Result<Redirect, StatusCode> {
    match state.page.select(&params.user_id) {
        Ok(()) => Ok(Redirect::to("/")),
        Err(e) => {
            warn!(error = %e, "selection rejected");
            Err(StatusCode::NOT_FOUND)
        }
    }
}

async fn reload_directory(State(state): State<AppState>) -> Redirect {
    spawn_directory_load(state.directory.clone());
    Redirect::to("/")
}

async fn page_snapshot(State(state): State<AppState>) -> Json<PageSnapshot> {
    Json(state.page.snapshot())
}

// Helper functions

/// The loader puts failures on the page itself.
fn spawn_directory_load(directory: Arc<UserDirectoryLoader>) {
    tokio::spawn(async move {
        if let Err(e) = directory.load().await {
            debug!(error = %e, "directory load ended without users");
        }
    });
}
