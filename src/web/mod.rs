// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Browser viewer for the answer log and the live status

mod markdown;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use minijinja::{context, Environment, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::answer_log::{AnswerLog, AnswerLogDocument};
use crate::config::AppConfig;
use crate::status::{read_status, StatusRecord};
use crate::{Result, SnapsolveError};

pub use markdown::render_markdown;

const PAGE_TEMPLATE: &str = include_str!("page.html");

/// Shared application state
pub struct AppState {
    pub answers: AnswerLog,
    pub status_path: PathBuf,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(answers: AnswerLog, status_path: PathBuf) -> Result<Self> {
        let mut templates = Environment::new();
        templates
            .add_template("page.html", PAGE_TEMPLATE)
            .map_err(|e| SnapsolveError::Server(format!("Bad page template: {}", e)))?;
        Ok(Self {
            answers,
            status_path,
            templates,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(AnswerLog::new(config.answers_path()), config.status_path())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Order {
    NewestFirst,
    OldestFirst,
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(answers_page))
        .route("/answers", get(answers_page))
        .route("/chronological", get(chronological_page))
        .route("/status.json", get(status_file))
        .route("/api/status", get(api_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Page Handlers ===

async fn answers_page(State(state): State<Arc<AppState>>) -> Response {
    render_page(&state, Order::NewestFirst)
}

async fn chronological_page(State(state): State<Arc<AppState>>) -> Response {
    render_page(&state, Order::OldestFirst)
}

fn render_page(state: &AppState, order: Order) -> Response {
    let text = match state.answers.read_to_string() {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read answers: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read answers").into_response();
        }
    };

    let document = AnswerLogDocument::parse(&text);
    let document = match order {
        Order::NewestFirst => document,
        Order::OldestFirst => document.reversed(),
    };

    match render_document(state, &document, order) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

fn render_document(
    state: &AppState,
    document: &AnswerLogDocument,
    order: Order,
) -> std::result::Result<String, minijinja::Error> {
    let entries: Vec<Value> = document
        .entries()
        .iter()
        .map(|e| Value::from_safe_string(render_markdown(e)))
        .collect();

    let (title, path) = match order {
        Order::NewestFirst => ("Screenshot Answers (Live)", "/answers"),
        Order::OldestFirst => ("Screenshot Answers (Chronological)", "/chronological"),
    };

    state.templates.get_template("page.html")?.render(context! {
        title => title,
        path => path,
        header => Value::from_safe_string(render_markdown(document.header())),
        entries => entries,
        scroll_to_bottom => order == Order::OldestFirst,
    })
}

// === Status Handlers ===

/// The status document exactly as the worker wrote it
async fn status_file(State(state): State<Arc<AppState>>) -> Response {
    let body = match tokio::fs::read_to_string(&state.status_path).await {
        Ok(content) if !content.trim().is_empty() => content,
        _ => "{}".to_string(),
    };
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn api_status(State(state): State<Arc<AppState>>) -> Json<Option<StatusRecord>> {
    Json(read_status(&state.status_path))
}

/// Start the web server
pub async fn start_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Viewer available at http://{}", addr);

    let router = create_router(Arc::new(state));
    axum::serve(listener, router)
        .await
        .map_err(|e| SnapsolveError::Server(e.to_string()))?;

    Ok(())
}
