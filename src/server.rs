//! Web interface.
//!
//! Serves HTML pages for browsing and editing entries plus a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Dashboard: totals, recent entries, tag cloud |
//! | `GET`  | `/entries` | All entries |
//! | `GET`  | `/entries/new` | Add form |
//! | `POST` | `/entries` | Create, then 303 to the entry |
//! | `GET`  | `/entries/{id}` | Entry detail with usage notes |
//! | `GET`  | `/entries/{id}/edit` | Edit form |
//! | `POST` | `/entries/{id}/edit` | Update, then 303 to the entry |
//! | `POST` | `/entries/{id}/use` | Record a use, then 303 to the entry |
//! | `GET`  | `/search` | Results for `q`, `category`, `tag`, `product` |
//! | `GET`  | `/stats` | Category, tag and usage breakdowns |
//! | `GET`  | `/api/search` | JSON search (`q`, `category`, `tag`, `product`, `limit`) |
//! | `GET`  | `/api/stats` | JSON stats |
//! | `GET`  | `/api/entries/{id}` | JSON entry |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! HTML routes render an error page; `/api/*` routes return
//!
//! ```json
//! { "error": { "code": "not_found", "message": "not found: entry 42" } }
//! ```
//!
//! Status codes: validation 422, not found 404, format 400, anything else 500.
//! A rejected add or edit form is re-rendered with the submitted values.

use anyhow::Context;
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use support_kb_core::models::{now, KnowledgeEntry, UsageInput};
use support_kb_core::search::SearchFilter;
use support_kb_core::stats::{self, Stats};
use support_kb_core::store::Store;
use support_kb_core::KbError;

use crate::config::Config;
use crate::pages::{self, EntryForm};
use crate::sqlite_store::SqliteStore;

/// Number of entries shown on the dashboard.
const DASHBOARD_RECENT: usize = 10;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

/// Open the configured store and serve until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let bind_addr = config.server.bind.clone();

    let app = router(Arc::new(store), Arc::new(config.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!(addr = %bind_addr, db = %config.db.path.display(), "web interface started");
    println!("Support KB listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("web interface stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Build the router over any [`Store`].
pub fn router(store: Arc<dyn Store>, config: Arc<Config>) -> Router {
    let state = AppState { store, config };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_dashboard))
        .route("/entries", get(handle_list).post(handle_create))
        .route("/entries/new", get(handle_new_form))
        .route("/entries/{id}", get(handle_show))
        .route("/entries/{id}/edit", get(handle_edit_form).post(handle_update))
        .route("/entries/{id}/use", post(handle_use))
        .route("/search", get(handle_search))
        .route("/stats", get(handle_stats))
        .route("/api/search", get(handle_api_search))
        .route("/api/stats", get(handle_api_stats))
        .route("/api/entries/{id}", get(handle_api_entry))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error responses ============

fn status_for(err: &KbError) -> StatusCode {
    match err {
        KbError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        KbError::NotFound(_) => StatusCode::NOT_FOUND,
        KbError::Format(_) => StatusCode::BAD_REQUEST,
        KbError::Io(_) | KbError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn log_failure(err: &KbError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
    }
}

/// Error rendered as an HTML page.
struct PageError(KbError);

impl From<KbError> for PageError {
    fn from(err: KbError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        log_failure(&self.0, status);
        let heading = match self.0 {
            KbError::NotFound(_) => "Not found",
            KbError::Validation(_) | KbError::Format(_) => "Invalid request",
            KbError::Io(_) | KbError::Storage(_) => "Something went wrong",
        };
        (status, Html(pages::error_page(heading, &self.0.to_string()))).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error rendered as the JSON error body.
struct ApiError(KbError);

impl From<KbError> for ApiError {
    fn from(err: KbError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        log_failure(&self.0, status);
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.0.code().to_string(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

// ============ HTML pages ============

async fn handle_dashboard(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let stats = stats::collect(state.store.as_ref(), now()).await?;
    let recent = state.store.list(Some(DASHBOARD_RECENT)).await?;
    Ok(Html(pages::dashboard(&stats, &recent)))
}

async fn handle_list(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let entries = state.store.list(None).await?;
    Ok(Html(pages::entry_list(&entries)))
}

async fn handle_new_form(State(state): State<AppState>) -> Html<String> {
    Html(pages::entry_form(
        "Add entry",
        "/entries",
        &EntryForm::default(),
        None,
        &state.config.suggestions,
    ))
}

async fn handle_create(
    State(state): State<AppState>,
    Form(form): Form<EntryForm>,
) -> Result<Response, PageError> {
    match state.store.add(&form.to_new_entry()).await {
        Ok(id) => Ok(Redirect::to(&format!("/entries/{}", id)).into_response()),
        Err(err @ KbError::Validation(_)) => Ok(rejected_form(
            "Add entry",
            "/entries",
            &form,
            &err,
            &state.config,
        )),
        Err(err) => Err(err.into()),
    }
}

async fn handle_show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let entry = state.store.get(id).await?;
    let history = state.store.usage_history(id).await?;
    Ok(Html(pages::entry_detail(&entry, &history)))
}

async fn handle_edit_form(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, PageError> {
    let entry = state.store.get(id).await?;
    Ok(Html(pages::entry_form(
        &format!("Edit entry #{}", id),
        &format!("/entries/{}/edit", id),
        &EntryForm::from_entry(&entry),
        None,
        &state.config.suggestions,
    )))
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<EntryForm>,
) -> Result<Response, PageError> {
    match state.store.update(id, &form.to_patch()).await {
        Ok(entry) => Ok(Redirect::to(&format!("/entries/{}", entry.id)).into_response()),
        Err(err @ KbError::Validation(_)) => Ok(rejected_form(
            &format!("Edit entry #{}", id),
            &format!("/entries/{}/edit", id),
            &form,
            &err,
            &state.config,
        )),
        Err(err) => Err(err.into()),
    }
}

fn rejected_form(
    heading: &str,
    action: &str,
    form: &EntryForm,
    err: &KbError,
    config: &Config,
) -> Response {
    tracing::debug!(error = %err, "form rejected");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Html(pages::entry_form(
            heading,
            action,
            form,
            Some(&err.to_string()),
            &config.suggestions,
        )),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct UseForm {
    #[serde(default)]
    helpful: Option<bool>,
    #[serde(default)]
    notes: Option<String>,
}

async fn handle_use(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<UseForm>,
) -> Result<Redirect, PageError> {
    let usage = UsageInput {
        context: "web".to_string(),
        helpful: form.helpful,
        notes: form.notes.filter(|n| !n.trim().is_empty()),
    };
    state.store.record_usage(id, &usage).await?;
    Ok(Redirect::to(&format!("/entries/{}", id)))
}

/// Query parameters shared by `/search` and `/api/search`.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

impl SearchParams {
    fn filter(&self) -> SearchFilter {
        SearchFilter {
            query: self.q.clone(),
            category: self.category.clone(),
            tag: self.tag.clone(),
            product: self.product.clone(),
        }
    }
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, PageError> {
    let filter = params.filter();
    let hits = state.store.search(&filter, params.limit).await?;
    Ok(Html(pages::search_results(&filter, &hits)))
}

async fn handle_stats(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let stats = stats::collect(state.store.as_ref(), now()).await?;
    Ok(Html(pages::stats_page(&stats)))
}

async fn handle_not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(pages::error_page("Not found", "There is no page at this address.")),
    )
}

// ============ JSON API ============

async fn handle_api_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<KnowledgeEntry>>, ApiError> {
    let hits = state.store.search(&params.filter(), params.limit).await?;
    Ok(Json(hits))
}

async fn handle_api_stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    let stats = stats::collect(state.store.as_ref(), now()).await?;
    Ok(Json(stats))
}

async fn handle_api_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<KnowledgeEntry>, ApiError> {
    let entry = state.store.get(id).await?;
    Ok(Json(entry))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
