use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hotrank_core::config::Settings;
use hotrank_core::domain::category::Category;
use hotrank_core::domain::comparison::ComparisonRow;
use hotrank_core::service::{hot_items, HotItemsError};
use hotrank_core::store::FileSnapshotStore;
use hotrank_core::time::half_day::{local_now, Slot};

const DEFAULT_PORT: u16 = 5000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = FileSnapshotStore::new(&settings.data_dir);
    if !store.data_dir().exists() {
        tracing::warn!(
            data_dir = %store.data_dir().display(),
            "data directory does not exist yet; every comparison will report missing snapshots"
        );
    }

    let state = AppState {
        store: Arc::new(store),
        settings: Arc::new(settings),
        clock: Utc::now,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/categories", get(get_categories))
        .route("/hot-items", get(get_hot_items))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    store: Arc<FileSnapshotStore>,
    settings: Arc<Settings>,
    clock: fn() -> DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ApiCategories {
    default: String,
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct HotItemsQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiCompared {
    current: Slot,
    previous: Slot,
}

#[derive(Debug, Serialize)]
struct ApiHotItems {
    category: String,
    message: String,
    compared: ApiCompared,
    items: Vec<ComparisonRow>,
    generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    message: String,
}

type ApiError = (StatusCode, Json<ApiMessage>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ApiMessage {
            message: message.into(),
        }),
    )
}

async fn get_categories(State(state): State<AppState>) -> Json<ApiCategories> {
    let catalog = &state.settings.categories;
    Json(ApiCategories {
        default: catalog.default_category().name.clone(),
        categories: catalog.iter().cloned().collect(),
    })
}

async fn get_hot_items(
    State(state): State<AppState>,
    Query(query): Query<HotItemsQuery>,
) -> Result<Json<ApiHotItems>, ApiError> {
    let catalog = &state.settings.categories;
    let category = match query.category.as_deref() {
        Some(name) => catalog
            .get(name)
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown category: {name}")))?,
        None => catalog.default_category(),
    }
    .name
    .clone();

    let generated_at = (state.clock)();
    let now = local_now(generated_at, state.settings.utc_offset);

    let store = Arc::clone(&state.store);
    let thresholds = state.settings.thresholds;
    let name = category.clone();
    let result = tokio::task::spawn_blocking(move || {
        hot_items(&*store, &name, now, thresholds)
    })
    .await
    .map_err(|e| {
        let err = anyhow::Error::new(e);
        sentry_anyhow::capture_anyhow(&err);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "analysis task failed")
    })?;

    match result {
        Ok(analysis) => Ok(Json(ApiHotItems {
            category,
            message: analysis.summary,
            compared: ApiCompared {
                current: analysis.current,
                previous: analysis.previous,
            },
            items: analysis.rows,
            generated_at,
        })),
        Err(err) => Err(into_api_error(err)),
    }
}

fn into_api_error(err: HotItemsError) -> ApiError {
    let message = err.user_message();
    if err.is_expected() {
        tracing::info!(error = %err, "no comparison available");
        return api_error(StatusCode::NOT_FOUND, message);
    }

    let err = anyhow::Error::new(err);
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %err, "hot item analysis failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
