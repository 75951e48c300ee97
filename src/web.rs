use crate::{
    app::{App, AppError},
    area::Area,
    report::Report,
    routing::RoutingDecision,
    semantic::SearchOutcome,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

async fn start_app(app: App, listen: String) {
    let app = Arc::new(app);

    let shared_state = Arc::new(SharedState { app });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        log::info!("shutting down");
    }

    let router = Router::new()
        .route("/api/reports/search", post(search))
        .route("/api/reports/route", post(route_report))
        .route("/api/areas", get(areas))
        .route("/api/health", get(health))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&listen).await.unwrap();
    log::info!("listening on {listen}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(app: App, listen: String) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(app, listen).await });
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            AppError::NotFound => (
                axum::http::StatusCode::NOT_FOUND,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::Geometry(_) => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            AppError::Embedding(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::SERVICE_UNAVAILABLE,
                    json!({"error": "search temporarily unavailable"}).to_string(),
                )
            }
            AppError::IO(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
            AppError::Other(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

async fn search(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<axum::Json<SearchOutcome>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.search(&payload.query).map(Into::into).map_err(Into::into)
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub report: Report,
    pub decision: RoutingDecision,
}

async fn route_report(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<Report>,
) -> Result<axum::Json<RouteResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.route_report(payload)
            .map(|(report, decision)| RouteResponse { report, decision }.into())
            .map_err(Into::into)
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreasRequest {
    #[serde(default)]
    pub active: bool,
}

async fn areas(
    State(state): State<Arc<SharedState>>,
    Query(params): Query<AreasRequest>,
) -> Result<axum::Json<Vec<Area>>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        app.areas(params.active).map(Into::into).map_err(Into::into)
    })
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub total_reports: usize,
    pub index_size: usize,
}

async fn health(
    State(state): State<Arc<SharedState>>,
) -> Result<axum::Json<HealthResponse>, HttpError> {
    let app = state.app.clone();

    tokio::task::block_in_place(move || {
        Ok(HealthResponse {
            total_reports: app.total_reports(),
            index_size: app.index_size(),
        }
        .into())
    })
}
