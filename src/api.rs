use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::RadarError;
use crate::pipeline::{EvaluationStore, Pipeline};
use crate::store::{self, DayGroup, Evaluation};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    evaluations: Arc<dyn EvaluationStore>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, evaluations: Arc<dyn EvaluationStore>) -> Self {
        Self {
            pipeline,
            evaluations,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/pipeline", get(run_pipeline))
        .route("/evaluations", get(evaluations))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
        .fallback_service(ServeDir::new("static"))
}

/// Error responses carry the raw message, `{"error": "..."}`. A missing
/// evaluation id maps to 404; every other failure is a 500.
pub struct ApiError(RadarError);

impl From<RadarError> for ApiError {
    fn from(err: RadarError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RadarError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn run_pipeline(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let refresh = q.get("refresh").is_some_and(|v| v == "true");
    let outcome = state.pipeline.run(refresh).await?;
    Ok(Json(outcome).into_response())
}

#[derive(Serialize)]
struct DaysResponse {
    days: Vec<DayGroup>,
}

#[derive(Serialize)]
struct EvaluationResponse {
    evaluation: Evaluation,
}

async fn evaluations(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    if let Some(id) = q.get("id") {
        let row = state
            .evaluations
            .fetch(id)
            .await?
            .ok_or_else(|| RadarError::NotFound { id: id.clone() })?;
        return Ok(Json(EvaluationResponse { evaluation: row }).into_response());
    }

    let rows = state.evaluations.list().await?;
    let days = store::group_by_day(&rows);
    Ok(Json(DaysResponse { days }).into_response())
}
