use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::job::api::register_job;
use crate::persistence::repo::Repository;
use crate::run::api::{get_run, postprocess_job};
use crate::run::model::StoreError;
use crate::run::service::Postprocessor;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub postprocessor: Arc<Postprocessor>,
}

impl FromRef<AppState> for Repository {
    fn from_ref(app_state: &AppState) -> Repository {
        app_state.repository.deref().clone()
    }
}

pub fn build_api(config: &IngestConfig) -> Result<Router, IngestError> {
    let app_state = AppState {
        repository: Arc::new(Repository::new()),
        postprocessor: Arc::new(Postprocessor::from_config(config)?),
    };
    Ok(router(app_state))
}

fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/jobs/:job_id/postprocess", post(postprocess_job))
        .route("/jobs/:job_id/run", get(get_run))
        .route("/jobs", post(register_job))
        .layer(TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new().include_headers(true))
            .on_request(
                DefaultOnRequest::new()
                    .level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Micros)
            ))
        .with_state(app_state)
}

pub struct ApiResponse<T>(pub T);

impl<T> ApiResponse<T> {
    pub fn from_option(result: Option<T>) -> Result<ApiResponse<T>, AppError> {
        match result {
            None => Err(AppError::NotFound("Not found".to_string())),
            Some(val) => Ok(ApiResponse(val)),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    NotFound(String),
    Validation(String),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::NotFound(err.to_string())
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::JobDefinition(_) => AppError::Validation(err.to_string()),
            IngestError::Store(store) => store.into(),
            IngestError::HttpClient(_) => AppError::Internal(err.to_string()),
        }
    }
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ErrorBody {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(message) => {
                tracing::error!("{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}
