use crate::api::{ApiResponse, AppError};
use crate::job::model::TestJob;
use crate::persistence::model::{NewTestRecord, StoredRun};
use crate::persistence::repo::Repository;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
pub struct RegisterJobRequest {
    pub job: TestJob,
    #[serde(default)]
    pub tests: Vec<NewTestRecord>,
}

pub async fn register_job(
    State(repository): State<Repository>,
    Json(request): Json<RegisterJobRequest>,
) -> Result<ApiResponse<StoredRun>, AppError> {
    if request.job.job_id.trim().is_empty() {
        return Err(AppError::Validation("job_id must not be empty".to_string()));
    }
    info!("registering job {} with {} test records", request.job.job_id, request.tests.len());
    let run = repository.runs().create(request.job, request.tests).await;
    Ok(ApiResponse(run))
}
