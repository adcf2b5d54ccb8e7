use crate::api::{ApiResponse, AppError, AppState};
use crate::persistence::model::StoredRun;
use crate::persistence::repo::Repository;
use crate::run::service::PostprocessReport;
use axum::extract::{Path, State};

pub async fn postprocess_job(
    Path(job_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<ApiResponse<PostprocessReport>, AppError> {
    let run = app_state.repository.runs().handle(&job_id).await?;
    let job = run.job().await?;
    let report = app_state.postprocessor.postprocess(&job, &run).await?;
    Ok(ApiResponse(report))
}

pub async fn get_run(
    Path(job_id): Path<String>,
    State(repository): State<Repository>,
) -> Result<ApiResponse<StoredRun>, AppError> {
    let result = repository.runs().get(&job_id).await;
    ApiResponse::from_option(result)
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{serve, test_router};
    use crate::job::definition::tests::JOB_DEFINITION;
    use crate::job::model::{BackendKind, TestJob};
    use axum::http::StatusCode;

    fn job(backend: BackendKind, definition: &str) -> TestJob {
        TestJob {
            job_id: "1234".to_string(),
            backend,
            definition: definition.to_string(),
        }
    }

    async fn postprocess(base_url: &str, job_id: &str) -> (StatusCode, serde_json::Value) {
        let response = reqwest::Client::new()
            .post(format!("{}/jobs/{}/postprocess", base_url, job_id))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn unregistered_job_is_not_found() {
        let (router, _) = test_router();
        let base_url = serve(router).await;

        let (status, body) = postprocess(&base_url, "1234").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "test run for job 1234 not found");
    }

    #[tokio::test]
    async fn missing_suite_is_reported_per_suite() {
        let (router, repository) = test_router();
        repository.runs().create(job(BackendKind::Lava, JOB_DEFINITION), vec![]).await;
        let base_url = serve(router).await;

        let (status, body) = postprocess(&base_url, "1234").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend_supported"], true);
        assert_eq!(body["layout"], "per_suite");
        assert_eq!(body["suites"][0]["suite"], "2_cts-lkft-armeabi-v7a");
        assert_eq!(body["suites"][0]["status"], "no_data");
        assert_eq!(body["suites"][0]["reason"], "suite_not_found");
        assert_eq!(repository.runs().get("1234").await.unwrap().revision, 0);
    }

    #[tokio::test]
    async fn unreadable_definition_is_a_bad_request() {
        let (router, repository) = test_router();
        repository.runs().create(job(BackendKind::Lava, "actions: [ {test: "), vec![]).await;
        let base_url = serve(router).await;

        let (status, _) = postprocess(&base_url, "1234").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stored_run_is_served_as_json() {
        let (router, repository) = test_router();
        repository
            .runs()
            .create(job(BackendKind::Unsupported("fake".to_string()), ""), vec![])
            .await;
        let base_url = serve(router).await;

        let response = reqwest::get(format!("{}/jobs/1234/run", base_url)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["job"]["backend"], "fake");
        assert_eq!(body["metadata"], serde_json::json!({}));
    }
}
