use crate::http::{ApiClient, Endpoint, HttpError, ReqParam};
use crate::result::model::{ParsedList, ResultRecord, SuiteDescriptor};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SUITES_PATH: &str = "/api/v0.2/jobs/:job_id/suites/";
const SUITE_RESULTS_PATH: &str = "/api/v0.2/jobs/:job_id/suites/:suite_id/tests/";

/// Raw document reads against the remote results service.
#[async_trait]
pub trait ResultsService: Send + Sync {
    async fn suites_list(&self, job_id: &str) -> Result<String, HttpError>;
    async fn suite_results(&self, job_id: &str, suite_id: &str) -> Result<String, HttpError>;
}

pub struct LavaResultsClient {
    api_client: Arc<ApiClient>,
    base_url: String,
}

impl LavaResultsClient {
    pub fn new(api_client: Arc<ApiClient>, base_url: &str) -> Self {
        Self {
            api_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_yaml(&self, path: &str, path_params: Vec<ReqParam>) -> Result<String, HttpError> {
        let endpoint = Endpoint::new(
            format!("{}{}", self.base_url, path),
            path_params,
            vec![ReqParam::new("format", "yaml")],
            vec![ReqParam::new("Accept", "application/yaml")],
        );
        self.api_client
            .get_text(endpoint)
            .await
            .map(|result| result.res_body.value)
    }
}

#[async_trait]
impl ResultsService for LavaResultsClient {
    async fn suites_list(&self, job_id: &str) -> Result<String, HttpError> {
        self.get_yaml(SUITES_PATH, vec![ReqParam::new(":job_id", job_id)])
            .await
    }

    async fn suite_results(&self, job_id: &str, suite_id: &str) -> Result<String, HttpError> {
        self.get_yaml(
            SUITE_RESULTS_PATH,
            vec![
                ReqParam::new(":job_id", job_id),
                ReqParam::new(":suite_id", suite_id),
            ],
        )
        .await
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
    Transport,
    MalformedSuiteList,
    EmptySuiteList,
    SuiteNotFound,
    MalformedResults,
    EmptyResults,
}

#[derive(Debug, PartialEq)]
pub enum SuiteResults {
    Found(Vec<ResultRecord>),
    NoData(NoDataReason),
}

pub struct ResultFetcher {
    service: Arc<dyn ResultsService>,
}

impl ResultFetcher {
    pub fn new(service: Arc<dyn ResultsService>) -> Self {
        Self { service }
    }

    /// Result records reported for `suite_name` in the given job.
    ///
    /// Every failure shape is folded into [`SuiteResults::NoData`]; the
    /// per-suite read is only issued once the suite list validated.
    pub async fn fetch(&self, job_id: &str, suite_name: &str) -> SuiteResults {
        debug!("fetching suite list for job {}", job_id);
        let suites_document = match self.service.suites_list(job_id).await {
            Ok(document) => document,
            Err(err) => {
                warn!("suite list for job {} unavailable: {}", job_id, err.get_message());
                return SuiteResults::NoData(NoDataReason::Transport);
            }
        };
        let suites: Vec<SuiteDescriptor> = match ParsedList::from_yaml(&suites_document) {
            ParsedList::Parsed(suites) => suites,
            ParsedList::Empty => return SuiteResults::NoData(NoDataReason::EmptySuiteList),
            ParsedList::Malformed(err) => {
                warn!("malformed suite list for job {}: {}", job_id, err);
                return SuiteResults::NoData(NoDataReason::MalformedSuiteList);
            }
        };
        let Some(suite) = suites.iter().find(|suite| suite.name == suite_name) else {
            info!("suite {} not reported for job {}", suite_name, job_id);
            return SuiteResults::NoData(NoDataReason::SuiteNotFound);
        };

        let results_document = match self.service.suite_results(job_id, &suite.id).await {
            Ok(document) => document,
            Err(err) => {
                warn!("results of suite {} unavailable: {}", suite_name, err.get_message());
                return SuiteResults::NoData(NoDataReason::Transport);
            }
        };
        match ParsedList::from_yaml(&results_document) {
            ParsedList::Parsed(records) => {
                info!("fetched {} results for suite {}", records.len(), suite_name);
                SuiteResults::Found(records)
            }
            ParsedList::Empty => SuiteResults::NoData(NoDataReason::EmptyResults),
            ParsedList::Malformed(err) => {
                warn!("malformed results for suite {}: {}", suite_name, err);
                SuiteResults::NoData(NoDataReason::MalformedResults)
            }
        }
    }
}
