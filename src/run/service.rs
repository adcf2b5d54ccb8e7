use crate::archive::downloader::ArchiveDownloader;
use crate::archive::model::PayloadKind;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::http::ApiClient;
use crate::job::definition::parse_definition;
use crate::job::model::{BackendKind, ExecutedSuite, ResultsLayout, TestJob};
use crate::report::service::correlate;
use crate::result::service::{LavaResultsClient, NoDataReason, ResultFetcher, SuiteResults};
use crate::run::model::{NewAttachment, StoreError, TestRun};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

pub const RESULTS_URL_KEY_PREFIX: &str = "tradefed_results_url_";

const LOG_ATTACHMENTS: [PayloadKind; 2] = [PayloadKind::TradefedStdout, PayloadKind::TradefedLogcat];

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuiteStatus {
    NoData {
        reason: NoDataReason,
    },
    Processed {
        results_url: Option<String>,
        attachments: usize,
        correlated: usize,
    },
    Failed {
        message: String,
    },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SuiteOutcome {
    pub suite: String,
    #[serde(flatten)]
    pub status: SuiteStatus,
}

#[derive(Serialize, Clone, Debug)]
pub struct PostprocessReport {
    pub job_id: String,
    pub backend_supported: bool,
    pub layout: Option<ResultsLayout>,
    pub suites: Vec<SuiteOutcome>,
    pub last_results_url: Option<String>,
}

pub struct Postprocessor {
    fetcher: ResultFetcher,
    downloader: ArchiveDownloader,
    suite_concurrency: usize,
}

impl Postprocessor {
    pub fn new(fetcher: ResultFetcher, downloader: ArchiveDownloader, suite_concurrency: usize) -> Self {
        Self {
            fetcher,
            downloader,
            suite_concurrency: suite_concurrency.max(1),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self, IngestError> {
        let api_client = Arc::new(ApiClient::new(config.http_timeout())?);
        let service = LavaResultsClient::new(Arc::clone(&api_client), &config.results_url);
        Ok(Self::new(
            ResultFetcher::new(Arc::new(service)),
            ArchiveDownloader::new(api_client, config.archive_limits()),
            config.effective_concurrency(),
        ))
    }

    /// Attach tradefed results of a finished job to its test run.
    ///
    /// A suite that yields no data or fails midway is reported in its outcome
    /// and never stops the remaining suites. Only an unreadable job
    /// definition fails the whole call.
    pub async fn postprocess<R: TestRun>(&self, job: &TestJob, run: &R) -> Result<PostprocessReport, IngestError> {
        if let BackendKind::Unsupported(kind) = &job.backend {
            info!("job {} ran on backend {}, nothing to postprocess", job.job_id, kind);
            return Ok(PostprocessReport {
                job_id: job.job_id.clone(),
                backend_supported: false,
                layout: None,
                suites: vec![],
                last_results_url: None,
            });
        }

        let definition = parse_definition(&job.definition)?;
        let layout = definition.layout;
        let suites: Vec<ExecutedSuite> = match layout {
            ResultsLayout::PerSuite => definition.suites,
            ResultsLayout::Combined => definition.suites.into_iter().take(1).collect(),
        };
        info!("job {}: {} tradefed suites, {:?} layout", job.job_id, suites.len(), layout);

        let outcomes: Vec<SuiteOutcome> = stream::iter(suites)
            .map(|suite| self.process_suite(job, run, suite, layout))
            .buffer_unordered(self.suite_concurrency)
            .collect()
            .await;
        let last_results_url = outcomes.iter().rev().find_map(|outcome| match &outcome.status {
            SuiteStatus::Processed {
                results_url: Some(url), ..
            } => Some(url.clone()),
            _ => None,
        });

        Ok(PostprocessReport {
            job_id: job.job_id.clone(),
            backend_supported: true,
            layout: Some(layout),
            suites: outcomes,
            last_results_url,
        })
    }

    async fn process_suite<R: TestRun>(
        &self,
        job: &TestJob,
        run: &R,
        suite: ExecutedSuite,
        layout: ResultsLayout,
    ) -> SuiteOutcome {
        let status = match self.try_process_suite(job, run, &suite, layout).await {
            Ok(status) => status,
            Err(err) => {
                warn!("suite {} of job {} failed: {}", suite.name, job.job_id, err);
                SuiteStatus::Failed {
                    message: err.to_string(),
                }
            }
        };
        SuiteOutcome {
            suite: suite.name,
            status,
        }
    }

    async fn try_process_suite<R: TestRun>(
        &self,
        job: &TestJob,
        run: &R,
        suite: &ExecutedSuite,
        layout: ResultsLayout,
    ) -> Result<SuiteStatus, StoreError> {
        let records = match self.fetcher.fetch(&job.job_id, &suite.name).await {
            SuiteResults::Found(records) => records,
            SuiteResults::NoData(reason) => {
                info!("no data for suite {}: {:?}", suite.name, reason);
                return Ok(SuiteStatus::NoData { reason });
            }
        };
        let Some(representative) = records
            .iter()
            .find(|record| record.reference().is_some())
            .or_else(|| records.first())
        else {
            return Ok(SuiteStatus::NoData {
                reason: NoDataReason::EmptyResults,
            });
        };

        let download = self.downloader.download(representative).await;
        if let Some(url) = &download.results_url {
            let key = format!("{}{}", RESULTS_URL_KEY_PREFIX, job.job_id);
            run.merge_metadata(BTreeMap::from([(key, url.clone())])).await?;
            run.save().await?;
        }
        if download.files.is_empty() {
            info!("suite {}: results archive carried nothing usable", suite.name);
        }

        let mut attachments = 0;
        for kind in LOG_ATTACHMENTS {
            if let Some(payload) = download.files.non_empty(kind) {
                run.create_attachment(NewAttachment {
                    name: kind.attachment_name().to_string(),
                    kind,
                    data: payload.contents.clone(),
                    length: payload.length,
                })
                .await?;
                attachments += 1;
            }
        }

        let mut correlated = 0;
        if let Some(report) = download.files.non_empty(PayloadKind::TestResults) {
            let prefix = match layout {
                ResultsLayout::PerSuite => suite.record_prefix(),
                ResultsLayout::Combined => None,
            };
            let mut tests = run.list_test_records(prefix.as_deref()).await?;
            correlated = correlate(report.reader(), &mut tests).await?;
        }

        Ok(SuiteStatus::Processed {
            results_url: download.results_url,
            attachments,
            correlated,
        })
    }
}
