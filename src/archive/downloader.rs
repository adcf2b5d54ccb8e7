use crate::archive::extractor::extract;
use crate::archive::model::{ArchiveLimits, ResultFiles};
use crate::http::{ApiClient, Endpoint};
use crate::result::model::ResultRecord;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct DownloadOutcome {
    pub results_url: Option<String>,
    pub files: ResultFiles,
}

impl DownloadOutcome {
    fn empty(results_url: Option<String>) -> Self {
        Self {
            results_url,
            files: ResultFiles::empty(),
        }
    }
}

pub struct ArchiveDownloader {
    api_client: Arc<ApiClient>,
    limits: ArchiveLimits,
}

impl ArchiveDownloader {
    pub fn new(api_client: Arc<ApiClient>, limits: ArchiveLimits) -> Self {
        Self { api_client, limits }
    }

    /// Fetch and unpack the archive referenced by `record`.
    ///
    /// The resolved link is returned whatever happens to the download.
    /// Missing links, failed requests, non-success statuses, oversized and
    /// empty bodies all end in an empty [`ResultFiles`].
    pub async fn download(&self, record: &ResultRecord) -> DownloadOutcome {
        let Some(url) = record.reference().map(str::to_string) else {
            info!("result {} carries no archive reference", record.id);
            return DownloadOutcome::empty(None);
        };
        info!("downloading results archive from {}", url);

        let endpoint = Endpoint::from_url(&url);
        let bytes = match self.api_client.get_bytes(endpoint, self.limits.max_archive_bytes).await {
            Ok(result) => {
                debug!("results archive {} answered {}", url, result.status_code);
                result.res_body.value
            }
            Err(err) => {
                warn!("results archive {} unavailable: {}", url, err);
                return DownloadOutcome::empty(Some(url));
            }
        };
        if bytes.is_empty() {
            info!("results archive {} is empty", url);
            return DownloadOutcome::empty(Some(url));
        }

        let limits = self.limits;
        let files = match tokio::task::spawn_blocking(move || extract(&bytes, &limits)).await {
            Ok(files) => files,
            Err(err) => {
                warn!("archive extraction aborted: {}", err);
                ResultFiles::empty()
            }
        };
        DownloadOutcome {
            results_url: Some(url),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::extractor::tests::tar_gz;
    use crate::archive::model::PayloadKind;
    use crate::result::model::{Outcome, ResultMetadata};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record_with_reference(reference: Option<String>) -> ResultRecord {
        ResultRecord {
            id: "9992".to_string(),
            job: "999".to_string(),
            level: String::new(),
            log_start_line: Some("4359".to_string()),
            log_end_line: Some("4359".to_string()),
            logged: Some("2018-11-07 11:11:01.341667+00:00".to_string()),
            measurement: None,
            metadata: ResultMetadata {
                case: Some("test-attachment".to_string()),
                definition: Some("2_bar".to_string()),
                result: Some("pass".to_string()),
                reference,
                extra: Default::default(),
            },
            name: "test-attachment".to_string(),
            result: Outcome::Pass,
            suite: "2_bar".to_string(),
            unit: String::new(),
            url: "/results/testcase/9991".to_string(),
        }
    }

    fn downloader(limits: ArchiveLimits) -> ArchiveDownloader {
        ArchiveDownloader::new(Arc::new(ApiClient::new(Duration::from_secs(5)).unwrap()), limits)
    }

    #[tokio::test]
    async fn downloads_and_extracts_archive() {
        let server = MockServer::start().await;
        let archive = tar_gz(&[
            ("r/test_result.xml", "<Result/>"),
            ("r/tradefed-stdout.txt", "stdout"),
            ("r/tradefed-logcat.txt", "logcat"),
        ]);
        Mock::given(method("GET"))
            .and(path("/artifacts/results.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let url = format!("{}/artifacts/results.tar.gz", server.uri());
        let downloader = downloader(ArchiveLimits::default());
        let outcome = downloader.download(&record_with_reference(Some(url.clone()))).await;

        assert_eq!(outcome.results_url, Some(url));
        for kind in PayloadKind::ALL {
            assert!(outcome.files.get(kind).is_some(), "{:?} missing", kind);
        }
    }

    #[tokio::test]
    async fn empty_body_yields_empty_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let url = format!("{}/empty", server.uri());
        let downloader = downloader(ArchiveLimits::default());
        let outcome = downloader.download(&record_with_reference(Some(url.clone()))).await;

        assert_eq!(outcome.results_url, Some(url));
        assert!(outcome.files.is_empty());
    }

    #[tokio::test]
    async fn expired_link_yields_empty_files_and_keeps_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_bytes(tar_gz(&[("test_result.xml", "x")])))
            .mount(&server)
            .await;

        let url = format!("{}/expired", server.uri());
        let downloader = downloader(ArchiveLimits::default());
        let outcome = downloader.download(&record_with_reference(Some(url.clone()))).await;

        assert_eq!(outcome.results_url, Some(url));
        assert!(outcome.files.is_empty());
    }

    #[tokio::test]
    async fn missing_reference_skips_request() {
        let downloader = downloader(ArchiveLimits::default());
        let outcome = downloader.download(&record_with_reference(None)).await;
        assert_eq!(outcome.results_url, None);
        assert!(outcome.files.is_empty());
    }

    #[tokio::test]
    async fn oversized_archive_yields_empty_files_and_keeps_url() {
        let server = MockServer::start().await;
        let archive = tar_gz(&[("r/test_result.xml", "<Result/>")]);
        let limit = archive.len() as u64 - 1;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .mount(&server)
            .await;

        let url = format!("{}/huge.tar.gz", server.uri());
        let downloader = downloader(ArchiveLimits {
            max_archive_bytes: limit,
            ..ArchiveLimits::default()
        });
        let outcome = downloader.download(&record_with_reference(Some(url.clone()))).await;

        assert_eq!(outcome.results_url, Some(url));
        assert!(outcome.files.is_empty());
    }
}
