use crate::archive::model::ArchiveLimits;
use bon::Builder;
use std::time::Duration;

const DEFAULT_RESULTS_URL: &str = "http://localhost:8000";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug, Builder)]
pub struct IngestConfig {
    #[builder(into, default = DEFAULT_RESULTS_URL.to_string())]
    pub results_url: String,
    #[builder(default = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,
    #[builder(default = 1)]
    pub suite_concurrency: usize,
    #[builder(into, default = DEFAULT_BIND_ADDRESS.to_string())]
    pub bind_address: String,
    #[builder(default = ArchiveLimits::default().max_archive_bytes)]
    pub max_archive_bytes: u64,
    #[builder(default = ArchiveLimits::default().max_decoded_bytes)]
    pub max_decoded_bytes: u64,
    #[builder(default = ArchiveLimits::default().max_payload_bytes)]
    pub max_payload_bytes: u64,
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let limits = ArchiveLimits::default();
        Self {
            results_url: std::env::var("TRADEFED_INGEST_RESULTS_URL")
                .unwrap_or_else(|_| DEFAULT_RESULTS_URL.to_string()),
            http_timeout_secs: env_or("TRADEFED_INGEST_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT_SECS),
            suite_concurrency: env_or("TRADEFED_INGEST_SUITE_CONCURRENCY", 1),
            bind_address: std::env::var("TRADEFED_INGEST_BIND")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            max_archive_bytes: env_or("TRADEFED_INGEST_MAX_ARCHIVE_BYTES", limits.max_archive_bytes),
            max_decoded_bytes: env_or("TRADEFED_INGEST_MAX_DECODED_BYTES", limits.max_decoded_bytes),
            max_payload_bytes: env_or("TRADEFED_INGEST_MAX_PAYLOAD_BYTES", limits.max_payload_bytes),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn archive_limits(&self) -> ArchiveLimits {
        ArchiveLimits {
            max_archive_bytes: self.max_archive_bytes,
            max_decoded_bytes: self.max_decoded_bytes,
            max_payload_bytes: self.max_payload_bytes,
        }
    }

    /// Never less than one.
    pub fn effective_concurrency(&self) -> usize {
        self.suite_concurrency.max(1)
    }
}
