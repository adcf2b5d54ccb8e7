use crate::archive::model::PayloadKind;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("test run for job {0} not found")]
    RunNotFound(String),
    #[error("test record {name} of suite {suite} not found")]
    RecordNotFound { suite: String, name: String },
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NewAttachment {
    pub name: String,
    pub kind: PayloadKind,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub length: usize,
}

/// Capabilities the ingestion pipeline needs from a job's test run.
#[async_trait]
pub trait TestRun: Send + Sync {
    type Record: TestRecord;

    /// Insert or overwrite `entries`, leaving every other key in place.
    async fn merge_metadata(&self, entries: BTreeMap<String, String>) -> Result<(), StoreError>;

    async fn save(&self) -> Result<(), StoreError>;

    async fn create_attachment(&self, attachment: NewAttachment) -> Result<(), StoreError>;

    /// Records of the run; with a prefix, only those whose suite starts with it.
    async fn list_test_records(&self, suite_prefix: Option<&str>) -> Result<Vec<Self::Record>, StoreError>;
}

#[async_trait]
pub trait TestRecord: Send + Sync {
    fn suite(&self) -> &str;
    fn name(&self) -> &str;
    fn set_log(&mut self, log: String);
    async fn save(&self) -> Result<(), StoreError>;
}
