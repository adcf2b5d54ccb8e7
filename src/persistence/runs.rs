use crate::job::model::TestJob;
use crate::persistence::model::{NewTestRecord, StoredAttachment, StoredRun};
use crate::persistence::repo::RunTable;
use crate::persistence::test_records::TestRecordHandle;
use crate::run::model::{NewAttachment, StoreError, TestRun};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct RunOperations {
    pub(crate) table: RunTable,
}

impl RunOperations {
    /// Store a fresh run for `job`, replacing any earlier one.
    pub async fn create(&self, job: TestJob, tests: Vec<NewTestRecord>) -> StoredRun {
        let run = StoredRun::new(job, tests);
        self.table
            .write()
            .await
            .insert(run.job.job_id.clone(), run.clone());
        run
    }

    pub async fn get(&self, job_id: &str) -> Option<StoredRun> {
        self.table.read().await.get(job_id).cloned()
    }

    pub async fn handle(&self, job_id: &str) -> Result<RunHandle, StoreError> {
        if self.table.read().await.contains_key(job_id) {
            Ok(RunHandle {
                table: Arc::clone(&self.table),
                job_id: job_id.to_string(),
            })
        } else {
            Err(StoreError::RunNotFound(job_id.to_string()))
        }
    }
}

/// Live view of one stored run.
pub struct RunHandle {
    table: RunTable,
    job_id: String,
}

impl RunHandle {
    pub async fn job(&self) -> Result<TestJob, StoreError> {
        self.table
            .read()
            .await
            .get(&self.job_id)
            .map(|run| run.job.clone())
            .ok_or_else(|| StoreError::RunNotFound(self.job_id.clone()))
    }
}

#[async_trait]
impl TestRun for RunHandle {
    type Record = TestRecordHandle;

    async fn merge_metadata(&self, entries: BTreeMap<String, String>) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let run = table
            .get_mut(&self.job_id)
            .ok_or_else(|| StoreError::RunNotFound(self.job_id.clone()))?;
        run.metadata.extend(entries);
        Ok(())
    }

    async fn save(&self) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let run = table
            .get_mut(&self.job_id)
            .ok_or_else(|| StoreError::RunNotFound(self.job_id.clone()))?;
        run.revision += 1;
        debug!("saved run of job {} at revision {}", self.job_id, run.revision);
        Ok(())
    }

    async fn create_attachment(&self, attachment: NewAttachment) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let run = table
            .get_mut(&self.job_id)
            .ok_or_else(|| StoreError::RunNotFound(self.job_id.clone()))?;
        run.attachments.push(StoredAttachment {
            id: Uuid::new_v4().to_string(),
            name: attachment.name,
            kind: attachment.kind,
            length: attachment.length,
            data: attachment.data,
        });
        Ok(())
    }

    async fn list_test_records(&self, suite_prefix: Option<&str>) -> Result<Vec<TestRecordHandle>, StoreError> {
        let table = self.table.read().await;
        let run = table
            .get(&self.job_id)
            .ok_or_else(|| StoreError::RunNotFound(self.job_id.clone()))?;
        Ok(run
            .tests
            .iter()
            .enumerate()
            .filter(|(_, test)| suite_prefix.map_or(true, |prefix| test.suite.starts_with(prefix)))
            .map(|(position, test)| TestRecordHandle {
                table: Arc::clone(&self.table),
                job_id: self.job_id.clone(),
                position,
                suite: test.suite.clone(),
                name: test.name.clone(),
                log: test.log.clone(),
            })
            .collect())
    }
}
