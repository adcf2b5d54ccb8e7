use crate::persistence::repo::RunTable;
use crate::run::model::{StoreError, TestRecord};
use async_trait::async_trait;

/// A test record of a stored run; `save` writes the log back.
pub struct TestRecordHandle {
    pub(crate) table: RunTable,
    pub(crate) job_id: String,
    pub(crate) position: usize,
    pub(crate) suite: String,
    pub(crate) name: String,
    pub(crate) log: Option<String>,
}

#[async_trait]
impl TestRecord for TestRecordHandle {
    fn suite(&self) -> &str {
        &self.suite
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_log(&mut self, log: String) {
        self.log = Some(log);
    }

    async fn save(&self) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let stored = table
            .get_mut(&self.job_id)
            .ok_or_else(|| StoreError::RunNotFound(self.job_id.clone()))?
            .tests
            .get_mut(self.position)
            .filter(|test| test.suite == self.suite && test.name == self.name)
            .ok_or_else(|| StoreError::RecordNotFound {
                suite: self.suite.clone(),
                name: self.name.clone(),
            })?;
        stored.log = self.log.clone();
        Ok(())
    }
}
