use crate::persistence::model::StoredRun;
use crate::persistence::runs::RunOperations;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub(crate) type RunTable = Arc<RwLock<HashMap<String, StoredRun>>>;

/// In-memory store of test runs keyed by job id.
#[derive(Clone, Default)]
pub struct Repository {
    runs: RunTable,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> RunOperations {
        RunOperations {
            table: Arc::clone(&self.runs),
        }
    }
}
