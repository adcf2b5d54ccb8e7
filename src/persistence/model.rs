use crate::archive::model::PayloadKind;
use crate::job::model::TestJob;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NewTestRecord {
    pub suite: String,
    pub name: String,
}

#[cfg(test)]
impl NewTestRecord {
    pub fn new(suite: &str, name: &str) -> Self {
        Self {
            suite: suite.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredTestRecord {
    pub suite: String,
    pub name: String,
    pub log: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredAttachment {
    pub id: String,
    pub name: String,
    pub kind: PayloadKind,
    pub length: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Serialize, Clone, Debug)]
pub struct StoredRun {
    pub job: TestJob,
    pub metadata: BTreeMap<String, String>,
    pub attachments: Vec<StoredAttachment>,
    pub tests: Vec<StoredTestRecord>,
    /// Bumped on every run save.
    pub revision: u64,
}

impl StoredRun {
    pub fn new(job: TestJob, tests: Vec<NewTestRecord>) -> Self {
        Self {
            job,
            metadata: BTreeMap::new(),
            attachments: vec![],
            tests: tests
                .into_iter()
                .map(|test| StoredTestRecord {
                    suite: test.suite,
                    name: test.name,
                    log: None,
                })
                .collect(),
            revision: 0,
        }
    }
}
