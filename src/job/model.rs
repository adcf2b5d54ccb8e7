use serde::{Deserialize, Serialize};

/// Backend a job ran on. Only LAVA jobs produce tradefed results we can read.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum BackendKind {
    Lava,
    Unsupported(String),
}

impl From<String> for BackendKind {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("lava") {
            BackendKind::Lava
        } else {
            BackendKind::Unsupported(value)
        }
    }
}

impl From<BackendKind> for String {
    fn from(value: BackendKind) -> Self {
        match value {
            BackendKind::Lava => "lava".to_string(),
            BackendKind::Unsupported(kind) => kind,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TestJob {
    pub job_id: String,
    pub backend: BackendKind,
    pub definition: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultsLayout {
    PerSuite,
    Combined,
}

/// A tradefed test definition the job executed.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecutedSuite {
    /// Suite name as reported by the results service, `<index>_<definition>`.
    pub name: String,
    pub plan: Option<String>,
    pub abi: Option<String>,
}

impl ExecutedSuite {
    /// Prefix of the test-record suites this definition produced.
    pub fn record_prefix(&self) -> Option<String> {
        match (&self.plan, &self.abi) {
            (Some(plan), Some(abi)) => Some(format!("{}/{}.", plan, abi)),
            (Some(plan), None) => Some(format!("{}/", plan)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobDefinition {
    pub suites: Vec<ExecutedSuite>,
    pub layout: ResultsLayout,
}
