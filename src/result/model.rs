use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuiteDescriptor {
    pub id: String,
    #[serde(default)]
    pub job: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Unknown,
    Other(String),
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pass" => Outcome::Pass,
            "fail" => Outcome::Fail,
            "skip" => Outcome::Skip,
            "unknown" => Outcome::Unknown,
            _ => Outcome::Other(value),
        }
    }
}

impl From<Outcome> for String {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Pass => "pass".to_string(),
            Outcome::Fail => "fail".to_string(),
            Outcome::Skip => "skip".to_string(),
            Outcome::Unknown => "unknown".to_string(),
            Outcome::Other(other) => other,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Link to the results archive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One reported test execution as delivered by the results service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResultRecord {
    pub id: String,
    pub job: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub log_start_line: Option<String>,
    #[serde(default)]
    pub log_end_line: Option<String>,
    #[serde(default)]
    pub logged: Option<String>,
    #[serde(default)]
    pub measurement: Option<String>,
    #[serde(default)]
    pub metadata: ResultMetadata,
    pub name: String,
    pub result: Outcome,
    pub suite: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub url: String,
}

impl ResultRecord {
    pub fn reference(&self) -> Option<&str> {
        self.metadata
            .reference
            .as_deref()
            .filter(|reference| !reference.is_empty())
    }
}

/// Outcome of reading a whole-document list from the results service.
#[derive(Debug, PartialEq)]
pub enum ParsedList<T> {
    Parsed(Vec<T>),
    Empty,
    Malformed(String),
}

impl<T: DeserializeOwned> ParsedList<T> {
    pub fn from_yaml(document: &str) -> Self {
        if document.trim().is_empty() {
            return ParsedList::Empty;
        }
        match serde_yaml::from_str::<Option<Vec<T>>>(document) {
            Ok(Some(items)) if !items.is_empty() => ParsedList::Parsed(items),
            Ok(_) => ParsedList::Empty,
            Err(err) => ParsedList::Malformed(err.to_string()),
        }
    }
}
