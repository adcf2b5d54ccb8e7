use crate::run::model::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("job definition is not valid YAML: {0}")]
    JobDefinition(#[from] serde_yaml::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("http client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}
