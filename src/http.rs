use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReqParam {
    pub key: String,
    pub value: String,
}

impl ReqParam {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        ReqParam {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub struct Endpoint {
    pub path: String,
    pub query_params: Vec<ReqParam>,
    pub headers: Vec<ReqParam>,
}

impl Endpoint {
    pub fn new(
        path: String,
        path_params: Vec<ReqParam>,
        query_params: Vec<ReqParam>,
        headers: Vec<ReqParam>,
    ) -> Endpoint {
        let mut raw_path = path;
        path_params.into_iter().for_each(|param| {
            raw_path = raw_path.replace(&param.key, &param.value);
        });
        Endpoint {
            path: raw_path,
            query_params,
            headers,
        }
    }

    /// An endpoint for a fully-qualified link, used as is.
    pub fn from_url(url: &str) -> Endpoint {
        Endpoint::new(url.to_string(), vec![], vec![], vec![])
    }

    pub fn to_url(&self) -> String {
        if self.query_params.is_empty() {
            self.path.to_string()
        } else {
            let query = self
                .query_params
                .iter()
                .map(|param| format!("{}={}", param.key, param.value))
                .collect::<Vec<String>>()
                .join("&");
            format!("{}?{}", self.path, query)
        }
    }
}

pub struct ResBody<T> {
    pub value: T,
}

impl<T> ResBody<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

pub struct HttpResult<T> {
    pub res_body: ResBody<T>,
    pub status_code: u16,
}

impl<T> HttpResult<T> {
    pub fn new(res_body: ResBody<T>, status_code: u16) -> Self {
        Self {
            res_body,
            status_code,
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum HttpError {
    #[error("http status {0}: {1}")]
    Status(u16, StatusError),
    #[error("http transport error: {0}")]
    Io(String),
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(u64),
}

impl HttpError {
    pub fn get_message(&self) -> String {
        match self {
            HttpError::Status(_, status_err) => match status_err {
                StatusError::ClientError(msg) => msg.to_string(),
                StatusError::ServerError(msg) => msg.to_string(),
            },
            HttpError::Io(msg) => msg.to_string(),
            HttpError::BodyTooLarge(limit) => format!("response body exceeds {} bytes", limit),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, thiserror::Error)]
pub enum StatusError {
    #[error("client error: {0}")]
    ClientError(String),
    #[error("server error: {0}")]
    ServerError(String),
}

/// Thin GET-only wrapper over a shared reqwest client.
///
/// A non-success status is turned into [`HttpError::Status`] from the status
/// line alone; the response body is never read in that case.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, endpoint: Endpoint) -> Result<HttpResult<String>, HttpError> {
        let response = self.send(endpoint).await?;
        let status_code = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| HttpError::Io(err.to_string()))?;
        Ok(HttpResult::new(ResBody::new(text), status_code))
    }

    /// Read the body chunk by chunk, giving up once it grows past `max_bytes`.
    pub async fn get_bytes(&self, endpoint: Endpoint, max_bytes: u64) -> Result<HttpResult<Vec<u8>>, HttpError> {
        let mut response = self.send(endpoint).await?;
        let status_code = response.status().as_u16();
        if response.content_length().is_some_and(|length| length > max_bytes) {
            return Err(HttpError::BodyTooLarge(max_bytes));
        }
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| HttpError::Io(err.to_string()))?
        {
            if (bytes.len() + chunk.len()) as u64 > max_bytes {
                return Err(HttpError::BodyTooLarge(max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(HttpResult::new(ResBody::new(bytes), status_code))
    }

    async fn send(&self, endpoint: Endpoint) -> Result<Response, HttpError> {
        let url_string = endpoint.to_url();
        debug!("url: {}", url_string);
        let url = Url::parse(&url_string).map_err(|err| HttpError::Io(err.to_string()))?;
        let headers = build_headers(&endpoint.headers)?;
        let result = self.client.get(url).headers(headers).send().await;
        match result {
            Ok(response) => {
                let status_code = response.status();
                info!("http request executed, status_code: {}", status_code);
                if status_code.is_success() {
                    Ok(response)
                } else {
                    let reason = status_code
                        .canonical_reason()
                        .unwrap_or("unknown status")
                        .to_string();
                    if status_code.is_client_error() {
                        Err(HttpError::Status(
                            status_code.as_u16(),
                            StatusError::ClientError(reason),
                        ))
                    } else {
                        Err(HttpError::Status(
                            status_code.as_u16(),
                            StatusError::ServerError(reason),
                        ))
                    }
                }
            }
            Err(error) => {
                info!("http request failed: {}", error);
                Err(HttpError::Io(error.to_string()))
            }
        }
    }
}

fn build_headers(params: &[ReqParam]) -> Result<HeaderMap, HttpError> {
    let mut headers = HeaderMap::new();
    for header in params {
        let name = HeaderName::from_bytes(header.key.as_bytes())
            .map_err(|err| HttpError::Io(err.to_string()))?;
        let value = HeaderValue::from_str(&header.value)
            .map_err(|err| HttpError::Io(err.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
