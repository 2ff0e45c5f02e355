use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{Config, ConfigError};

/// Reasons a query can fail. The widget shows all of them to the user as a
/// single fallback message, but they are kept distinct for logging.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server responded with {status}{}", fmt_detail(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response body has no string 'answer' field")]
    MissingAnswer,
}

/// A successful reply from the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub answer: String,
    /// Knowledge-base documents the answer was drawn from, if the server listed any.
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    message: &'a str,
}

/// Outbound side of the widget. Implemented over HTTP by [`ChatClient`] and
/// by stubs in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn query(&self, message: &str) -> Result<QueryResponse, QueryError>;
}

pub struct ChatClient {
    query_url: Url,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let query_url = config.query_url()?;

        // No timeout: a query waits for as long as the transport does.
        let client = reqwest::Client::new();

        Ok(Self { query_url, client })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn query(&self, message: &str) -> Result<QueryResponse, QueryError> {
        let request_body = QueryRequest { message };

        debug!(url = %self.query_url, request = ?request_body, "Sending chat query");

        let response = self
            .client
            .post(self.query_url.clone())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = error_detail(&body);
            debug!(%status, detail = ?detail, "Chat query rejected by server");
            return Err(QueryError::Status { status, detail });
        }

        debug!("Received chat response: {}", String::from_utf8_lossy(&body));

        let response = parse_response(&body)?;
        if !response.sources.is_empty() {
            debug!(sources = ?response.sources, "Answer cites knowledge-base sources");
        }

        Ok(response)
    }
}

/// Decode a 2xx body. Anything without a string `answer` is an error, even
/// if it is otherwise valid JSON.
pub fn parse_response(body: &[u8]) -> Result<QueryResponse, QueryError> {
    let value: Value = serde_json::from_slice(body)?;

    let answer = value
        .get("answer")
        .and_then(Value::as_str)
        .ok_or(QueryError::MissingAnswer)?
        .to_string();

    let sources = value
        .get("sources")
        .and_then(Value::as_array)
        .map(|sources| {
            sources
                .iter()
                .filter_map(|source| source.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(QueryResponse { answer, sources })
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Pull the server's `detail` field out of an error body, if it has one.
fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}
