use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::error::DifyError;
use crate::types::{ApiErrorBody, CompletionRequest, CompletionResponse};

/// Client bound to a single Dify application (one API key).
#[derive(Clone)]
pub struct DifyClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl DifyClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reuse an existing connection pool.
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap, DifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Send a blocking completion request and return the full response.
    pub async fn completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, DifyError> {
        let url = format!("{}/completion-messages", self.base_url);

        debug!(
            inputs = request.inputs.len(),
            query_len = request.query.len(),
            "Dify completion request"
        );

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Decode a non-2xx body into [`DifyError::Api`], keeping the raw body when it is not JSON.
fn api_error(status: u16, body: &str) -> DifyError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => DifyError::Api {
            status,
            code: parsed.code.unwrap_or_else(|| "unknown_error".to_string()),
            message: parsed
                .message
                .unwrap_or_else(|| "Unknown error occurred".to_string()),
        },
        Err(_) => DifyError::Api {
            status,
            code: "response_parse_error".to_string(),
            message: format!("Failed to parse error response: {body}"),
        },
    }
}
