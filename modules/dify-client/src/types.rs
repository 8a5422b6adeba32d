use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Completion Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Blocking,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub inputs: BTreeMap<String, String>,
    pub query: String,
    pub response_mode: ResponseMode,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            inputs: BTreeMap::new(),
            query: query.into(),
            response_mode: ResponseMode::Blocking,
            user: user.into(),
        }
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    pub fn inputs<K, V>(mut self, inputs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inputs
            .extend(inputs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

// =============================================================================
// Completion Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
}

impl CompletionResponse {
    /// The answer text, or `None` when the application returned nothing usable.
    pub fn text(&self) -> Option<&str> {
        let answer = self.answer.trim();
        if answer.is_empty() {
            None
        } else {
            Some(&self.answer)
        }
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.metadata.as_ref().and_then(|m| m.usage.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// =============================================================================
// Error Body
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_blocking_mode() {
        let request = CompletionRequest::new("write something", "copyflow")
            .input("persona", "a calm tea master")
            .inputs([("scenario", "rainy morning")]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_mode"], "blocking");
        assert_eq!(json["query"], "write something");
        assert_eq!(json["user"], "copyflow");
        assert_eq!(json["inputs"]["persona"], "a calm tea master");
        assert_eq!(json["inputs"]["scenario"], "rainy morning");
    }

    #[test]
    fn response_reads_answer_and_usage() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{
                "message_id": "m-1",
                "answer": "hello",
                "metadata": {"usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}}
            }"#,
        )
        .unwrap();

        assert_eq!(response.text(), Some("hello"));
        assert_eq!(response.usage().map(|u| u.total_tokens), Some(5));
    }

    #[test]
    fn blank_answer_has_no_text() {
        let response: CompletionResponse = serde_json::from_str(r#"{"answer": "  \n"}"#).unwrap();
        assert!(response.text().is_none());
    }
}
