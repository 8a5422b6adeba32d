use std::path::PathBuf;

use dify_client::DifyError;
use thiserror::Error;

use crate::service::StageKind;

/// A failed call to the content backend. Recoverable by retry where the
/// pipeline allows it, otherwise recorded on the scenario's result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service error ({status}) {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("empty response from {0}")]
    EmptyResponse(StageKind),

    #[error("no application configured for {0}")]
    Unconfigured(StageKind),
}

impl From<DifyError> for ServiceError {
    fn from(err: DifyError) -> Self {
        match err {
            DifyError::Api {
                status,
                code,
                message,
            } => ServiceError::Api {
                status,
                code,
                message,
            },
            other => ServiceError::Transport(other.to_string()),
        }
    }
}

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("scenario generation failed: {0}")]
    ScenarioGeneration(#[source] ServiceError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write export {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_their_status() {
        let err: ServiceError = DifyError::Api {
            status: 429,
            code: "too_many_requests".to_string(),
            message: "slow down".to_string(),
        }
        .into();

        assert_eq!(
            err,
            ServiceError::Api {
                status: 429,
                code: "too_many_requests".to_string(),
                message: "slow down".to_string(),
            }
        );
    }

    #[test]
    fn decode_errors_become_transport_errors() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ServiceError = DifyError::Decode(decode).into();
        assert!(matches!(err, ServiceError::Transport(msg) if msg.contains("decode")));
    }
}
