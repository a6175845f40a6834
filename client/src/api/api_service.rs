use shared::{HealthResponse, ModelInfoMap, PredictionResponse};
use std::future::Future;

/// What came back from the server: a parsed body, or a non-2xx status with its raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiReply<T> {
    Ok(T),
    Failed { status: u16, body: String },
}

/// No usable response was received.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Message to show the user, if the failure carries one.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            TransportError::Timeout => return None,
            TransportError::Connect(msg)
            | TransportError::Decode(msg)
            | TransportError::Other(msg) => msg.as_str(),
        };
        (!message.trim().is_empty()).then_some(message)
    }
}

/// The three remote calls of the inference service. Non-2xx statuses are
/// replies, not errors; no call is retried.
pub trait PneumoniaApi: Send + Sync {
    fn check_health(
        &self,
    ) -> impl Future<Output = Result<ApiReply<HealthResponse>, TransportError>> + Send;

    fn predict(
        &self,
        image: &[u8],
        file_name: &str,
    ) -> impl Future<Output = Result<ApiReply<PredictionResponse>, TransportError>> + Send;

    fn model_info(
        &self,
    ) -> impl Future<Output = Result<ApiReply<ModelInfoMap>, TransportError>> + Send;
}
