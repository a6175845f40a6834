use crate::api::{ApiReply, PneumoniaApi, TransportError};
use log::{info, warn};
use shared::{ErrorResponse, HealthResponse, ModelInfoMap, PredictionResponse};

pub const SERVER_WAKING_UP: &str =
    "Server is waking up. This may take up to 60 seconds. Please wait...";
pub const SERVER_STARTING_UP: &str = "Server is starting up. Please try again in 30 seconds.";
pub const HEALTH_CHECK_FAILED: &str = "Health check failed";
pub const PREDICTION_FAILED: &str = "Prediction failed";
pub const MODEL_INFO_FAILED: &str = "Model info request failed";
pub const GENERIC_NETWORK_ERROR: &str = "Network error occurred";

const BAD_GATEWAY: u16 = 502;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Success(T),
    Error(ErrorResponse),
    /// Never returned by the repository; kept so callers can model a pending call.
    Loading,
}

impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn error(&self) -> Option<&ErrorResponse> {
        match self {
            ApiResult::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Turns transport outcomes into [`ApiResult`]s with messages a user can act on.
///
/// The backend is cold-start prone, so the mapping separates "server is
/// asleep" from "request was rejected" from "network is down".
pub struct PneumoniaRepository<A> {
    api: A,
    timeout_hint_on_predict: bool,
}

impl<A: PneumoniaApi> PneumoniaRepository<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            timeout_hint_on_predict: false,
        }
    }

    /// Reuse the health-check cold-start message for predict timeouts.
    pub fn with_timeout_hint_on_predict(mut self, enabled: bool) -> Self {
        self.timeout_hint_on_predict = enabled;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn check_health(&self) -> ApiResult<HealthResponse> {
        match self.api.check_health().await {
            Ok(ApiReply::Ok(health)) => {
                info!(
                    "Server status '{}', model loaded: {}",
                    health.status, health.model_loaded
                );
                ApiResult::Success(health)
            }
            Ok(ApiReply::Failed { status, .. }) if status == BAD_GATEWAY => {
                warn!("Health check hit a sleeping server (502)");
                ApiResult::Error(ErrorResponse::new(SERVER_WAKING_UP, BAD_GATEWAY))
            }
            Ok(ApiReply::Failed { status, .. }) => {
                ApiResult::Error(ErrorResponse::new(HEALTH_CHECK_FAILED, status))
            }
            Err(TransportError::Timeout) => {
                ApiResult::Error(ErrorResponse::without_code(SERVER_STARTING_UP))
            }
            Err(err) => ApiResult::Error(transport_failure(&err)),
        }
    }

    pub async fn predict(&self, image: &[u8], file_name: &str) -> ApiResult<PredictionResponse> {
        match self.api.predict(image, file_name).await {
            Ok(ApiReply::Ok(prediction)) => {
                info!(
                    "Prediction received: {} ({:.2}%)",
                    prediction.diagnosis, prediction.confidence
                );
                ApiResult::Success(prediction)
            }
            Ok(ApiReply::Failed { status, body }) => {
                let message = if body.trim().is_empty() {
                    PREDICTION_FAILED.to_string()
                } else {
                    body
                };
                ApiResult::Error(ErrorResponse::new(message, status))
            }
            Err(TransportError::Timeout) if self.timeout_hint_on_predict => {
                ApiResult::Error(ErrorResponse::without_code(SERVER_STARTING_UP))
            }
            Err(err) => ApiResult::Error(transport_failure(&err)),
        }
    }

    pub async fn model_info(&self) -> ApiResult<ModelInfoMap> {
        match self.api.model_info().await {
            Ok(ApiReply::Ok(info)) => ApiResult::Success(info),
            Ok(ApiReply::Failed { status, .. }) => {
                ApiResult::Error(ErrorResponse::new(MODEL_INFO_FAILED, status))
            }
            Err(err) => ApiResult::Error(transport_failure(&err)),
        }
    }
}

fn transport_failure(err: &TransportError) -> ErrorResponse {
    ErrorResponse::without_code(err.message().unwrap_or(GENERIC_NETWORK_ERROR))
}
