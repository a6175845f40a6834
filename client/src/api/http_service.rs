use super::api_service::{ApiReply, PneumoniaApi, TransportError};
use crate::config::{ClientConfig, ConfigError};
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{HealthResponse, ModelInfoMap, PredictionResponse};
use url::Url;

const HEALTH_ENDPOINT: &str = "health";
const PREDICT_ENDPOINT: &str = "predict";
const MODEL_INFO_ENDPOINT: &str = "model-info";
const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum ApiInitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// reqwest-backed implementation of [`PneumoniaApi`].
#[derive(Clone)]
pub struct HttpApiService {
    client: Client,
    base: Url,
}

impl HttpApiService {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiInitError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base: config.base()?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|e| TransportError::Other(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<ApiReply<T>, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        debug!("{} responded with {}", endpoint, status);

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        if !status.is_success() {
            warn!("{} failed with {}: {}", endpoint, status, body);
            return Ok(ApiReply::Failed {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map(ApiReply::Ok).map_err(|e| {
            warn!("{} returned an unreadable body: {}", endpoint, e);
            TransportError::Decode(e.to_string())
        })
    }
}

impl PneumoniaApi for HttpApiService {
    async fn check_health(&self) -> Result<ApiReply<HealthResponse>, TransportError> {
        let url = self.endpoint(HEALTH_ENDPOINT)?;
        debug!("GET {}", url);
        self.fetch(HEALTH_ENDPOINT, self.client.get(url)).await
    }

    async fn predict(
        &self,
        image: &[u8],
        file_name: &str,
    ) -> Result<ApiReply<PredictionResponse>, TransportError> {
        let url = self.endpoint(PREDICT_ENDPOINT)?;
        let part = Part::bytes(image.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))
            .map_err(|e| TransportError::Other(e.to_string()))?;
        let form = Form::new().part(FILE_FIELD, part);

        debug!("POST {} ({} bytes, {})", url, image.len(), file_name);
        self.fetch(PREDICT_ENDPOINT, self.client.post(url).multipart(form))
            .await
    }

    async fn model_info(&self) -> Result<ApiReply<ModelInfoMap>, TransportError> {
        let url = self.endpoint(MODEL_INFO_ENDPOINT)?;
        debug!("GET {}", url);
        self.fetch(MODEL_INFO_ENDPOINT, self.client.get(url)).await
    }
}

fn mime_for(file_name: &str) -> &'static str {
    image::ImageFormat::from_path(file_name)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> TransportError {
    warn!("{} transport failure: {}", endpoint, err);
    // Connect timeouts report both flags; the timeout wins.
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
