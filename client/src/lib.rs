//! Client for a remote chest X-ray pneumonia classifier.
//!
//! The layers mirror the app flow: [`api`] talks HTTP, [`repository`] maps
//! transport outcomes to user-facing errors, [`viewmodel`] holds the screen
//! state machine, [`imaging`] compresses a picked image for upload and
//! [`report`] renders a result as text.

pub mod api;
pub mod config;
pub mod imaging;
pub mod report;
pub mod repository;
pub mod viewmodel;

pub use api::{ApiReply, HttpApiService, PneumoniaApi, TransportError};
pub use config::{ClientConfig, ConfigError};
pub use imaging::{ImagePrepError, ImagePreparer, PreparedImage};
pub use repository::{ApiResult, PneumoniaRepository};
pub use viewmodel::{PneumoniaViewModel, Submission, UiState};

/// Wires the HTTP service, repository and image preparer from one config.
pub fn build_view_model(
    config: &ClientConfig,
) -> Result<PneumoniaViewModel<HttpApiService>, api::ApiInitError> {
    let service = HttpApiService::new(config)?;
    let repository = PneumoniaRepository::new(service)
        .with_timeout_hint_on_predict(config.timeout_hint_on_predict);
    Ok(PneumoniaViewModel::new(
        repository,
        ImagePreparer::from_config(config),
    ))
}
