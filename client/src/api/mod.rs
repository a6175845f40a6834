mod api_service;
mod http_service;

pub use api_service::{ApiReply, PneumoniaApi, TransportError};
pub use http_service::{ApiInitError, HttpApiService};
