mod pneumonia_repository;

pub use pneumonia_repository::{
    ApiResult, PneumoniaRepository, GENERIC_NETWORK_ERROR, HEALTH_CHECK_FAILED,
    MODEL_INFO_FAILED, PREDICTION_FAILED, SERVER_STARTING_UP, SERVER_WAKING_UP,
};
