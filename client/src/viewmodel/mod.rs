mod pneumonia_view_model;

pub use pneumonia_view_model::{PneumoniaViewModel, Submission, UiState, IMAGE_PROCESSING_FAILED};
