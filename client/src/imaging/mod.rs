mod image_service;

pub use image_service::{format_file_size, ImagePrepError, ImagePreparer, PreparedImage};
