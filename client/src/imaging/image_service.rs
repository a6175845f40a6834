use crate::config::ClientConfig;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use log::{debug, info};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ImagePrepError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("Could not encode JPEG: {0}")]
    Encode(#[source] image::ImageError),
}

/// A compressed JPEG sitting in the cache directory, ready for upload.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PreparedImage {
    pub fn discard(&self) -> Result<(), ImagePrepError> {
        fs::remove_file(&self.path).map_err(|source| ImagePrepError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Turns a user-selected image into a bounded-size JPEG.
#[derive(Debug, Clone)]
pub struct ImagePreparer {
    cache_dir: PathBuf,
    max_dimension: u32,
    quality: u8,
}

impl ImagePreparer {
    pub fn new(cache_dir: impl Into<PathBuf>, max_dimension: u32, quality: u8) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_dimension,
            quality,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.cache_dir.clone(),
            config.max_image_dimension,
            config.jpeg_quality,
        )
    }

    pub fn prepare(&self, source: &Path) -> Result<PreparedImage, ImagePrepError> {
        let image = ImageReader::open(source)
            .map_err(|e| io_error(source, e))?
            .with_guessed_format()
            .map_err(|e| io_error(source, e))?
            .decode()
            .map_err(ImagePrepError::Decode)?;

        let (width, height) = (image.width(), image.height());
        let image = self.bound(image);
        debug!(
            "Prepared {} ({}x{} -> {}x{})",
            source.display(),
            width,
            height,
            image.width(),
            image.height()
        );

        let bytes = self.encode(&image)?;

        fs::create_dir_all(&self.cache_dir).map_err(|e| io_error(&self.cache_dir, e))?;
        let file_name = format!(
            "xray_{}_{}.jpg",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let path = self.cache_dir.join(&file_name);
        fs::write(&path, &bytes).map_err(|e| io_error(&path, e))?;

        info!(
            "Compressed {} to {} ({})",
            source.display(),
            file_name,
            format_file_size(bytes.len() as u64)
        );

        Ok(PreparedImage {
            path,
            file_name,
            bytes,
        })
    }

    fn bound(&self, image: DynamicImage) -> DynamicImage {
        if image.width() <= self.max_dimension && image.height() <= self.max_dimension {
            return image;
        }
        // `resize` keeps the aspect ratio and fits inside the box.
        image.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, ImagePrepError> {
        let rgb = image.to_rgb8();
        let mut buffer = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(&rgb)
            .map_err(ImagePrepError::Encode)?;
        Ok(buffer.into_inner())
    }
}

/// Human-readable size using whole units, e.g. `512 B`, `34 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    match bytes {
        b if b < KB => format!("{} B", b),
        b if b < MB => format!("{} KB", b / KB),
        b => format!("{} MB", b / MB),
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ImagePrepError {
    ImagePrepError::Io {
        path: path.to_path_buf(),
        source,
    }
}
