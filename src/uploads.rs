use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use uuid::Uuid;

use crate::settings::UploadSettings;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported image type: {0}")]
    Unsupported(String),

    #[error("Could not decode image: {0}")]
    Decode(#[source] ImageError),

    #[error("Could not encode image: {0}")]
    Encode(#[source] ImageError),

    #[error("Could not store image: {0}")]
    Io(#[from] io::Error),
}

/// Directory of product photos, referenced from products by filename.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    max_dimension: u32,
    jpeg_quality: u8,
}

impl ImageStore {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            dir: PathBuf::from(&settings.dir),
            max_dimension: settings.max_dimension.max(1),
            jpeg_quality: settings.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Shrinks the image so neither side exceeds `max_dimension`, re-encodes it
    /// and stores it under a fresh `<uuid>.<ext>` name. Empty uploads yield `None`.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> Result<Option<String>, UploadError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let ext = extension(original_name)?;
        let mut img = image::load_from_memory(bytes).map_err(UploadError::Decode)?;
        if img.width() > self.max_dimension || img.height() > self.max_dimension {
            img = img.resize(self.max_dimension, self.max_dimension, FilterType::Triangle);
        }

        fs::create_dir_all(&self.dir)?;
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&filename);
        if let Err(err) = self.encode(&img, &path, &ext) {
            let _ = fs::remove_file(&path);
            return Err(err);
        }

        tracing::debug!(%filename, width = img.width(), height = img.height(), "stored image");
        Ok(Some(filename))
    }

    fn encode(&self, img: &DynamicImage, path: &Path, ext: &str) -> Result<(), UploadError> {
        let mut out = BufWriter::new(File::create(path)?);
        let encoded = match ext {
            "jpg" | "jpeg" => JpegEncoder::new_with_quality(&mut out, self.jpeg_quality)
                .encode_image(&img.to_rgb8())
                .map_err(UploadError::Encode),
            "png" => img
                .write_to(&mut out, ImageFormat::Png)
                .map_err(UploadError::Encode),
            _ => DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut out, ImageFormat::WebP)
                .map_err(UploadError::Encode),
        };
        encoded?;
        out.flush()?;
        Ok(())
    }

    /// Best-effort removal. Missing files are skipped silently; other failures
    /// are logged. Returns how many files were deleted.
    pub fn remove(&self, filenames: &[String]) -> usize {
        let mut removed = 0;
        for name in filenames {
            if Path::new(name).file_name().map_or(true, |base| base != name.as_str()) {
                tracing::warn!(%name, "refusing to remove image outside the upload directory");
                continue;
            }
            match fs::remove_file(self.dir.join(name)) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!(%name, error = %err, "could not remove image"),
            }
        }
        removed
    }
}

fn extension(original_name: &str) -> Result<String, UploadError> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(UploadError::Unsupported(original_name.to_string()))
    }
}
