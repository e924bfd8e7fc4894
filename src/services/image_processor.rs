// src/services/image_processor.rs
use crate::errors::SkinsightError;
use crate::models::PreparedImage;
use base64::{Engine as _, engine::general_purpose};
use image::{GenericImageView, ImageFormat as ImgFormat};

// Photos larger than this get downscaled before upload to keep the inline
// payload within provider limits.
const MAX_DIMENSION: u32 = 2048;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Validates a `data:image/...` URI from the client and returns the mime
    /// type plus a clean base64 payload. Fails before any network call is
    /// made when the input is not a usable image.
    pub fn prepare(&self, data_uri: &str) -> Result<PreparedImage, SkinsightError> {
        if data_uri.is_empty() {
            return Err(SkinsightError::Validation(
                "No image provided. Please take a photo first.".to_string(),
            ));
        }

        if !data_uri.starts_with("data:image/") {
            return Err(SkinsightError::Validation(
                "Invalid image format. Please try taking the photo again.".to_string(),
            ));
        }

        let mime_type = detect_mime(data_uri);

        // Everything after the comma is the payload; camera libraries are
        // known to inject stray whitespace into long base64 strings.
        let raw = data_uri
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or(data_uri);
        let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

        let bytes = general_purpose::STANDARD.decode(&cleaned).map_err(|_| {
            SkinsightError::Validation(
                "Image data is corrupted. Please try taking the photo again.".to_string(),
            )
        })?;

        // HEIC and webp are passed through untouched; the decoder only
        // handles the common formats.
        if mime_type == "image/jpeg" || mime_type == "image/png" {
            return self.decode_and_bound(&bytes, cleaned, mime_type);
        }

        Ok(PreparedImage {
            mime_type: mime_type.to_string(),
            data: cleaned,
        })
    }

    fn decode_and_bound(
        &self,
        bytes: &[u8],
        original_base64: String,
        mime_type: &str,
    ) -> Result<PreparedImage, SkinsightError> {
        let img = image::load_from_memory(bytes).map_err(|_| {
            SkinsightError::Validation(
                "Could not read the photo. Please try taking it again.".to_string(),
            )
        })?;

        let (width, height) = img.dimensions();
        if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
            return Ok(PreparedImage {
                mime_type: mime_type.to_string(),
                data: original_base64,
            });
        }

        let ratio = MAX_DIMENSION as f32 / width.max(height) as f32;
        let new_width = (width as f32 * ratio) as u32;
        let new_height = (height as f32 * ratio) as u32;

        let resized = img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3);

        let mut output = Vec::new();
        resized
            .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Jpeg)
            .map_err(|e| {
                SkinsightError::Validation(format!("Failed to re-encode resized image: {}", e))
            })?;

        Ok(PreparedImage {
            mime_type: "image/jpeg".to_string(),
            data: general_purpose::STANDARD.encode(output),
        })
    }
}

fn detect_mime(data_uri: &str) -> &'static str {
    if data_uri.starts_with("data:image/png") {
        "image/png"
    } else if data_uri.starts_with("data:image/webp") {
        "image/webp"
    } else if data_uri.starts_with("data:image/heic") {
        "image/heic"
    } else {
        "image/jpeg"
    }
}
