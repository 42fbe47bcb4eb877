//! Turns a selected file into a text-safe payload plus its declared media type.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::MAX_IMAGE_BYTES;

pub const IMAGE_MEDIA_PREFIX: &str = "image/";
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("declared media type '{media_type}' is not an image")]
    NotAnImage { media_type: String },

    #[error("input too large: {size} bytes, max {max_size}")]
    TooLarge { size: usize, max_size: usize },

    #[error("input bytes empty")]
    Empty,

    #[error("failed to read '{path}': {reason}")]
    Read { path: String, reason: String },
}

/// A file as handed over by the upload control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    #[serde(with = "serde_bytes")]
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// Standard base64, no line breaks.
    pub payload: String,
    pub media_type: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        data_url(&self.media_type, &self.payload)
    }
}

pub fn data_url(media_type: &str, payload: &str) -> String {
    format!("data:{media_type};base64,{payload}")
}

/// Accepts any declared type starting with `image/`. Returns the trimmed declaration.
pub fn validate_media_type(media_type: &str) -> Result<&str, EncodeError> {
    let trimmed = media_type.trim();
    let is_image = trimmed
        .get(..IMAGE_MEDIA_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_MEDIA_PREFIX));

    if is_image {
        Ok(trimmed)
    } else {
        Err(EncodeError::NotAnImage {
            media_type: media_type.to_string(),
        })
    }
}

#[instrument(skip(file), fields(name = %file.name, media_type = %file.media_type, size = file.bytes.len()))]
pub fn encode_image(file: &SelectedFile) -> Result<EncodedImage, EncodeError> {
    let media_type = validate_media_type(&file.media_type)?;

    if file.bytes.is_empty() {
        warn!("selected file is empty");
        return Err(EncodeError::Empty);
    }

    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(EncodeError::TooLarge {
            size: file.bytes.len(),
            max_size: MAX_IMAGE_BYTES,
        });
    }

    let payload = STANDARD.encode(&file.bytes);
    debug!(encoded_len = payload.len(), "image encoded");

    Ok(EncodedImage {
        payload,
        media_type: media_type.to_string(),
    })
}

pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(payload.trim())
}

/// Media type a native shell declares for a path, judged by extension the way
/// a browser file picker does.
pub fn media_type_for_path(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MEDIA_TYPE)
}

#[instrument]
pub async fn read_selected_file(path: &Path) -> Result<SelectedFile, EncodeError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| EncodeError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SelectedFile::new(name, media_type_for_path(path), bytes))
}
