use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EditorConfig;
use crate::encoder::{data_url, EncodedImage};
use crate::AppError;

/// Identifies one edit request so a late completion can be matched to its slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user's source image, as selected and encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub encoded: EncodedImage,
}

impl ImageRecord {
    pub fn media_type(&self) -> &str {
        &self.encoded.media_type
    }

    pub fn data_url(&self) -> String {
        self.encoded.data_url()
    }
}

/// A displayable edited image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditResult {
    pub media_type: String,
    pub payload: String,
}

impl EditResult {
    pub fn data_url(&self) -> String {
        data_url(&self.media_type, &self.payload)
    }
}

/// The single in-flight slot. Busy is exactly "this slot is occupied".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub request_id: RequestId,
    /// Media type of the image that was submitted; the result is rendered with it.
    pub media_type: String,
    /// Set when a new file replaced the submitted one; the completion is then dropped.
    pub superseded: bool,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Ready,
    Submitting,
    ReadyWithResult,
    ReadyWithError,
}

#[derive(Debug, Default)]
pub struct Model {
    pub image: Option<ImageRecord>,
    pub result: Option<EditResult>,
    pub instruction: String,
    pub pending: Option<PendingEdit>,
    pub active_error: Option<AppError>,
    pub config: EditorConfig,
}

impl Model {
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn has_instruction(&self) -> bool {
        !self.instruction.trim().is_empty()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_busy() && self.image.is_some() && self.has_instruction()
    }

    /// Empties the in-flight slot and hands back what it held.
    pub fn take_pending(&mut self) -> Option<PendingEdit> {
        self.pending.take()
    }

    /// A visible error outranks a still-displayed result.
    pub fn phase(&self) -> Phase {
        if self.is_busy() {
            Phase::Submitting
        } else if self.image.is_none() {
            Phase::Idle
        } else if self.active_error.is_some() {
            Phase::ReadyWithError
        } else if self.result.is_some() {
            Phase::ReadyWithResult
        } else {
            Phase::Ready
        }
    }
}
