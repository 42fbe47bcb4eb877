//! Request/response codec for the generative image edit call.
//!
//! The core never performs I/O: [`build_edit_request`] produces what the
//! `Http` capability sends, and [`parse_edit_response`] turns whatever came
//! back into a result payload or a [`EditError`] whose message is shown to the
//! user as is.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::capabilities::{EditOutcome, HttpError};
use crate::config::{ConfigError, EditorConfig};
use crate::encoder::{decode_payload, EncodedImage};

pub const API_KEY_HEADER: &str = "x-goog-api-key";
pub const NO_IMAGE_MESSAGE: &str = "The model did not return an image.";
pub const TIMEOUT_MESSAGE: &str = "The request timed out.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Please upload an image and enter an editing prompt.")]
    MissingInput,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    #[error("{}", no_image_message(.text.as_deref()))]
    NoImage { text: Option<String> },

    #[error("The request was blocked: {reason}")]
    Blocked { reason: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

fn no_image_message(text: Option<&str>) -> String {
    match text {
        Some(text) => format!("{NO_IMAGE_MESSAGE} {text}"),
        None => NO_IMAGE_MESSAGE.to_string(),
    }
}

/// One ready-to-send edit call.
#[derive(Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub url: String,
    pub api_key: String,
    pub body: Vec<u8>,
}

impl fmt::Debug for EditRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditRequest")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("body_len", &self.body.len())
            .finish()
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataRef<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataRef<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 2],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Builds the single request for one edit. `instruction` is sent trimmed.
pub fn build_edit_request(
    config: &EditorConfig,
    image: &EncodedImage,
    instruction: &str,
) -> Result<EditRequest, EditError> {
    let instruction = instruction.trim();
    if instruction.is_empty() || image.payload.is_empty() {
        return Err(EditError::MissingInput);
    }
    config.validate()?;

    let body = GenerateContentRequest {
        contents: vec![RequestContent {
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineDataRef {
                        mime_type: &image.media_type,
                        data: &image.payload,
                    },
                },
                RequestPart::Text { text: instruction },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: ["IMAGE", "TEXT"],
        },
    };
    let body = serde_json::to_vec(&body).map_err(|e| EditError::Request(e.to_string()))?;

    let request = EditRequest {
        url: config.edit_endpoint(),
        api_key: config.api_key().to_string(),
        body,
    };
    debug!(url = %request.url, body_len = request.body.len(), "edit request built");

    Ok(request)
}

/// Maps the capability outcome onto [`parse_edit_reply`].
pub fn parse_edit_response(outcome: EditOutcome) -> Result<String, EditError> {
    match outcome {
        Ok(response) => {
            let status = u16::from(response.status());
            let body = response.body().map(Vec::as_slice).unwrap_or_default();
            parse_edit_reply(status, body)
        }
        Err(HttpError::Http(e)) => {
            parse_edit_reply(u16::from(e.code), e.body.as_deref().unwrap_or_default())
        }
        Err(HttpError::Timeout) => Err(EditError::Timeout),
        Err(other) => Err(EditError::Transport(other.to_string())),
    }
}

/// The first inline image in the reply, as base64 text.
pub fn parse_edit_reply(status: u16, body: &[u8]) -> Result<String, EditError> {
    if !(200..300).contains(&status) {
        return Err(status_error(status, body));
    }

    let parsed: GenerateContentResponse =
        serde_json::from_slice(body).map_err(|e| EditError::Malformed(e.to_string()))?;

    let mut text_reply: Option<String> = None;
    for part in parsed
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
    {
        if let Some(inline) = part.inline_data {
            let payload = inline.data.trim().to_string();
            decode_payload(&payload)
                .map_err(|e| EditError::Malformed(format!("image data is not base64: {e}")))?;
            debug!(
                payload_len = payload.len(),
                mime_type = inline.mime_type.as_deref().unwrap_or("unknown"),
                "edit response decoded"
            );
            return Ok(payload);
        }
        if let Some(text) = part.text.filter(|t| !t.trim().is_empty()) {
            text_reply.get_or_insert(text.trim().to_string());
        }
    }

    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(EditError::Blocked { reason });
    }

    Err(EditError::NoImage { text: text_reply })
}

fn status_error(status: u16, body: &[u8]) -> EditError {
    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {status}"));

    EditError::Status { status, message }
}
