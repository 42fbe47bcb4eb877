// lib.rs - shared core for the prompt-driven photo editor

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod capabilities;
pub mod config;
pub mod edit_client;
pub mod encoder;
pub mod event;
pub mod model;
pub mod shell;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigUpdate, EditorConfig};
pub use crux_core::App as CruxApp;
pub use encoder::SelectedFile;
pub use event::Event;
pub use model::{EditResult, ImageRecord, Model, Phase, RequestId};

use config::ConfigError;
use edit_client::EditError;
use encoder::EncodeError;

/// Inline image limit of the generative service.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub const INVALID_IMAGE_MESSAGE: &str = "Please select a valid image file.";
pub const READ_ERROR_MESSAGE: &str = "Failed to process image file.";
pub const MISSING_INPUT_MESSAGE: &str = "Please upload an image and enter an editing prompt.";
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

pub const ACCEPTED_FILE_TYPES: &str = "image/*";
pub const PLACEHOLDER_TEXT: &str = "Your image will appear here";
pub const INSTRUCTION_PLACEHOLDER: &str = "e.g., 'Add a retro filter', 'Make the sky look like a galaxy', 'Remove the person in the background'";
pub const SUBMIT_LABEL: &str = "Generate Image";
pub const SUBMIT_BUSY_LABEL: &str = "Generating...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    Read,
    Service,
    Configuration,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::Read => "READ_ERROR",
            Self::Service => "SERVICE_ERROR",
            Self::Configuration => "CONFIGURATION_ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Read => READ_ERROR_MESSAGE.into(),
            ErrorKind::Service if self.message.trim().is_empty() => UNKNOWN_ERROR_MESSAGE.into(),
            ErrorKind::InvalidInput | ErrorKind::Service | ErrorKind::Configuration => {
                self.message.clone()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<EncodeError> for AppError {
    fn from(e: EncodeError) -> Self {
        let internal = e.to_string();
        let error = match e {
            EncodeError::NotAnImage { media_type } => {
                AppError::new(ErrorKind::InvalidInput, INVALID_IMAGE_MESSAGE)
                    .with_context("media_type", media_type)
            }
            EncodeError::TooLarge { max_size, .. } => AppError::new(
                ErrorKind::InvalidInput,
                format!(
                    "The image is too large. Please use an image smaller than {} MB.",
                    max_size / (1024 * 1024)
                ),
            ),
            EncodeError::Empty | EncodeError::Read { .. } => {
                AppError::new(ErrorKind::Read, READ_ERROR_MESSAGE)
            }
        };
        error.with_internal(internal)
    }
}

impl From<EditError> for AppError {
    fn from(e: EditError) -> Self {
        match e {
            EditError::MissingInput => AppError::new(ErrorKind::InvalidInput, MISSING_INPUT_MESSAGE),
            EditError::Config(e) => e.into(),
            EditError::Status { status, message } => AppError::new(ErrorKind::Service, message)
                .with_context("http_status", status.to_string()),
            other => AppError::new(ErrorKind::Service, other.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

// --- View model ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PanelView {
    Loading,
    Image { src: String, alt: String },
    Placeholder { text: String },
}

impl PanelView {
    fn placeholder() -> Self {
        Self::Placeholder {
            text: PLACEHOLDER_TEXT.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadView {
    pub enabled: bool,
    pub accept: String,
    pub file_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstructionView {
    pub text: String,
    pub enabled: bool,
    pub placeholder: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitView {
    pub enabled: bool,
    pub busy: bool,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub phase: Phase,
    pub upload: UploadView,
    pub instruction: InstructionView,
    pub submit: SubmitView,
    pub error: Option<UserFacingError>,
    pub original: PanelView,
    pub edited: PanelView,
}


pub mod app {
    use tracing::{debug, info, warn};

    use super::*;
    use crate::capabilities::EditOutcome;
    use crate::edit_client::{
        build_edit_request, parse_edit_response, EditError, EditRequest, API_KEY_HEADER,
    };
    use crate::encoder::encode_image;
    use crate::model::PendingEdit;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn configure(model: &mut Model, update: ConfigUpdate, caps: &Capabilities) {
            model.config.apply(update);

            match model.config.validate() {
                Ok(()) => {
                    info!(
                        api_base = %model.config.api_base,
                        model = %model.config.model,
                        timeout_ms = model.config.timeout_ms,
                        "configured"
                    );
                    if model
                        .active_error
                        .as_ref()
                        .is_some_and(|e| e.kind == ErrorKind::Configuration)
                    {
                        model.clear_error();
                    }
                }
                Err(e) => {
                    warn!(error = %e, "configuration rejected");
                    model.set_error(e.into());
                }
            }
            caps.render.render();
        }

        fn select_file(model: &mut Model, file: SelectedFile, caps: &Capabilities) {
            match encode_image(&file) {
                Ok(encoded) => {
                    model.clear_error();
                    model.result = None;

                    if let Some(pending) = model.pending.as_mut() {
                        // The in-flight edit belongs to the old image.
                        pending.superseded = true;
                        debug!(request_id = %pending.request_id, "pending edit superseded");
                    }

                    info!(media_type = %encoded.media_type, size = file.bytes.len(), "image selected");
                    model.image = Some(ImageRecord {
                        file_name: file.name,
                        bytes: file.bytes,
                        encoded,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "file rejected");
                    model.set_error(AppError::from(e).with_context("file", file.name));
                }
            }
            caps.render.render();
        }

        fn submit(model: &mut Model, caps: &Capabilities) {
            if model.is_busy() {
                debug!("submit ignored while an edit is in flight");
                return;
            }

            model.clear_error();

            let request = match model.image.as_ref() {
                Some(image) if model.has_instruction() => {
                    build_edit_request(&model.config, &image.encoded, &model.instruction)
                        .map(|request| (request, image.media_type().to_string()))
                }
                _ => Err(EditError::MissingInput),
            };

            let (request, media_type) = match request {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "submit rejected");
                    model.set_error(e.into());
                    caps.render.render();
                    return;
                }
            };

            let request_id = RequestId::generate();
            info!(%request_id, "edit submitted");

            model.result = None;
            model.pending = Some(PendingEdit {
                request_id: request_id.clone(),
                media_type,
                superseded: false,
            });

            caps.render.render();
            Self::send_edit_request(request_id, request, caps);
        }

        fn send_edit_request(request_id: RequestId, request: EditRequest, caps: &Capabilities) {
            caps.http
                .post(&request.url)
                .body(request.body)
                .header("Content-Type", "application/json")
                .header(API_KEY_HEADER, request.api_key.as_str())
                .send(move |result| Event::EditResponse {
                    request_id,
                    result: Box::new(result),
                });
        }

        fn complete(
            model: &mut Model,
            request_id: &RequestId,
            result: EditOutcome,
            caps: &Capabilities,
        ) {
            let is_current = model
                .pending
                .as_ref()
                .is_some_and(|pending| &pending.request_id == request_id);
            if !is_current {
                warn!(%request_id, "completion for unknown request dropped");
                return;
            }

            // The slot is always emptied before the outcome is applied.
            let Some(pending) = model.take_pending() else {
                return;
            };

            if pending.superseded {
                debug!(%request_id, "superseded edit completed, result discarded");
                caps.render.render();
                return;
            }

            match parse_edit_response(result) {
                Ok(payload) => {
                    info!(%request_id, payload_len = payload.len(), "edit completed");
                    model.clear_error();
                    model.result = Some(EditResult {
                        media_type: pending.media_type,
                        payload,
                    });
                }
                Err(e) => {
                    warn!(%request_id, error = %e, "edit failed");
                    model.result = None;
                    model.set_error(e.into());
                }
            }

            caps.render.render();
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(
                event = event.name(),
                user_initiated = event.is_user_initiated(),
                "update"
            );

            match event {
                Event::Noop => {}

                Event::Configure(update) => Self::configure(model, update, caps),

                Event::FileSelected(file) => Self::select_file(model, file, caps),

                Event::FileReadFailed { name, reason } => {
                    warn!(file = %name, %reason, "file read failed");
                    model.set_error(
                        AppError::new(ErrorKind::Read, READ_ERROR_MESSAGE)
                            .with_internal(reason)
                            .with_context("file", name),
                    );
                    caps.render.render();
                }

                Event::InstructionChanged { text } => {
                    if model.is_busy() {
                        debug!("instruction locked while an edit is in flight");
                        return;
                    }
                    model.instruction = text;
                    caps.render.render();
                }

                Event::SubmitRequested => Self::submit(model, caps),

                Event::DismissError => {
                    model.clear_error();
                    caps.render.render();
                }

                Event::EditResponse { request_id, result } => {
                    Self::complete(model, &request_id, *result, caps);
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let busy = model.is_busy();

            let original = match &model.image {
                Some(image) => PanelView::Image {
                    src: image.data_url(),
                    alt: "Original".into(),
                },
                None => PanelView::placeholder(),
            };

            let edited = if busy {
                PanelView::Loading
            } else if let Some(result) = &model.result {
                PanelView::Image {
                    src: result.data_url(),
                    alt: "Edited".into(),
                }
            } else {
                PanelView::placeholder()
            };

            ViewModel {
                phase: model.phase(),
                upload: UploadView {
                    enabled: !busy,
                    accept: ACCEPTED_FILE_TYPES.into(),
                    file_name: model.image.as_ref().map(|image| image.file_name.clone()),
                },
                instruction: InstructionView {
                    text: model.instruction.clone(),
                    enabled: !busy,
                    placeholder: INSTRUCTION_PLACEHOLDER.into(),
                },
                submit: SubmitView {
                    enabled: model.can_submit(),
                    busy,
                    label: if busy { SUBMIT_BUSY_LABEL } else { SUBMIT_LABEL }.into(),
                },
                error: model.active_error.as_ref().map(UserFacingError::from),
                original,
                edited,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{HttpError, HttpRequest, HttpResponse, HttpResult};
    use crux_core::testing::AppTester;
    use crux_core::Request;
    use serde_json::json;

    type Tester = AppTester<App, Effect>;

    fn configured() -> (Tester, Model) {
        let app = Tester::default();
        let mut model = Model::default();
        app.update(
            Event::Configure(ConfigUpdate {
                api_key: Some("test-key".into()),
                ..ConfigUpdate::default()
            }),
            &mut model,
        );
        (app, model)
    }

    fn png(name: &str) -> SelectedFile {
        SelectedFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    fn renders(effects: &[Effect]) -> bool {
        effects.iter().any(|e| matches!(e, Effect::Render(_)))
    }

    fn http_request(effects: Vec<Effect>) -> Option<Request<HttpRequest>> {
        effects.into_iter().find_map(|effect| match effect {
            Effect::Http(request) => Some(request),
            Effect::Render(_) => None,
        })
    }

    fn reply(status: u16, body: &serde_json::Value) -> HttpResult {
        HttpResult::Ok(HttpResponse {
            status,
            headers: vec![],
            body: serde_json::to_vec(body).unwrap(),
        })
    }

    fn image_reply(payload: &str) -> HttpResult {
        reply(
            200,
            &json!({"candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": payload}}
            ]}}]}),
        )
    }

    fn error_reply(status: u16, message: &str) -> HttpResult {
        reply(status, &json!({"error": {"code": status, "message": message}}))
    }

    /// Answers the request and applies the events it produces; returns their effects.
    fn answer(
        app: &Tester,
        model: &mut Model,
        request: &mut Request<HttpRequest>,
        result: HttpResult,
    ) -> Vec<Effect> {
        let update = app.resolve(request, result).expect("request resolves");
        let mut effects = Vec::new();
        for event in update.events {
            effects.extend(app.update(event, model).effects);
        }
        effects
    }

    /// Selects a PNG, types an instruction and submits; returns the outgoing request.
    fn submit_cat(app: &Tester, model: &mut Model) -> Request<HttpRequest> {
        app.update(Event::FileSelected(png("cat.png")), model);
        app.update(
            Event::InstructionChanged {
                text: "add a hat".into(),
            },
            model,
        );
        let update = app.update(Event::SubmitRequested, model);
        let http_count = update
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::Http(_)))
            .count();
        assert_eq!(http_count, 1, "exactly one request per submit");
        http_request(update.effects).unwrap()
    }

    mod configure_tests {
        use super::*;

        #[test]
        fn unconfigured_submit_reports_missing_key() {
            let app = Tester::default();
            let mut model = Model::default();
            app.update(Event::FileSelected(png("cat.png")), &mut model);
            app.update(
                Event::InstructionChanged {
                    text: "add a hat".into(),
                },
                &mut model,
            );

            let update = app.update(Event::SubmitRequested, &mut model);

            assert!(http_request(update.effects).is_none());
            assert!(!model.is_busy());
            assert_eq!(
                model.active_error.as_ref().unwrap().kind,
                ErrorKind::Configuration
            );
        }

        #[test]
        fn invalid_configuration_is_shown_then_cleared() {
            let app = Tester::default();
            let mut model = Model::default();

            app.update(
                Event::Configure(ConfigUpdate {
                    api_key: Some("k".into()),
                    api_base: Some("ftp://files".into()),
                    ..ConfigUpdate::default()
                }),
                &mut model,
            );
            assert_eq!(
                app.view(&model).error.unwrap().error_code,
                "CONFIGURATION_ERROR"
            );

            app.update(
                Event::Configure(ConfigUpdate {
                    api_base: Some(config::DEFAULT_API_BASE.into()),
                    ..ConfigUpdate::default()
                }),
                &mut model,
            );
            assert!(model.active_error.is_none());
        }

        #[test]
        fn request_targets_configured_endpoint_with_key() {
            let (app, mut model) = configured();
            let request = submit_cat(&app, &mut model);

            let operation = &request.operation;
            assert_eq!(operation.method.to_uppercase(), "POST");
            assert_eq!(operation.url, model.config.edit_endpoint());
            assert!(operation.headers.iter().any(|header| {
                header.name.eq_ignore_ascii_case(edit_client::API_KEY_HEADER)
                    && header.value == "test-key"
            }));

            let body: serde_json::Value = serde_json::from_slice(&operation.body).unwrap();
            assert_eq!(body["contents"][0]["parts"][1]["text"], "add a hat");
        }
    }

    mod file_selection_tests {
        use super::*;

        #[test]
        fn valid_image_creates_record() {
            let (app, mut model) = configured();

            let update = app.update(Event::FileSelected(png("cat.png")), &mut model);

            let image = model.image.as_ref().unwrap();
            assert_eq!(image.media_type(), "image/png");
            assert_eq!(image.file_name, "cat.png");
            assert_eq!(image.encoded.payload, "iVBORw==");
            assert_eq!(model.phase(), Phase::Ready);
            assert!(renders(&update.effects));
        }

        #[test]
        fn non_image_sets_error_and_keeps_record() {
            let (app, mut model) = configured();
            app.update(Event::FileSelected(png("cat.png")), &mut model);
            let before = model.image.clone();

            app.update(
                Event::FileSelected(SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec())),
                &mut model,
            );

            assert_eq!(model.image, before);
            let error = model.active_error.as_ref().unwrap();
            assert_eq!(error.kind, ErrorKind::InvalidInput);
            assert_eq!(error.user_facing_message(), INVALID_IMAGE_MESSAGE);
        }

        #[test]
        fn rejected_file_after_result_reports_error_phase() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);
            answer(&app, &mut model, &mut request, image_reply("UA=="));

            app.update(
                Event::FileSelected(SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec())),
                &mut model,
            );

            assert!(model.result.is_some());
            assert_eq!(app.view(&model).phase, Phase::ReadyWithError);
        }

        #[test]
        fn valid_image_clears_result_and_error() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);
            answer(&app, &mut model, &mut request, image_reply("UA=="));
            model.set_error(AppError::new(ErrorKind::Service, "old"));

            app.update(
                Event::FileSelected(SelectedFile::new("dog.jpg", "image/jpeg", vec![1, 2])),
                &mut model,
            );

            assert!(model.result.is_none());
            assert!(model.active_error.is_none());
            assert_eq!(model.image.as_ref().unwrap().media_type(), "image/jpeg");
        }

        #[test]
        fn read_failure_is_reported_generically() {
            let (app, mut model) = configured();
            app.update(Event::FileSelected(png("cat.png")), &mut model);

            app.update(
                Event::FileReadFailed {
                    name: "broken.png".into(),
                    reason: "permission denied".into(),
                },
                &mut model,
            );

            let error = model.active_error.as_ref().unwrap();
            assert_eq!(error.kind, ErrorKind::Read);
            assert_eq!(error.user_facing_message(), READ_ERROR_MESSAGE);
            assert_eq!(error.internal_message.as_deref(), Some("permission denied"));
            assert_eq!(model.image.as_ref().unwrap().file_name, "cat.png");
        }

        #[test]
        fn empty_file_is_read_error() {
            let (app, mut model) = configured();
            app.update(
                Event::FileSelected(SelectedFile::new("empty.png", "image/png", Vec::new())),
                &mut model,
            );
            assert_eq!(model.active_error.as_ref().unwrap().kind, ErrorKind::Read);
            assert!(model.image.is_none());
        }
    }

    mod submit_tests {
        use super::*;

        #[test]
        fn submit_without_image_is_rejected() {
            let (app, mut model) = configured();
            app.update(
                Event::InstructionChanged {
                    text: "add a hat".into(),
                },
                &mut model,
            );

            let update = app.update(Event::SubmitRequested, &mut model);

            assert!(http_request(update.effects).is_none());
            assert!(!model.is_busy());
            assert_eq!(
                model.active_error.as_ref().unwrap().user_facing_message(),
                MISSING_INPUT_MESSAGE
            );
        }

        #[test]
        fn submit_with_blank_instruction_is_rejected() {
            let (app, mut model) = configured();
            app.update(Event::FileSelected(png("cat.png")), &mut model);
            app.update(
                Event::InstructionChanged {
                    text: "   \t".into(),
                },
                &mut model,
            );

            let update = app.update(Event::SubmitRequested, &mut model);

            assert!(http_request(update.effects).is_none());
            assert_eq!(
                model.active_error.as_ref().unwrap().kind,
                ErrorKind::InvalidInput
            );
        }

        #[test]
        fn submit_enters_submitting_and_disables_controls() {
            let (app, mut model) = configured();
            submit_cat(&app, &mut model);

            assert!(model.is_busy());
            assert_eq!(model.phase(), Phase::Submitting);

            let view = app.view(&model);
            assert!(!view.submit.enabled);
            assert!(view.submit.busy);
            assert_eq!(view.submit.label, SUBMIT_BUSY_LABEL);
            assert!(!view.upload.enabled);
            assert!(!view.instruction.enabled);
            assert_eq!(view.edited, PanelView::Loading);
        }

        #[test]
        fn submit_while_busy_issues_nothing() {
            let (app, mut model) = configured();
            submit_cat(&app, &mut model);
            let first = model.pending.as_ref().unwrap().request_id.clone();

            let update = app.update(Event::SubmitRequested, &mut model);

            assert!(update.effects.is_empty());
            assert_eq!(model.pending.as_ref().unwrap().request_id, first);
        }

        #[test]
        fn instruction_is_locked_while_busy() {
            let (app, mut model) = configured();
            submit_cat(&app, &mut model);

            app.update(
                Event::InstructionChanged {
                    text: "something else".into(),
                },
                &mut model,
            );

            assert_eq!(model.instruction, "add a hat");
        }

        #[test]
        fn submit_clears_previous_error() {
            let (app, mut model) = configured();
            app.update(Event::SubmitRequested, &mut model);
            assert!(model.active_error.is_some());

            submit_cat(&app, &mut model);
            assert!(model.active_error.is_none());
        }
    }

    mod completion_tests {
        use super::*;

        #[test]
        fn success_shows_result_with_source_media_type() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);

            let effects = answer(&app, &mut model, &mut request, image_reply("UA=="));

            assert!(!model.is_busy());
            assert_eq!(model.phase(), Phase::ReadyWithResult);
            assert!(renders(&effects));

            let view = app.view(&model);
            assert_eq!(
                view.edited,
                PanelView::Image {
                    src: "data:image/png;base64,UA==".into(),
                    alt: "Edited".into()
                }
            );
            assert!(view.submit.enabled);
            assert!(view.error.is_none());
        }

        #[test]
        fn failure_shows_provider_message() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);

            answer(&app, &mut model, &mut request, error_reply(429, "quota exceeded"));

            assert!(!model.is_busy());
            assert_eq!(model.phase(), Phase::ReadyWithError);
            let view = app.view(&model);
            assert_eq!(view.error.as_ref().unwrap().message, "quota exceeded");
            assert_eq!(view.error.as_ref().unwrap().error_code, "SERVICE_ERROR");
            assert!(matches!(view.original, PanelView::Image { .. }));
            assert_eq!(view.edited, PanelView::placeholder());
        }

        #[test]
        fn transport_failure_is_service_error() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);

            answer(
                &app,
                &mut model,
                &mut request,
                HttpResult::Err(HttpError::Io("network unreachable".into())),
            );

            let error = model.active_error.as_ref().unwrap();
            assert_eq!(error.kind, ErrorKind::Service);
            assert!(error.user_facing_message().contains("network unreachable"));
        }

        #[test]
        fn empty_service_message_falls_back() {
            let error = AppError::new(ErrorKind::Service, "  ");
            assert_eq!(error.user_facing_message(), UNKNOWN_ERROR_MESSAGE);
        }

        #[test]
        fn unknown_request_id_is_ignored() {
            let (app, mut model) = configured();
            submit_cat(&app, &mut model);
            let id = model.pending.as_ref().unwrap().request_id.clone();

            let update = app.update(
                Event::EditResponse {
                    request_id: RequestId::new("someone-else"),
                    result: Box::new(Err(HttpError::Timeout)),
                },
                &mut model,
            );

            assert!(update.effects.is_empty());
            assert_eq!(model.pending.as_ref().unwrap().request_id, id);
            assert!(model.active_error.is_none());
        }

        #[test]
        fn resubmit_replaces_prior_result() {
            let (app, mut model) = configured();
            let mut first = submit_cat(&app, &mut model);
            let first_id = model.pending.as_ref().unwrap().request_id.clone();
            answer(&app, &mut model, &mut first, image_reply("UA=="));

            let update = app.update(Event::SubmitRequested, &mut model);
            let mut second = http_request(update.effects).unwrap();
            assert_ne!(model.pending.as_ref().unwrap().request_id, first_id);
            assert!(model.result.is_none(), "prior result cleared on submit");

            answer(&app, &mut model, &mut second, image_reply("Ug=="));

            assert_eq!(model.result.as_ref().unwrap().payload, "Ug==");
            assert!(model.active_error.is_none());
        }

        #[test]
        fn new_file_during_flight_discards_stale_result() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);

            app.update(
                Event::FileSelected(SelectedFile::new("dog.webp", "image/webp", vec![7])),
                &mut model,
            );
            assert!(model.is_busy(), "old call is still outstanding");
            assert!(model.pending.as_ref().unwrap().superseded);

            let effects = answer(&app, &mut model, &mut request, image_reply("UA=="));

            assert!(!model.is_busy());
            assert!(model.result.is_none());
            assert!(model.active_error.is_none());
            assert_eq!(model.image.as_ref().unwrap().file_name, "dog.webp");
            assert!(renders(&effects));
        }

        #[test]
        fn superseded_failure_is_not_shown() {
            let (app, mut model) = configured();
            let mut request = submit_cat(&app, &mut model);
            app.update(Event::FileSelected(png("other.png")), &mut model);

            answer(&app, &mut model, &mut request, error_reply(500, "internal"));

            assert!(model.active_error.is_none());
        }
    }

    mod view_tests {
        use super::*;

        #[test]
        fn initial_view() {
            let app = Tester::default();
            let view = app.view(&Model::default());

            assert_eq!(view.phase, Phase::Idle);
            assert!(view.upload.enabled);
            assert_eq!(view.upload.accept, ACCEPTED_FILE_TYPES);
            assert!(!view.submit.enabled);
            assert_eq!(view.submit.label, SUBMIT_LABEL);
            assert!(view.error.is_none());
            assert_eq!(view.original, PanelView::placeholder());
            assert_eq!(view.edited, PanelView::placeholder());
        }

        #[test]
        fn view_serializes_panels_with_type_tag() {
            let value = serde_json::to_value(PanelView::Loading).unwrap();
            assert_eq!(value, json!({"type": "loading"}));
        }

        #[test]
        fn dismiss_error_clears_it() {
            let (app, mut model) = configured();
            app.update(Event::SubmitRequested, &mut model);
            app.update(Event::DismissError, &mut model);
            assert!(app.view(&model).error.is_none());
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn encode_errors_map_to_kinds() {
            let too_large: AppError = EncodeError::TooLarge {
                size: MAX_IMAGE_BYTES + 1,
                max_size: MAX_IMAGE_BYTES,
            }
            .into();
            assert_eq!(too_large.kind, ErrorKind::InvalidInput);
            assert!(too_large.message.contains("20 MB"));

            let read: AppError = EncodeError::Read {
                path: "x".into(),
                reason: "gone".into(),
            }
            .into();
            assert_eq!(read.kind, ErrorKind::Read);
            assert!(read.internal_message.unwrap().contains("gone"));
        }

        #[test]
        fn status_error_keeps_http_status_context() {
            let error: AppError = EditError::Status {
                status: 403,
                message: "API key not valid".into(),
            }
            .into();
            assert_eq!(error.context.get("http_status").map(String::as_str), Some("403"));
            assert_eq!(error.user_facing_message(), "API key not valid");
        }

        #[test]
        fn config_error_maps_to_configuration_kind() {
            let error: AppError = EditError::Config(ConfigError::MissingApiKey).into();
            assert_eq!(error.kind, ErrorKind::Configuration);
            assert!(error.message.contains("API_KEY"));
        }

        #[test]
        fn display_includes_code_and_internal() {
            let error = AppError::new(ErrorKind::Read, READ_ERROR_MESSAGE).with_internal("eof");
            assert_eq!(
                error.to_string(),
                "[READ_ERROR] Failed to process image file. (internal: eof)"
            );
        }
    }
}
