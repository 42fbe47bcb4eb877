//! Native driver for the core: runs effects against a real transport and feeds
//! completions back until no effect is left.

use std::collections::VecDeque;
use std::path::Path;

use crux_core::Core;
use tracing::{debug, instrument};

use crate::capabilities::{HttpRequest, HttpResult};
use crate::config::ConfigUpdate;
use crate::encoder::read_selected_file;
use crate::{App, Capabilities, Effect, Event, ViewModel};

#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> HttpResult;
}

pub struct Shell<T> {
    core: Core<Effect, App>,
    transport: T,
    renders: usize,
}

impl<T: HttpTransport> Shell<T> {
    pub fn new(transport: T) -> Self {
        Self {
            core: Core::new::<Capabilities>(),
            transport,
            renders: 0,
        }
    }

    pub fn view(&self) -> ViewModel {
        self.core.view()
    }

    /// Number of render requests seen so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn dispatch(&mut self, event: Event) -> ViewModel {
        let mut queue: VecDeque<Effect> = self.core.process_event(event).into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Render(_) => self.renders += 1,
                Effect::Http(mut request) => {
                    debug!(url = %request.operation.url, "executing request");
                    let result = self.transport.execute(&request.operation).await;
                    queue.extend(self.core.resolve(&mut request, result));
                }
            }
        }

        self.view()
    }

    pub async fn configure(&mut self, update: ConfigUpdate) -> ViewModel {
        self.dispatch(Event::Configure(update)).await
    }

    /// Reads `path` the way the upload control would and dispatches the outcome.
    pub async fn select_file(&mut self, path: &Path) -> ViewModel {
        let event = match read_selected_file(path).await {
            Ok(file) => Event::FileSelected(file),
            Err(e) => Event::FileReadFailed {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                reason: e.to_string(),
            },
        };
        self.dispatch(event).await
    }

    pub async fn set_instruction(&mut self, text: impl Into<String>) -> ViewModel {
        self.dispatch(Event::InstructionChanged { text: text.into() })
            .await
    }

    pub async fn submit(&mut self) -> ViewModel {
        self.dispatch(Event::SubmitRequested).await
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::{ReqwestTransport, ShellError};

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use std::time::Duration;

    use thiserror::Error;
    use tracing::warn;

    use super::{HttpTransport, Shell};
    use crate::capabilities::{
        HttpError, HttpHeader, HttpRequest, HttpResponse, HttpResult, MAX_RESPONSE_BODY_SIZE,
    };
    use crate::config::{ConfigError, ConfigUpdate, EditorConfig};

    #[derive(Debug, Error)]
    pub enum ShellError {
        #[error(transparent)]
        Config(#[from] ConfigError),

        #[error("failed to build HTTP client: {0}")]
        Client(#[from] reqwest::Error),
    }

    pub struct ReqwestTransport {
        client: reqwest::Client,
        max_response_size: usize,
    }

    impl ReqwestTransport {
        pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(Self {
                client,
                max_response_size: MAX_RESPONSE_BODY_SIZE,
            })
        }

        #[must_use]
        pub fn with_max_response_size(mut self, max: usize) -> Self {
            self.max_response_size = max;
            self
        }

        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
            let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
                .map_err(|e| HttpError::Url(e.to_string()))?;

            let mut builder = self.client.request(method, &request.url);
            for header in &request.headers {
                builder = builder.header(&header.name, &header.value);
            }
            if !request.body.is_empty() {
                builder = builder.body(request.body.clone());
            }

            let response = builder.send().await.map_err(|e| {
                warn!(error = %e, "request failed");
                transport_error(e.is_timeout(), e.to_string())
            })?;

            if let Some(len) = response.content_length() {
                check_size(usize::try_from(len).unwrap_or(usize::MAX), self.max_response_size)?;
            }

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|value| HttpHeader {
                        name: name.as_str().to_string(),
                        value: value.to_string(),
                    })
                })
                .collect();

            let body = response
                .bytes()
                .await
                .map_err(|e| transport_error(e.is_timeout(), e.to_string()))?;
            check_size(body.len(), self.max_response_size)?;

            Ok(HttpResponse {
                status,
                headers,
                body: body.to_vec(),
            })
        }
    }

    pub(super) fn transport_error(is_timeout: bool, message: String) -> HttpError {
        if is_timeout {
            HttpError::Timeout
        } else {
            HttpError::Io(message)
        }
    }

    pub(super) fn check_size(size: usize, max: usize) -> Result<(), HttpError> {
        if size > max {
            return Err(HttpError::Io(format!(
                "response body too large: {size} bytes exceeds maximum of {max} bytes"
            )));
        }
        Ok(())
    }

    #[async_trait::async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn execute(&self, request: &HttpRequest) -> HttpResult {
            match self.send(request).await {
                Ok(response) => HttpResult::Ok(response),
                Err(e) => HttpResult::Err(e),
            }
        }
    }

    impl Shell<ReqwestTransport> {
        /// Validates `config`, builds a transport honoring its timeout and hands
        /// the settings to the core.
        pub async fn with_reqwest(config: EditorConfig) -> Result<Self, ShellError> {
            config.validate()?;
            let transport = ReqwestTransport::new(Duration::from_millis(config.timeout_ms))?;
            let mut shell = Self::new(transport);
            shell.configure(ConfigUpdate::from(&config)).await;
            Ok(shell)
        }

        pub async fn from_env() -> Result<Self, ShellError> {
            Self::with_reqwest(EditorConfig::from_env()?).await
        }
    }
}
