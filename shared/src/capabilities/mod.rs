mod http;

pub use self::http::{InvalidUrl, ValidatedUrl, MAX_RESPONSE_BODY_SIZE, MAX_TIMEOUT_MS};

pub use crux_core::render::Render;
pub use crux_http::protocol::{HttpHeader, HttpRequest, HttpResponse, HttpResult};
pub use crux_http::{Error as HttpError, Http};

use crate::event::Event;
use crate::App;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;

/// What the core's edit call completes with.
pub type EditOutcome = crux_http::Result<crux_http::Response<Vec<u8>>>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
}
