//! Toast notifications delivered through the `HX-Trigger` header.
//!
//! The base layout listens for a `toast` event and renders it in the toast
//! host; other events in the same header (`cartUpdated`, `reviewSubmitted`)
//! are dispatched alongside.

use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Toast severity, mapped to a CSS modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

/// `HX-Trigger` header carrying client-side events.
#[derive(Debug, Clone, Default)]
pub struct HxTrigger {
    events: Map<String, Value>,
}

impl HxTrigger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn toast(mut self, toast: &Toast) -> Self {
        let payload = serde_json::to_value(toast).unwrap_or(Value::Null);
        self.events.insert("toast".to_string(), payload);
        self
    }

    /// Add an event without a payload.
    #[must_use]
    pub fn event(mut self, name: &str) -> Self {
        self.events.insert(name.to_string(), Value::Null);
        self
    }

    /// Header value, e.g. `{"toast":{"level":"success","message":"Saved"}}`.
    #[must_use]
    pub fn header_value(&self) -> String {
        Value::Object(self.events.clone()).to_string()
    }
}

impl IntoResponseParts for HxTrigger {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Ok(value) = HeaderValue::from_str(&self.header_value()) {
            res.headers_mut()
                .insert(HeaderName::from_static("hx-trigger"), value);
        }
        Ok(res)
    }
}

/// A response that only raises a toast and leaves the page untouched.
#[derive(Debug, Clone)]
pub struct ToastOnly(pub Toast);

impl IntoResponse for ToastOnly {
    fn into_response(self) -> Response {
        (
            HxTrigger::new().toast(&self.0),
            [("hx-reswap", "none")],
            (),
        )
            .into_response()
    }
}
