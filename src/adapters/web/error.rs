//! HTTP error responses for web adapter.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::domain::error::TickerdeskError;

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    status: u16,
    message: &'a str,
}

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &TickerdeskError) -> StatusCode {
    match err {
        TickerdeskError::ConfigMissing { .. }
        | TickerdeskError::ConfigInvalid { .. }
        | TickerdeskError::ConfigParse { .. }
        | TickerdeskError::InvalidHorizon { .. } => StatusCode::BAD_REQUEST,
        TickerdeskError::NoData { .. } => StatusCode::NOT_FOUND,
        TickerdeskError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TickerdeskError::Provider { .. } | TickerdeskError::Unsupported { .. } => {
            StatusCode::BAD_GATEWAY
        }
        TickerdeskError::ModelLoad { .. } | TickerdeskError::ModelShape { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        TickerdeskError::Report { .. } | TickerdeskError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<TickerdeskError> for WebError {
    fn from(err: TickerdeskError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let template = ErrorTemplate {
            status: self.status.as_u16(),
            message: &self.message,
        };
        match template.render() {
            Ok(html) => (self.status, Html(html)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}
