use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::crud::CrudError;
use crate::application::error::ErrorReport;

use super::views::{View, ViewError};

pub const MSG_NOT_FOUND_ITEM: &str = "Item not found";
pub const MSG_NOT_FOUND: &str = "Not Found";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
pub const MSG_UNAUTHORIZED: &str = "You are not authorized to access this resource.";
pub const MSG_UPDATED: &str = "Successfully updated";
pub const MSG_DELETED: &str = "Successfully deleted";
const READ_REQUEST_PREFIX: &str = "Failed reading from request";

/// Status envelope used for every error and for bodiless successes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleMessage {
    pub status: u16,
    pub message: String,
}

impl SimpleMessage {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Envelope response encoded with `view`.
pub fn service_response(view: View, status: StatusCode, message: impl Into<String>) -> Response {
    view.produce(status, &SimpleMessage::new(status, message))
}

/// Handler failure rendered as a [`SimpleMessage`] in the active view.
#[derive(Debug)]
pub struct ApiError {
    view: View,
    status: StatusCode,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(source: &'static str, view: View, status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            view,
            status,
            report: ErrorReport::from_message(source, status, message.clone()),
            message,
        }
    }

    pub fn unauthorized(view: View) -> Self {
        Self::new("infra::http::api_key", view, StatusCode::UNAUTHORIZED, MSG_UNAUTHORIZED)
    }

    pub fn not_found(view: View) -> Self {
        Self::new("infra::http::fallback", view, StatusCode::NOT_FOUND, MSG_NOT_FOUND)
    }

    pub fn method_not_allowed(view: View) -> Self {
        Self::new(
            "infra::http::fallback",
            view,
            StatusCode::METHOD_NOT_ALLOWED,
            MSG_METHOD_NOT_ALLOWED,
        )
    }

    /// Negotiation failure; body decoding problems are reported as request read failures.
    pub fn from_view(view: View, err: ViewError) -> Self {
        let status = err.status();
        let message = match &err {
            ViewError::UnsupportedMediaType { .. } | ViewError::Decode(_) => {
                format!("{READ_REQUEST_PREFIX}: {err}")
            }
            ViewError::NotAcceptable { .. } | ViewError::Encode(_) => err.to_string(),
        };
        Self {
            view,
            status,
            message,
            report: ErrorReport::from_error("infra::http::views", status, &err),
        }
    }

    pub fn from_crud(view: View, err: CrudError) -> Self {
        let status = err.status();
        Self {
            view,
            status,
            message: err.to_string(),
            report: ErrorReport::from_error("infra::http::handlers", status, &err),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = service_response(self.view, self.status, self.message);
        self.report.attach(&mut response);
        response
    }
}
