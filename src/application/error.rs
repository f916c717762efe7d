use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::config::LoadError;
use crate::infra::error::InfraError;

const NO_DETAIL: &str = "no diagnostic available";

/// Diagnostic carried in response extensions to the response logger.
///
/// The HTTP body only ever holds the public status message; the full source
/// chain stays server side.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub chain: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let chain = std::iter::successors(Some(error), |&err| err.source())
            .map(ToString::to_string)
            .collect();
        Self {
            source,
            status,
            chain,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            chain: vec![message.into()],
        }
    }

    /// Outermost message of the chain.
    pub fn summary(&self) -> &str {
        self.chain.first().map_or(NO_DETAIL, String::as_str)
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failure that ends a command of a binary built on the toolkit.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("{context}: {message}")]
    Command {
        context: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn command(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            context,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn report_collects_the_source_chain() {
        let error = Outer(std::io::Error::other("inner"));
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &error);
        assert_eq!(report.chain, vec!["outer".to_string(), "inner".to_string()]);
        assert_eq!(report.summary(), "outer");
    }

    #[test]
    fn empty_reports_have_a_placeholder_summary() {
        let report = ErrorReport {
            source: "test",
            status: StatusCode::BAD_REQUEST,
            chain: Vec::new(),
        };
        assert_eq!(report.summary(), NO_DETAIL);
    }

    #[test]
    fn infra_errors_pass_through_transparently() {
        let error = AppError::from(InfraError::database("connection refused"));
        assert_eq!(error.to_string(), "database error: connection refused");
    }

    #[test]
    fn command_errors_name_their_context() {
        let error = AppError::command("server error", "address in use");
        assert_eq!(error.to_string(), "server error: address in use");
    }
}
