use std::net::SocketAddr;

use thiserror::Error;

/// Startup failures of the runtime adapters.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("database error: {message}")]
    Database { message: String },
    #[error("cache error: {message}")]
    Cache { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
