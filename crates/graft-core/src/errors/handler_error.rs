//! Errors raised by plugged-in handlers, services, and destinations.

use super::error_code::{self, GraftErrorCode};
use super::GraphError;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("handler {handler} failed: {message}")]
    Failed { handler: String, message: String },

    #[error("destination {destination} rejected commit {commit_id}: {message}")]
    DeliveryFailed {
        destination: String,
        commit_id: String,
        message: String,
    },

    #[error("graph error in handler: {0}")]
    Graph(#[from] GraphError),
}

impl HandlerError {
    pub fn failed(handler: &str, message: impl Into<String>) -> Self {
        Self::Failed {
            handler: handler.to_string(),
            message: message.into(),
        }
    }
}

impl GraftErrorCode for HandlerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Graph(e) => e.error_code(),
            _ => error_code::HANDLER_ERROR,
        }
    }
}
