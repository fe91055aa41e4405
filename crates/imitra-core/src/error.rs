use thiserror::Error;

use crate::complaint::Status;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("cannot move complaint from {from} to {to}")]
    InvalidTransition { from: Status, to: Status },

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("{0}")]
    Validation(String),
}

impl DomainError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
