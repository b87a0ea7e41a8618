use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{IdentifierKind, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Upstream,
    PartialFetchFailure,
    Transport,
    Config,
}

#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("no registry data found for {kind} {identifier}")]
    NotFound {
        kind: IdentifierKind,
        identifier: String,
    },

    #[error("registry returned an error: {message}")]
    Upstream { message: String },

    #[error("{failed} of {total} GST lookups failed (first: {first})")]
    #[diagnostic(help("rerun with --best-effort to keep the records that did resolve"))]
    PartialFetchFailure {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("registry request failed: {0}")]
    Transport(String),

    #[error("malformed {operation} payload for {identifier}: got {found}")]
    MalformedPayload {
        operation: String,
        identifier: String,
        found: &'static str,
    },

    #[error("registry returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LookupError::Validation(_) => ErrorKind::Validation,
            LookupError::NotFound { .. } => ErrorKind::NotFound,
            LookupError::Upstream { .. } => ErrorKind::Upstream,
            LookupError::PartialFetchFailure { .. } => ErrorKind::PartialFetchFailure,
            LookupError::Transport(_)
            | LookupError::MalformedPayload { .. }
            | LookupError::HttpStatus { .. }
            | LookupError::Timeout { .. } => ErrorKind::Transport,
            LookupError::ConfigRead(_)
            | LookupError::ConfigParse(_)
            | LookupError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Text shown to the person who ran the search. Transport failures read
    /// like upstream ones; `kind()` keeps them apart for logs.
    pub fn user_message(&self) -> String {
        match self {
            LookupError::Validation(err) => err.to_string(),
            LookupError::NotFound { kind, .. } => format!("No data found for this {}", kind.label()),
            LookupError::Upstream { message } => message.clone(),
            LookupError::PartialFetchFailure { failed, total, .. } => format!(
                "Failed to fetch data for this PAN: {failed} of {total} GST registration(s) could not be retrieved"
            ),
            LookupError::Transport(_)
            | LookupError::MalformedPayload { .. }
            | LookupError::HttpStatus { .. }
            | LookupError::Timeout { .. } => format!("Error connecting to API: {self}"),
            _ => self.to_string(),
        }
    }
}
