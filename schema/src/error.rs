use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StructlyError>;

#[derive(Debug, Error)]
pub enum StructlyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument \"{name}\": {message}")]
    InvalidArgument {
        name:    String,
        message: String,
    },

    #[error("Layout error: {0}")]
    Layout(String),

    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        needed:    usize,
        available: usize,
    },

    #[error("Data does not match schema: {0}")]
    Mismatch(Mismatch),

    #[error("Invalid schema version {found}, should be {expected}")]
    VersionMismatch {
        found:    u32,
        expected: u32,
    },

    #[error("Schema description error: {0}")]
    Description(String),

    #[error("Missing required field \"{0}\"")]
    MissingField(String),

    #[error("Expected {expected} value, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found:    &'static str,
    },
}

impl StructlyError {
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> StructlyError {
        StructlyError::InvalidArgument {
            name:    name.into(),
            message: message.into(),
        }
    }
}

/// Sparse description of where a value disagrees with a schema.
///
/// Composite schemas only report the members that failed, keyed by field
/// name or element index, so a single report names every bad field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Mismatch {
    Message(String),
    Fields(BTreeMap<String, Mismatch>),
    Elements(BTreeMap<usize, Mismatch>),
}

impl Mismatch {
    /// Returns the failure recorded for a struct or bitfield member.
    pub fn field(&self, name: &str) -> Option<&Mismatch> {
        match self {
            Mismatch::Fields(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Returns the failure recorded for an array or tuple element.
    pub fn element(&self, index: usize) -> Option<&Mismatch> {
        match self {
            Mismatch::Elements(elements) => elements.get(&index),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Mismatch::Message(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}
