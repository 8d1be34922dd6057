//! Error types for document loading, reference resolution and mocking.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a raw contract document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

/// Errors while inlining `$ref` pointers into a document.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference target not found: {reference}")]
    PointerNotFound { reference: String },

    #[error("circular reference detected: {reference}")]
    CircularReference { reference: String },

    #[error("unsupported reference {reference}: {message}")]
    UnsupportedReference { reference: String, message: String },

    #[error("cannot load referenced document {reference}: {source}")]
    Load {
        reference: String,
        #[source]
        source: LoadError,
    },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::Load { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

/// Errors surfaced by [`OpenApiMocker`](crate::OpenApiMocker).
#[derive(Debug, Error)]
pub enum MockerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to resolve document: {0}")]
    Resolve(#[from] ResolveError),
}

impl MockerError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MockerError::Load(e) => e.exit_code(),
            MockerError::Resolve(e) => e.exit_code(),
        }
    }
}

/// Errors while reading an inbound request body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body is empty")]
    Empty,

    #[error("request body is not valid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read request body: {message}")]
    Transport { message: String },
}
