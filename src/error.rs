use std::{io, path::PathBuf};

use thiserror::Error;

pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("all fields are required")]
    IncompleteInput,
    #[error("payload could not be encoded: {0}")]
    SerializationFailure(#[source] CodecError),
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed geocoder response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location use was not authorized")]
    NotAuthorized,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("cache entry {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failures that abort the command line driver before a submission happens.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("could not read fixes from {path}: {reason}")]
    Fixes { path: PathBuf, reason: String },
}
