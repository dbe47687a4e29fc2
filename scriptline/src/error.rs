use thiserror::Error;
use url::Url;

use crate::span::Range;

/// Error type collaborators hand back across the pipeline boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Faults raised while reading a script or merging its fragments.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("script fragments require absolute positions (received: {0})")]
    MissingOffset(Range),
    #[error(
        "unsorted or overlapping fragments: previous: {previous}, current: {current}"
    )]
    UnsortedFragments { previous: Range, current: Range },
    #[error("fragment {range} lies outside the script text ({len} bytes)")]
    OutOfBounds { range: Range, len: usize },
    #[error("unable to get text from a script with neither text nor location")]
    NoText,
    #[error("not an absolute file path: {}", .0.display())]
    InvalidPath(std::path::PathBuf),
    #[error("unsupported script location: {0}")]
    UnsupportedLocation(Url),
    #[error("unable to read script {location}: {source}")]
    Io {
        location: Url,
        #[source]
        source: std::io::Error,
    },
}

/// Every way a pipeline stage can fail.
///
/// None of these cross a stage boundary as a Rust error; each one is
/// turned into an ERROR diagnostic (with the error kept as its cause)
/// inside a failed [`crate::ScriptResult`].
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Resolution(String),
    #[error("{0}")]
    Compilation(String),
    #[error("{0}")]
    Instantiation(String),
    #[error("{0}")]
    Execution(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

impl ScriptError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn compilation(message: impl Into<String>) -> Self {
        Self::Compilation(message.into())
    }

    pub fn instantiation(message: impl Into<String>) -> Self {
        Self::Instantiation(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Best-effort text for a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
