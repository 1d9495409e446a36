//! Error taxonomy and exit code mapping.
//!
//! - Every failure surfaces once at the CLI boundary; nothing is retried.
//! - `Launch` maps to exit code 2; all other variants map to 1.
//! - Collaborator errors (`LookupError`, `RuntimeError`) convert into the
//!   matching `LauncherError` variant so callers can use `?`.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LauncherError {
    /// Bad or missing user input (flags, prompts, config file).
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The image identifier cannot be turned into a concrete reference.
    #[error("resolution error: {0}")]
    Resolution(String),
    /// The launch request is internally inconsistent.
    #[error("plan conflict: {0}")]
    PlanConflict(String),
    /// The container runtime rejected or failed the launch.
    #[error("launch error: {0}")]
    Launch(String),
}

impl LauncherError {
    pub fn exit_code(&self) -> u8 {
        match self {
            LauncherError::Launch(_) => 2,
            LauncherError::Configuration(_)
            | LauncherError::Resolution(_)
            | LauncherError::PlanConflict(_) => 1,
        }
    }
}

/// Failure reported by a content-addressed storage lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("content not found in storage")]
    NotFound,
    #[error("storage unreachable: {0}")]
    Unreachable(String),
    /// The blob exists but does not name an image.
    #[error("no image reference in blob: {0}")]
    NoReference(String),
}

/// Failure reported by the container runtime collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<RuntimeError> for LauncherError {
    fn from(e: RuntimeError) -> Self {
        LauncherError::Launch(e.message)
    }
}

impl From<dialoguer::Error> for LauncherError {
    fn from(e: dialoguer::Error) -> Self {
        LauncherError::Configuration(format!("prompt failed: {e}"))
    }
}
