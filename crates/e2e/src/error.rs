//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("No element matches '{0}'")]
    ElementNotFound(String),

    #[error("No page loaded; navigate first")]
    NoPage,

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Snapshot mismatch: {name} (baseline {baseline_hash}, actual {actual_hash})")]
    SnapshotMismatch {
        name: String,
        baseline_hash: String,
        actual_hash: String,
    },

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Page script error: {0}")]
    Script(String),

    #[error("Page diverged from the note list controller: {0}")]
    PageDiverged(String),

    #[error("Page error: {0}")]
    Page(#[from] notably_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
