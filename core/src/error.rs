use std::fmt;
use thiserror::Error;

use slide_common::{JobId, SlideValidationError};
use slide_protocol::JobStatus;

/// Core error types for the slide generation pipeline
#[derive(Error, Debug)]
pub enum StudioError {
    /// Blank or malformed prompt / revision text
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A submit arrived while another job still holds the project's job slot
    #[error("Job {job_id} is still building")]
    ConcurrentJobConflict { job_id: JobId },

    /// Revisions need a finished deck
    #[error("No finished deck to revise (job is {status})")]
    NotReady { status: String },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid slide: {0}")]
    InvalidSlide(#[from] SlideValidationError),

    /// The project view was torn down
    #[error("Project is closed")]
    ProjectClosed,
}

impl StudioError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        StudioError::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn not_ready(status: Option<JobStatus>) -> Self {
        let status = status.map_or_else(|| "not started".to_string(), |s| s.to_string());
        StudioError::NotReady { status }
    }
}

/// Generation-backend errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("backend error: {reason}")]
    Backend { reason: String },

    #[error("no result within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("generation was cancelled")]
    Cancelled,

    #[error("backend returned an unusable deck: {reason}")]
    InvalidDeck { reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, StudioError>;

/// Error reporting utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Format error for user display
    pub fn format_user_error(error: &StudioError) -> String {
        match error {
            StudioError::InvalidRequest { reason } => {
                format!("Nothing to do: {reason}.")
            }
            StudioError::ConcurrentJobConflict { .. } => {
                "I'm still building the current draft. Wait for it to finish before submitting a new prompt."
                    .to_string()
            }
            StudioError::NotReady { .. } => {
                "There is no finished deck yet. Revisions are accepted once the first draft is ready."
                    .to_string()
            }
            StudioError::Generation(generation_err) => {
                Self::format_generation_error(generation_err)
            }
            StudioError::InvalidSlide(slide_err) => {
                format!("The generated content was malformed: {slide_err}")
            }
            StudioError::ProjectClosed => "This project has been closed.".to_string(),
        }
    }

    /// Chat text for a job that ended in `Failed`.
    pub fn format_generation_error(error: &GenerationError) -> String {
        match error {
            GenerationError::Timeout { timeout_ms } => {
                let budget = if timeout_ms % 1000 == 0 {
                    format!("{}s", timeout_ms / 1000)
                } else {
                    format!("{timeout_ms}ms")
                };
                format!(
                    "Sorry, building the presentation took longer than {budget} and was stopped. Submit your prompt again to retry."
                )
            }
            GenerationError::Cancelled => {
                "Generation was cancelled before it finished.".to_string()
            }
            GenerationError::InvalidDeck { reason } => {
                format!(
                    "Sorry, the draft I produced was not usable ({reason}). Submit your prompt again to retry."
                )
            }
            GenerationError::Backend { reason } => {
                format!(
                    "Sorry, I couldn't build the presentation: {reason}. Submit your prompt again to retry."
                )
            }
        }
    }

    /// Get error severity level
    pub fn severity(error: &StudioError) -> ErrorSeverity {
        match error {
            StudioError::InvalidRequest { .. } => ErrorSeverity::Info,
            StudioError::ConcurrentJobConflict { .. } | StudioError::NotReady { .. } => {
                ErrorSeverity::Warning
            }
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Error => write!(f, "ERROR"),
        }
    }
}
