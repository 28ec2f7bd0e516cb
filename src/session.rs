//! Browser-automation engine capability.
//!
//! The executor never touches selectors or the DOM itself; it drives an
//! opaque [`BrowserSession`] that performs one action at a time and reports
//! success, optional extracted text, and whether the engine considers the
//! task finished. The session is an exclusively-owned resource: one run, one
//! session, no concurrent tabs.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Action;

/// Errors surfaced by a browser session implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("browser session error: {0}")]
    Message(String),
    #[error("browser session not launched")]
    NotLaunched,
    #[error("browser session feature unsupported: {0}")]
    Unsupported(String),
}

/// What the engine reports after performing a single action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub success: bool,
    pub extracted_text: Option<String>,
    pub error: Option<String>,
    /// Engine's own "done" signal; authoritative for result extraction.
    pub terminal: bool,
}

impl StepOutcome {
    /// Successful non-terminal step.
    pub fn ok() -> Self {
        StepOutcome {
            success: true,
            ..StepOutcome::default()
        }
    }

    /// Successful non-terminal step that extracted some text.
    pub fn ok_with_text(text: impl Into<String>) -> Self {
        StepOutcome {
            success: true,
            extracted_text: Some(text.into()),
            ..StepOutcome::default()
        }
    }

    /// Failed step; the plan continues, the failure is recorded.
    pub fn failed(error: impl Into<String>) -> Self {
        StepOutcome {
            success: false,
            error: Some(error.into()),
            ..StepOutcome::default()
        }
    }

    /// Terminal "done" step carrying the engine's final text.
    pub fn done(text: impl Into<String>) -> Self {
        StepOutcome {
            success: true,
            extracted_text: Some(text.into()),
            terminal: true,
            ..StepOutcome::default()
        }
    }
}

/// One exclusively-owned browser automation session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Make sure the underlying engine is reachable and ready to act.
    ///
    /// Called once before any action runs; failure here means the whole run
    /// aborts without a trace.
    async fn ensure_ready(&self) -> Result<(), SessionError>;

    /// Perform a single action.
    ///
    /// Ordinary action failures (element not found, navigation timeout) are
    /// reported inside [`StepOutcome`], not as `Err`; `Err` is reserved for
    /// session-level faults.
    async fn perform(&self, action: &Action) -> Result<StepOutcome, SessionError>;

    /// Release the session's resources.
    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
