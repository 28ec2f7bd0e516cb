use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::action::Action;

/// Error produced when constructing a [`Task`] with a zero step budget.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("step budget must be greater than zero")]
pub struct InvalidStepBudget;

/// One task invocation: the free-text description plus the run-time cap on
/// how many actions may be performed. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    text: String,
    step_budget: u32,
}

impl Task {
    pub fn new(text: impl Into<String>, step_budget: u32) -> Result<Self, InvalidStepBudget> {
        if step_budget == 0 {
            return Err(InvalidStepBudget);
        }
        Ok(Self {
            text: text.into(),
            step_budget,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn step_budget(&self) -> u32 {
        self.step_budget
    }
}

/// Outcome of one executed action, recorded in trace order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    pub action: Action,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_terminal: bool,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.succeeded { "ok" } else { "failed" };
        write!(f, "{} [{status}]", self.action)?;
        if let Some(err) = &self.error {
            write!(f, ": {err}")?;
        }
        if let Some(text) = &self.extracted_text {
            write!(f, " -> {text}")?;
        }
        if self.is_terminal {
            write!(f, " (done)")?;
        }
        Ok(())
    }
}

/// Ordered record of everything one executor invocation attempted.
///
/// Owned by a single run and consumed by the result extractor; step results
/// appear in the exact order actions were attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExecutionTrace {
    steps: Vec<StepResult>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepResult> {
        self.steps.iter()
    }
}

impl fmt::Display for ExecutionTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            writeln!(f, "{}. {step}", index + 1)?;
        }
        Ok(())
    }
}

/// Value handed back to the caller once the pipeline finishes; the only
/// pipeline entity that outlives the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
    pub steps_taken: Vec<String>,
    pub raw_trace: String,
}
