//! Plan execution with a hard step budget.
//!
//! The executor's whole job is sequencing, budget enforcement, and trace
//! construction. At most `step_budget` actions are performed regardless of
//! plan length; running out of budget is a normal incomplete outcome, not an
//! error. A single action's failure is recorded in its [`StepResult`] and
//! the run continues: there is no plan-level retry, no plan repair, and no
//! re-invocation of the translator.

use thiserror::Error;

use crate::session::{BrowserSession, SessionError, StepOutcome};
use crate::types::{ActionPlan, ExecutionTrace, StepResult};

/// Errors that abort an execution before or during a run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("browser engine unavailable: {source}")]
    EngineUnavailable {
        #[source]
        source: SessionError,
    },
}

/// Runs validated plans against a [`BrowserSession`].
pub struct PlanExecutor<S: BrowserSession> {
    session: S,
}

impl<S: BrowserSession> PlanExecutor<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Access the underlying session (primarily for testing).
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Execute up to `step_budget` actions from the plan, in order.
    ///
    /// The run ends when the budget is exhausted, the plan is exhausted, or
    /// the engine marks a step terminal, whichever comes first.
    pub async fn execute(
        &self,
        plan: &ActionPlan,
        step_budget: u32,
    ) -> Result<ExecutionTrace, ExecutionError> {
        self.session
            .ensure_ready()
            .await
            .map_err(|source| ExecutionError::EngineUnavailable { source })?;

        let mut trace = ExecutionTrace::new();
        for action in plan.iter().take(step_budget as usize) {
            let outcome = match self.session.perform(action).await {
                Ok(outcome) => outcome,
                // Session faults mid-run are recorded like any other step
                // failure; the engine owns its retry policy, we own the trace.
                Err(err) => StepOutcome::failed(err.to_string()),
            };

            let terminal = outcome.terminal;
            trace.push(StepResult {
                action: action.clone(),
                succeeded: outcome.success,
                extracted_text: outcome.extracted_text,
                error: outcome.error,
                is_terminal: terminal,
            });

            if terminal {
                break;
            }
        }

        Ok(trace)
    }
}
