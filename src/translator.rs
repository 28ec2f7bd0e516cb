//! Task translation: free text in, raw model output out.
//!
//! The translator owns the planner prompt and a [`CompletionBackend`]; it
//! performs exactly one provider call per task and hands back the unparsed
//! text. Parsing and validation live downstream in the plan validator.

use crate::llm::prompts::{build_planner_system_prompt, build_planner_user_message};
use crate::llm::{CompletionBackend, TranslationError};
use crate::types::Task;

/// Sends a task plus the grammar-declaring system prompt to a provider.
pub struct TaskTranslator<P: CompletionBackend> {
    backend: P,
    system_prompt: String,
}

impl<P: CompletionBackend> TaskTranslator<P> {
    /// Create a translator; `site_hints` are optional per-site selector hints
    /// folded into the system prompt (configuration, not code).
    pub fn new(backend: P, site_hints: Option<&str>) -> Self {
        Self {
            backend,
            system_prompt: build_planner_system_prompt(site_hints),
        }
    }

    /// Access the backend (primarily for testing).
    pub fn backend(&self) -> &P {
        &self.backend
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Translate a task into raw model output. Single attempt, no retry.
    pub async fn translate(&self, task: &Task) -> Result<String, TranslationError> {
        self.backend
            .generate(&self.system_prompt, &build_planner_user_message(task.text()))
            .await
    }
}
