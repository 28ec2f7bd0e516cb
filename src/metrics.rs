//! Token and step accounting for operator runs.

use serde::{Deserialize, Serialize};

/// Aggregated usage across the pipeline stages of one or more runs.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorMetrics {
    pub translate_prompt_tokens: u64,
    pub translate_completion_tokens: u64,
    pub translate_inference_time_ms: u64,

    pub actions_attempted: u64,
    pub actions_succeeded: u64,
}

impl OperatorMetrics {
    /// Record one translation call's token usage and latency.
    pub fn record_translation(
        &mut self,
        prompt_tokens: u64,
        completion_tokens: u64,
        inference_time_ms: u64,
    ) {
        self.translate_prompt_tokens += prompt_tokens;
        self.translate_completion_tokens += completion_tokens;
        self.translate_inference_time_ms += inference_time_ms;
    }

    /// Record one executed action.
    pub fn record_step(&mut self, succeeded: bool) {
        self.actions_attempted += 1;
        if succeeded {
            self.actions_succeeded += 1;
        }
    }

    /// Merge the values from another metrics instance into this one.
    pub fn merge(&mut self, other: &OperatorMetrics) {
        self.translate_prompt_tokens += other.translate_prompt_tokens;
        self.translate_completion_tokens += other.translate_completion_tokens;
        self.translate_inference_time_ms += other.translate_inference_time_ms;
        self.actions_attempted += other.actions_attempted;
        self.actions_succeeded += other.actions_succeeded;
    }
}
