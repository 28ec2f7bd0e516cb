//! Result extraction from execution traces.
//!
//! Engines may emit several nested "result" records per step, including
//! retried sub-actions; the authoritative answer is the *last* terminal one
//! in trace order, so the scan runs newest-to-oldest. Traces without any
//! terminal marker fall back to a block-splitting heuristic over the raw
//! text, and when even that fails the caller still receives an outcome with
//! the original trace passed through; extraction never fails the pipeline.

use thiserror::Error;

use crate::types::{ExecutionOutcome, ExecutionTrace};

/// Internal failure of the heuristic fallback; degrades to raw passthrough.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("trace contains no terminal record and no candidate result block")]
    NoCandidateBlocks,
}

/// Extract an outcome from a structured trace.
pub fn extract_outcome(trace: &ExecutionTrace) -> ExecutionOutcome {
    let steps_taken: Vec<String> = trace.iter().map(|step| step.to_string()).collect();
    let raw_trace = trace.to_string();

    // Newest-to-oldest: the last terminal record wins, regardless of any
    // non-terminal records recorded after it.
    let final_answer = trace
        .iter()
        .rev()
        .find(|step| step.is_terminal)
        .and_then(|step| step.extracted_text.clone());

    ExecutionOutcome {
        final_answer,
        steps_taken,
        raw_trace,
    }
}

/// Degraded path: extract an outcome from an unstructured trace string
/// produced by an engine without structured step results.
pub fn extract_from_raw(raw_trace: &str) -> ExecutionOutcome {
    match split_raw_trace(raw_trace) {
        Ok((steps_taken, final_answer)) => ExecutionOutcome {
            final_answer: Some(final_answer),
            steps_taken,
            raw_trace: raw_trace.to_string(),
        },
        Err(ExtractionError::NoCandidateBlocks) => ExecutionOutcome {
            final_answer: None,
            steps_taken: Vec::new(),
            raw_trace: raw_trace.to_string(),
        },
    }
}

/// Split blank-line-separated blocks into step blocks and a result block.
///
/// Blocks whose first line starts with an enumerated-list marker are steps;
/// the last non-step block is the candidate final answer.
fn split_raw_trace(raw_trace: &str) -> Result<(Vec<String>, String), ExtractionError> {
    let blocks: Vec<&str> = raw_trace
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .collect();

    let mut steps = Vec::new();
    let mut result_block = None;

    for block in &blocks {
        if block_is_step_list(block) {
            steps.extend(block.lines().map(|line| line.trim().to_string()));
        } else {
            result_block = Some(block.to_string());
        }
    }

    match result_block {
        Some(result) => Ok((steps, result)),
        None => Err(ExtractionError::NoCandidateBlocks),
    }
}

fn block_is_step_list(block: &str) -> bool {
    let first_line = match block.lines().next() {
        Some(line) => line.trim_start(),
        None => return false,
    };

    if first_line.starts_with("- ") || first_line.starts_with("* ") {
        return true;
    }

    // "1. ..." / "2) ..." style enumerations.
    let digits: String = first_line.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return false;
    }
    matches!(
        first_line[digits.len()..].chars().next(),
        Some('.') | Some(')')
    )
}
