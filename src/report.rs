//! Outcome formatting and optional file persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::types::{ExecutionOutcome, Task};

/// Render an outcome as the human-readable summary shown to the operator.
pub fn format_outcome(task: &Task, outcome: &ExecutionOutcome) -> String {
    let mut summary = format!("Task:\n{}\n", task.text());

    summary.push_str("\nSteps Taken:\n");
    if outcome.steps_taken.is_empty() {
        summary.push_str("(none)\n");
    } else {
        for step in &outcome.steps_taken {
            summary.push_str(step);
            summary.push('\n');
        }
    }

    summary.push_str("\nExecution Result:\n");
    match &outcome.final_answer {
        Some(answer) => {
            summary.push_str(answer);
            summary.push('\n');
        }
        None => {
            summary.push_str("(no final answer; run ended before a terminal step)\n");
        }
    }

    summary
}

/// File name used when persistence is requested without an explicit name.
pub fn default_summary_filename(now: DateTime<Local>) -> String {
    format!("summary_{}.txt", now.format("%Y%m%d_%H%M%S"))
}

/// Write a summary as UTF-8 text, resolving a missing name to the
/// timestamped default in the current directory.
pub fn persist_summary(path: Option<&Path>, contents: &str) -> io::Result<PathBuf> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(default_summary_filename(Local::now())),
    };
    fs::write(&target, contents)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn outcome(final_answer: Option<&str>) -> ExecutionOutcome {
        ExecutionOutcome {
            final_answer: final_answer.map(str::to_string),
            steps_taken: vec![
                "navigate https://shop.example [ok]".to_string(),
                "click #sort-price-asc [ok]".to_string(),
            ],
            raw_trace: String::new(),
        }
    }

    #[test]
    fn formats_steps_and_answer() {
        let task = Task::new("search laptops", 5).expect("task");
        let summary = format_outcome(&task, &outcome(Some("Cheapest: $299")));

        assert!(summary.contains("Task:\nsearch laptops"));
        assert!(summary.contains("navigate https://shop.example [ok]"));
        assert!(summary.contains("Execution Result:\nCheapest: $299"));
    }

    #[test]
    fn missing_answer_is_reported_not_omitted() {
        let task = Task::new("search laptops", 5).expect("task");
        let summary = format_outcome(&task, &outcome(None));
        assert!(summary.contains("no final answer"));
    }

    #[test]
    fn default_filename_uses_timestamp_pattern() {
        let moment = Local.with_ymd_and_hms(2026, 8, 7, 14, 30, 5).unwrap();
        assert_eq!(
            default_summary_filename(moment),
            "summary_20260807_143005.txt"
        );
    }

    #[test]
    fn persist_writes_utf8_to_explicit_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.txt");

        let written =
            persist_summary(Some(&path), "résumé of the run").expect("persist succeeds");
        assert_eq!(written, path);
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "résumé of the run"
        );
    }
}
