//! End-to-end pipeline tests over mocked provider and browser session.
//!
//! These exercise the full translate → validate → execute → extract chain
//! the way the CLI drives it, without network or a real browser.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use operator_rs::executor::PlanExecutor;
use operator_rs::llm::{CompletionBackend, TranslationError};
use operator_rs::operator::{Operator, OperatorError};
use operator_rs::session::{BrowserSession, SessionError, StepOutcome};
use operator_rs::translator::TaskTranslator;
use operator_rs::types::{Action, Task};
use operator_rs::validator::ValidationError;

struct ScriptedBackend {
    response: Mutex<Option<Result<String, TranslationError>>>,
}

impl ScriptedBackend {
    fn returning(raw: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(Ok(raw.to_string()))),
        })
    }

    fn failing(error: TranslationError) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Some(Err(error))),
        })
    }
}

/// Local newtype over a shared backend handle. The trait and `Arc` are both
/// foreign to this (integration test) crate, so the trait can't be implemented
/// for `Arc<ScriptedBackend>` directly — `Arc` isn't a fundamental type. A
/// local wrapper satisfies the orphan rule while staying `Send + Sync +
/// 'static` for `tokio::spawn`.
struct SharedBackend(Arc<ScriptedBackend>);

#[async_trait]
impl CompletionBackend for SharedBackend {
    async fn generate(
        &self,
        _system_instructions: &str,
        _task_text: &str,
    ) -> Result<String, TranslationError> {
        self.0
            .response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok("[]".to_string()))
    }
}

#[derive(Default)]
struct ScriptedSession {
    outcomes: Mutex<Vec<StepOutcome>>,
    performed: Mutex<Vec<Action>>,
    ready_calls: Mutex<usize>,
}

/// Local newtype over a shared session handle, for the same orphan-rule reason
/// as [`SharedBackend`].
struct SharedSession(Arc<ScriptedSession>);

#[async_trait]
impl BrowserSession for SharedSession {
    async fn ensure_ready(&self) -> Result<(), SessionError> {
        *self.0.ready_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn perform(&self, action: &Action) -> Result<StepOutcome, SessionError> {
        self.0.performed.lock().unwrap().push(action.clone());
        let mut outcomes = self.0.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            Ok(StepOutcome::ok())
        } else {
            Ok(outcomes.remove(0))
        }
    }
}

fn operator_with(
    backend: Arc<ScriptedBackend>,
    session: Arc<ScriptedSession>,
) -> Operator<SharedBackend, SharedSession> {
    Operator::new(
        TaskTranslator::new(SharedBackend(backend), None),
        PlanExecutor::new(SharedSession(session)),
    )
}

#[tokio::test]
async fn search_task_runs_whole_plan_within_budget() {
    // The provider answers with a three-step plan using the `value` key
    // convention; all three actions must run under a budget of five.
    let backend = ScriptedBackend::returning(
        r##"[
            {"action":"navigate","value":"https://shop.example/search?q=laptops"},
            {"action":"wait","value":3},
            {"action":"click","selector":"#sort-price-asc"}
        ]"##,
    );
    let session = Arc::new(ScriptedSession::default());
    let operator = operator_with(backend, Arc::clone(&session));

    let task = Task::new("search for laptops sorted by price ascending on shop.example", 5)
        .expect("task");
    let outcome = operator.run(&task).await.expect("outcome");

    let performed = session.performed.lock().unwrap();
    assert_eq!(performed.len(), 3);
    assert_eq!(
        performed[0],
        Action::Navigate {
            url: "https://shop.example/search?q=laptops".into()
        }
    );
    assert_eq!(performed[1], Action::Wait { seconds: 3.0 });
    assert_eq!(
        performed[2],
        Action::Click {
            selector: "#sort-price-asc".into()
        }
    );

    assert_eq!(outcome.steps_taken.len(), 3);
    // No engine-side terminal marker, so no final answer.
    assert!(outcome.final_answer.is_none());
}

#[tokio::test]
async fn conversational_reply_is_a_malformed_json_failure() {
    let raw = "Sure, here are the steps: ...";
    let backend = ScriptedBackend::returning(raw);
    let session = Arc::new(ScriptedSession::default());
    let operator = operator_with(backend, Arc::clone(&session));

    let task = Task::new("anything", 5).expect("task");
    let err = operator.run(&task).await.expect_err("malformed json");

    match &err {
        OperatorError::Validation(ValidationError::MalformedJson { raw_text, .. }) => {
            assert_eq!(raw_text, raw);
        }
        other => panic!("unexpected error variant: {other:?}"),
    }
    // The user-facing message must carry the exact model output.
    assert!(err.to_string().contains(raw));
    assert!(session.performed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn budget_of_two_executes_exactly_two_of_six_actions() {
    let backend = ScriptedBackend::returning(
        r#"[
            {"action":"scroll","pixels":200},
            {"action":"scroll","pixels":200},
            {"action":"scroll","pixels":200},
            {"action":"scroll","pixels":200},
            {"action":"scroll","pixels":200},
            {"action":"scroll","pixels":200}
        ]"#,
    );
    let session = Arc::new(ScriptedSession::default());
    let operator = operator_with(backend, Arc::clone(&session));

    let task = Task::new("scroll a lot", 2).expect("task");
    let outcome = operator.run(&task).await.expect("outcome");

    assert_eq!(session.performed.lock().unwrap().len(), 2);
    assert_eq!(outcome.steps_taken.len(), 2);
    assert!(outcome.final_answer.is_none());
}

#[tokio::test]
async fn terminal_step_within_budget_still_yields_answer() {
    let backend = ScriptedBackend::returning(
        r##"[
            {"action":"navigate","url":"https://example.com"},
            {"action":"click","selector":"#best-offer"},
            {"action":"scroll","pixels":400}
        ]"##,
    );
    let session = Arc::new(ScriptedSession::default());
    *session.outcomes.lock().unwrap() = vec![
        StepOutcome::ok(),
        StepOutcome::done("Best offer: Acme Book, $299"),
    ];
    let operator = operator_with(backend, Arc::clone(&session));

    let task = Task::new("find the best offer", 2).expect("task");
    let outcome = operator.run(&task).await.expect("outcome");

    // The terminal step ends the run before the third action.
    assert_eq!(session.performed.lock().unwrap().len(), 2);
    assert_eq!(
        outcome.final_answer.as_deref(),
        Some("Best offer: Acme Book, $299")
    );
}

#[tokio::test]
async fn provider_timeout_produces_no_plan_and_no_trace() {
    let backend = ScriptedBackend::failing(TranslationError::Timeout);
    let session = Arc::new(ScriptedSession::default());
    let operator = operator_with(backend, Arc::clone(&session));

    let task = Task::new("anything", 5).expect("task");
    let err = operator.run(&task).await.expect_err("timeout");

    assert!(matches!(
        err,
        OperatorError::Translation(TranslationError::Timeout)
    ));
    // The engine was never touched: no readiness check, no actions.
    assert_eq!(*session.ready_calls.lock().unwrap(), 0);
    assert!(session.performed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_actions_are_recorded_without_aborting_the_run() {
    let backend = ScriptedBackend::returning(
        r##"[
            {"action":"navigate","url":"https://example.com"},
            {"action":"click","selector":"#missing"},
            {"action":"scroll","pixels":100}
        ]"##,
    );
    let session = Arc::new(ScriptedSession::default());
    *session.outcomes.lock().unwrap() = vec![
        StepOutcome::ok(),
        StepOutcome::failed("element not found for selector '#missing'"),
        StepOutcome::ok(),
    ];
    let operator = operator_with(backend, Arc::clone(&session));

    let task = Task::new("click something missing", 5).expect("task");
    let outcome = operator.run(&task).await.expect("outcome");

    assert_eq!(session.performed.lock().unwrap().len(), 3);
    assert_eq!(outcome.steps_taken.len(), 3);
    assert!(outcome.steps_taken[1].contains("element not found"));
}

#[tokio::test]
async fn runs_are_serialized_over_one_session() {
    let backend = Arc::new(ScriptedBackend {
        response: Mutex::new(None),
    });
    let session = Arc::new(ScriptedSession::default());
    let operator = Arc::new(operator_with(backend, Arc::clone(&session)));

    // Two concurrent submissions; the session lock forces them to run one
    // after the other, so both fail validation (empty plan) without ever
    // interleaving engine access.
    let first = {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            let task = Task::new("first", 3).expect("task");
            operator.run(&task).await
        })
    };
    let second = {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            let task = Task::new("second", 3).expect("task");
            operator.run(&task).await
        })
    };

    let first = first.await.expect("join");
    let second = second.await.expect("join");
    assert!(matches!(first, Err(OperatorError::Validation(_))));
    assert!(matches!(second, Err(OperatorError::Validation(_))));
    assert!(session.performed.lock().unwrap().is_empty());
}
