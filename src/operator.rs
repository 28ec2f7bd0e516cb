//! High-level operator facade.
//!
//! Wires the pipeline stages (translate, validate, execute, extract) for
//! one task invocation. Data flows strictly forward; the first stage failure
//! stops the run and is surfaced as a single tagged [`OperatorError`], never
//! a stage-internal error type. Runs are serialized behind a session lock
//! because the browser session is one exclusively-owned resource.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_openai::types::CompletionUsage;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::OperatorConfig;
use crate::engine::ChromiumSession;
use crate::executor::{ExecutionError, PlanExecutor};
use crate::extractor::extract_outcome;
use crate::llm::{ChatCompletionBackend, CompletionBackend, ReqwestTransport, TranslationError};
use crate::logging::{LogCallback, OperatorLogger};
use crate::metrics::OperatorMetrics;
use crate::session::BrowserSession;
use crate::translator::TaskTranslator;
use crate::types::{ExecutionOutcome, Task};
use crate::validator::{ValidationError, validate_plan};

/// Failure of one pipeline invocation, tagged by stage.
///
/// This is the only error type that crosses the pipeline boundary; its
/// display form is the user-visible message and keeps the original
/// diagnostic detail (including raw model output for validation failures).
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),
    #[error("plan validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

/// One configured operator: a translator and an executor sharing a metrics
/// sink, processing one task at a time.
pub struct Operator<P: CompletionBackend, S: BrowserSession> {
    translator: TaskTranslator<P>,
    executor: PlanExecutor<S>,
    session_lock: Mutex<()>,
    metrics: Arc<StdMutex<OperatorMetrics>>,
    logger: OperatorLogger,
}

impl Operator<ChatCompletionBackend<ReqwestTransport>, Arc<ChromiumSession>> {
    /// Construct an operator from process configuration, backed by the
    /// configured provider and a local Chromium session.
    pub fn from_config(config: &OperatorConfig) -> Result<Self, TranslationError> {
        let metrics = Arc::new(StdMutex::new(OperatorMetrics::default()));
        let metrics_sink = Arc::clone(&metrics);
        let callback = Arc::new(move |usage: &CompletionUsage, elapsed: Duration| {
            if let Ok(mut metrics) = metrics_sink.lock() {
                metrics.record_translation(
                    u64::from(usage.prompt_tokens),
                    u64::from(usage.completion_tokens),
                    elapsed.as_millis() as u64,
                );
            }
        });

        let backend = ChatCompletionBackend::from_config(config, Some(callback))?;
        let translator = TaskTranslator::new(backend, config.site_hints.as_deref());
        let executor = PlanExecutor::new(Arc::new(ChromiumSession::from_config(config)));

        let mut logger = OperatorLogger::new(config.verbose);
        if let Some(sink) = config.logger.clone() {
            let callback: LogCallback = Arc::new(move |record| {
                sink(&format!("[{}] {}", record.level.label(), record.message));
            });
            logger.set_external_logger(Some(callback));
        }

        Ok(Self {
            translator,
            executor,
            session_lock: Mutex::new(()),
            metrics,
            logger,
        })
    }
}

impl<P: CompletionBackend, S: BrowserSession> Operator<P, S> {
    /// Assemble an operator from already-built stages.
    pub fn new(translator: TaskTranslator<P>, executor: PlanExecutor<S>) -> Self {
        Self {
            translator,
            executor,
            session_lock: Mutex::new(()),
            metrics: Arc::new(StdMutex::new(OperatorMetrics::default())),
            logger: OperatorLogger::new(crate::config::Verbosity::Minimal),
        }
    }

    /// Replace the structured logger.
    pub fn with_logger(mut self, logger: OperatorLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn translator(&self) -> &TaskTranslator<P> {
        &self.translator
    }

    pub fn executor(&self) -> &PlanExecutor<S> {
        &self.executor
    }

    /// Snapshot of the accumulated metrics.
    pub fn metrics(&self) -> OperatorMetrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// Run one task through the full pipeline.
    ///
    /// Invocations are serialized: a second call waits until the in-flight
    /// run has released the browser session.
    pub async fn run(&self, task: &Task) -> Result<ExecutionOutcome, OperatorError> {
        let _session = self.session_lock.lock().await;

        self.logger
            .debug(format!("translating task: {}", task.text()), Some("translator"), None);
        let raw = match self.translator.translate(task).await {
            Ok(raw) => raw,
            Err(err) => {
                self.logger
                    .error(format!("translation failed: {err}"), Some("translator"), None);
                return Err(err.into());
            }
        };

        let plan = match validate_plan(&raw) {
            Ok(plan) => plan,
            Err(err) => {
                self.logger
                    .error(format!("plan rejected: {err}"), Some("validator"), None);
                return Err(err.into());
            }
        };
        self.logger.info(
            format!("plan accepted with {} actions", plan.len()),
            Some("validator"),
            None,
        );

        let trace = self.executor.execute(&plan, task.step_budget()).await?;
        self.logger.info(
            format!(
                "executed {} of {} actions (budget {})",
                trace.len(),
                plan.len(),
                task.step_budget()
            ),
            Some("executor"),
            None,
        );

        if let Ok(mut metrics) = self.metrics.lock() {
            for step in trace.iter() {
                metrics.record_step(step.succeeded);
            }
        }

        Ok(extract_outcome(&trace))
    }

    /// Release the browser session's resources.
    pub async fn close(&self) -> Result<(), crate::session::SessionError> {
        self.executor.session().close().await
    }
}
