//! Chromiumoxide-backed browser session.
//!
//! Implements [`BrowserSession`](crate::session::BrowserSession) over the
//! `chromiumoxide` crate: the session either launches a local Chrome or
//! attaches to a running one over CDP, then drives a single page for the
//! lifetime of the run. Selector resolution, navigation, and DOM interaction
//! all belong to the browser; this adapter only maps the five grammar
//! actions onto CDP calls and reports per-action outcomes.
//!
//! CDP emits no "task done" signal, so steps from this engine are never
//! terminal; result extraction falls back to its heuristic path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    page::Page as ChromiumPage,
};
use futures_util::StreamExt;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::config::OperatorConfig;
use crate::session::{BrowserSession, SessionError, StepOutcome};
use crate::types::Action;

/// How the session obtains a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub args: Vec<String>,
    /// Attach to this CDP URL instead of launching when set.
    pub cdp_url: Option<String>,
}

impl LaunchSpec {
    pub fn from_config(config: &OperatorConfig) -> Self {
        LaunchSpec {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone().map(PathBuf::from),
            args: vec!["--disable-blink-features=AutomationControlled".to_string()],
            cdp_url: config.cdp_url.clone(),
        }
    }
}

impl Default for LaunchSpec {
    fn default() -> Self {
        LaunchSpec {
            headless: true,
            chrome_executable: None,
            args: vec!["--disable-blink-features=AutomationControlled".to_string()],
            cdp_url: None,
        }
    }
}

struct EngineState {
    browser: Browser,
    _handler: JoinHandle<()>,
    page: Option<ChromiumPage>,
}

/// One exclusively-owned Chromium session driving a single page.
pub struct ChromiumSession {
    spec: LaunchSpec,
    state: Mutex<Option<EngineState>>,
}

impl ChromiumSession {
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            spec,
            state: Mutex::new(None),
        }
    }

    pub fn from_config(config: &OperatorConfig) -> Self {
        Self::new(LaunchSpec::from_config(config))
    }

    fn build_config(&self) -> Result<BrowserConfig, SessionError> {
        let mut builder = BrowserConfig::builder();

        if let Some(path) = &self.spec.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let builder = builder.args(self.spec.args.clone());
        let builder = if self.spec.headless {
            builder
        } else {
            builder.with_head()
        };

        builder.build().map_err(SessionError::Message)
    }

    async fn perform_on_state(
        &self,
        state: &mut EngineState,
        action: &Action,
    ) -> StepOutcome {
        match action {
            Action::Navigate { url } => match &state.page {
                Some(page) => match page.goto(url.as_str()).await {
                    Ok(_) => navigated_outcome(page).await,
                    Err(err) => StepOutcome::failed(err.to_string()),
                },
                None => match state.browser.new_page(url.as_str()).await {
                    Ok(page) => {
                        let outcome = navigated_outcome(&page).await;
                        state.page = Some(page);
                        outcome
                    }
                    Err(err) => StepOutcome::failed(err.to_string()),
                },
            },
            Action::Click { selector } => {
                let Some(page) = &state.page else {
                    return StepOutcome::failed("no active page; navigate first");
                };
                match page.find_element(selector.as_str()).await {
                    Ok(element) => match element.click().await {
                        Ok(_) => StepOutcome::ok(),
                        Err(err) => StepOutcome::failed(err.to_string()),
                    },
                    Err(err) => StepOutcome::failed(format!(
                        "element not found for selector '{selector}': {err}"
                    )),
                }
            }
            Action::Input { selector, text } => {
                let Some(page) = &state.page else {
                    return StepOutcome::failed("no active page; navigate first");
                };
                match page.find_element(selector.as_str()).await {
                    Ok(element) => {
                        let typed = async {
                            element.click().await?;
                            element.type_str(text.as_str()).await
                        }
                        .await;
                        match typed {
                            Ok(_) => StepOutcome::ok(),
                            Err(err) => StepOutcome::failed(err.to_string()),
                        }
                    }
                    Err(err) => StepOutcome::failed(format!(
                        "element not found for selector '{selector}': {err}"
                    )),
                }
            }
            Action::Wait { seconds } => {
                tokio::time::sleep(Duration::from_secs_f64(*seconds)).await;
                StepOutcome::ok()
            }
            Action::Scroll { pixels } => {
                let Some(page) = &state.page else {
                    return StepOutcome::failed("no active page; navigate first");
                };
                match page
                    .evaluate(format!("window.scrollBy(0, {pixels})"))
                    .await
                {
                    Ok(_) => StepOutcome::ok(),
                    Err(err) => StepOutcome::failed(err.to_string()),
                }
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn ensure_ready(&self) -> Result<(), SessionError> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let (browser, handler) = match &self.spec.cdp_url {
            Some(url) => Browser::connect(url.as_str())
                .await
                .map_err(map_cdp_error)?,
            None => {
                let config = self.build_config()?;
                Browser::launch(config).await.map_err(map_cdp_error)?
            }
        };

        let join = spawn_handler(handler);
        *guard = Some(EngineState {
            browser,
            _handler: join,
            page: None,
        });
        Ok(())
    }

    async fn perform(&self, action: &Action) -> Result<StepOutcome, SessionError> {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(SessionError::NotLaunched)?;
        Ok(self.perform_on_state(state, action).await)
    }

    async fn close(&self) -> Result<(), SessionError> {
        let state = {
            let mut guard = self.state.lock().await;
            guard.take()
        };

        if let Some(state) = state {
            state._handler.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for Arc<ChromiumSession> {
    async fn ensure_ready(&self) -> Result<(), SessionError> {
        (**self).ensure_ready().await
    }

    async fn perform(&self, action: &Action) -> Result<StepOutcome, SessionError> {
        (**self).perform(action).await
    }

    async fn close(&self) -> Result<(), SessionError> {
        (**self).close().await
    }
}

async fn navigated_outcome(page: &ChromiumPage) -> StepOutcome {
    match page.get_title().await {
        Ok(Some(title)) if !title.is_empty() => StepOutcome::ok_with_text(title),
        _ => StepOutcome::ok(),
    }
}

fn map_cdp_error<E: std::fmt::Display>(err: E) -> SessionError {
    SessionError::Message(err.to_string())
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                log::debug!("chromiumoxide handler error: {err}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorConfig;

    #[test]
    fn launch_spec_follows_config() {
        let mut config = OperatorConfig::default();
        config.headless = false;
        config.chrome_executable = Some("/usr/bin/chromium".to_string());
        config.cdp_url = Some("ws://127.0.0.1:9222".to_string());

        let spec = LaunchSpec::from_config(&config);
        assert!(!spec.headless);
        assert_eq!(
            spec.chrome_executable.as_deref(),
            Some(std::path::Path::new("/usr/bin/chromium"))
        );
        assert_eq!(spec.cdp_url.as_deref(), Some("ws://127.0.0.1:9222"));
    }

    #[tokio::test]
    async fn perform_before_launch_reports_not_launched() {
        let session = ChromiumSession::new(LaunchSpec::default());
        let err = session
            .perform(&Action::Wait { seconds: 0.0 })
            .await
            .expect_err("not launched");
        assert!(matches!(err, SessionError::NotLaunched));
    }

    #[tokio::test]
    async fn close_without_launch_is_a_noop() {
        let session = ChromiumSession::new(LaunchSpec::default());
        session.close().await.expect("noop close");
    }
}
