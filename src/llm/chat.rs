//! Provider-neutral chat-completion backend.
//!
//! All three provider kinds (direct vendor, cost-routed aggregator, local
//! inference server) speak the same chat-completions wire format, so one
//! backend covers them: construction differs only in endpoint, credential,
//! model id, and the routing metadata attached for the aggregator. Requests
//! are built with `async-openai`'s typed builders and posted through the
//! [`HttpTransport`] so the configured timeout always applies.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, CompletionUsage, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use crate::config::{LoggerCallback, OperatorConfig};

use super::error::TranslationError;
use super::http::{HttpTransport, JsonResponse, ReqwestTransport};
use super::provider::CompletionBackend;

/// Callback invoked after a successful completion to capture usage metrics.
pub type MetricsCallback = Arc<dyn Fn(&CompletionUsage, Duration) + Send + Sync + 'static>;

/// Chat-completions backend over an OpenAI-compatible endpoint.
pub struct ChatCompletionBackend<T: HttpTransport> {
    transport: T,
    endpoint: String,
    credential: Option<String>,
    model_id: String,
    routing_metadata: Option<Value>,
    logger: Option<LoggerCallback>,
    metrics_callback: Option<MetricsCallback>,
}

impl<T: HttpTransport> fmt::Debug for ChatCompletionBackend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionBackend")
            .field("endpoint", &self.endpoint)
            .field("credential_present", &self.credential.is_some())
            .field("model_id", &self.model_id)
            .field("routing_metadata", &self.routing_metadata.is_some())
            .field("metrics_callback", &self.metrics_callback.is_some())
            .finish()
    }
}

impl ChatCompletionBackend<ReqwestTransport> {
    /// Wire a backend from process configuration.
    ///
    /// Direct and routed providers must carry a credential; the local
    /// provider may omit one but still honours the request timeout.
    pub fn from_config(
        config: &OperatorConfig,
        metrics_callback: Option<MetricsCallback>,
    ) -> Result<Self, TranslationError> {
        if config.requires_credential() && config.credential.is_none() {
            return Err(TranslationError::MissingCredential);
        }

        let transport = ReqwestTransport::new(config.request_timeout)?;
        let mut backend = ChatCompletionBackend::new(
            transport,
            &config.base_endpoint,
            config.credential.clone(),
            &config.model_id,
        );
        backend.routing_metadata = config
            .routing
            .as_ref()
            .map(|routing| routing.to_request_metadata());
        backend.logger = config.logger.clone();
        backend.metrics_callback = metrics_callback;
        Ok(backend)
    }
}

impl<T: HttpTransport> ChatCompletionBackend<T> {
    /// Create a backend against `base_endpoint` with the supplied transport.
    pub fn new(
        transport: T,
        base_endpoint: &str,
        credential: Option<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint: chat_completions_url(base_endpoint),
            credential,
            model_id: model_id.into(),
            routing_metadata: None,
            logger: None,
            metrics_callback: None,
        }
    }

    /// Attach aggregator routing metadata sent verbatim with each request.
    pub fn with_routing_metadata(mut self, metadata: Option<Value>) -> Self {
        self.routing_metadata = metadata;
        self
    }

    /// Attach a logger callback.
    pub fn with_logger(mut self, logger: Option<LoggerCallback>) -> Self {
        self.logger = logger;
        self
    }

    /// Attach a metrics callback invoked after successful completions.
    pub fn with_metrics_callback(mut self, callback: Option<MetricsCallback>) -> Self {
        self.metrics_callback = callback;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn build_body(
        &self,
        system_instructions: &str,
        task_text: &str,
    ) -> Result<Value, TranslationError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(ChatCompletionRequestSystemMessageContent::Text(
                        system_instructions.to_string(),
                    ))
                    .build()
                    .map_err(|err| TranslationError::InvalidRequest(err.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Text(
                        task_text.to_string(),
                    ))
                    .build()
                    .map_err(|err| TranslationError::InvalidRequest(err.to_string()))?,
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model_id.clone())
            .messages(messages)
            .build()
            .map_err(|err| TranslationError::InvalidRequest(err.to_string()))?;

        let mut body = serde_json::to_value(&request)
            .map_err(|err| TranslationError::InvalidRequest(err.to_string()))?;

        if let (Some(metadata), Some(map)) = (&self.routing_metadata, body.as_object_mut()) {
            map.insert("provider".to_string(), metadata.clone());
        }

        Ok(body)
    }

    fn build_headers(&self) -> Result<HeaderMap, TranslationError> {
        let mut headers = HeaderMap::new();
        if let Some(credential) = &self.credential {
            let mut value = HeaderValue::from_str(&format!("Bearer {credential}"))
                .map_err(|_| TranslationError::InvalidRequest("credential is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn decode(&self, response: JsonResponse) -> Result<(String, Option<CompletionUsage>), TranslationError> {
        if !response.is_success() {
            let detail = error_detail(&response.body);
            return Err(match response.status {
                401 | 403 => TranslationError::Auth {
                    status: response.status,
                    detail,
                },
                status => TranslationError::Api { status, detail },
            });
        }

        let parsed: CreateChatCompletionResponse = serde_json::from_value(response.body)
            .map_err(|err| TranslationError::MalformedResponse(err.to_string()))?;

        let text = parsed
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or(TranslationError::EmptyCompletion)?;

        Ok((text, parsed.usage))
    }

    fn log_debug(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger(&format!("[llm][debug] {message}"));
        }
    }

    fn log_error(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger(&format!("[llm][error] {message}"));
        }
    }
}

#[async_trait]
impl<T: HttpTransport> CompletionBackend for ChatCompletionBackend<T> {
    async fn generate(
        &self,
        system_instructions: &str,
        task_text: &str,
    ) -> Result<String, TranslationError> {
        let body = self.build_body(system_instructions, task_text)?;
        let headers = self.build_headers()?;

        self.log_debug(&format!(
            "sending chat completion to model={} endpoint={}",
            self.model_id, self.endpoint
        ));

        let start = Instant::now();
        match self.transport.post_json(&self.endpoint, headers, &body).await {
            Ok(response) => {
                let elapsed = start.elapsed();
                let (text, usage) = self.decode(response)?;
                if let (Some(callback), Some(usage)) = (&self.metrics_callback, usage.as_ref()) {
                    callback(usage, elapsed);
                }
                self.log_debug(&format!(
                    "chat completion succeeded: model={} duration={}ms",
                    self.model_id,
                    elapsed.as_millis()
                ));
                Ok(text)
            }
            Err(err) => {
                self.log_error(&format!(
                    "chat completion failed for model={}: {err}",
                    self.model_id
                ));
                Err(err)
            }
        }
    }
}

fn chat_completions_url(base_endpoint: &str) -> String {
    format!("{}/chat/completions", base_endpoint.trim_end_matches('/'))
}

fn error_detail(body: &Value) -> String {
    body.get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(|message| message.to_string())
        .unwrap_or_else(|| body.to_string())
}
