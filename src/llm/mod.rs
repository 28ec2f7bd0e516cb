//! Language model client abstractions for the operator pipeline.
//!
//! This module houses the provider-agnostic backend interface along with a
//! chat-completions implementation that covers the direct, routed, and local
//! provider kinds over a timeout-bounded HTTP transport.

pub mod chat;
pub mod error;
pub mod http;
pub mod prompts;
pub mod provider;

pub use chat::{ChatCompletionBackend, MetricsCallback};
pub use error::TranslationError;
pub use http::{HttpTransport, JsonResponse, ReqwestTransport};
pub use provider::CompletionBackend;
