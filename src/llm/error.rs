use thiserror::Error;

/// Errors surfaced while asking a provider to translate a task.
///
/// All transport, authentication, and timeout failures end up here; the
/// client makes a single attempt per invocation and never retries on its own.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("missing provider credential; set OPERATOR_API_KEY or the vendor key")]
    MissingCredential,
    #[error("provider request timed out")]
    Timeout,
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("provider rejected credentials (status {status}): {detail}")]
    Auth { status: u16, detail: String },
    #[error("provider returned an error (status {status}): {detail}")]
    Api { status: u16, detail: String },
    #[error("provider response could not be decoded: {0}")]
    MalformedResponse(String),
    #[error("provider returned no completion text")]
    EmptyCompletion,
    #[error("invalid chat completion request: {0}")]
    InvalidRequest(String),
}
