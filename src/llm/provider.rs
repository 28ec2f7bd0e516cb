use async_trait::async_trait;

use super::error::TranslationError;

/// Abstraction over language-model backends so the pipeline can be tested
/// without performing real HTTP requests.
///
/// Every backend exposes the same contract: send system instructions plus a
/// task description, get the raw model text back. Backends differ only in
/// endpoint, credentials, model id, and request metadata.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn generate(
        &self,
        system_instructions: &str,
        task_text: &str,
    ) -> Result<String, TranslationError>;
}
