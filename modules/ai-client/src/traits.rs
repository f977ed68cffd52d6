use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// ChatAgent Trait
// =============================================================================

/// A chat-completion backend. One system prompt, one user prompt, one text
/// reply. Implementations decide model and transport.
#[async_trait]
pub trait ChatAgent: Send + Sync {
    async fn chat_completion(&self, system: &str, user: &str) -> Result<String>;
}

// =============================================================================
// EmbedAgent Trait
// =============================================================================

/// An embedding backend. Batched only; callers with a single text pass a
/// one-element batch.
#[async_trait]
pub trait EmbedAgent: Send + Sync {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}
