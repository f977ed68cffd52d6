use ai_client::traits::EmbedAgent;
use ai_client::OpenAi;
use anyhow::Result;

// --- TextEmbedder trait ---

/// Sentence-embedding seam. One production implementation; tests stub it
/// with fixed vectors.
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Sentence embeddings via the OpenAI-compatible embeddings endpoint.
/// Constructed once at startup and shared; the handle is cheap, the model
/// behind it is not.
pub struct Embedder {
    client: OpenAi,
}

impl Embedder {
    pub fn new(api_key: &str, embedding_model: &str) -> Self {
        let client = OpenAi::new(api_key, embedding_model).with_embedding_model(embedding_model);
        Self { client }
    }
}

#[async_trait::async_trait]
impl TextEmbedder for Embedder {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.client.embed_batch(texts).await
    }
}
