//! The embedding capability consumed by the analysis pipeline.
//!
//! Models are expensive to acquire (weights on disk, possibly a first-run
//! download), so the session owns a [`LazyEmbedder`]: the provider is built
//! on first use and concurrent first calls coalesce into a single
//! acquisition instead of racing into duplicate loads.

use crate::core::embedding::Embedding;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding backend unavailable: {message}")]
    Backend { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts images and text prompts into fixed-length vectors.
///
/// Vectors are expected L2-normalized. Implementations are opaque to the
/// rest of the crate; per-photo failures are recovered by the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_image(&self, path: &Path) -> Result<Embedding, EmbedError>;

    async fn embed_texts(&self, prompts: &[&str]) -> Result<Vec<Embedding>, EmbedError>;
}

type ProviderFactory =
    Box<dyn Fn() -> Result<Arc<dyn EmbeddingProvider>, EmbedError> + Send + Sync>;

/// Lazily-acquired, shared embedding provider.
///
/// The factory runs at most once per session; `get` callers that arrive
/// while acquisition is in flight await the same initialization instead of
/// triggering another. A failed acquisition is returned to the caller and
/// retried on the next `get`.
pub struct LazyEmbedder {
    factory: ProviderFactory,
    cell: OnceCell<Arc<dyn EmbeddingProvider>>,
}

impl LazyEmbedder {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EmbeddingProvider>, EmbedError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            cell: OnceCell::new(),
        }
    }

    /// Wraps an already-built provider; the factory never runs.
    pub fn preloaded(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            factory: Box::new(|| {
                Err(EmbedError::Backend {
                    message: "preloaded embedder has no factory".to_string(),
                })
            }),
            cell: OnceCell::new_with(Some(provider)),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn EmbeddingProvider>, EmbedError> {
        let provider = self
            .cell
            .get_or_try_init(|| async { (self.factory)() })
            .await?;
        Ok(Arc::clone(provider))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic provider for tests: image embeddings are looked up by
    /// file name, text prompts all map to `text_embedding`.
    pub(crate) struct StaticProvider {
        pub by_file_name: HashMap<String, Embedding>,
        pub text_embedding: Embedding,
    }

    impl StaticProvider {
        pub(crate) fn new(
            images: &[(&str, Embedding)],
            text_embedding: Embedding,
        ) -> Arc<dyn EmbeddingProvider> {
            Arc::new(Self {
                by_file_name: images
                    .iter()
                    .map(|(name, emb)| (name.to_string(), emb.clone()))
                    .collect(),
                text_embedding,
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for StaticProvider {
        async fn embed_image(&self, path: &Path) -> Result<Embedding, EmbedError> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.by_file_name
                .get(&name)
                .cloned()
                .ok_or(EmbedError::Backend {
                    message: format!("no embedding for {}", name),
                })
        }

        async fn embed_texts(&self, prompts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
            Ok(prompts.iter().map(|_| self.text_embedding.clone()).collect())
        }
    }
}
