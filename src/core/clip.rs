//! Default embedding backend: CLIP ViT-B/32 via `fastembed` (local ONNX).
//!
//! The image and text encoders share CLIP's vector space, which is what
//! lets photo embeddings be scored against text-prompt embeddings.

use crate::core::embedding::{l2_normalize, Embedding};
use crate::core::provider::{EmbedError, EmbeddingProvider};
use async_trait::async_trait;
use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};
use std::path::Path;
use std::sync::Mutex;

pub struct ClipEmbedder {
    image_model: Mutex<ImageEmbedding>,
    text_model: Mutex<TextEmbedding>,
}

impl ClipEmbedder {
    /// Loads both CLIP encoders. First use on a machine downloads the
    /// model files; wrap construction in a [`super::provider::LazyEmbedder`]
    /// so that cost is paid once and only when embeddings are needed.
    pub fn new() -> Result<Self, EmbedError> {
        let image_model = ImageEmbedding::try_new(
            ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32).with_show_download_progress(false),
        )
        .map_err(backend_error)?;
        let text_model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::ClipVitB32).with_show_download_progress(false),
        )
        .map_err(backend_error)?;

        Ok(Self {
            image_model: Mutex::new(image_model),
            text_model: Mutex::new(text_model),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for ClipEmbedder {
    async fn embed_image(&self, path: &Path) -> Result<Embedding, EmbedError> {
        let rendered = path.to_string_lossy().to_string();
        let mut model = self.image_model.lock().map_err(|_| EmbedError::Backend {
            message: "image encoder lock poisoned".to_string(),
        })?;
        let mut batch = model
            .embed(vec![rendered], None)
            .map_err(backend_error)?;
        let embedding = batch.pop().ok_or(EmbedError::Backend {
            message: format!("empty embedding batch for {}", path.display()),
        })?;
        Ok(l2_normalize(&embedding))
    }

    async fn embed_texts(&self, prompts: &[&str]) -> Result<Vec<Embedding>, EmbedError> {
        let mut model = self.text_model.lock().map_err(|_| EmbedError::Backend {
            message: "text encoder lock poisoned".to_string(),
        })?;
        let batch = model
            .embed(prompts.to_vec(), None)
            .map_err(backend_error)?;
        Ok(batch.iter().map(|e| l2_normalize(e)).collect())
    }
}

fn backend_error<E: std::fmt::Display>(e: E) -> EmbedError {
    EmbedError::Backend {
        message: e.to_string(),
    }
}
