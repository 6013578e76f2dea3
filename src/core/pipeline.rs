//! Turns raw files into fully analyzed [`Photo`]s.
//!
//! Per-file work (metadata, embedding, scoring) is independent and runs
//! concurrently; ordering among files is irrelevant here because grouping
//! and ingestion happen later, against a consistent snapshot. Every
//! failure is recovered per-photo: the worst outcome for a single file is
//! an absent embedding and a quality of 0.

use crate::core::metadata::MetadataService;
use crate::core::provider::{EmbedError, LazyEmbedder};
use crate::core::quality::{self, PromptBank, NEGATIVE_PROMPTS, POSITIVE_PROMPTS};
use crate::store::models::Photo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeProgress {
    pub files_processed: usize,
    pub total_files: usize,
    pub current_file: String,
}

pub struct AnalysisService {
    embedder: Arc<LazyEmbedder>,
    metadata: MetadataService,
    prompt_bank: OnceCell<PromptBank>,
    progress_sender: Option<mpsc::UnboundedSender<AnalyzeProgress>>,
}

impl AnalysisService {
    pub fn new(embedder: Arc<LazyEmbedder>) -> Self {
        Self {
            embedder,
            metadata: MetadataService::new(),
            prompt_bank: OnceCell::new(),
            progress_sender: None,
        }
    }

    pub fn with_progress_sender(mut self, sender: mpsc::UnboundedSender<AnalyzeProgress>) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    /// Analyzes all `paths` concurrently. Infallible by design: files that
    /// cannot be embedded or read still come back as photos (embedding
    /// absent, quality 0, capture date best-effort).
    pub async fn analyze(&self, paths: &[PathBuf]) -> Vec<Photo> {
        let total = paths.len();
        let processed = AtomicUsize::new(0);

        let tasks = paths
            .iter()
            .map(|path| self.analyze_one(path, total, &processed));
        futures::future::join_all(tasks).await
    }

    async fn analyze_one(&self, path: &Path, total: usize, processed: &AtomicUsize) -> Photo {
        let metadata = self.metadata.extract(path);

        let embedding = match self.embedder.get().await {
            Ok(provider) => match provider.embed_image(path).await {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    log::warn!("embedding extraction failed for {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("embedding provider unavailable: {}", e);
                None
            }
        };

        let quality = match self.prompt_bank().await {
            Some(bank) => quality::score_photo(embedding.as_ref(), bank),
            None => 0,
        };

        let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
        self.send_progress(AnalyzeProgress {
            files_processed: current,
            total_files: total,
            current_file: path.to_string_lossy().to_string(),
        });

        Photo::new(path, metadata, embedding, quality)
    }

    /// Prompt embeddings are computed once per session and reused for
    /// every photo. A failed computation degrades scoring to 0 for this
    /// batch and is retried on the next one.
    async fn prompt_bank(&self) -> Option<&PromptBank> {
        let result = self
            .prompt_bank
            .get_or_try_init(|| async {
                let provider = self.embedder.get().await?;
                let positive = provider.embed_texts(&POSITIVE_PROMPTS).await?;
                let negative = provider.embed_texts(&NEGATIVE_PROMPTS).await?;
                Ok::<_, EmbedError>(PromptBank { positive, negative })
            })
            .await;

        match result {
            Ok(bank) => Some(bank),
            Err(e) => {
                log::warn!("prompt embedding failed, scoring disabled: {}", e);
                None
            }
        }
    }

    fn send_progress(&self, progress: AnalyzeProgress) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::testing::StaticProvider;
    use std::fs;
    use tempfile::TempDir;

    fn service_with(images: &[(&str, Vec<f32>)]) -> AnalysisService {
        let provider = StaticProvider::new(images, vec![1.0, 0.0, 0.0]);
        AnalysisService::new(Arc::new(LazyEmbedder::preloaded(provider)))
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_analyze_produces_one_photo_per_file() {
        let dir = TempDir::new().unwrap();
        let a = touch(&dir, "a.jpg");
        let b = touch(&dir, "b.jpg");

        let service = service_with(&[
            ("a.jpg", vec![1.0, 0.0, 0.0]),
            ("b.jpg", vec![0.0, 1.0, 0.0]),
        ]);
        let photos = service.analyze(&[a, b]).await;

        assert_eq!(photos.len(), 2);
        assert!(photos.iter().all(|p| p.embedding.is_some()));
        assert!(photos.iter().all(|p| !p.selected));
    }

    #[tokio::test]
    async fn test_extraction_failure_yields_zero_quality_photo() {
        let dir = TempDir::new().unwrap();
        let known = touch(&dir, "known.jpg");
        let unknown = touch(&dir, "unknown.jpg");

        // Provider only knows "known.jpg"; the other file fails extraction.
        let service = service_with(&[("known.jpg", vec![1.0, 0.0, 0.0])]);
        let photos = service.analyze(&[known, unknown]).await;

        let failed = photos.iter().find(|p| p.file_name == "unknown.jpg").unwrap();
        assert!(failed.embedding.is_none());
        assert_eq!(failed.quality, 0);

        let ok = photos.iter().find(|p| p.file_name == "known.jpg").unwrap();
        assert!(ok.embedding.is_some());
        // StaticProvider's identical prompt banks cancel out: raw = 0 -> 50.
        assert_eq!(ok.quality, 50);
    }

    #[tokio::test]
    async fn test_progress_events_cover_every_file() {
        let dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = (0..5)
            .map(|i| touch(&dir, &format!("p{}.jpg", i)))
            .collect();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let provider = StaticProvider::new(&[], vec![1.0]);
        let service = AnalysisService::new(Arc::new(LazyEmbedder::preloaded(provider)))
            .with_progress_sender(tx);

        let photos = service.analyze(&files).await;
        assert_eq!(photos.len(), 5);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 5);
        assert!(events.iter().all(|e| e.total_files == 5));
        assert!(events.iter().any(|e| e.files_processed == 5));
    }

    #[tokio::test]
    async fn test_unavailable_backend_degrades_to_no_embeddings() {
        let dir = TempDir::new().unwrap();
        let file = touch(&dir, "a.jpg");

        let embedder = LazyEmbedder::new(|| {
            Err(crate::core::provider::EmbedError::Backend {
                message: "no model".to_string(),
            })
        });
        let service = AnalysisService::new(Arc::new(embedder));
        let photos = service.analyze(&[file]).await;

        assert_eq!(photos.len(), 1);
        assert!(photos[0].embedding.is_none());
        assert_eq!(photos[0].quality, 0);
    }
}
