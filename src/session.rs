//! Composition root: owns the embedding provider, the analysis pipeline,
//! and the selection store, and exposes the operation set the UI layer
//! calls.

use crate::core::grouping::{self, DEFAULT_SIMILARITY_THRESHOLD};
use crate::core::pipeline::{AnalysisService, AnalyzeProgress};
use crate::core::provider::LazyEmbedder;
use crate::store::models::AppState;
use crate::store::selection::{Action, SelectionStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Session {
    analyzer: AnalysisService,
    threshold: f32,
    store: Mutex<SelectionStore>,
}

impl Session {
    pub fn new(embedder: Arc<LazyEmbedder>) -> Self {
        Self {
            analyzer: AnalysisService::new(embedder),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            store: Mutex::new(SelectionStore::new()),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_progress_sender(mut self, sender: mpsc::UnboundedSender<AnalyzeProgress>) -> Self {
        self.analyzer = self.analyzer.with_progress_sender(sender);
        self
    }

    /// Analyzes `files` and ingests them. Per-file analysis runs
    /// concurrently; the grouping recompute and the ingest transition run
    /// under the store lock, so concurrent imports serialize in submission
    /// order against a consistent photo snapshot.
    pub async fn import(&self, files: &[PathBuf]) -> Arc<AppState> {
        let new_photos = self.analyzer.analyze(files).await;

        let mut store = self.store.lock().await;
        let mut all_photos = store.state().photos.clone();
        all_photos.extend(new_photos.iter().cloned());

        // Grouping always runs over the entire photo set, not just the
        // new arrivals; earlier groups may dissolve or absorb members.
        let result = grouping::group_photos(&all_photos, self.threshold);
        store.dispatch(Action::Ingest {
            new_photos,
            groups: result.groups,
            unique_photos: result.unique_photos,
        });
        store.state()
    }

    /// Read-only snapshot of the current state.
    pub async fn state(&self) -> Arc<AppState> {
        self.store.lock().await.state()
    }

    pub async fn toggle_select(&self, photo_id: &str) -> Arc<AppState> {
        self.dispatch(Action::ToggleSelect {
            photo_id: photo_id.to_string(),
        })
        .await
    }

    pub async fn select_all_in_group(&self, group_id: &str) -> Arc<AppState> {
        self.dispatch(Action::SelectAllInGroup {
            group_id: group_id.to_string(),
        })
        .await
    }

    pub async fn deselect_all_in_group(&self, group_id: &str) -> Arc<AppState> {
        self.dispatch(Action::DeselectAllInGroup {
            group_id: group_id.to_string(),
        })
        .await
    }

    pub async fn select_all(&self) -> Arc<AppState> {
        self.dispatch(Action::SelectAll).await
    }

    pub async fn deselect_all(&self) -> Arc<AppState> {
        self.dispatch(Action::DeselectAll).await
    }

    pub async fn undo(&self) -> Arc<AppState> {
        self.dispatch(Action::Undo).await
    }

    pub async fn redo(&self) -> Arc<AppState> {
        self.dispatch(Action::Redo).await
    }

    /// Copies every currently selected photo into `output_dir`, iterating
    /// selected ids in stored order. Returns the destination paths.
    pub async fn export_selected(&self, output_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        let state = self.state().await;
        fs::create_dir_all(output_dir)?;

        let mut exported = Vec::with_capacity(state.selected_photos.len());
        for id in &state.selected_photos {
            let Some(photo) = state.photos.iter().find(|p| &p.id == id) else {
                continue;
            };
            let dest = output_dir.join(&photo.file_name);
            fs::copy(&photo.path, &dest)?;
            log::info!("exported {} -> {}", photo.path.display(), dest.display());
            exported.push(dest);
        }
        Ok(exported)
    }

    async fn dispatch(&self, action: Action) -> Arc<AppState> {
        let mut store = self.store.lock().await;
        store.dispatch(action);
        store.state()
    }
}
