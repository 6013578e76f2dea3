use crate::core::embedding::Embedding;
use crate::core::metadata::PhotoMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One imported image and everything derived from it.
///
/// Immutable after analysis except for `selected`, which only the selection
/// store flips. Photos are never removed within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub path: PathBuf,
    pub file_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Absent when embedding extraction failed for this file.
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    /// 0-100; 0 means "unknown quality" (no embedding or scoring failed).
    pub quality: u8,
    pub capture_date: DateTime<Utc>,
    pub selected: bool,
}

impl Photo {
    pub fn new(
        path: &Path,
        metadata: PhotoMetadata,
        embedding: Option<Embedding>,
        quality: u8,
    ) -> Self {
        Self {
            id: format!("pht_{}", Uuid::new_v4().simple()),
            path: path.to_path_buf(),
            file_name: metadata.file_name,
            width: metadata.width,
            height: metadata.height,
            embedding,
            quality,
            capture_date: metadata.capture_date,
            selected: false,
        }
    }
}

/// A cluster of two or more mutually similar photos.
///
/// `photos` is sorted by quality descending; index 0 is the recommended
/// keeper. Groups are recomputed wholesale whenever the photo set changes
/// and carry no identity across recomputations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoGroup {
    pub id: String,
    pub photos: Vec<Photo>,
    /// Minimum similarity observed on the anchor connections that formed
    /// this group. A lower bound on intra-group closeness, not an
    /// all-pairs minimum.
    pub similarity: f32,
    /// Capture date of the best (index 0) photo.
    pub date: DateTime<Utc>,
}

impl PhotoGroup {
    /// Finalizes a candidate group: orders members best-first and derives
    /// the group identity from the top member. Callers guarantee
    /// `members.len() >= 2`.
    pub fn new(mut members: Vec<Photo>, similarity: f32) -> Self {
        // Stable sort: equal-quality members keep their scan order.
        members.sort_by(|a, b| b.quality.cmp(&a.quality));
        let id = format!("grp_{}", members[0].id);
        let date = members[0].capture_date;
        Self {
            id,
            photos: members,
            similarity,
            date,
        }
    }
}

/// Selection snapshot recorded after every selection-changing transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub selected: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistorySnapshot {
    pub fn capture(selected: &BTreeSet<String>) -> Self {
        Self {
            selected: selected.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// The full session state.
///
/// Invariants, re-established after every transition:
/// - every photo appears in exactly one of {a group, `unique_photos`};
/// - `photos[i].selected == selected_photos.contains(&photos[i].id)`,
///   mirrored into the copies held by `groups` and `unique_photos`;
/// - `-1 <= current_history_index < history.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// All photos ever ingested, in insertion order.
    pub photos: Vec<Photo>,
    pub groups: Vec<PhotoGroup>,
    pub unique_photos: Vec<Photo>,
    pub selected_photos: BTreeSet<String>,
    pub history: Vec<HistorySnapshot>,
    /// Index into `history`; -1 before the first entry exists.
    pub current_history_index: isize,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            photos: Vec::new(),
            groups: Vec::new(),
            unique_photos: Vec::new(),
            selected_photos: BTreeSet::new(),
            history: Vec::new(),
            current_history_index: -1,
        }
    }

    pub fn is_selected(&self, photo_id: &str) -> bool {
        self.selected_photos.contains(photo_id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::empty()
    }
}
