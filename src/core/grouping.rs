//! Embedding-similarity grouping.
//!
//! Greedy single-linkage over cosine similarity: each unprocessed photo in
//! turn becomes an anchor, and every later unprocessed photo joins the
//! anchor's group when its similarity to the anchor clears the threshold.
//! Candidates are only ever compared against the anchor, never against
//! other members, so a group may chain together members whose pairwise
//! similarity is below the threshold. That quirk is load-bearing: consumers
//! expect these exact groupings, so it must not be "fixed" into transitive
//! clustering.

use crate::core::embedding::cosine_similarity;
use crate::store::models::{Photo, PhotoGroup};
use rayon::prelude::*;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Default)]
pub struct GroupingResult {
    pub groups: Vec<PhotoGroup>,
    pub unique_photos: Vec<Photo>,
}

/// Partitions `photos` into similarity groups and a residual unique list.
///
/// Photos without an embedding never enter pairwise comparison and are
/// always routed to `unique_photos`. O(n²) comparisons in one pass,
/// acceptable at session scale (tens to low thousands of photos).
pub fn group_photos(photos: &[Photo], threshold: f32) -> GroupingResult {
    let (embedded, skipped): (Vec<&Photo>, Vec<&Photo>) =
        photos.iter().partition(|p| p.embedding.is_some());

    let mut processed = vec![false; embedded.len()];
    let mut groups: Vec<PhotoGroup> = Vec::new();
    let mut unique_photos: Vec<Photo> = Vec::new();

    for i in 0..embedded.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;
        let Some(anchor_embedding) = embedded[i].embedding.as_deref() else {
            continue;
        };

        // Every candidate compares against the fixed anchor only, so the
        // similarity scan parallelizes without changing the outcome.
        let similarities: Vec<f32> = ((i + 1)..embedded.len())
            .into_par_iter()
            .map(|j| match embedded[j].embedding.as_deref() {
                Some(e) if !processed[j] => cosine_similarity(anchor_embedding, e),
                _ => f32::NEG_INFINITY,
            })
            .collect();

        let mut member_indices = vec![i];
        let mut min_similarity = f32::INFINITY;
        for (offset, &similarity) in similarities.iter().enumerate() {
            let j = i + 1 + offset;
            if processed[j] || similarity < threshold {
                continue;
            }
            processed[j] = true;
            member_indices.push(j);
            if similarity < min_similarity {
                min_similarity = similarity;
            }
        }

        if member_indices.len() >= 2 {
            let members: Vec<Photo> = member_indices
                .iter()
                .map(|&k| embedded[k].clone())
                .collect();
            groups.push(PhotoGroup::new(members, min_similarity));
        } else {
            unique_photos.push(embedded[i].clone());
        }
    }

    unique_photos.extend(skipped.into_iter().cloned());

    groups.sort_by(|a, b| b.date.cmp(&a.date));
    unique_photos.sort_by(|a, b| b.capture_date.cmp(&a.capture_date));

    GroupingResult {
        groups,
        unique_photos,
    }
}
