//! Prompt-based perceptual quality scoring.
//!
//! An image embedding is compared against two fixed banks of text-prompt
//! embeddings; the averaged positive-minus-negative similarity is mapped
//! onto a 0-100 integer scale.

use crate::core::embedding::{cosine_similarity, Embedding};

/// Prompts describing what a keeper looks like. The exact wording is part
/// of the score calibration; changing it shifts the whole 0-100 scale.
pub const POSITIVE_PROMPTS: [&str; 10] = [
    "a high-quality photo",
    "a sharp, in-focus photo",
    "a well-composed photograph",
    "a professional photograph",
    "a photo with good lighting",
    "a clear and detailed photo",
    "a beautiful photo",
    "a well-exposed photograph",
    "a photo with vibrant colors",
    "an aesthetically pleasing photo",
];

/// Prompts describing defects worth culling for.
pub const NEGATIVE_PROMPTS: [&str; 10] = [
    "a blurry photo",
    "an out-of-focus photo",
    "a poorly lit photo",
    "an overexposed photo",
    "an underexposed photo",
    "a grainy, noisy photo",
    "a badly composed photograph",
    "a photo with motion blur",
    "a dark, murky photo",
    "a low-quality photo",
];

/// Prompt embeddings, computed once per session and reused for every photo.
#[derive(Debug, Clone)]
pub struct PromptBank {
    pub positive: Vec<Embedding>,
    pub negative: Vec<Embedding>,
}

/// Scores an image embedding against positive and negative prompt banks.
///
/// Returns an integer in [0, 100]. A missing/empty embedding, empty prompt
/// banks, or non-finite arithmetic all yield 0; callers treat 0 as a
/// valid "unknown quality" result, not an error.
pub fn score(
    image_embedding: &[f32],
    positive_prompts: &[Embedding],
    negative_prompts: &[Embedding],
) -> u8 {
    if image_embedding.is_empty() || positive_prompts.is_empty() || negative_prompts.is_empty() {
        return 0;
    }

    let avg_pos = mean_similarity(image_embedding, positive_prompts);
    let avg_neg = mean_similarity(image_embedding, negative_prompts);
    let raw = avg_pos - avg_neg;
    if !raw.is_finite() {
        log::warn!("non-finite quality signal, scoring as unknown");
        return 0;
    }

    calibrated(raw)
}

/// Convenience wrapper for the optional embedding carried by a photo.
pub fn score_photo(embedding: Option<&Embedding>, bank: &PromptBank) -> u8 {
    match embedding {
        Some(emb) => score(emb, &bank.positive, &bank.negative),
        None => 0,
    }
}

/// Maps the raw positive-minus-negative signal onto the display scale.
///
/// The `* 15`, `+ 1`, `/ 2`, `* 100` constants are tuned values with no
/// principled derivation; downstream consumers depend on this exact scale,
/// so they are preserved as-is.
fn calibrated(raw: f32) -> u8 {
    let scaled = ((raw * 15.0 + 1.0) / 2.0) * 100.0;
    scaled.round().clamp(0.0, 100.0) as u8
}

fn mean_similarity(embedding: &[f32], prompts: &[Embedding]) -> f32 {
    let sum: f32 = prompts
        .iter()
        .map(|p| cosine_similarity(embedding, p))
        .sum();
    sum / prompts.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Embedding {
        crate::core::embedding::l2_normalize(&[x, y])
    }

    #[test]
    fn test_prompt_banks_are_ten_each() {
        assert_eq!(POSITIVE_PROMPTS.len(), 10);
        assert_eq!(NEGATIVE_PROMPTS.len(), 10);
    }

    #[test]
    fn test_high_raw_signal_clamps_to_100() {
        // avg_pos = 0.9, avg_neg = 0.1 -> raw = 0.8,
        // ((0.8 * 15 + 1) / 2) * 100 = 650 -> clamped to 100.
        let image = vec![1.0, 0.0];
        let positive = vec![unit(0.9, (1.0f32 - 0.81).sqrt())];
        let negative = vec![unit(0.1, (1.0f32 - 0.01).sqrt())];
        assert_eq!(score(&image, &positive, &negative), 100);
    }

    #[test]
    fn test_negative_raw_signal_clamps_to_0() {
        let image = vec![1.0, 0.0];
        let positive = vec![unit(0.0, 1.0)];
        let negative = vec![unit(1.0, 0.0)];
        assert_eq!(score(&image, &positive, &negative), 0);
    }

    #[test]
    fn test_neutral_signal_scores_50() {
        // raw = 0 -> ((0 + 1) / 2) * 100 = 50.
        let image = vec![1.0, 0.0];
        let prompts = vec![unit(0.5, 0.5)];
        assert_eq!(score(&image, &prompts, &prompts), 50);
    }

    #[test]
    fn test_calibration_is_monotonic_in_raw() {
        let mut last = 0u8;
        let mut raw = -0.2f32;
        while raw <= 0.2 {
            let s = calibrated(raw);
            assert!(s >= last, "score dropped at raw = {}", raw);
            last = s;
            raw += 0.005;
        }
    }

    #[test]
    fn test_calibration_bounds() {
        assert_eq!(calibrated(-1.0), 0);
        assert_eq!(calibrated(1.0), 100);
        for raw in [-0.07, -0.03, 0.0, 0.03, 0.07] {
            let s = calibrated(raw);
            assert!(s <= 100);
        }
    }

    #[test]
    fn test_missing_inputs_score_zero() {
        let prompts = vec![unit(1.0, 0.0)];
        assert_eq!(score(&[], &prompts, &prompts), 0);
        assert_eq!(score(&[1.0, 0.0], &[], &prompts), 0);
        assert_eq!(score(&[1.0, 0.0], &prompts, &[]), 0);

        let bank = PromptBank {
            positive: prompts.clone(),
            negative: prompts,
        };
        assert_eq!(score_photo(None, &bank), 0);
    }

    #[test]
    fn test_averaging_over_multiple_prompts() {
        // Positives at cosine 1.0 and 0.0 average to 0.5; negatives at 0.0.
        // raw = 0.5 -> ((7.5 + 1) / 2) * 100 = 425 -> clamped 100.
        let image = vec![1.0, 0.0];
        let positive = vec![unit(1.0, 0.0), unit(0.0, 1.0)];
        let negative = vec![unit(0.0, 1.0)];
        assert_eq!(score(&image, &positive, &negative), 100);

        // Symmetric banks cancel: raw = 0 -> 50.
        let both = vec![unit(1.0, 0.0), unit(0.0, 1.0)];
        assert_eq!(score(&image, &both, &both), 50);
    }
}
