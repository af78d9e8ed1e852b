//! Greedy non-maximum suppression.
//!
//! Suppression runs across all classes in a single pass: a confident box of one class
//! removes an overlapping box of any other class.

use crate::detect::result::{Detection, DetectionSet};

/// Confidence filter plus class-agnostic greedy NMS.
#[derive(Clone, Copy, Debug)]
pub struct SuppressionEngine {
    pub confidence_threshold: f32,
    pub overlap_threshold: f32,
}

impl SuppressionEngine {
    pub fn new(confidence_threshold: f32, overlap_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            overlap_threshold,
        }
    }

    pub fn suppress(&self, candidates: &[Detection]) -> DetectionSet {
        suppress(candidates, self.confidence_threshold, self.overlap_threshold)
    }
}

/// Survivors in selection order: descending confidence, ties by input order.
///
/// Candidates at or below `confidence_threshold` are dropped first. A candidate is
/// removed when its overlap ratio with an already selected box exceeds
/// `overlap_threshold`.
pub fn suppress(
    candidates: &[Detection],
    confidence_threshold: f32,
    overlap_threshold: f32,
) -> DetectionSet {
    let mut order: Vec<&Detection> = candidates
        .iter()
        .filter(|d| d.confidence > confidence_threshold)
        .collect();
    // `sort_by` is stable, so equal confidences keep their input order.
    order.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut survivors: DetectionSet = Vec::with_capacity(order.len());
    for candidate in order {
        let overlapped = survivors
            .iter()
            .any(|kept| kept.rect.overlap_ratio(&candidate.rect) > overlap_threshold);
        if !overlapped {
            survivors.push(candidate.clone());
        }
    }
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoxRect;

    fn det(class_id: usize, confidence: f32, l: f32, t: f32, w: f32, h: f32) -> Detection {
        Detection::new(class_id, confidence, BoxRect::new(l, t, w, h))
    }

    #[test]
    fn overlapping_person_box_is_suppressed() {
        let candidates = vec![
            det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
            det(0, 0.8, 1.0, 1.0, 10.0, 10.0),
            det(3, 0.95, 50.0, 50.0, 5.0, 5.0),
        ];
        let out = suppress(&candidates, 0.5, 0.5);
        assert_eq!(
            out,
            vec![
                det(3, 0.95, 50.0, 50.0, 5.0, 5.0),
                det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
            ]
        );
    }

    #[test]
    fn suppression_crosses_classes() {
        let candidates = vec![
            det(2, 0.7, 0.0, 0.0, 10.0, 10.0),
            det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
        ];
        let out = suppress(&candidates, 0.5, 0.4);
        assert_eq!(out, vec![det(0, 0.9, 0.0, 0.0, 10.0, 10.0)]);
    }

    #[test]
    fn ties_keep_input_order() {
        let candidates = vec![
            det(1, 0.8, 0.0, 0.0, 10.0, 10.0),
            det(2, 0.8, 100.0, 0.0, 10.0, 10.0),
            det(3, 0.8, 1.0, 0.0, 10.0, 10.0),
        ];
        let out = suppress(&candidates, 0.5, 0.5);
        assert_eq!(
            out,
            vec![
                det(1, 0.8, 0.0, 0.0, 10.0, 10.0),
                det(2, 0.8, 100.0, 0.0, 10.0, 10.0),
            ]
        );
    }

    #[test]
    fn overlap_equal_to_threshold_survives() {
        // intersection 50, union 150
        let candidates = vec![
            det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
            det(0, 0.8, 5.0, 0.0, 10.0, 10.0),
        ];
        let third = 1.0_f32 / 3.0;
        let ratio = candidates[0].rect.overlap_ratio(&candidates[1].rect);
        assert_eq!(ratio, third);
        assert_eq!(suppress(&candidates, 0.5, third).len(), 2);
        assert_eq!(suppress(&candidates, 0.5, 0.3).len(), 1);
    }

    #[test]
    fn low_confidence_is_filtered() {
        let candidates = vec![
            det(0, 0.5, 0.0, 0.0, 10.0, 10.0),
            det(0, 0.49, 40.0, 0.0, 10.0, 10.0),
            det(0, 0.51, 80.0, 0.0, 10.0, 10.0),
        ];
        let out = suppress(&candidates, 0.5, 0.4);
        assert_eq!(out, vec![det(0, 0.51, 80.0, 0.0, 10.0, 10.0)]);
    }

    #[test]
    fn empty_in_empty_out() {
        assert!(suppress(&[], 0.5, 0.4).is_empty());
    }

    #[test]
    fn survivors_respect_overlap_and_are_idempotent() {
        let mut candidates = Vec::new();
        for i in 0..40 {
            let f = i as f32;
            candidates.push(det(
                i % 3,
                0.5 + ((i * 37) % 50) as f32 / 100.0,
                (f * 7.0) % 60.0,
                (f * 11.0) % 45.0,
                12.0 + (i % 4) as f32,
                15.0,
            ));
        }
        let engine = SuppressionEngine::new(0.4, 0.3);
        let survivors = engine.suppress(&candidates);
        assert!(!survivors.is_empty());
        for (i, a) in survivors.iter().enumerate() {
            for b in &survivors[i + 1..] {
                assert!(a.rect.overlap_ratio(&b.rect) <= 0.3);
            }
        }
        assert_eq!(engine.suppress(&survivors), survivors);
    }
}
