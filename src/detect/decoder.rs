//! Raw output tensors to candidate detections.
//!
//! Each anchor row holds a normalized box (`center_x, center_y, width, height`), an
//! objectness column that is not used for scoring, then one score per class. The
//! anchor's class is the arg-max of its score segment and its confidence is that score.

use crate::detect::result::{Detection, DetectionSet, RawOutputTensor, BOX_COLUMNS};
use crate::error::SentryError;
use crate::geometry::BoxRect;

/// Decodes raw output tensors against a fixed confidence threshold.
#[derive(Clone, Debug)]
pub struct DetectionDecoder {
    confidence_threshold: f32,
    class_count: Option<usize>,
}

impl DetectionDecoder {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            class_count: None,
        }
    }

    /// Require every tensor to carry exactly `class_count` score columns.
    pub fn with_class_count(mut self, class_count: usize) -> Self {
        self.class_count = Some(class_count);
        self
    }

    /// Decode all tensors in order. Anchors at or below the threshold, anchors with a
    /// non-finite box value, and anchors whose box has no area are dropped. Boxes are not
    /// clamped to the frame.
    pub fn decode(
        &self,
        tensors: &[RawOutputTensor],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<DetectionSet, SentryError> {
        for (index, tensor) in tensors.iter().enumerate() {
            self.check_shape(index, tensor)?;
        }

        let fw = frame_width as f32;
        let fh = frame_height as f32;
        let mut candidates = Vec::new();

        for tensor in tensors {
            for row in tensor.rows() {
                let Some((class_id, confidence)) = arg_max(row.iter().skip(BOX_COLUMNS)) else {
                    continue;
                };
                if !(confidence > self.confidence_threshold) {
                    continue;
                }
                if !row.iter().take(4).all(|v| v.is_finite()) {
                    continue;
                }
                let rect =
                    BoxRect::from_center(row[0] * fw, row[1] * fh, row[2] * fw, row[3] * fh);
                if rect.is_degenerate() {
                    continue;
                }
                candidates.push(Detection::new(class_id, confidence, rect));
            }
        }

        Ok(candidates)
    }

    fn check_shape(&self, index: usize, tensor: &RawOutputTensor) -> Result<(), SentryError> {
        let columns = tensor.ncols();
        let ok = match self.class_count {
            Some(classes) => columns == BOX_COLUMNS + classes,
            None => columns > BOX_COLUMNS,
        };
        if ok {
            return Ok(());
        }
        let expected = match self.class_count {
            Some(classes) => (BOX_COLUMNS + classes).to_string(),
            None => format!("more than {}", BOX_COLUMNS),
        };
        Err(SentryError::DecodeMalformedInput {
            tensor: index,
            columns,
            expected,
        })
    }
}

/// Decode with only a confidence threshold, accepting any number of score columns.
pub fn decode(
    tensors: &[RawOutputTensor],
    frame_width: u32,
    frame_height: u32,
    confidence_threshold: f32,
) -> Result<DetectionSet, SentryError> {
    DetectionDecoder::new(confidence_threshold).decode(tensors, frame_width, frame_height)
}

/// Index and value of the largest score. Ties keep the lowest index; NaN scores are
/// skipped.
fn arg_max<'a>(scores: impl Iterator<Item = &'a f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, value)) if !(score > value) => {}
            _ => best = Some((index, score)),
        }
    }
    best
}
