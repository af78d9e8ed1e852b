use crate::geometry::BoxRect;

/// Raw network output for one layer: rows are anchors, columns are
/// `[center_x, center_y, width, height, objectness, score_0 .. score_n]`.
pub type RawOutputTensor = ndarray::Array2<f32>;

/// Columns preceding the per-class scores in every anchor row.
pub const BOX_COLUMNS: usize = 5;

/// One confident detection in pixel space, scoped to a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub rect: BoxRect,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32, rect: BoxRect) -> Self {
        Self {
            class_id,
            confidence,
            rect,
        }
    }
}

/// Detections for one frame. Order after suppression is selection order.
pub type DetectionSet = Vec<Detection>;
