//! Render collaborator.
//!
//! Rendering only labels boxes. Signaling is owned by the dispatcher and never happens
//! here.

use crate::detect::{ClassLabelTable, Detection};
use crate::frame::Frame;
use crate::geometry::BoxRect;

/// One labelled box ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub class_id: usize,
    pub rect: BoxRect,
    pub text: String,
}

/// Label text such as `person:0.87`, or just `0.87` when the class has no name.
pub fn label_text(detection: &Detection, labels: &ClassLabelTable) -> String {
    let confidence = format!("{:.2}", detection.confidence);
    match labels.name(detection.class_id) {
        Some(name) if !name.is_empty() => format!("{}:{}", name, confidence),
        _ => confidence,
    }
}

/// Build annotations for the survivors, optionally restricted to one class.
pub fn annotate(
    survivors: &[Detection],
    labels: &ClassLabelTable,
    only_class: Option<usize>,
) -> Vec<Annotation> {
    survivors
        .iter()
        .filter(|d| only_class.map_or(true, |class_id| d.class_id == class_id))
        .map(|d| Annotation {
            class_id: d.class_id,
            rect: d.rect,
            text: label_text(d, labels),
        })
        .collect()
}

/// Per-frame figures shown alongside the annotations.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub inference_ms: f64,
}

/// Display sink for annotated frames.
pub trait Renderer {
    fn render(&mut self, frame: &Frame, annotations: &[Annotation], stats: FrameStats);
}

/// Renderer that writes annotations to the log instead of a window.
#[derive(Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &Frame, annotations: &[Annotation], stats: FrameStats) {
        log::debug!(
            "frame {}: inference time {:.2} ms, {} annotation(s)",
            frame.index,
            stats.inference_ms,
            annotations.len()
        );
        for annotation in annotations {
            let r = annotation.rect.clamped_to(frame.width, frame.height);
            log::debug!(
                "  {} at ({:.0}, {:.0}) {:.0}x{:.0}",
                annotation.text,
                r.left,
                r.top,
                r.width,
                r.height
            );
        }
    }
}
