#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::detect::backend::InferenceBackend;
use crate::detect::result::RawOutputTensor;
use crate::frame::Frame;

/// Blob normalization: `(pixel - MEAN) * SCALE` maps `0..=255` onto `-1..=1`.
const BLOB_MEAN: f32 = 127.5;
const BLOB_SCALE: f32 = 1.0 / 127.5;

/// Tract-based backend for ONNX inference.
///
/// Loads a local model file once; output layer names are resolved at load time and
/// kept for logging and ordering. Each output is flattened to `[anchors, columns]`.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_width: u32,
    input_height: u32,
    output_names: Vec<String>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_width: u32, input_height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let typed = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_height as usize, input_width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?;

        let output_names = typed
            .output_outlets()
            .context("failed to list model outputs")?
            .iter()
            .map(|outlet| typed.node(outlet.node).name.clone())
            .collect::<Vec<_>>();

        let model = typed
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "loaded model {} ({}x{}), outputs: {}",
            model_path.display(),
            input_width,
            input_height,
            output_names.join(", ")
        );

        Ok(Self {
            model,
            input_width,
            input_height,
            output_names,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
            .ok_or_else(|| {
                anyhow!(
                    "frame buffer of {} bytes does not hold {}x{} RGB pixels",
                    frame.pixels().len(),
                    frame.width,
                    frame.height
                )
            })?;
        let resized = image::imageops::resize(
            &image,
            self.input_width,
            self.input_height,
            FilterType::Triangle,
        );

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.input_height as usize, self.input_width as usize),
            |(_, channel, y, x)| {
                let value = resized.get_pixel(x as u32, y as u32).0[channel] as f32;
                (value - BLOB_MEAN) * BLOB_SCALE
            },
        );

        Ok(input.into_tensor())
    }
}

impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawOutputTensor>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;

        outputs
            .iter()
            .zip(&self.output_names)
            .map(|(output, name)| {
                let view = output
                    .to_array_view::<f32>()
                    .with_context(|| format!("output {} was not f32", name))?;
                let columns = view.shape().last().copied().unwrap_or(0);
                if columns == 0 {
                    return Ok(RawOutputTensor::zeros((0, 0)));
                }
                let data: Vec<f32> = view.iter().copied().collect();
                let rows = data.len() / columns;
                RawOutputTensor::from_shape_vec((rows, columns), data)
                    .with_context(|| format!("output {} could not be reshaped to 2-D", name))
            })
            .collect()
    }
}
