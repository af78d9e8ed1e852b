use anyhow::Result;

use crate::detect::result::RawOutputTensor;
use crate::frame::Frame;

/// Inference collaborator: runs the network forward pass on a frame.
///
/// The forward pass is opaque to the detection core. Implementations resolve their
/// output layers once, at construction, and return one tensor per output layer in a
/// fixed order.
pub trait InferenceBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the network on one frame and return its raw output tensors.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawOutputTensor>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
