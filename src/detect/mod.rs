mod backend;
mod backends;
mod decoder;
mod labels;
mod result;
mod suppress;

pub use backend::InferenceBackend;
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use decoder::{decode, DetectionDecoder};
pub use labels::ClassLabelTable;
pub use result::{Detection, DetectionSet, RawOutputTensor, BOX_COLUMNS};
pub use suppress::{suppress, SuppressionEngine};
