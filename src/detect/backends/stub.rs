use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::InferenceBackend;
use crate::detect::result::RawOutputTensor;
use crate::frame::Frame;

/// Backend that replays pre-recorded outputs, one entry per frame.
///
/// Once the script is exhausted every frame yields no tensors.
#[derive(Default)]
pub struct ScriptedBackend {
    script: VecDeque<Vec<RawOutputTensor>>,
    frames_seen: u64,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_script(script: Vec<Vec<RawOutputTensor>>) -> Self {
        Self {
            script: script.into(),
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn infer(&mut self, _frame: &Frame) -> Result<Vec<RawOutputTensor>> {
        self.frames_seen += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
