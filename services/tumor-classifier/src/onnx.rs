//! tract-backed ONNX execution of the exported classifier.

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tract_onnx::prelude::*;

use crate::inference::InferenceBackend;
use crate::preprocess::{warmup_tensor, InputTensor, CHANNELS, INPUT_SIZE};

type Plan = TypedRunnableModel<TypedModel>;

const SIDE: usize = INPUT_SIZE as usize;

pub struct OnnxBackend {
    plan: Plan,
}

impl OnnxBackend {
    /// Parse, pin the input to (1, 299, 299, 3) f32, optimise, and optionally
    /// run one discarded inference so graph set-up happens here rather than
    /// on the first request.
    pub fn load(path: &Path, warmup: bool) -> Result<Self> {
        let start = Instant::now();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to parse onnx model at {}", path.display()))?
            .with_input_fact(0, f32::fact([1, SIDE, SIDE, CHANNELS]).into())?
            .into_optimized()?
            .into_runnable()?;
        let this = Self { plan };
        info!(path = %path.display(), elapsed_ms = start.elapsed().as_millis() as u64, "onnx model loaded");
        if warmup {
            let start = Instant::now();
            this.run(&warmup_tensor()).context("warm-up inference failed")?;
            info!(elapsed_ms = start.elapsed().as_millis() as u64, "model warmed up");
        }
        Ok(this)
    }
}

impl InferenceBackend for OnnxBackend {
    fn run(&self, input: &InputTensor) -> Result<Vec<f32>> {
        let flat = input.as_slice().ok_or_else(|| anyhow!("input tensor is not contiguous"))?;
        let tensor = Tensor::from_shape(&[1, SIDE, SIDE, CHANNELS], flat)?;
        let outputs = self.plan.run(tvec!(tensor.into()))?;
        let scores = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?
            .to_array_view::<f32>()?
            .iter()
            .copied()
            .collect();
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_onnx_artifact_is_rejected_with_context() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"<html>not a model</html>").unwrap();
        let err = match OnnxBackend::load(file.path(), true) {
            Ok(_) => panic!("garbage parsed as a model"),
            Err(e) => e,
        };
        assert!(format!("{err:#}").contains("failed to parse onnx model"));
    }
}
