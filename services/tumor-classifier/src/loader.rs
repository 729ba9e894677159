//! Model lifecycle state machine.
//!
//! States:
//! - Uninitialized
//! - Loading
//! - Ready (holds the shared backend)
//! - Failed (holds the load error)
//!
//! The Uninitialized -> Loading step is a compare-and-set under the lock, so at
//! most one load ever runs per slot. Requests never wait on a load: they see
//! `NotReady` while loading and `Unavailable` once loading has failed.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "onnx")]
use anyhow::Context;
use neuroscan_core::ModelSettings;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::artifact::{self, ArtifactFetcher};
use crate::error::ModelError;
use crate::inference::{self, InferenceBackend, Prediction};
use crate::metrics::MODEL_READY;
#[cfg(feature = "onnx")]
use crate::onnx::OnnxBackend;
use crate::preprocess::InputTensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPhase { Uninitialized, Loading, Ready, Failed }

enum ModelState {
    Uninitialized,
    Loading { started: Instant },
    Ready(Arc<dyn InferenceBackend>),
    Failed(String),
}

impl ModelState {
    fn phase(&self) -> ModelPhase {
        match self {
            ModelState::Uninitialized => ModelPhase::Uninitialized,
            ModelState::Loading { .. } => ModelPhase::Loading,
            ModelState::Ready(_) => ModelPhase::Ready,
            ModelState::Failed(_) => ModelPhase::Failed,
        }
    }
}

pub struct ModelSlot {
    state: RwLock<ModelState>,
}

impl Default for ModelSlot {
    fn default() -> Self { Self::new() }
}

impl ModelSlot {
    pub fn new() -> Self { Self { state: RwLock::new(ModelState::Uninitialized) } }

    /// A slot that starts out ready, for callers that built the backend themselves.
    pub fn with_backend(backend: Arc<dyn InferenceBackend>) -> Self {
        Self { state: RwLock::new(ModelState::Ready(backend)) }
    }

    pub fn phase(&self) -> ModelPhase { self.state.read().phase() }

    pub fn failure(&self) -> Option<String> {
        match &*self.state.read() {
            ModelState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    fn begin_loading(&self) -> bool {
        let mut st = self.state.write();
        if !matches!(*st, ModelState::Uninitialized) {
            return false;
        }
        *st = ModelState::Loading { started: Instant::now() };
        true
    }

    fn finish(&self, outcome: anyhow::Result<Arc<dyn InferenceBackend>>) -> ModelPhase {
        let mut st = self.state.write();
        let elapsed_ms = match &*st {
            ModelState::Loading { started } => started.elapsed().as_millis() as u64,
            _ => 0,
        };
        *st = match outcome {
            Ok(backend) => {
                MODEL_READY.set(1);
                info!(elapsed_ms, "model ready");
                ModelState::Ready(backend)
            }
            Err(e) => {
                let reason = format!("{e:#}");
                MODEL_READY.set(0);
                error!(elapsed_ms, error = %reason, "model load failed; predictions will be refused");
                ModelState::Failed(reason)
            }
        };
        st.phase()
    }

    /// Run `load` if and only if this slot has never been loaded. A second
    /// call does not poll its future and just reports the current phase.
    pub async fn initialize<Fut>(&self, load: Fut) -> ModelPhase
    where
        Fut: Future<Output = anyhow::Result<Arc<dyn InferenceBackend>>>,
    {
        if !self.begin_loading() {
            let phase = self.phase();
            warn!(?phase, "model load already attempted; ignoring");
            return phase;
        }
        info!("loading model");
        let outcome = load.await;
        self.finish(outcome)
    }

    /// Shared handle to the loaded backend.
    pub fn backend(&self) -> Result<Arc<dyn InferenceBackend>, ModelError> {
        match &*self.state.read() {
            ModelState::Ready(backend) => Ok(Arc::clone(backend)),
            ModelState::Uninitialized | ModelState::Loading { .. } => Err(ModelError::NotReady),
            ModelState::Failed(reason) => Err(ModelError::Unavailable(reason.clone())),
        }
    }

    pub fn predict(&self, input: &InputTensor) -> Result<Prediction, ModelError> {
        let backend = self.backend()?;
        inference::predict(backend.as_ref(), input)
    }
}

/// Fetch the artifact if missing, check the optional pin, then parse and warm
/// the model on a blocking thread.
pub async fn fetch_and_load(settings: &ModelSettings) -> anyhow::Result<Arc<dyn InferenceBackend>> {
    let fetcher = ArtifactFetcher::new(settings.url_template.clone())?;
    fetcher.ensure_present(&settings.artifact_id, &settings.path).await?;
    if let Some(pin) = settings.sha256_pin() {
        artifact::verify_sha256(&settings.path, pin).await?;
    }
    load_backend(settings.path.clone(), settings.warmup).await
}

#[cfg(feature = "onnx")]
async fn load_backend(path: PathBuf, warmup: bool) -> anyhow::Result<Arc<dyn InferenceBackend>> {
    let backend = tokio::task::spawn_blocking(move || OnnxBackend::load(&path, warmup))
        .await
        .context("model load task aborted")??;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "onnx"))]
async fn load_backend(path: PathBuf, _warmup: bool) -> anyhow::Result<Arc<dyn InferenceBackend>> {
    anyhow::bail!("built without the `onnx` feature; cannot execute {}", path.display())
}
