use std::path::Path;

use tracing::warn;

use crate::{
    error::ServiceError,
    model::{BatchOutput, Device},
};

/// Environment variable the CUDA runtime consults when enumerating devices.
pub const ACCELERATOR_MASK_VAR: &str = "CUDA_VISIBLE_DEVICES";

/// Whether a CPU fallback may hide accelerators through the process environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskPolicy {
    /// The process is still single-threaded; the environment may be written.
    Mask,
    /// Other threads are running; fall back without touching the environment.
    KeepVisible,
}

/// A loaded sequence-to-sequence model that translates batches of token strings.
pub trait InferenceEngine: Send + Sync {
    /// Device the engine actually runs on.
    fn device(&self) -> Device;

    /// Translates `source` token sequences, forcing each output to start with
    /// the matching `target_prefix` sequence. Returns one entry per input.
    fn translate_batch(
        &self,
        source: &[Vec<String>],
        target_prefix: &[Vec<String>],
    ) -> Result<Vec<BatchOutput>, ServiceError>;
}

/// Creates engines from an on-disk model artifact.
pub trait EngineBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn load(&self, model_path: &Path, device: Device)
    -> Result<Box<dyn InferenceEngine>, ServiceError>;

    /// Hides accelerated devices from any later device enumeration.
    ///
    /// Must only run while the process is single-threaded; the loader calls
    /// it under [`MaskPolicy::Mask`] only.
    fn mask_accelerators(&self) {
        if std::env::var(ACCELERATOR_MASK_VAR).is_ok_and(|v| v.is_empty()) {
            return;
        }
        warn!(var = ACCELERATOR_MASK_VAR, "hiding accelerated devices");
        // SAFETY: `MaskPolicy::Mask` is used by `ModelRegistry::initialize`,
        // which the server calls before the async runtime exists. Reloads run
        // on runtime threads and use `MaskPolicy::KeepVisible`.
        unsafe { std::env::set_var(ACCELERATOR_MASK_VAR, "") };
    }
}

/// Backend used when the crate is built without an inference engine.
pub struct UnsupportedBackend;

impl EngineBackend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn load(
        &self,
        _model_path: &Path,
        _device: Device,
    ) -> Result<Box<dyn InferenceEngine>, ServiceError> {
        Err(ServiceError::Inference(
            "built without an inference backend (enable the `ct2-backend` feature)".into(),
        ))
    }

    fn mask_accelerators(&self) {}
}
