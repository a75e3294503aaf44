//! CTranslate2 inference through the `ct2rs` bindings.

use std::path::Path;

use ct2rs::sys::{Config, Device as Ct2Device, TranslationOptions, Translator};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{BatchOutput, Device, EngineBackend, InferenceEngine},
};

pub struct Ct2Backend {
    beam_size: usize,
    max_decoding_length: usize,
}

impl Ct2Backend {
    pub fn new(config: &AppConfig) -> Self {
        if config.device != Device::Cpu && !cfg!(feature = "cuda") {
            warn!(
                device = %config.device,
                "built without the `cuda` feature; the model will load on the cpu"
            );
        }
        Self {
            beam_size: config.beam_size,
            max_decoding_length: config.max_decoding_length,
        }
    }
}

impl EngineBackend for Ct2Backend {
    fn name(&self) -> &'static str {
        "ctranslate2"
    }

    fn load(
        &self,
        model_path: &Path,
        device: Device,
    ) -> Result<Box<dyn InferenceEngine>, ServiceError> {
        let (ct2_device, resolved) = resolve_device(device);
        let config = Config {
            device: ct2_device,
            ..Default::default()
        };

        debug!(path = %model_path.display(), device = %resolved, "creating translator");
        let translator = Translator::new(model_path, &config)
            .map_err(|e| ServiceError::Inference(e.to_string()))?;

        Ok(Box::new(Ct2Engine {
            translator: Mutex::new(translator),
            device: resolved,
            beam_size: self.beam_size,
            max_decoding_length: self.max_decoding_length,
        }))
    }
}

/// CTranslate2 has no runtime "auto"; an accelerator is tried first and the
/// loader falls back to the CPU when that fails. Builds without the `cuda`
/// feature always take the fallback.
fn resolve_device(device: Device) -> (Ct2Device, Device) {
    match device {
        Device::Auto | Device::Cuda => (Ct2Device::CUDA, Device::Cuda),
        Device::Cpu => (Ct2Device::CPU, Device::Cpu),
    }
}

pub struct Ct2Engine {
    translator: Mutex<Translator>,
    device: Device,
    beam_size: usize,
    max_decoding_length: usize,
}

impl InferenceEngine for Ct2Engine {
    fn device(&self) -> Device {
        self.device
    }

    fn translate_batch(
        &self,
        source: &[Vec<String>],
        target_prefix: &[Vec<String>],
    ) -> Result<Vec<BatchOutput>, ServiceError> {
        let options = TranslationOptions::<String, String> {
            beam_size: self.beam_size,
            max_decoding_length: self.max_decoding_length,
            ..Default::default()
        };

        let results = self
            .translator
            .lock()
            .translate_batch_with_target_prefix(source, target_prefix, &options, None)
            .map_err(|e| ServiceError::Inference(e.to_string()))?;

        Ok(results
            .into_iter()
            .map(|result| BatchOutput {
                hypotheses: result.hypotheses,
            })
            .collect())
    }
}
