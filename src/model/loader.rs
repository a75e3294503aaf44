use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tracing::{error, info, warn};

use crate::{
    config::AppConfig,
    conversion::artifact_size,
    error::{LoadError, ServiceError},
    languages::{DEFAULT_SOURCE_TAG, LanguageTable},
    model::{
        Device, EngineBackend, InferenceEngine, MaskPolicy, TranslationRequest, TranslationResponse,
        tokenizer::{NllbTokenizer, TextCodec},
    },
};

const WARMUP_TOKEN: &str = "test";

/// Tokenizer and engine, ready to serve requests.
pub struct LoadedModel {
    codec: Arc<dyn TextCodec>,
    engine: Arc<dyn InferenceEngine>,
    model_path: PathBuf,
    size_bytes: Option<u64>,
}

impl LoadedModel {
    pub fn new(
        codec: Arc<dyn TextCodec>,
        engine: Arc<dyn InferenceEngine>,
        model_path: impl Into<PathBuf>,
    ) -> Self {
        let model_path = model_path.into();
        let size_bytes = artifact_size(&model_path).ok();
        Self {
            codec,
            engine,
            model_path,
            size_bytes,
        }
    }

    /// Brings up tokenizer and engine for `config`, falling back from the
    /// configured device to the CPU once.
    pub fn load(
        config: &AppConfig,
        backend: &dyn EngineBackend,
        mask: MaskPolicy,
    ) -> Result<Self, LoadError> {
        if !config.model_path.exists() {
            return Err(LoadError::MissingArtifact(config.model_path.clone()));
        }

        let codec =
            NllbTokenizer::load(config).map_err(|e| LoadError::Tokenizer(e.to_string()))?;
        let engine = load_engine(backend, &config.model_path, config.device, mask)?;

        Ok(Self::new(
            Arc::new(codec),
            Arc::from(engine),
            config.model_path.clone(),
        ))
    }

    pub fn device(&self) -> Device {
        self.engine.device()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    /// Translates one request.
    ///
    /// Source and target tags missing from the tokenizer vocabulary are
    /// rejected here instead of being decoded through `<unk>`, which would
    /// still produce text, just in an arbitrary language.
    pub fn translate(
        &self,
        languages: &LanguageTable,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse, ServiceError> {
        let start = Instant::now();

        let (source_lang, target_lang) =
            languages.resolve_pair(&request.source_lang, &request.target_lang);
        if !self.codec.has_token(&target_lang) {
            return Err(ServiceError::Tokenizer(format!(
                "unknown target language tag '{target_lang}'"
            )));
        }

        let source = self.codec.encode(&request.text, &source_lang)?;
        let results = self
            .engine
            .translate_batch(&[source], &[vec![target_lang.clone()]])?;

        let best = results
            .into_iter()
            .next()
            .and_then(|result| result.hypotheses.into_iter().next())
            .ok_or_else(|| ServiceError::Inference("engine returned no hypothesis".into()))?;
        let translation = self.codec.decode(&best)?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            source = %source_lang,
            target = %target_lang,
            chars = request.text.chars().count(),
            "translated"
        );

        Ok(TranslationResponse { translation })
    }
}

/// Loads the engine on `preferred`, then on the CPU if that attempt (or its
/// warmup) fails. Accelerators are hidden for the CPU attempt only under
/// [`MaskPolicy::Mask`]. No further retries.
pub fn load_engine(
    backend: &dyn EngineBackend,
    model_path: &Path,
    preferred: Device,
    mask: MaskPolicy,
) -> Result<Box<dyn InferenceEngine>, LoadError> {
    info!(backend = backend.name(), device = %preferred, path = %model_path.display(), "loading model");

    let primary = match try_load(backend, model_path, preferred) {
        Ok(engine) => {
            info!(device = %engine.device(), "model loaded");
            return Ok(engine);
        }
        Err(err) => err,
    };

    if preferred == Device::Cpu {
        error!(error = %primary, "failed to load model on cpu");
        return Err(LoadError::Device {
            device: preferred.to_string(),
            reason: primary.to_string(),
        });
    }

    warn!(device = %preferred, error = %primary, "model load failed, falling back to cpu");
    match mask {
        MaskPolicy::Mask => backend.mask_accelerators(),
        MaskPolicy::KeepVisible => {
            warn!("accelerated devices stay visible; they can only be hidden at startup")
        }
    }

    match try_load(backend, model_path, Device::Cpu) {
        Ok(engine) => {
            info!(device = %engine.device(), "model loaded on cpu");
            Ok(engine)
        }
        Err(fallback) => {
            error!(error = %fallback, "failed to load model on cpu");
            Err(LoadError::AllDevicesFailed {
                primary_device: preferred.to_string(),
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            })
        }
    }
}

fn try_load(
    backend: &dyn EngineBackend,
    model_path: &Path,
    device: Device,
) -> Result<Box<dyn InferenceEngine>, ServiceError> {
    let engine = backend.load(model_path, device)?;
    warmup(engine.as_ref())?;
    Ok(engine)
}

/// Forces lazily initialized device libraries to load now instead of on the
/// first request.
fn warmup(engine: &dyn InferenceEngine) -> Result<(), ServiceError> {
    engine.translate_batch(
        &[vec![WARMUP_TOKEN.to_string()]],
        &[vec![DEFAULT_SOURCE_TAG.to_string()]],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BatchOutput;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Load(Device),
        Warmup(Device),
        Mask,
    }

    #[derive(Default)]
    struct RecordingBackend {
        events: Arc<Mutex<Vec<Event>>>,
        fail_load: Vec<Device>,
        fail_warmup: Vec<Device>,
    }

    impl RecordingBackend {
        fn events(&self) -> Vec<Event> {
            self.events.lock().clone()
        }
    }

    struct RecordingEngine {
        device: Device,
        events: Arc<Mutex<Vec<Event>>>,
        fail: bool,
    }

    impl InferenceEngine for RecordingEngine {
        fn device(&self) -> Device {
            self.device
        }

        fn translate_batch(
            &self,
            source: &[Vec<String>],
            target_prefix: &[Vec<String>],
        ) -> Result<Vec<BatchOutput>, ServiceError> {
            assert_eq!(source, &[vec!["test".to_string()]]);
            assert_eq!(target_prefix, &[vec!["eng_Latn".to_string()]]);
            self.events.lock().push(Event::Warmup(self.device));
            if self.fail {
                return Err(ServiceError::Inference("cuBLAS failed to initialize".into()));
            }
            Ok(vec![BatchOutput::default()])
        }
    }

    impl EngineBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn load(
            &self,
            _model_path: &Path,
            device: Device,
        ) -> Result<Box<dyn InferenceEngine>, ServiceError> {
            self.events.lock().push(Event::Load(device));
            if self.fail_load.contains(&device) {
                return Err(ServiceError::Inference(format!("no {device} device")));
            }
            Ok(Box::new(RecordingEngine {
                device,
                events: self.events.clone(),
                fail: self.fail_warmup.contains(&device),
            }))
        }

        fn mask_accelerators(&self) {
            self.events.lock().push(Event::Mask);
        }
    }

    fn path() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
    }

    #[test]
    fn test_auto_success_loads_once() {
        let backend = RecordingBackend::default();
        let engine = load_engine(&backend, path(), Device::Auto, MaskPolicy::Mask).unwrap();
        assert_eq!(engine.device(), Device::Auto);
        assert_eq!(
            backend.events(),
            vec![Event::Load(Device::Auto), Event::Warmup(Device::Auto)]
        );
    }

    #[test]
    fn test_auto_load_failure_falls_back_to_masked_cpu() {
        let backend = RecordingBackend {
            fail_load: vec![Device::Auto],
            ..Default::default()
        };
        let engine = load_engine(&backend, path(), Device::Auto, MaskPolicy::Mask).unwrap();
        assert_eq!(engine.device(), Device::Cpu);
        assert_eq!(
            backend.events(),
            vec![
                Event::Load(Device::Auto),
                Event::Mask,
                Event::Load(Device::Cpu),
                Event::Warmup(Device::Cpu),
            ]
        );
    }

    #[test]
    fn test_warmup_failure_triggers_fallback() {
        let backend = RecordingBackend {
            fail_warmup: vec![Device::Auto],
            ..Default::default()
        };
        let engine = load_engine(&backend, path(), Device::Auto, MaskPolicy::Mask).unwrap();
        assert_eq!(engine.device(), Device::Cpu);
        assert_eq!(
            backend.events(),
            vec![
                Event::Load(Device::Auto),
                Event::Warmup(Device::Auto),
                Event::Mask,
                Event::Load(Device::Cpu),
                Event::Warmup(Device::Cpu),
            ]
        );
    }

    #[test]
    fn test_keep_visible_falls_back_without_masking() {
        let backend = RecordingBackend {
            fail_load: vec![Device::Auto],
            ..Default::default()
        };
        let engine = load_engine(&backend, path(), Device::Auto, MaskPolicy::KeepVisible).unwrap();
        assert_eq!(engine.device(), Device::Cpu);
        assert_eq!(
            backend.events(),
            vec![
                Event::Load(Device::Auto),
                Event::Load(Device::Cpu),
                Event::Warmup(Device::Cpu),
            ]
        );
    }

    #[test]
    fn test_both_attempts_failing_is_permanent() {
        let backend = RecordingBackend {
            fail_load: vec![Device::Cuda],
            fail_warmup: vec![Device::Cpu],
            ..Default::default()
        };
        let err = load_engine(&backend, path(), Device::Cuda, MaskPolicy::Mask).err().unwrap();
        match err {
            LoadError::AllDevicesFailed {
                primary_device,
                primary,
                fallback,
            } => {
                assert_eq!(primary_device, "cuda");
                assert!(primary.contains("no cuda device"));
                assert!(fallback.contains("cuBLAS"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let loads = backend
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Load(_)))
            .count();
        assert_eq!(loads, 2);
    }

    #[test]
    fn test_cpu_preference_makes_single_attempt() {
        let backend = RecordingBackend {
            fail_load: vec![Device::Cpu],
            ..Default::default()
        };
        let err = load_engine(&backend, path(), Device::Cpu, MaskPolicy::Mask).err().unwrap();
        assert!(matches!(err, LoadError::Device { .. }));
        assert_eq!(backend.events(), vec![Event::Load(Device::Cpu)]);
    }

    #[test]
    fn test_missing_model_directory() {
        let config = AppConfig {
            model_path: PathBuf::from("/nonexistent/nllb-200-distilled-600M-int8"),
            ..AppConfig::default()
        };
        let backend = RecordingBackend::default();
        let err = LoadedModel::load(&config, &backend, MaskPolicy::Mask).err().unwrap();
        assert!(matches!(err, LoadError::MissingArtifact(_)));
        assert!(backend.events().is_empty());
    }
}
