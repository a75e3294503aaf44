use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task;
use tracing::{error, warn};

use crate::{
    config::AppConfig,
    error::{LoadError, ServiceError},
    languages::LanguageTable,
    model::{
        EngineBackend, MaskPolicy, ModelMetadata, TranslationRequest, TranslationResponse,
        loader::LoadedModel,
    },
};

enum ModelState {
    Loaded(Arc<LoadedModel>),
    Unavailable(LoadError),
}

/// Process-wide model state shared by all request handlers.
pub struct ModelRegistry {
    config: AppConfig,
    backend: Arc<dyn EngineBackend>,
    languages: Arc<LanguageTable>,
    state: RwLock<ModelState>,
}

impl ModelRegistry {
    /// Runs the load sequence once. Never fails: an unavailable model is
    /// recorded and reported on every translation request.
    ///
    /// A CPU fallback here may hide accelerators through the environment, so
    /// call this before the async runtime (or any other thread) is started.
    pub fn initialize(
        config: &AppConfig,
        backend: Arc<dyn EngineBackend>,
        languages: LanguageTable,
    ) -> Self {
        let state = load_state(config, backend.as_ref(), MaskPolicy::Mask);
        Self {
            config: config.clone(),
            backend,
            languages: Arc::new(languages),
            state: RwLock::new(state),
        }
    }

    /// Registry around an already loaded model.
    pub fn with_model(
        config: &AppConfig,
        backend: Arc<dyn EngineBackend>,
        languages: LanguageTable,
        model: LoadedModel,
    ) -> Self {
        Self {
            config: config.clone(),
            backend,
            languages: Arc::new(languages),
            state: RwLock::new(ModelState::Loaded(Arc::new(model))),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.read(), ModelState::Loaded(_))
    }

    pub fn metadata(&self) -> ModelMetadata {
        match &*self.state.read() {
            ModelState::Loaded(model) => ModelMetadata {
                loaded: true,
                model_path: model.model_path().to_path_buf(),
                device: Some(model.device()),
                size_bytes: model.size_bytes(),
                languages: self.languages.len(),
                error: None,
            },
            ModelState::Unavailable(err) => ModelMetadata {
                loaded: false,
                model_path: self.config.model_path.clone(),
                device: None,
                size_bytes: None,
                languages: self.languages.len(),
                error: Some(err.to_string()),
            },
        }
    }

    /// Re-runs the full load sequence and swaps in the result. Runtime
    /// threads are live, so a CPU fallback leaves accelerators visible.
    pub async fn reload(self: &Arc<Self>) -> Result<ModelMetadata, ServiceError> {
        let registry = self.clone();
        let state = task::spawn_blocking(move || {
            load_state(
                &registry.config,
                registry.backend.as_ref(),
                MaskPolicy::KeepVisible,
            )
        })
        .await
        .map_err(|err| ServiceError::Inference(format!("reload task failed: {err}")))?;

        let loaded = matches!(state, ModelState::Loaded(_));
        *self.state.write() = state;

        if loaded {
            Ok(self.metadata())
        } else {
            Err(ServiceError::ModelUnavailable)
        }
    }

    pub async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ServiceError> {
        let model = match &*self.state.read() {
            ModelState::Loaded(model) => model.clone(),
            ModelState::Unavailable(_) => return Err(ServiceError::ModelUnavailable),
        };
        let languages = self.languages.clone();

        task::spawn_blocking(move || model.translate(&languages, &request))
            .await
            .map_err(|err| ServiceError::Inference(format!("translation task failed: {err}")))
            .and_then(|result| result)
            .map_err(|err| {
                error!(error = ?err, "translation failed");
                ServiceError::Translation(err.to_string())
            })
    }
}

fn load_state(config: &AppConfig, backend: &dyn EngineBackend, mask: MaskPolicy) -> ModelState {
    match LoadedModel::load(config, backend, mask) {
        Ok(model) => ModelState::Loaded(Arc::new(model)),
        Err(err @ LoadError::MissingArtifact(_)) => {
            warn!(error = %err, "model artifact not found; translation is disabled");
            warn!(
                "convert one with the `convert` binary, or: ct2-transformers-converter \
                 --model facebook/nllb-200-distilled-600M \
                 --output_dir nllb-200-distilled-600M-int8 --quantization int8"
            );
            ModelState::Unavailable(err)
        }
        Err(err) => {
            error!(error = %err, "model failed to load; translation is disabled");
            ModelState::Unavailable(err)
        }
    }
}
