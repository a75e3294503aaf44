mod engine;
mod loader;
mod registry;
mod tokenizer;
mod types;

#[cfg(feature = "ct2-backend")]
pub mod ct2;

use std::sync::Arc;

use crate::config::AppConfig;

pub use engine::{
    ACCELERATOR_MASK_VAR, EngineBackend, InferenceEngine, MaskPolicy, UnsupportedBackend,
};
pub use loader::{LoadedModel, load_engine};
pub use registry::ModelRegistry;
pub use tokenizer::{NllbTokenizer, TextCodec};
pub use types::{BatchOutput, Device, ModelMetadata, TranslationRequest, TranslationResponse};

/// Backend compiled into this build.
pub fn default_backend(config: &AppConfig) -> Arc<dyn EngineBackend> {
    #[cfg(feature = "ct2-backend")]
    {
        Arc::new(ct2::Ct2Backend::new(config))
    }
    #[cfg(not(feature = "ct2-backend"))]
    {
        let _ = config;
        Arc::new(UnsupportedBackend)
    }
}
