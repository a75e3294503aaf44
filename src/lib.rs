pub mod config;
pub mod conversion;
pub mod error;
pub mod languages;
pub mod model;
pub mod server;
pub mod telemetry;

pub use config::{AppConfig, ConversionConfig};
pub use conversion::Converter;
pub use languages::{LanguageTable, map_lang};
pub use model::{ModelRegistry, TranslationRequest, TranslationResponse};
pub use server::build_router;
