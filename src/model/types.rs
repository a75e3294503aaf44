use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ServiceError,
    languages::{AUTODETECT, DEFAULT_TARGET_TAG},
};

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
}

fn default_source_lang() -> String {
    AUTODETECT.to_string()
}

fn default_target_lang() -> String {
    DEFAULT_TARGET_TAG.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationResponse {
    pub translation: String,
}

/// Compute device requested from the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Let the engine pick; prefers an accelerator.
    Auto,
    Cuda,
    Cpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Auto => "auto",
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        };
        f.write_str(name)
    }
}

impl FromStr for Device {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            other if other.starts_with("cuda") || other.starts_with("gpu") => Ok(Device::Cuda),
            other => Err(ServiceError::Config(format!("unknown device '{other}'"))),
        }
    }
}

/// One entry of a batch translation: n-best target token sequences.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub hypotheses: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub loaded: bool,
    pub model_path: PathBuf,
    pub device: Option<Device>,
    pub size_bytes: Option<u64>,
    pub languages: usize,
    pub error: Option<String>,
}
