//! One-shot conversion of a Hugging Face checkpoint into a quantized
//! CTranslate2 model directory.
//!
//! The conversion itself is delegated to CTranslate2's transformers converter;
//! this module builds its invocation and checks what it produced.

use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
};

use tracing::{info, warn};

use crate::{config::ConversionConfig, error::ConversionError};

/// Weights file every CTranslate2 model directory contains.
pub const MODEL_FILE: &str = "model.bin";

#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub model_name: String,
    pub output_dir: String,
    pub quantization: String,
    pub size_bytes: u64,
}

pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// Converter arguments. `--force` overwrites any previous output.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--model".to_string(),
            self.config.model_name.clone(),
            "--output_dir".to_string(),
            self.config.output_dir.display().to_string(),
            "--quantization".to_string(),
            self.config.quantization.clone(),
            "--force".to_string(),
        ]
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.config.converter_program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }

    pub fn run(&self) -> Result<ConversionSummary, ConversionError> {
        info!(model = %self.config.model_name, "starting conversion");
        info!(output_dir = %self.config.output_dir.display(), quantization = %self.config.quantization, "output directory");

        let status = self
            .command()
            .status()
            .map_err(|source| ConversionError::Launch {
                program: self.config.converter_program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ConversionError::Failed(status));
        }

        let size_bytes = validate_artifact(&self.config.output_dir)?;

        Ok(ConversionSummary {
            model_name: self.config.model_name.clone(),
            output_dir: self.config.output_dir.display().to_string(),
            quantization: self.config.quantization.clone(),
            size_bytes,
        })
    }
}

/// Checks that `dir` holds a model and returns its total size.
pub fn validate_artifact(dir: &Path) -> Result<u64, ConversionError> {
    if !dir.join(MODEL_FILE).is_file() {
        return Err(ConversionError::MissingArtifact(dir.join(MODEL_FILE)));
    }
    Ok(artifact_size(dir)?)
}

/// Total size of the files under `path`. Symlinks are not followed and
/// count as zero, so a link cycle cannot recurse forever.
pub fn artifact_size(path: &Path) -> std::io::Result<u64> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        warn!(path = %path.display(), "skipping symlink in model directory");
        return Ok(0);
    }
    if metadata.is_file() {
        return Ok(metadata.len());
    }

    let mut total = 0;
    for entry in fs::read_dir(path)? {
        total += artifact_size(&entry?.path())?;
    }
    Ok(total)
}
