use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use crate::model::Device;

pub const DEFAULT_MODEL_PATH: &str = "nllb-200-distilled-600M-int8";
pub const DEFAULT_TOKENIZER_ID: &str = "facebook/nllb-200-distilled-600M";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_path: PathBuf,
    pub tokenizer_id: String,
    pub tokenizer_path: Option<PathBuf>,
    pub device: Device,
    pub language_map_path: Option<PathBuf>,
    pub beam_size: usize,
    pub max_decoding_length: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            tokenizer_id: DEFAULT_TOKENIZER_ID.to_string(),
            tokenizer_path: None,
            device: Device::Auto,
            language_map_path: None,
            beam_size: 2,
            max_decoding_length: 256,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let listen_addr = env::var("SERVER_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.listen_addr);

        let model_path = env::var("MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.model_path);
        let tokenizer_id = env::var("TOKENIZER_ID").unwrap_or(defaults.tokenizer_id);
        let tokenizer_path = env::var("TOKENIZER_PATH").ok().map(PathBuf::from);

        let device = match env::var("DEVICE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.device,
        };

        let language_map_path = env::var("LANGUAGE_MAP_PATH").ok().map(PathBuf::from);

        let beam_size = env::var("BEAM_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.beam_size);
        let max_decoding_length = env::var("MAX_DECODING_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_decoding_length);

        Ok(Self {
            listen_addr,
            model_path,
            tokenizer_id,
            tokenizer_path,
            device,
            language_map_path,
            beam_size,
            max_decoding_length,
        })
    }
}

/// Inputs for the one-shot checkpoint conversion.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub model_name: String,
    pub output_dir: PathBuf,
    pub quantization: String,
    pub converter_program: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_TOKENIZER_ID.to_string(),
            output_dir: PathBuf::from(DEFAULT_MODEL_PATH),
            quantization: "int8".to_string(),
            converter_program: "ct2-transformers-converter".to_string(),
        }
    }
}

impl ConversionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_name: env::var("CONVERT_MODEL").unwrap_or(defaults.model_name),
            output_dir: env::var("CONVERT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            quantization: env::var("CONVERT_QUANTIZATION").unwrap_or(defaults.quantization),
            converter_program: env::var("CT2_CONVERTER").unwrap_or(defaults.converter_program),
        }
    }
}
