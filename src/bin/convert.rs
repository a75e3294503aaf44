//! Converts the NLLB checkpoint into a quantized CTranslate2 model directory.

use nllb_translation_service::{ConversionConfig, Converter, telemetry::init_tracing};

fn main() {
    init_tracing();

    let converter = Converter::new(ConversionConfig::from_env());
    match converter.run() {
        Ok(summary) => {
            tracing::info!(
                model = %summary.model_name,
                quantization = %summary.quantization,
                output_dir = %summary.output_dir,
                size_bytes = summary.size_bytes,
                "conversion successful"
            );
        }
        Err(err) => {
            tracing::error!("error during conversion: {err}");
            std::process::exit(1);
        }
    }
}
