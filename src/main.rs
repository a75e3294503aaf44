use std::sync::Arc;

use tokio::net::TcpListener;

use nllb_translation_service::{
    AppConfig, LanguageTable, ModelRegistry, build_router, model::default_backend,
    telemetry::init_tracing,
};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let languages = match config.language_map_path.as_deref() {
        Some(path) => LanguageTable::from_path(path)?,
        None => LanguageTable::builtin(),
    };

    // Loaded before the runtime starts: the device fallback edits the
    // process environment, which must happen while single-threaded.
    tracing::info!(path = %config.model_path.display(), "loading model artifacts");
    let registry = Arc::new(ModelRegistry::initialize(
        &config,
        default_backend(&config),
        languages,
    ));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(config, registry))
}

async fn serve(config: AppConfig, registry: Arc<ModelRegistry>) -> anyhow::Result<()> {
    let router = build_router(registry);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}
