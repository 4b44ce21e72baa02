use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_classifier_service::{AppConfig, ModelRegistry, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        metadata = %config.metadata_path.display(),
        models_dir = %config.models_dir.display(),
        "loading model artifacts"
    );

    let registry = Arc::new(load_registry(config.as_ref())?);
    tracing::info!(
        loaded = ?registry.loaded_models(),
        declared = registry.catalog().len(),
        "model registry ready"
    );
    let router = build_router(config.clone(), registry);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(feature = "tch-backend")]
fn load_registry(config: &AppConfig) -> anyhow::Result<ModelRegistry> {
    let loader = image_classifier_service::model::tch_backend::TorchScriptLoader::new(config);
    Ok(ModelRegistry::initialize(config, &loader)?)
}

#[cfg(not(feature = "tch-backend"))]
fn load_registry(_config: &AppConfig) -> anyhow::Result<ModelRegistry> {
    anyhow::bail!("built without an inference backend; enable the `tch-backend` feature")
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
