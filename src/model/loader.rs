use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{ArtifactLoader, Classifier, ModelCatalog, Preprocessing},
};

pub struct LoadedModel {
    pub name: String,
    pub preprocessing: Option<Preprocessing>,
    pub classifier: Arc<dyn Classifier>,
}

/// Everything loaded from disk at startup.
pub struct ModelArtifacts {
    pub catalog: ModelCatalog,
    pub models: Vec<LoadedModel>,
}

impl ModelArtifacts {
    pub fn load(config: &AppConfig, loader: &dyn ArtifactLoader) -> Result<Self, ServiceError> {
        let catalog = ModelCatalog::load(&config.metadata_path)?;
        Self::load_with_catalog(catalog, config, loader)
    }

    pub fn load_with_catalog(
        catalog: ModelCatalog,
        config: &AppConfig,
        loader: &dyn ArtifactLoader,
    ) -> Result<Self, ServiceError> {
        let mut models = Vec::new();

        for (name, _) in catalog.iter() {
            let Some(artifact_path) =
                resolve_artifact(&config.models_dir, name, &config.artifact_extensions)
            else {
                warn!(model = name, dir = %config.models_dir.display(), "skipping model (file not found)");
                continue;
            };

            let classifier = loader.load(&artifact_path)?;
            let preprocessing = Preprocessing::for_model(name).ok();
            info!(model = name, path = %artifact_path.display(), ?preprocessing, "loaded model");

            models.push(LoadedModel {
                name: name.to_string(),
                preprocessing,
                classifier,
            });
        }

        let unhandled: Vec<&str> = models
            .iter()
            .filter(|m| m.preprocessing.is_none())
            .map(|m| m.name.as_str())
            .collect();
        if !unhandled.is_empty() {
            if config.strict_preprocessing {
                return Err(ServiceError::ModelLoad(format!(
                    "no preprocessing rule for loaded models: {}",
                    unhandled.join(", ")
                )));
            }
            warn!(models = ?unhandled, "loaded models have no preprocessing rule; requests for them will be rejected");
        }

        Ok(Self { catalog, models })
    }
}

/// First existing `<dir>/<name>.<ext>` in extension order.
pub fn resolve_artifact(dir: &Path, name: &str, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|path| path.is_file())
}
