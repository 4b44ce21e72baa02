use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::task;

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{
        ArtifactLoader, ModelCatalog, ModelSummary, Prediction,
        loader::{LoadedModel, ModelArtifacts},
    },
};

/// Models available for the lifetime of the process. Built once before the
/// listener binds and shared read-only behind an `Arc`.
pub struct ModelRegistry {
    catalog: ModelCatalog,
    models: HashMap<String, LoadedModel>,
    upload_dir: PathBuf,
}

impl ModelRegistry {
    pub fn initialize(
        config: &AppConfig,
        loader: &dyn ArtifactLoader,
    ) -> Result<Self, ServiceError> {
        let artifacts = ModelArtifacts::load(config, loader)?;
        Ok(Self::from_artifacts(artifacts, config))
    }

    pub fn from_artifacts(artifacts: ModelArtifacts, config: &AppConfig) -> Self {
        let models = artifacts
            .models
            .into_iter()
            .map(|model| (model.name.clone(), model))
            .collect();
        Self {
            catalog: artifacts.catalog,
            models,
            upload_dir: config.upload_dir.clone(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// The metadata document exactly as it was read at startup.
    pub fn metadata_document(&self) -> &Value {
        self.catalog.document()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Loaded model names in metadata order.
    pub fn loaded_models(&self) -> Vec<&str> {
        self.catalog
            .iter()
            .map(|(name, _)| name)
            .filter(|name| self.is_loaded(name))
            .collect()
    }

    pub fn summaries(&self) -> Vec<ModelSummary> {
        self.catalog
            .iter()
            .map(|(name, meta)| ModelSummary {
                name: name.to_string(),
                available: self.is_loaded(name),
                description: meta
                    .extra
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect()
    }

    pub async fn predict(
        &self,
        model_name: &str,
        image: Vec<u8>,
    ) -> Result<Prediction, ServiceError> {
        let model = self
            .models
            .get(model_name)
            .ok_or_else(|| ServiceError::UnknownModel(model_name.to_string()))?;
        let preprocessing = model
            .preprocessing
            .ok_or_else(|| ServiceError::PreprocessingUndefined(model_name.to_string()))?;
        let labels = self
            .catalog
            .get(model_name)
            .map(|meta| meta.class_labels.clone())
            .ok_or_else(|| {
                ServiceError::Metadata(format!("no metadata for loaded model '{model_name}'"))
            })?;

        let classifier = model.classifier.clone();
        let upload_dir = self.upload_dir.clone();
        let name = model_name.to_string();

        task::spawn_blocking(move || {
            // Removed from disk when dropped, on every return path.
            let upload = stage_upload(&upload_dir, &image)?;
            let batch = preprocessing.apply_to_path(upload.path())?;
            let scores = classifier.predict(&batch)?;
            Prediction::from_scores(&name, &scores, &labels)
        })
        .await
        .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))?
    }
}

fn stage_upload(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile, ServiceError> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".img")
        .tempfile_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}
