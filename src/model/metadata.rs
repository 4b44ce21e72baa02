use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ServiceError;

/// Per-model record from the metadata document. Everything besides the label
/// list (description, accuracy, precision, ...) is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelMetadata {
    pub class_labels: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parsed metadata plus the document it came from. The raw document is what
/// `/get-model-details` serves so clients see exactly what was loaded.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    document: Value,
    models: Vec<(String, ModelMetadata)>,
}

impl ModelCatalog {
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ServiceError::Metadata(format!("cannot read {}: {e}", path.display()))
        })?;
        let document: Value = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Metadata(format!("{}: {e}", path.display())))?;
        Self::from_document(document)
    }

    pub fn from_document(document: Value) -> Result<Self, ServiceError> {
        let entries = document
            .get("models")
            .and_then(Value::as_object)
            .ok_or_else(|| ServiceError::Metadata("missing top-level \"models\" object".into()))?;

        let models = entries
            .iter()
            .map(|(name, record)| {
                let metadata = ModelMetadata::deserialize(record)
                    .map_err(|e| ServiceError::Metadata(format!("model '{name}': {e}")))?;
                Ok((name.clone(), metadata))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok(Self { document, models })
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn get(&self, name: &str) -> Option<&ModelMetadata> {
        self.models
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, metadata)| metadata)
    }

    /// Declared models in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelMetadata)> {
        self.models.iter().map(|(name, meta)| (name.as_str(), meta))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
