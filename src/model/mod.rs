mod backend;
mod loader;
mod metadata;
mod preprocess;
mod registry;
mod types;

#[cfg(feature = "tch-backend")]
pub mod tch_backend;

pub use backend::{ArtifactLoader, Classifier};
pub use loader::{LoadedModel, ModelArtifacts, resolve_artifact};
pub use metadata::{ModelCatalog, ModelMetadata};
pub use preprocess::{Preprocessing, load_image, preprocess};
pub use registry::ModelRegistry;
pub use types::{ModelSummary, Prediction};
