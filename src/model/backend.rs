use std::{path::Path, sync::Arc};

use ndarray::Array4;

use crate::error::ServiceError;

/// A loaded model that maps a preprocessed batch of one image to class scores.
pub trait Classifier: Send + Sync {
    fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>, ServiceError>;
}

/// Turns an artifact on disk into a [`Classifier`].
pub trait ArtifactLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn Classifier>, ServiceError>;
}

impl<F> ArtifactLoader for F
where
    F: Fn(&Path) -> Result<Arc<dyn Classifier>, ServiceError>,
{
    fn load(&self, path: &Path) -> Result<Arc<dyn Classifier>, ServiceError> {
        self(path)
    }
}
