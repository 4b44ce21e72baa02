use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Model '{0}' is not available.")]
    UnknownModel(String),
    #[error("Preprocessing for model '{0}' is not defined.")]
    PreprocessingUndefined(String),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("upload too large: {0}")]
    PayloadTooLarge(String),
    #[error("invalid image: {0}")]
    ImageDecode(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("model '{model}' produced {outputs} scores but declares {labels} class labels")]
    LabelMismatch {
        model: String,
        outputs: usize,
        labels: usize,
    },
    #[error("metadata error: {0}")]
    Metadata(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UnknownModel(_)
            | ServiceError::PreprocessingUndefined(_)
            | ServiceError::BadRequest(_)
            | ServiceError::ImageDecode(_) => StatusCode::BAD_REQUEST,
            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Inference(_)
            | ServiceError::LabelMismatch { .. }
            | ServiceError::Metadata(_)
            | ServiceError::ModelLoad(_)
            | ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<image::ImageError> for ServiceError {
    fn from(err: image::ImageError) -> Self {
        ServiceError::ImageDecode(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
