use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{ModelRegistry, Prediction},
    page::render_index,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

pub fn build_router(config: Arc<AppConfig>, registry: Arc<ModelRegistry>) -> Router {
    let body_limit = config.max_upload_bytes;
    let state = AppState { registry };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/get-model-details", get(model_details))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.registry.summaries()))
}

async fn model_details(State(state): State<AppState>) -> Response {
    match serde_json::to_vec(state.registry.metadata_document()) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            tracing::error!(%err, "failed to serialise model metadata");
            let body = serde_json::json!({ "error": "Failed to load model details" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

struct PredictForm {
    model: String,
    image: Vec<u8>,
}

impl PredictForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut model = None;
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| form_error("failed to read form", e))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("model") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| form_error("failed to read field 'model'", e))?;
                    model = Some(value);
                }
                Some("image") => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| form_error("failed to read field 'image'", e))?;
                    image = Some(data.to_vec());
                }
                other => {
                    tracing::debug!(field = ?other, "ignoring unknown form field");
                }
            }
        }

        let model =
            model.ok_or_else(|| ServiceError::BadRequest("missing form field 'model'".into()))?;
        let image =
            image.ok_or_else(|| ServiceError::BadRequest("missing form field 'image'".into()))?;

        Ok(Self { model, image })
    }
}

fn form_error(context: &str, err: MultipartError) -> ServiceError {
    let message = format!("{context}: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(message)
    } else {
        ServiceError::BadRequest(message)
    }
}

async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ServiceError> {
    let multipart = multipart.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let form = PredictForm::read(multipart).await?;

    info!(model = %form.model, bytes = form.image.len(), "running prediction");
    let prediction = state.registry.predict(&form.model, form.image).await?;
    info!(
        model = %form.model,
        class = %prediction.predicted_class,
        confidence = prediction.confidence,
        "prediction complete"
    );

    Ok(Json(prediction))
}
