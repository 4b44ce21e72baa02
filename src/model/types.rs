use serde::Serialize;

use crate::error::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_class: String,
    pub confidence: f64,
}

impl Prediction {
    /// Pick the highest score (first one on ties) and report it as a
    /// percentage rounded to two decimals.
    pub fn from_scores(
        model: &str,
        scores: &[f32],
        labels: &[String],
    ) -> Result<Self, ServiceError> {
        if scores.len() != labels.len() {
            return Err(ServiceError::LabelMismatch {
                model: model.to_string(),
                outputs: scores.len(),
                labels: labels.len(),
            });
        }

        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(ServiceError::Inference(format!(
                "model '{model}' produced a non-finite score ({bad})"
            )));
        }

        let (index, score) = argmax(scores).ok_or_else(|| {
            ServiceError::Inference(format!("model '{model}' returned no scores"))
        })?;

        Ok(Self {
            predicted_class: labels[index].clone(),
            confidence: round_percent(score),
        })
    }
}

fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((index, score)),
        }
    }
    best
}

fn round_percent(probability: f32) -> f64 {
    (f64::from(probability) * 100.0 * 100.0).round() / 100.0
}

/// Entry of the model picker on the index page.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub available: bool,
    pub description: Option<String>,
}
