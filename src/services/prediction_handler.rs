use crate::model::{FeatureRecord, FeatureRow};
use crate::services::model_handle::{ModelHandle, PredictionError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

pub const PREDICTION_FAILED_MESSAGE: &str =
    "Prediction failed. Ensure the model file path is correct and matches training features.";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub capacity_mah: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Predicted { capacity_mah: f64, message: String },
    Failed { message: String, detail: String },
}

#[derive(Clone)]
pub struct PredictionHandler {
    model: Arc<ModelHandle>,
}

impl PredictionHandler {
    pub fn new(model: Arc<ModelHandle>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn predict(&self, record: &FeatureRecord) -> Result<Prediction, PredictionError> {
        self.predict_row(&record.to_row())
    }

    pub fn predict_row(&self, row: &FeatureRow) -> Result<Prediction, PredictionError> {
        let capacity_mah = self.model.predict(row)?;
        debug!("Predicted {} mAh for {:?}", capacity_mah, row);
        Ok(Prediction {
            capacity_mah,
            message: format!("Estimated Battery Capacity: {} mAh", format_capacity(capacity_mah)),
        })
    }

    /// Runs a form submission to completion, folding any error into the outcome.
    pub fn handle(&self, record: &FeatureRecord) -> PredictionOutcome {
        match self.predict(record) {
            Ok(prediction) => PredictionOutcome::Predicted {
                capacity_mah: prediction.capacity_mah,
                message: prediction.message,
            },
            Err(err) => {
                error!("Prediction failed: {}", err);
                PredictionOutcome::Failed {
                    message: PREDICTION_FAILED_MESSAGE.to_string(),
                    detail: err.to_string(),
                }
            }
        }
    }
}

/// Rounds to the nearest integer (ties to even) and groups thousands with commas.
pub fn format_capacity(value: f64) -> String {
    let rounded = value.round_ties_even();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
