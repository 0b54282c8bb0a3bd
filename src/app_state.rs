use crate::services::prediction_handler::PredictionHandler;

/// Shared by every request. Holds the loaded model, which is never mutated.
#[derive(Clone)]
pub struct AppState {
    pub handler: PredictionHandler,
    pub page_title: String,
}
