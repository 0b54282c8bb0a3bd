use crate::model::RangeError;
use crate::services::model_handle::PredictionError;
use crate::services::prediction_handler::PREDICTION_FAILED_MESSAGE;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                message: PREDICTION_FAILED_MESSAGE.to_string(),
                detail: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for RangeError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                message: self.to_string(),
                detail: None,
            }),
        )
            .into_response()
    }
}
