use crate::app_error::ErrorResponse;
use crate::app_state::AppState;
use crate::model::FeatureRecord;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

pub async fn post_predict(
    State(state): State<AppState>,
    payload: Result<Json<FeatureRecord>, JsonRejection>,
) -> Response {
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => {
            warn!("Rejected prediction request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(ErrorResponse {
                    message: "Invalid prediction request".to_string(),
                    detail: Some(rejection.body_text()),
                }),
            )
                .into_response();
        }
    };

    if let Err(err) = record.check_ranges() {
        warn!("Rejected prediction request: {}", err);
        return err.into_response();
    }

    match state.handler.predict(&record) {
        Ok(prediction) => Json(prediction).into_response(),
        Err(err) => {
            error!("Prediction failed: {}", err);
            err.into_response()
        }
    }
}
