use crate::app_state::AppState;
use crate::services::model_handle::ModelInfo;
use axum::Json;
use axum::extract::State;

pub async fn get_model(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.handler.model().info())
}
