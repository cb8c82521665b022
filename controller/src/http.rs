use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use tokio::sync::Mutex;
use tracing::warn;

use crate::control::Controller;
use crate::store::{ConfigStore, FsStorage, HistoryLog};
use crate::telemetry::MqttTelemetry;

pub type HostController = Controller<FsStorage, MqttTelemetry>;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<HostController>>,
    pub setpoint: ConfigStore<FsStorage>,
    pub history: HistoryLog<FsStorage>,
    pub setpoint_step: f32,
}

pub async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = {
        let controller = state.controller.lock().await;
        controller.status()
    };
    Json(status)
}

pub async fn handle_target_increment(State(state): State<AppState>) -> impl IntoResponse {
    adjust_target(state, 1.0).await
}

pub async fn handle_target_decrement(State(state): State<AppState>) -> impl IntoResponse {
    adjust_target(state, -1.0).await
}

pub async fn handle_get_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.history.read_all().await)
}

/// Step the setpoint and persist it. The in-memory target always moves;
/// a failed persist is logged and the new state still returned, since the
/// controller keeps tracking the updated setpoint either way.
async fn adjust_target(state: AppState, direction: f32) -> axum::response::Response {
    let new_target = {
        let mut controller = state.controller.lock().await;
        let next = controller.target() + direction * state.setpoint_step;
        controller.set_target(next);
        controller.target()
    };

    if let Err(err) = state.setpoint.save(new_target).await {
        warn!("failed to persist setpoint {new_target}: {err}");
    }

    handle_get_status(State(state)).await.into_response()
}
