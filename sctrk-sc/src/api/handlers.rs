//! HTTP request handlers

use super::AppContext;
use crate::session::SessionSnapshot;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SceneRequest {
    pub value: String,
    /// Decoded region as a fraction of the frame area
    #[serde(default = "default_region_fraction")]
    pub region_fraction: f64,
}

fn default_region_fraction() -> f64 {
    0.25
}

#[derive(Debug, Deserialize)]
pub struct ButtonRequest {
    pub pressed: bool,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn api_error(code: StatusCode, status: impl Into<String>) -> ApiError {
    (
        code,
        Json(StatusResponse {
            status: status.into(),
        }),
    )
}

fn ok(status: &str) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: status.to_string(),
    })
}

// ============================================================================
// Health
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "scan_controller".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        running: ctx.engine.is_running(),
    })
}

// ============================================================================
// Session
// ============================================================================

/// GET /api/v1/session - current snapshot
pub async fn get_session(State(ctx): State<AppContext>) -> Json<SessionSnapshot> {
    Json(ctx.engine.snapshot())
}

/// POST /api/v1/session/reset - start a new session
pub async fn reset_session(
    State(ctx): State<AppContext>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    match ctx.engine.reset() {
        Ok(snapshot) => {
            info!("Session reset via API");
            Ok(Json(snapshot))
        }
        Err(e) => {
            warn!("Reset rejected: {}", e);
            Err(api_error(StatusCode::CONFLICT, e.to_string()))
        }
    }
}

/// POST /api/v1/shutdown - stop the controller
pub async fn shutdown(State(ctx): State<AppContext>) -> (StatusCode, Json<StatusResponse>) {
    info!("Shutdown requested via API");
    ctx.shutdown.notify_one();
    (StatusCode::ACCEPTED, ok("shutting_down"))
}

// ============================================================================
// Simulation hooks
// ============================================================================

/// POST /api/v1/sim/scene - hold an identifier in front of the camera
pub async fn show_scene_item(
    State(ctx): State<AppContext>,
    Json(request): Json<SceneRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let scene = ctx
        .scene
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "simulation disabled"))?;

    if request.value.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "value must not be empty"));
    }

    scene.show(request.value, request.region_fraction);
    Ok(ok("ok"))
}

/// DELETE /api/v1/sim/scene - clear the camera view
pub async fn clear_scene(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, ApiError> {
    let scene = ctx
        .scene
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "simulation disabled"))?;

    scene.clear();
    Ok(ok("ok"))
}

/// POST /api/v1/sim/button - press or release the soft trigger
pub async fn set_button(
    State(ctx): State<AppContext>,
    Json(request): Json<ButtonRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let trigger = ctx
        .soft_trigger
        .as_ref()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "simulation disabled"))?;

    if request.pressed {
        trigger.press();
    } else {
        trigger.release();
    }
    Ok(ok("ok"))
}
