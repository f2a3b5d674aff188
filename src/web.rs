//! # Charger Configuration API
//!
//! Accepts the user's charging goal over HTTP and republishes it onto the bus
//! as the charger's `webserver_charger_config` trigger.
//!
//! `POST /` and `POST /config` with `{"percentage": 20, "goal": 80}` answer
//! `200 Ok` once the message is on the bus.

use crate::bus::{Bus, Message};
use crate::core::Args;
use crate::domain::ChargerTrigger;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Body of a configuration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargerConfigRequest {
    pub percentage: i64,
    pub goal: i64,
}

impl ChargerConfigRequest {
    fn validate(&self) -> Result<(), String> {
        if self.percentage < 0 {
            return Err("percentage must not be negative".to_string());
        }
        if self.goal < 0 {
            return Err("goal must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ApiState {
    bus: Arc<dyn Bus>,
    charger_topic: Arc<str>,
}

impl ApiState {
    pub fn new(bus: Arc<dyn Bus>, charger_topic: &str) -> Self {
        Self {
            bus,
            charger_topic: Arc::from(charger_topic),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Body is not a configuration request (422).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Values are out of range (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// The bus refused the message (503).
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::BadRequest(_) => (StatusCode::UNPROCESSABLE_ENTITY, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        };
        if let Self::Unavailable(_) = &self {
            warn!(error = %self, "Configuration not forwarded");
        }
        let body = ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", post(configure_charger))
        .route("/config", post(configure_charger))
        .with_state(state)
}

async fn configure_charger(
    State(state): State<ApiState>,
    payload: Result<Json<ChargerConfigRequest>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    request.validate().map_err(ApiError::Validation)?;

    info!(
        percentage = request.percentage,
        goal = request.goal,
        "Received charger configuration"
    );
    let message = Message::of(
        ChargerTrigger::Config,
        Args::from([request.percentage, request.goal]),
    );
    state
        .bus
        .publish_message(&state.charger_topic, &message)
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok("Ok")
}
