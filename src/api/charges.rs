//! HTTP surface for the card-charge flow: one endpoint to open a charge
//! and one per challenge follow-up. Success and challenge replies go out
//! as-is; every failure is an [`AppError`] rendered through the shared
//! error envelope.

use crate::charges::service::ChargeService;
use crate::charges::types::{ChargeReply, ChargeRequest, OtpRequest, PinRequest};
use crate::error::AppError;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChargesState {
    pub service: Arc<ChargeService>,
}

/// Actor identity taken from the `x-actor-id` header. The upstream edge
/// terminates authentication; this service only needs the resolved id.
pub struct AuthenticatedActor(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Validation {
                message: "x-actor-id header is required".to_string(),
                field: Some("x-actor-id".to_string()),
            })?;

        let actor_id = Uuid::parse_str(header).map_err(|_| AppError::Validation {
            message: "x-actor-id must be a UUID".to_string(),
            field: Some("x-actor-id".to_string()),
        })?;
        Ok(AuthenticatedActor(actor_id))
    }
}

pub async fn process_charge(
    State(state): State<ChargesState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<ChargeReply>, AppError> {
    let reply = state.service.charge(actor_id, request).await?;
    Ok(Json(reply))
}

pub async fn submit_pin(
    State(state): State<ChargesState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Json(request): Json<PinRequest>,
) -> Result<Json<ChargeReply>, AppError> {
    let reply = state.service.submit_pin(actor_id, request).await?;
    Ok(Json(reply))
}

pub async fn submit_otp(
    State(state): State<ChargesState>,
    AuthenticatedActor(actor_id): AuthenticatedActor,
    Json(request): Json<OtpRequest>,
) -> Result<Json<ChargeReply>, AppError> {
    let reply = state.service.submit_otp(actor_id, request).await?;
    Ok(Json(reply))
}
