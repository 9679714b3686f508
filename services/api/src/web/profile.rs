//! services/api/src/web/profile.rs
//!
//! The signed-in user's own area: profile, place reviews and support requests.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use descubre_core::domain::{NewSupportRequest, SupportKind, UserProfile};
use descubre_core::Caller;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::rest::{caller_id, port_failure, HandlerResult};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SupportRequestBody {
    /// One of `reclamo`, `sugerencia` or `problema`.
    #[serde(rename = "type")]
    pub kind: String,
    pub subject: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/perfil",
    responses((status = 200, description = "The caller's profile"))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let profile = state
        .db
        .get_profile(user_id)
        .await
        .map_err(|e| port_failure("load profile", e))?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/perfil",
    request_body = ProfileRequest,
    responses((status = 200, description = "The updated profile"))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<ProfileRequest>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let profile = UserProfile {
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        country: req.country.trim().to_string(),
        region: req.region.trim().to_string(),
    };
    state
        .db
        .update_profile(user_id, &profile)
        .await
        .map_err(|e| port_failure("update profile", e))?;
    Ok(Json(profile))
}

/// Reviews the caller left on places, newest first.
#[utoipa::path(
    get,
    path = "/perfil/comentarios",
    responses((status = 200, description = "The caller's place feedback"))
)]
pub async fn my_feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let feedback = state
        .db
        .place_feedback_for(user_id)
        .await
        .map_err(|e| port_failure("list place feedback", e))?;
    Ok(Json(feedback))
}

#[utoipa::path(
    get,
    path = "/perfil/soporte",
    responses((status = 200, description = "The caller's support requests, newest first"))
)]
pub async fn list_support_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let requests = state
        .db
        .support_requests_for(user_id)
        .await
        .map_err(|e| port_failure("list support requests", e))?;
    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/perfil/soporte",
    request_body = SupportRequestBody,
    responses(
        (status = 201, description = "Support request filed"),
        (status = 400, description = "Unknown type or empty subject/message")
    )
)]
pub async fn create_support_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<SupportRequestBody>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let kind: SupportKind = req.kind.parse().map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let subject = req.subject.trim();
    let message = req.message.trim();
    if subject.is_empty() || message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Subject and message are required".to_string()));
    }

    let request = state
        .db
        .create_support_request(NewSupportRequest {
            user_id,
            kind,
            subject: subject.to_string(),
            message: message.to_string(),
        })
        .await
        .map_err(|e| port_failure("create support request", e))?;
    info!("Support request {} filed by {}", request.id, user_id);

    Ok((StatusCode::CREATED, Json(request)))
}
