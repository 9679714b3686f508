//! services/api/src/web/admin.rs
//!
//! Back-office endpoints. The route guard only lets admins reach these.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use descubre_core::dashboard::build_dashboard;
use descubre_core::domain::{ItineraryFeedback, PlaceFeedback, Role};
use descubre_core::ports::PortError;
use futures::try_join;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::web::rest::{port_failure, HandlerResult};
use crate::web::state::AppState;

/// Users shown in the "recent registrations" panel.
const RECENT_USERS: i64 = 5;

#[derive(Serialize, ToSchema)]
pub struct FeedbackOverview {
    #[schema(value_type = Vec<Object>)]
    pub places: Vec<PlaceFeedback>,
    #[schema(value_type = Vec<Object>)]
    pub itineraries: Vec<ItineraryFeedback>,
}

#[derive(Deserialize, ToSchema)]
pub struct GrantRoleRequest {
    pub email: String,
    /// `admin` or `editor`.
    #[schema(value_type = String)]
    pub role: Role,
}

#[utoipa::path(
    get,
    path = "/admin",
    responses((status = 200, description = "Counters, average rating, weekly itineraries and recent users"))
)]
pub async fn dashboard_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let db = &state.db;
    let (counts, place_feedback, itinerary_feedback, timestamps, recent_users) = try_join!(
        db.back_office_counts(),
        db.list_place_feedback(),
        db.list_itinerary_feedback(),
        db.itinerary_timestamps(),
        db.recent_users(RECENT_USERS),
    )
    .map_err(|e| port_failure("load dashboard", e))?;

    let ratings: Vec<_> = place_feedback
        .iter()
        .map(|f| f.rating)
        .chain(itinerary_feedback.iter().map(|f| f.rating))
        .collect();

    Ok(Json(build_dashboard(counts, &ratings, &timestamps, recent_users, Utc::now())))
}

#[utoipa::path(get, path = "/admin/users", responses((status = 200, description = "All users, newest first")))]
pub async fn list_users_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let users = state.db.list_users().await.map_err(|e| port_failure("list users", e))?;
    Ok(Json(users))
}

#[utoipa::path(get, path = "/admin/places", responses((status = 200, description = "All places, active or not")))]
pub async fn list_places_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let places = state
        .db
        .list_all_places()
        .await
        .map_err(|e| port_failure("list places", e))?;
    Ok(Json(places))
}

#[utoipa::path(get, path = "/admin/offers", responses((status = 200, description = "All offers with place and location names")))]
pub async fn list_offers_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let offers = state
        .db
        .list_offer_listings()
        .await
        .map_err(|e| port_failure("list offers", e))?;
    Ok(Json(offers))
}

#[utoipa::path(get, path = "/admin/events", responses((status = 200, description = "All district events")))]
pub async fn list_events_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let events = state.db.list_events().await.map_err(|e| port_failure("list events", e))?;
    Ok(Json(events))
}

#[utoipa::path(get, path = "/admin/support", responses((status = 200, description = "Every support request, newest first")))]
pub async fn list_support_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let requests = state
        .db
        .list_support_requests()
        .await
        .map_err(|e| port_failure("list support requests", e))?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/admin/feedback",
    responses((status = 200, description = "Place and itinerary feedback with user names", body = FeedbackOverview))
)]
pub async fn list_feedback_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let (places, itineraries) = try_join!(state.db.list_place_feedback(), state.db.list_itinerary_feedback())
        .map_err(|e| port_failure("list feedback", e))?;
    Ok(Json(FeedbackOverview { places, itineraries }))
}

#[utoipa::path(get, path = "/admin/admins", responses((status = 200, description = "Users holding a role")))]
pub async fn list_admins_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let admins = state.db.list_admins().await.map_err(|e| port_failure("list admins", e))?;
    Ok(Json(admins))
}

/// Grants a role to an already registered user.
#[utoipa::path(
    post,
    path = "/admin/admins",
    request_body = GrantRoleRequest,
    responses(
        (status = 201, description = "Role granted"),
        (status = 404, description = "No user with that email")
    )
)]
pub async fn grant_role_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GrantRoleRequest>,
) -> HandlerResult<impl IntoResponse> {
    let email = req.email.trim();
    let user = state.db.get_user_by_email(email).await.map_err(|e| match e {
        PortError::NotFound(_) => (StatusCode::NOT_FOUND, format!("No user registered with {}", email)),
        other => {
            error!("Failed to look up user: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to grant role".to_string())
        }
    })?;
    let profile = state
        .db
        .get_profile(user.user_id)
        .await
        .map_err(|e| port_failure("load profile", e))?;

    let record = state
        .db
        .grant_role(user.user_id, &user.email, &profile.name, req.role)
        .await
        .map_err(|e| port_failure("grant role", e))?;
    info!("Granted role {} to {}", req.role.as_str(), user.user_id);

    Ok((StatusCode::CREATED, Json(record)))
}
