//! services/api/src/web/catalog.rs
//!
//! Public read-only endpoints over the tourism catalog.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::rest::{port_failure, HandlerResult};
use crate::web::state::AppState;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DistrictQuery {
    pub province_id: Option<Uuid>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlaceQuery {
    pub district_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/provinces",
    responses((status = 200, description = "All provinces, by name"))
)]
pub async fn list_provinces_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let provinces = state
        .db
        .list_provinces()
        .await
        .map_err(|e| port_failure("list provinces", e))?;
    Ok(Json(provinces))
}

#[utoipa::path(
    get,
    path = "/districts",
    params(DistrictQuery),
    responses((status = 200, description = "Districts, optionally of one province"))
)]
pub async fn list_districts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DistrictQuery>,
) -> HandlerResult<impl IntoResponse> {
    let districts = state
        .db
        .list_districts(query.province_id)
        .await
        .map_err(|e| port_failure("list districts", e))?;
    Ok(Json(districts))
}

/// Active places, optionally restricted to one district.
#[utoipa::path(
    get,
    path = "/destinos",
    params(PlaceQuery),
    responses((status = 200, description = "Active places"))
)]
pub async fn list_places_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlaceQuery>,
) -> HandlerResult<impl IntoResponse> {
    let places = state
        .db
        .list_active_places(query.district_id)
        .await
        .map_err(|e| port_failure("list places", e))?;
    Ok(Json(places))
}

#[utoipa::path(
    get,
    path = "/events",
    responses((status = 200, description = "District events with location names"))
)]
pub async fn list_events_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let events = state
        .db
        .list_events()
        .await
        .map_err(|e| port_failure("list events", e))?;
    Ok(Json(events))
}

#[utoipa::path(
    get,
    path = "/offers",
    responses((status = 200, description = "Active offers"))
)]
pub async fn list_offers_handler(State(state): State<Arc<AppState>>) -> HandlerResult<impl IntoResponse> {
    let offers = state
        .db
        .list_active_offers()
        .await
        .map_err(|e| port_failure("list offers", e))?;
    Ok(Json(offers))
}

/// Where regular users land when they try to open the back-office.
#[utoipa::path(
    get,
    path = "/unauthorized",
    responses((status = 403, description = "Access denied", body = MessageResponse))
)]
pub async fn unauthorized_handler() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        Json(MessageResponse {
            message: "No tienes permisos para acceder a esta sección.".to_string(),
        }),
    )
}
