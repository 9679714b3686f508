//! services/api/src/web/itineraries.rs
//!
//! The caller's saved itineraries and the feedback left on them.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use descubre_core::domain::{ItinerarySnapshot, NewItinerary, NewItineraryFeedback, Rating};
use descubre_core::Caller;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::planner::ITINERARY_PAGE;
use crate::web::rest::{caller_id, port_failure, HandlerResult};
use crate::web::state::AppState;

/// One row of the itinerary history.
#[derive(Serialize, ToSchema)]
pub struct ItinerarySummary {
    pub id: Uuid,
    pub district_id: Uuid,
    pub district_name: String,
    pub province_name: String,
    pub destinations: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub was_useful: bool,
    #[serde(default)]
    pub comment: String,
}

/// An itinerary generated earlier, stored as-is without calling the model again.
#[derive(Deserialize, ToSchema)]
pub struct SaveItineraryRequest {
    pub district_id: Uuid,
    pub generated_text: String,
    /// `{province, district, places, offers}` as returned alongside the text.
    #[schema(value_type = Object)]
    pub input_data: ItinerarySnapshot,
}

/// The caller's most recent itinerary.
#[utoipa::path(
    get,
    path = "/itinerario",
    responses(
        (status = 200, description = "The latest itinerary with its input snapshot"),
        (status = 404, description = "The caller has no itineraries yet")
    )
)]
pub async fn latest_itinerary_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let record = state
        .db
        .latest_itinerary_for(user_id)
        .await
        .map_err(|e| port_failure("load latest itinerary", e))?
        .ok_or((StatusCode::NOT_FOUND, "No itineraries yet".to_string()))?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/perfil/itinerarios",
    responses((status = 200, description = "Itinerary history, newest first", body = [ItinerarySummary]))
)]
pub async fn list_itineraries_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let records = state
        .db
        .itineraries_for(user_id)
        .await
        .map_err(|e| port_failure("list itineraries", e))?;

    let summaries: Vec<ItinerarySummary> = records
        .into_iter()
        .map(|r| ItinerarySummary {
            id: r.id,
            district_id: r.district_id,
            district_name: r.input_data.district.name,
            province_name: r.input_data.province.name,
            destinations: r.input_data.places.len(),
            created_at: r.created_at,
        })
        .collect();
    Ok(Json(summaries))
}

#[utoipa::path(
    post,
    path = "/perfil/itinerarios",
    request_body = SaveItineraryRequest,
    responses(
        (status = 201, description = "Itinerary saved"),
        (status = 400, description = "Empty itinerary text"),
        (status = 404, description = "Unknown district"),
        (status = 500, description = "Could not save; the same body can be sent again")
    )
)]
pub async fn save_itinerary_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<SaveItineraryRequest>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    if req.generated_text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Itinerary text is empty".to_string()));
    }

    state
        .db
        .get_district(req.district_id)
        .await
        .map_err(|e| port_failure("load district", e))?;

    let record = state
        .db
        .save_itinerary(NewItinerary {
            user_id,
            district_id: req.district_id,
            generated_text: req.generated_text,
            input_data: req.input_data,
        })
        .await
        .map_err(|e| port_failure("save itinerary", e))?;
    info!("Saved generated itinerary {} for user {}", record.id, user_id);

    Ok((StatusCode::CREATED, [(header::LOCATION, ITINERARY_PAGE)], Json(record)))
}

#[utoipa::path(
    get,
    path = "/perfil/itinerarios/{id}",
    params(("id" = Uuid, Path, description = "Itinerary id")),
    responses(
        (status = 200, description = "The itinerary with its input snapshot"),
        (status = 404, description = "Unknown itinerary or not owned by the caller")
    )
)]
pub async fn get_itinerary_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(itinerary_id): Path<Uuid>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let record = state
        .db
        .itinerary_for_owner(itinerary_id, user_id)
        .await
        .map_err(|e| port_failure("load itinerary", e))?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/perfil/itinerarios/{id}/feedback",
    params(("id" = Uuid, Path, description = "Itinerary id")),
    request_body = FeedbackRequest,
    responses(
        (status = 201, description = "Feedback saved"),
        (status = 400, description = "Rating outside 1-5"),
        (status = 404, description = "Unknown itinerary or not owned by the caller")
    )
)]
pub async fn itinerary_feedback_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Path(itinerary_id): Path<Uuid>,
    Json(req): Json<FeedbackRequest>,
) -> HandlerResult<impl IntoResponse> {
    let user_id = caller_id(caller)?;
    let rating = Rating::new(req.rating)
        .ok_or((StatusCode::BAD_REQUEST, "Rating must be between 1 and 5".to_string()))?;

    state
        .db
        .itinerary_for_owner(itinerary_id, user_id)
        .await
        .map_err(|e| port_failure("load itinerary", e))?;

    let feedback = state
        .db
        .save_itinerary_feedback(NewItineraryFeedback {
            itinerary_id,
            user_id,
            rating,
            was_useful: req.was_useful,
            comment: req.comment.trim().to_string(),
        })
        .await
        .map_err(|e| port_failure("save itinerary feedback", e))?;
    info!("Feedback {} saved for itinerary {}", feedback.id, itinerary_id);

    Ok((StatusCode::CREATED, Json(feedback)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{json_body, test_state};
    use descubre_core::domain::LocationInfo;
    use descubre_core::memory::{InMemoryStore, ScriptedGenerator};
    use descubre_core::ports::{BackOfficeStore, ItineraryStore};

    async fn save(store: &InMemoryStore, user_id: Uuid, district: &str) -> Uuid {
        let snapshot = ItinerarySnapshot {
            province: LocationInfo { name: "Piura".to_string(), description: None },
            district: LocationInfo { name: district.to_string(), description: None },
            places: vec![],
            offers: vec![],
        };
        store
            .save_itinerary(NewItinerary {
                user_id,
                district_id: Uuid::new_v4(),
                generated_text: format!("Itinerario en {}", district),
                input_data: snapshot,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn history_is_newest_first_with_district_names() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        save(&store, user_id, "Catacaos").await;
        save(&store, user_id, "Máncora").await;
        save(&store, Uuid::new_v4(), "Paita").await;
        let state = test_state(&store, ScriptedGenerator::failing());

        let response = list_itineraries_handler(State(state), Extension(Caller::Regular(user_id)))
            .await
            .unwrap()
            .into_response();
        let body = json_body(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["district_name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Máncora", "Catacaos"]);
    }

    #[tokio::test]
    async fn itineraries_are_only_visible_to_their_owner() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let id = save(&store, owner, "Catacaos").await;
        let state = test_state(&store, ScriptedGenerator::failing());

        assert!(
            get_itinerary_handler(State(state.clone()), Extension(Caller::Regular(owner)), Path(id))
                .await
                .is_ok()
        );
        let err = get_itinerary_handler(State(state), Extension(Caller::Regular(Uuid::new_v4())), Path(id))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn latest_is_missing_until_something_is_saved() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let state = test_state(&store, ScriptedGenerator::failing());

        let err = latest_itinerary_handler(State(state.clone()), Extension(Caller::Regular(user_id)))
            .await
            .err()
            .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        save(&store, user_id, "Catacaos").await;
        let response = latest_itinerary_handler(State(state), Extension(Caller::Regular(user_id)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(json_body(response).await["generated_text"], "Itinerario en Catacaos");
    }

    #[tokio::test]
    async fn feedback_is_validated_and_stored() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let id = save(&store, owner, "Catacaos").await;
        let state = test_state(&store, ScriptedGenerator::failing());

        let out_of_range = FeedbackRequest { rating: 6, was_useful: true, comment: String::new() };
        let err = itinerary_feedback_handler(
            State(state.clone()),
            Extension(Caller::Regular(owner)),
            Path(id),
            Json(out_of_range),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let stranger = FeedbackRequest { rating: 4, was_useful: true, comment: String::new() };
        let err = itinerary_feedback_handler(
            State(state.clone()),
            Extension(Caller::Regular(Uuid::new_v4())),
            Path(id),
            Json(stranger),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);

        let good = FeedbackRequest { rating: 5, was_useful: true, comment: "  Excelente  ".to_string() };
        let response = itinerary_feedback_handler(State(state), Extension(Caller::Regular(owner)), Path(id), Json(good))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let stored = store.list_itinerary_feedback().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].comment, "Excelente");
        assert_eq!(stored[0].rating.value(), 5);
    }

    fn save_request(district_id: Uuid, text: &str) -> SaveItineraryRequest {
        SaveItineraryRequest {
            district_id,
            generated_text: text.to_string(),
            input_data: ItinerarySnapshot {
                province: LocationInfo { name: "Piura".to_string(), description: None },
                district: LocationInfo { name: "Catacaos".to_string(), description: None },
                places: vec![],
                offers: vec![],
            },
        }
    }

    #[tokio::test]
    async fn generated_text_can_be_saved_again_after_a_failed_write() {
        let store = InMemoryStore::new();
        let province = store.add_province("Piura", None);
        let district = store.add_district(province.id, "Catacaos", None);
        let user_id = Uuid::new_v4();
        let state = test_state(&store, ScriptedGenerator::failing());

        store.fail_itinerary_writes(true);
        let err = save_itinerary_handler(
            State(state.clone()),
            Extension(Caller::Regular(user_id)),
            Json(save_request(district.id, "Día 1: Catacaos")),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.itineraries_for(user_id).await.unwrap().is_empty());

        store.fail_itinerary_writes(false);
        let response = save_itinerary_handler(
            State(state),
            Extension(Caller::Regular(user_id)),
            Json(save_request(district.id, "Día 1: Catacaos")),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], ITINERARY_PAGE);

        let latest = store.latest_itinerary_for(user_id).await.unwrap().unwrap();
        assert_eq!(latest.generated_text, "Día 1: Catacaos");
        assert_eq!(latest.district_id, district.id);
        assert_eq!(latest.input_data.district.name, "Catacaos");
    }

    #[tokio::test]
    async fn saving_needs_text_and_a_known_district() {
        let store = InMemoryStore::new();
        let province = store.add_province("Piura", None);
        let district = store.add_district(province.id, "Catacaos", None);
        let user_id = Uuid::new_v4();
        let state = test_state(&store, ScriptedGenerator::failing());

        let err = save_itinerary_handler(
            State(state.clone()),
            Extension(Caller::Regular(user_id)),
            Json(save_request(district.id, "   ")),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let err = save_itinerary_handler(
            State(state),
            Extension(Caller::Regular(user_id)),
            Json(save_request(Uuid::new_v4(), "Día 1")),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert!(store.itineraries_for(user_id).await.unwrap().is_empty());
    }
}
