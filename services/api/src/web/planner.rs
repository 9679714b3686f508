//! services/api/src/web/planner.rs
//!
//! Trip planning endpoints: the data preview, the full generate-and-save
//! pipeline, and the stand-alone generation endpoint that returns a
//! completion without storing it.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use descubre_core::domain::{LocationInfo, Offer};
use descubre_core::{Caller, PlannerError, PreparedTrip, TripRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::rest::{caller_id, ErrorBody};
use crate::web::state::AppState;

/// Where the client should go to read a freshly saved itinerary.
pub const ITINERARY_PAGE: &str = "/itinerario";

/// Successful answer of the stand-alone generation endpoint.
#[derive(Serialize, ToSchema)]
pub struct GenerationResponse {
    pub success: bool,
    pub result: String,
    #[serde(rename = "provinceInfo")]
    #[schema(value_type = Object)]
    pub province_info: LocationInfo,
    #[serde(rename = "districtInfo")]
    #[schema(value_type = Object)]
    pub district_info: LocationInfo,
    #[schema(value_type = Vec<Object>)]
    pub offers: Vec<Offer>,
}

/// Maps a pipeline failure to its HTTP status and user-facing message.
pub fn planner_failure(err: PlannerError) -> (StatusCode, Json<ErrorBody>) {
    let (status, body) = match err {
        PlannerError::InvalidTrip(e) => (StatusCode::BAD_REQUEST, ErrorBody::new(e.to_string())),
        PlannerError::MissingDays | PlannerError::DayCountMismatch { .. } => {
            (StatusCode::BAD_REQUEST, ErrorBody::new(err.to_string()))
        }
        PlannerError::NoDestinations => (StatusCode::NOT_FOUND, ErrorBody::new("no destinations found")),
        PlannerError::LocationNotFound => (StatusCode::NOT_FOUND, ErrorBody::new(err.to_string())),
        PlannerError::DataUnavailable(e) => {
            error!("Planner data lookup failed: {:?}", e);
            (StatusCode::BAD_GATEWAY, ErrorBody::new("could not load data"))
        }
        PlannerError::Generation(e) => {
            error!("Itinerary generation failed: {:?}", e);
            (
                StatusCode::BAD_GATEWAY,
                ErrorBody::new("No se pudo generar el itinerario. Inténtalo de nuevo."),
            )
        }
        PlannerError::Persistence { generated_text, source } => {
            error!("Failed to save itinerary: {:?}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("could not save itinerary").with_generated_text(generated_text),
            )
        }
    };
    (status, Json(body))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Shows the data an itinerary would be generated from, without generating it.
#[utoipa::path(
    post,
    path = "/planner/preview",
    request_body(content_type = "application/json", description = "The trip request form."),
    responses(
        (status = 200, description = "Destinations, foods, cultural notes and offers for the trip"),
        (status = 400, description = "Incomplete trip request", body = ErrorBody),
        (status = 502, description = "Catalog unavailable", body = ErrorBody)
    )
)]
pub async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TripRequest>,
) -> Result<Json<PreparedTrip>, (StatusCode, Json<ErrorBody>)> {
    let prepared = state.planner().prepare(&request).await.map_err(planner_failure)?;
    Ok(Json(prepared))
}

/// Runs the whole pipeline and stores the result for the caller.
#[utoipa::path(
    post,
    path = "/planner/itineraries",
    request_body(content_type = "application/json", description = "The trip request form."),
    responses(
        (status = 201, description = "Itinerary generated and saved"),
        (status = 400, description = "Incomplete trip request", body = ErrorBody),
        (status = 404, description = "No destinations found", body = ErrorBody),
        (status = 500, description = "Generated but not saved", body = ErrorBody),
        (status = 502, description = "Catalog or generation service failed", body = ErrorBody)
    )
)]
pub async fn create_itinerary_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<TripRequest>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let user_id = caller_id(caller).map_err(|(status, message)| (status, Json(ErrorBody::new(message))))?;

    let record = state
        .planner()
        .plan(user_id, &request)
        .await
        .map_err(planner_failure)?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, ITINERARY_PAGE)],
        Json(record),
    )
        .into_response())
}

/// Generates an itinerary from already prepared data and returns it without saving.
#[utoipa::path(
    post,
    path = "/api/generate-itinerary",
    request_body(content_type = "application/json", description = "`{form, days, places, stats, climate, offers}`"),
    responses(
        (status = 200, description = "Generated itinerary", body = GenerationResponse),
        (status = 400, description = "Missing trip data", body = ErrorBody),
        (status = 401, description = "No active session"),
        (status = 422, description = "Malformed body", body = ErrorBody),
        (status = 502, description = "Generation failed", body = ErrorBody)
    )
)]
pub async fn generate_itinerary_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PreparedTrip>, JsonRejection>,
) -> Result<Json<GenerationResponse>, (StatusCode, Json<ErrorBody>)> {
    let Json(prepared) = payload.map_err(|rejection| {
        warn!("Rejected generation body: {}", rejection.body_text());
        (rejection.status(), Json(ErrorBody::new(rejection.body_text())))
    })?;
    let generated = state.planner().generate(&prepared).await.map_err(|err| match err {
        PlannerError::NoDestinations => {
            warn!("Generation requested without destinations");
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new("missing destinations")))
        }
        other => planner_failure(other),
    })?;
    info!("Itinerary generated for {} destinations", prepared.places.len());

    Ok(Json(GenerationResponse {
        success: true,
        result: generated.text,
        province_info: generated.province,
        district_info: generated.district,
        offers: generated.offers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{json_body, test_state, with_session};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;
    use chrono::NaiveDate;
    use descubre_core::domain::{ExperienceType, Level, Place, Priority};
    use descubre_core::memory::{InMemoryStore, ScriptedGenerator};
    use descubre_core::ports::ItineraryStore;
    use uuid::Uuid;

    struct Fixture {
        store: InMemoryStore,
        request: TripRequest,
    }

    fn fixture(places: usize) -> Fixture {
        let store = InMemoryStore::new();
        let province = store.add_province("Piura", Some("Costa norte"));
        let district = store.add_district(province.id, "Catacaos", Some("Artesanía"));
        for i in 0..places {
            store.add_place(Place {
                id: Uuid::new_v4(),
                district_id: district.id,
                name: format!("Lugar {:02}", i),
                place_type: Some("museo".to_string()),
                experience_type: ExperienceType::Culture,
                effort_level: Level::Bajo,
                price_range: Level::Bajo,
                description: None,
                local_foods: vec!["seco de chabelo".to_string()],
                cultural_notes: vec![],
                is_active: true,
                latitude: None,
                longitude: None,
            });
        }
        let request = TripRequest {
            province_id: Some(province.id),
            district_id: Some(district.id),
            date_start: NaiveDate::from_ymd_opt(2024, 6, 1),
            date_end: NaiveDate::from_ymd_opt(2024, 6, 3),
            experience_type: Some(ExperienceType::Culture),
            effort_level: Level::Medio,
            budget_level: Level::Bajo,
            priority: Some(Priority::Culture),
        };
        Fixture { store, request }
    }

    #[tokio::test]
    async fn preview_returns_the_data_without_generating() {
        let f = fixture(3);
        let generator = ScriptedGenerator::replying("Día 1");
        let state = test_state(&f.store, generator.clone());

        let Json(prepared) = preview_handler(State(state), Json(f.request.clone())).await.unwrap();
        assert_eq!(prepared.days, 3);
        assert_eq!(prepared.places.len(), 3);
        assert_eq!(prepared.stats.foods, vec!["seco de chabelo".to_string()]);
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn saved_itinerary_points_to_the_itinerary_page() {
        let f = fixture(12);
        let state = test_state(&f.store, ScriptedGenerator::replying("Día 1: Catacaos"));
        let user_id = Uuid::new_v4();

        let response = create_itinerary_handler(State(state), Extension(Caller::Regular(user_id)), Json(f.request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], ITINERARY_PAGE);

        let body = json_body(response).await;
        assert_eq!(body["generated_text"], "Día 1: Catacaos");
        assert_eq!(body["input_data"]["places"].as_array().unwrap().len(), 12);

        let latest = f.store.latest_itinerary_for(user_id).await.unwrap().unwrap();
        assert_eq!(latest.generated_text, "Día 1: Catacaos");
    }

    #[tokio::test]
    async fn empty_catalog_reports_no_destinations() {
        let f = fixture(0);
        let generator = ScriptedGenerator::replying("Día 1");
        let state = test_state(&f.store, generator.clone());
        let user_id = Uuid::new_v4();

        let (status, Json(body)) =
            create_itinerary_handler(State(state), Extension(Caller::Regular(user_id)), Json(f.request))
                .await
                .err()
                .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "no destinations found");
        assert!(generator.prompts().is_empty());
        assert!(f.store.itineraries_for(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_still_returns_the_generated_text() {
        let f = fixture(2);
        f.store.fail_itinerary_writes(true);
        let state = test_state(&f.store, ScriptedGenerator::replying("Día 1: Catacaos"));

        let (status, Json(body)) = create_itinerary_handler(
            State(state),
            Extension(Caller::Regular(Uuid::new_v4())),
            Json(f.request),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "could not save itinerary");
        assert_eq!(body.generated_text.as_deref(), Some("Día 1: Catacaos"));
    }

    #[tokio::test]
    async fn generation_endpoint_answers_with_location_info() {
        let f = fixture(2);
        let state = test_state(&f.store, ScriptedGenerator::replying("Día 1"));
        let Json(prepared) = preview_handler(State(state.clone()), Json(f.request)).await.unwrap();

        let Json(response) = generate_itinerary_handler(State(state), Ok(Json(prepared))).await.unwrap();
        assert!(response.success);
        assert_eq!(response.result, "Día 1");
        assert_eq!(response.province_info.name, "Piura");
        assert_eq!(response.district_info.name, "Catacaos");
    }

    #[tokio::test]
    async fn generation_endpoint_rejects_incomplete_input() {
        let f = fixture(2);
        let generator = ScriptedGenerator::replying("Día 1");
        let state = test_state(&f.store, generator.clone());
        let Json(prepared) = preview_handler(State(state.clone()), Json(f.request)).await.unwrap();

        let mut no_places = prepared.clone();
        no_places.places.clear();
        let (status, Json(body)) = generate_itinerary_handler(State(state.clone()), Ok(Json(no_places)))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);

        let mut no_days = prepared.clone();
        no_days.days = 0;
        let (status, _) = generate_itinerary_handler(State(state.clone()), Ok(Json(no_days)))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut no_district = prepared;
        no_district.form.district_id = None;
        let (status, _) = generate_itinerary_handler(State(state), Ok(Json(no_district)))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_is_a_generic_upstream_error() {
        let f = fixture(2);
        let state = test_state(&f.store, ScriptedGenerator::failing());
        let Json(prepared) = preview_handler(State(state.clone()), Json(f.request)).await.unwrap();

        let (status, Json(body)) = generate_itinerary_handler(State(state), Ok(Json(prepared)))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body.error.contains("unavailable"));
    }

    fn generation_request(token: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generate-itinerary")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, format!("session={}", token))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn generation_body_accepts_delimited_list_fields() {
        let f = fixture(1);
        let generator = ScriptedGenerator::replying("Día 1");
        let state = test_state(&f.store, generator.clone());
        let (token, _) = with_session(&f.store, None).await;
        let Json(prepared) = preview_handler(State(state.clone()), Json(f.request)).await.unwrap();

        let mut body = serde_json::to_value(&prepared).unwrap();
        body["places"][0]["local_foods"] = json!("ceviche, chicha");
        body["places"][0]["cultural_notes"] = json!("Semana Santa");

        let response = crate::web::router(state)
            .oneshot(generation_request(&token, body.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Comida: ceviche, chicha"));
        assert!(prompts[0].contains("Nota cultural: Semana Santa"));
    }

    #[tokio::test]
    async fn malformed_generation_body_gets_an_error_body() {
        let f = fixture(1);
        let generator = ScriptedGenerator::replying("Día 1");
        let state = test_state(&f.store, generator.clone());
        let (token, _) = with_session(&f.store, None).await;

        let response = crate::web::router(state)
            .oneshot(generation_request(&token, json!({ "form": 5 }).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn day_count_disagreeing_with_the_dates_is_rejected() {
        let f = fixture(2);
        let generator = ScriptedGenerator::replying("Día 1");
        let state = test_state(&f.store, generator.clone());
        let Json(mut prepared) = preview_handler(State(state.clone()), Json(f.request)).await.unwrap();
        prepared.days = 7;

        let (status, Json(body)) = generate_itinerary_handler(State(state), Ok(Json(prepared)))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("7 day(s)"));
        assert!(generator.prompts().is_empty());
    }
}
