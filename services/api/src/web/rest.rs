//! services/api/src/web/rest.rs
//!
//! Shared helpers for the REST handlers and the master definition for the
//! OpenAPI specification.

use axum::http::StatusCode;
use descubre_core::ports::PortError;
use descubre_core::Caller;
use serde::Serialize;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::{admin, auth, catalog, itineraries, planner, profile};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        catalog::list_provinces_handler,
        catalog::list_districts_handler,
        catalog::list_places_handler,
        catalog::list_events_handler,
        catalog::list_offers_handler,
        catalog::unauthorized_handler,
        planner::preview_handler,
        planner::create_itinerary_handler,
        planner::generate_itinerary_handler,
        itineraries::latest_itinerary_handler,
        itineraries::list_itineraries_handler,
        itineraries::save_itinerary_handler,
        itineraries::get_itinerary_handler,
        itineraries::itinerary_feedback_handler,
        profile::get_profile_handler,
        profile::update_profile_handler,
        profile::my_feedback_handler,
        profile::list_support_handler,
        profile::create_support_handler,
        admin::dashboard_handler,
        admin::list_users_handler,
        admin::list_places_handler,
        admin::list_offers_handler,
        admin::list_events_handler,
        admin::list_support_handler,
        admin::list_feedback_handler,
        admin::list_admins_handler,
        admin::grant_role_handler,
    ),
    components(
        schemas(
            ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            catalog::MessageResponse,
            planner::GenerationResponse,
            itineraries::ItinerarySummary,
            itineraries::FeedbackRequest,
            itineraries::SaveItineraryRequest,
            profile::ProfileRequest,
            profile::SupportRequestBody,
            admin::FeedbackOverview,
            admin::GrantRoleRequest,
        )
    ),
    tags(
        (name = "Descubre Piura API", description = "Trip planning, itineraries and back-office for the Piura tourism site.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Error Handling
//=========================================================================================

/// The error shape handlers return when the body is plain text.
pub type HandlerResult<T> = Result<T, (StatusCode, String)>;

/// JSON error body of the planning endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    /// Text that was generated but could not be saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_text: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            generated_text: None,
        }
    }

    pub fn with_generated_text(mut self, text: String) -> Self {
        self.generated_text = Some(text);
        self
    }
}

/// Logs a port failure and turns it into a status and message.
pub fn port_failure(action: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, what),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(_) => {
            error!("Failed to {}: {:?}", action, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}", action))
        }
    }
}

/// The signed-in user behind a request that passed the route guard.
pub fn caller_id(caller: Caller) -> HandlerResult<Uuid> {
    caller
        .user_id()
        .ok_or((StatusCode::UNAUTHORIZED, "No active session".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_statuses() {
        assert_eq!(
            port_failure("load", PortError::NotFound("Itinerary x".to_string())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            port_failure("load", PortError::Unexpected("boom".to_string())),
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load".to_string())
        );
    }

    #[test]
    fn anonymous_callers_have_no_id() {
        assert_eq!(caller_id(Caller::Anonymous).unwrap_err().0, StatusCode::UNAUTHORIZED);
        let id = Uuid::new_v4();
        assert_eq!(caller_id(Caller::Admin(id)).unwrap(), id);
    }

    #[test]
    fn openapi_document_lists_the_planner_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/planner/itineraries"));
        assert!(doc.paths.paths.contains_key("/api/generate-itinerary"));
        assert!(doc.paths.paths.contains_key("/perfil/itinerarios/{id}"));
    }
}
