//! crates/descubre_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the planner and
//! the access rules are written against them, the `api` service supplies the
//! PostgreSQL and OpenAI implementations, and tests supply in-memory ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AdminRecord, BackOfficeCounts, District, DistrictEvent, ExperienceType, ItineraryFeedback,
    ItineraryRecord, Level, NewItinerary, NewItineraryFeedback, NewSupportRequest, Offer,
    OfferListing, Place, PlaceFeedback, Province, Role, SupportRequest, User, UserCredentials,
    UserProfile, UserSummary,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Query Types
//=========================================================================================

/// Criteria for selecting itinerary candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationFilter {
    pub district_id: Uuid,
    pub experience_type: ExperienceType,
    /// Highest effort level accepted (inclusive of every lower level).
    pub max_effort: Level,
    /// Highest price range accepted (inclusive of every lower level).
    pub max_budget: Level,
}

impl DestinationFilter {
    /// Whether an individual place satisfies the filter. Only active places match.
    pub fn matches(&self, place: &Place) -> bool {
        place.is_active
            && place.district_id == self.district_id
            && place.experience_type == self.experience_type
            && self.max_effort.includes(place.effort_level)
            && self.max_budget.includes(place.price_range)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Users, login sessions and role records.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        profile: &UserProfile,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a live (unexpired) session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    /// The role record for a user, or `None` for regular users.
    async fn role_for(&self, user_id: Uuid) -> PortResult<Option<Role>>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile>;

    async fn update_profile(&self, user_id: Uuid, profile: &UserProfile) -> PortResult<()>;

    async fn list_users(&self) -> PortResult<Vec<UserSummary>>;

    async fn recent_users(&self, limit: i64) -> PortResult<Vec<UserSummary>>;

    async fn list_admins(&self) -> PortResult<Vec<AdminRecord>>;

    /// Inserts (or replaces) the role record of an existing user.
    async fn grant_role(&self, user_id: Uuid, email: &str, name: &str, role: Role) -> PortResult<AdminRecord>;
}

/// Read access to provinces, districts, places, offers and events.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_provinces(&self) -> PortResult<Vec<Province>>;

    async fn list_districts(&self, province_id: Option<Uuid>) -> PortResult<Vec<District>>;

    async fn get_province(&self, province_id: Uuid) -> PortResult<Province>;

    async fn get_district(&self, district_id: Uuid) -> PortResult<District>;

    /// Active places matching a filter, in storage order.
    async fn find_destinations(&self, filter: &DestinationFilter) -> PortResult<Vec<Place>>;

    /// Active places, optionally restricted to one district.
    async fn list_active_places(&self, district_id: Option<Uuid>) -> PortResult<Vec<Place>>;

    /// Every place, active or not, for the back-office.
    async fn list_all_places(&self) -> PortResult<Vec<Place>>;

    /// Active offers attached to any of the given places.
    async fn active_offers_for_places(&self, place_ids: &[Uuid]) -> PortResult<Vec<Offer>>;

    async fn list_active_offers(&self) -> PortResult<Vec<Offer>>;

    async fn list_offer_listings(&self) -> PortResult<Vec<OfferListing>>;

    async fn list_events(&self) -> PortResult<Vec<DistrictEvent>>;
}

/// Generated itineraries and the feedback left on them.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// Writes one new record. Never deduplicates.
    async fn save_itinerary(&self, itinerary: NewItinerary) -> PortResult<ItineraryRecord>;

    /// The newest record owned by a user.
    async fn latest_itinerary_for(&self, user_id: Uuid) -> PortResult<Option<ItineraryRecord>>;

    /// Every record owned by a user, newest first.
    async fn itineraries_for(&self, user_id: Uuid) -> PortResult<Vec<ItineraryRecord>>;

    /// One record, only if it belongs to the given user.
    async fn itinerary_for_owner(&self, itinerary_id: Uuid, user_id: Uuid) -> PortResult<ItineraryRecord>;

    async fn save_itinerary_feedback(&self, feedback: NewItineraryFeedback) -> PortResult<ItineraryFeedback>;
}

/// Support requests, place feedback and aggregate figures for the back-office.
#[async_trait]
pub trait BackOfficeStore: Send + Sync {
    async fn create_support_request(&self, request: NewSupportRequest) -> PortResult<SupportRequest>;

    async fn support_requests_for(&self, user_id: Uuid) -> PortResult<Vec<SupportRequest>>;

    async fn list_support_requests(&self) -> PortResult<Vec<SupportRequest>>;

    async fn place_feedback_for(&self, user_id: Uuid) -> PortResult<Vec<PlaceFeedback>>;

    async fn list_place_feedback(&self) -> PortResult<Vec<PlaceFeedback>>;

    async fn list_itinerary_feedback(&self) -> PortResult<Vec<ItineraryFeedback>>;

    async fn back_office_counts(&self) -> PortResult<BackOfficeCounts>;

    /// Creation times of every itinerary, for the weekly chart.
    async fn itinerary_timestamps(&self) -> PortResult<Vec<DateTime<Utc>>>;
}

/// Everything the web layer needs from persistence, as one handle.
pub trait DatabaseService: IdentityStore + CatalogStore + ItineraryStore + BackOfficeStore {}

impl<T> DatabaseService for T where T: IdentityStore + CatalogStore + ItineraryStore + BackOfficeStore {}

#[async_trait]
pub trait ItineraryGenerationService: Send + Sync {
    /// Sends a compiled prompt to the text-generation API and returns the completion.
    async fn generate_itinerary(&self, prompt: &str) -> PortResult<String>;
}
