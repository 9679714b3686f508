//! crates/descubre_core/src/memory.rs
//!
//! In-memory implementations of the store and generation ports, used by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::domain::{
    AdminRecord, BackOfficeCounts, District, DistrictEvent, ItineraryFeedback, ItineraryRecord,
    NewItinerary, NewItineraryFeedback, NewSupportRequest, Offer, OfferListing, Place,
    PlaceFeedback, Province, Rating, Role, SupportRequest, User, UserCredentials, UserProfile,
    UserSummary, SUPPORT_STATUS_PENDING,
};
use crate::ports::{
    BackOfficeStore, CatalogStore, DestinationFilter, IdentityStore, ItineraryGenerationService,
    ItineraryStore, PortError, PortResult,
};

struct StoredUser {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    profile: UserProfile,
    created_at: DateTime<Utc>,
}

impl StoredUser {
    fn summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.user_id,
            email: Some(self.email.clone()),
            profile: self.profile.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Default)]
struct State {
    users: Vec<StoredUser>,
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    admins: Vec<AdminRecord>,
    provinces: Vec<Province>,
    districts: Vec<District>,
    places: Vec<Place>,
    offers: Vec<Offer>,
    events: Vec<DistrictEvent>,
    itineraries: Vec<ItineraryRecord>,
    itinerary_feedback: Vec<ItineraryFeedback>,
    place_feedback: Vec<PlaceFeedback>,
    support: Vec<SupportRequest>,
}

impl State {
    fn user_name(&self, user_id: Uuid) -> Option<String> {
        self.users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| u.profile.name.clone())
            .filter(|n| !n.is_empty())
    }

    fn place_name(&self, place_id: Option<Uuid>) -> Option<String> {
        let id = place_id?;
        self.places.iter().find(|p| p.id == id).map(|p| p.name.clone())
    }

    fn district_name(&self, district_id: Option<Uuid>) -> Option<String> {
        let id = district_id?;
        self.districts.iter().find(|d| d.id == id).map(|d| d.name.clone())
    }

    fn province_name(&self, province_id: Option<Uuid>) -> Option<String> {
        let id = province_id?;
        self.provinces.iter().find(|p| p.id == id).map(|p| p.name.clone())
    }
}

/// A thread-safe store kept entirely in memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    fail_roles: Arc<AtomicBool>,
    fail_offers: Arc<AtomicBool>,
    fail_itinerary_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes every role lookup fail, to exercise fail-closed resolution.
    pub fn fail_role_lookups(&self, fail: bool) {
        self.fail_roles.store(fail, Ordering::SeqCst);
    }

    pub fn fail_offer_lookups(&self, fail: bool) {
        self.fail_offers.store(fail, Ordering::SeqCst);
    }

    pub fn fail_itinerary_writes(&self, fail: bool) {
        self.fail_itinerary_writes.store(fail, Ordering::SeqCst);
    }

    pub fn add_province(&self, name: &str, description: Option<&str>) -> Province {
        let province = Province {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.state().provinces.push(province.clone());
        province
    }

    pub fn add_district(&self, province_id: Uuid, name: &str, description: Option<&str>) -> District {
        let district = District {
            id: Uuid::new_v4(),
            province_id,
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        self.state().districts.push(district.clone());
        district
    }

    /// Inserts a place, replacing any existing place with the same id.
    pub fn add_place(&self, place: Place) -> Place {
        let mut state = self.state();
        match state.places.iter_mut().find(|p| p.id == place.id) {
            Some(existing) => *existing = place.clone(),
            None => state.places.push(place.clone()),
        }
        place
    }

    pub fn add_offer(&self, place_id: Uuid, title: &str, is_active: bool) -> Offer {
        let mut state = self.state();
        let district_id = state.places.iter().find(|p| p.id == place_id).map(|p| p.district_id);
        let offer = Offer {
            id: Uuid::new_v4(),
            place_id: Some(place_id),
            province_id: None,
            district_id,
            title: title.to_string(),
            description: None,
            offer_type: None,
            valid_from: None,
            valid_to: None,
            sponsor: None,
            url: None,
            is_active,
        };
        state.offers.push(offer.clone());
        offer
    }

    pub fn add_event(&self, district_id: Uuid, name: &str, event_type: &str, date_range: &str) -> DistrictEvent {
        let mut state = self.state();
        let district = state.districts.iter().find(|d| d.id == district_id).cloned();
        let event = DistrictEvent {
            id: Uuid::new_v4(),
            district_id,
            name: name.to_string(),
            event_type: event_type.to_string(),
            description: None,
            date_range: date_range.to_string(),
            district_name: district.as_ref().map(|d| d.name.clone()),
            province_name: district.and_then(|d| state.province_name(Some(d.province_id))),
        };
        state.events.push(event.clone());
        event
    }

    pub fn add_place_feedback(&self, user_id: Uuid, place_id: Uuid, rating: Rating, comment: &str) -> PlaceFeedback {
        let mut state = self.state();
        let feedback = PlaceFeedback {
            id: Uuid::new_v4(),
            place_id,
            place_name: state.place_name(Some(place_id)),
            user_id,
            user_name: state.user_name(user_id),
            rating,
            was_useful: None,
            experience: None,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };
        state.place_feedback.push(feedback.clone());
        feedback
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        profile: &UserProfile,
    ) -> PortResult<User> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(PortError::Unexpected(format!("Email {} is already registered", email)));
        }
        let user_id = Uuid::new_v4();
        state.users.push(StoredUser {
            user_id,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            profile: profile.clone(),
            created_at: Utc::now(),
        });
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.state()
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| UserCredentials {
                user_id: u.user_id,
                email: u.email.clone(),
                hashed_password: u.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.state()
            .sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        match self.state().sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state().sessions.remove(session_id);
        Ok(())
    }

    async fn role_for(&self, user_id: Uuid) -> PortResult<Option<Role>> {
        if self.fail_roles.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("role lookup unavailable".to_string()));
        }
        Ok(self
            .state()
            .admins
            .iter()
            .find(|a| a.user_id == user_id)
            .map(|a| a.role))
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
        self.state()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| u.profile.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_profile(&self, user_id: Uuid, profile: &UserProfile) -> PortResult<()> {
        let mut state = self.state();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.profile = profile.clone();
        Ok(())
    }

    async fn list_users(&self) -> PortResult<Vec<UserSummary>> {
        Ok(self.state().users.iter().map(StoredUser::summary).collect())
    }

    async fn recent_users(&self, limit: i64) -> PortResult<Vec<UserSummary>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .state()
            .users
            .iter()
            .rev()
            .take(limit)
            .map(StoredUser::summary)
            .collect())
    }

    async fn list_admins(&self) -> PortResult<Vec<AdminRecord>> {
        Ok(self.state().admins.clone())
    }

    async fn grant_role(&self, user_id: Uuid, email: &str, name: &str, role: Role) -> PortResult<AdminRecord> {
        let record = AdminRecord {
            user_id,
            email: email.to_string(),
            name: name.to_string(),
            role,
            created_at: Utc::now(),
        };
        let mut state = self.state();
        state.admins.retain(|a| a.user_id != user_id);
        state.admins.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_provinces(&self) -> PortResult<Vec<Province>> {
        Ok(self.state().provinces.clone())
    }

    async fn list_districts(&self, province_id: Option<Uuid>) -> PortResult<Vec<District>> {
        Ok(self
            .state()
            .districts
            .iter()
            .filter(|d| province_id.map_or(true, |p| d.province_id == p))
            .cloned()
            .collect())
    }

    async fn get_province(&self, province_id: Uuid) -> PortResult<Province> {
        self.state()
            .provinces
            .iter()
            .find(|p| p.id == province_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Province {} not found", province_id)))
    }

    async fn get_district(&self, district_id: Uuid) -> PortResult<District> {
        self.state()
            .districts
            .iter()
            .find(|d| d.id == district_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("District {} not found", district_id)))
    }

    async fn find_destinations(&self, filter: &DestinationFilter) -> PortResult<Vec<Place>> {
        Ok(self
            .state()
            .places
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn list_active_places(&self, district_id: Option<Uuid>) -> PortResult<Vec<Place>> {
        Ok(self
            .state()
            .places
            .iter()
            .filter(|p| p.is_active && district_id.map_or(true, |d| p.district_id == d))
            .cloned()
            .collect())
    }

    async fn list_all_places(&self) -> PortResult<Vec<Place>> {
        Ok(self.state().places.clone())
    }

    async fn active_offers_for_places(&self, place_ids: &[Uuid]) -> PortResult<Vec<Offer>> {
        if self.fail_offers.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("offer lookup unavailable".to_string()));
        }
        Ok(self
            .state()
            .offers
            .iter()
            .filter(|o| o.is_active && o.place_id.is_some_and(|id| place_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn list_active_offers(&self) -> PortResult<Vec<Offer>> {
        Ok(self.state().offers.iter().filter(|o| o.is_active).cloned().collect())
    }

    async fn list_offer_listings(&self) -> PortResult<Vec<OfferListing>> {
        let state = self.state();
        Ok(state
            .offers
            .iter()
            .map(|o| OfferListing {
                offer: o.clone(),
                place_name: state.place_name(o.place_id),
                district_name: state.district_name(o.district_id),
                province_name: state.province_name(o.province_id),
            })
            .collect())
    }

    async fn list_events(&self) -> PortResult<Vec<DistrictEvent>> {
        Ok(self.state().events.clone())
    }
}

#[async_trait]
impl ItineraryStore for InMemoryStore {
    async fn save_itinerary(&self, itinerary: NewItinerary) -> PortResult<ItineraryRecord> {
        if self.fail_itinerary_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("itinerary storage unavailable".to_string()));
        }
        let record = ItineraryRecord {
            id: Uuid::new_v4(),
            user_id: itinerary.user_id,
            district_id: itinerary.district_id,
            generated_text: itinerary.generated_text,
            input_data: itinerary.input_data,
            created_at: Utc::now(),
        };
        self.state().itineraries.push(record.clone());
        Ok(record)
    }

    async fn latest_itinerary_for(&self, user_id: Uuid) -> PortResult<Option<ItineraryRecord>> {
        Ok(self
            .state()
            .itineraries
            .iter()
            .rev()
            .find(|i| i.user_id == user_id)
            .cloned())
    }

    async fn itineraries_for(&self, user_id: Uuid) -> PortResult<Vec<ItineraryRecord>> {
        Ok(self
            .state()
            .itineraries
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn itinerary_for_owner(&self, itinerary_id: Uuid, user_id: Uuid) -> PortResult<ItineraryRecord> {
        self.state()
            .itineraries
            .iter()
            .find(|i| i.id == itinerary_id && i.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Itinerary {} not found", itinerary_id)))
    }

    async fn save_itinerary_feedback(&self, feedback: NewItineraryFeedback) -> PortResult<ItineraryFeedback> {
        let mut state = self.state();
        let record = ItineraryFeedback {
            id: Uuid::new_v4(),
            itinerary_id: feedback.itinerary_id,
            user_id: feedback.user_id,
            user_name: state.user_name(feedback.user_id),
            rating: feedback.rating,
            was_useful: feedback.was_useful,
            comment: feedback.comment,
            created_at: Utc::now(),
        };
        state.itinerary_feedback.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl BackOfficeStore for InMemoryStore {
    async fn create_support_request(&self, request: NewSupportRequest) -> PortResult<SupportRequest> {
        let mut state = self.state();
        let record = SupportRequest {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            user_name: state.user_name(request.user_id),
            kind: request.kind,
            subject: request.subject,
            message: request.message,
            status: SUPPORT_STATUS_PENDING.to_string(),
            created_at: Utc::now(),
        };
        state.support.push(record.clone());
        Ok(record)
    }

    async fn support_requests_for(&self, user_id: Uuid) -> PortResult<Vec<SupportRequest>> {
        Ok(self
            .state()
            .support
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_support_requests(&self) -> PortResult<Vec<SupportRequest>> {
        Ok(self.state().support.iter().rev().cloned().collect())
    }

    async fn place_feedback_for(&self, user_id: Uuid) -> PortResult<Vec<PlaceFeedback>> {
        Ok(self
            .state()
            .place_feedback
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_place_feedback(&self) -> PortResult<Vec<PlaceFeedback>> {
        Ok(self.state().place_feedback.iter().rev().cloned().collect())
    }

    async fn list_itinerary_feedback(&self) -> PortResult<Vec<ItineraryFeedback>> {
        Ok(self.state().itinerary_feedback.iter().rev().cloned().collect())
    }

    async fn back_office_counts(&self) -> PortResult<BackOfficeCounts> {
        let state = self.state();
        Ok(BackOfficeCounts {
            users: state.users.len() as i64,
            active_places: state.places.iter().filter(|p| p.is_active).count() as i64,
            itineraries: state.itineraries.len() as i64,
            pending_support: state
                .support
                .iter()
                .filter(|s| s.status == SUPPORT_STATUS_PENDING)
                .count() as i64,
            active_offers: state.offers.iter().filter(|o| o.is_active).count() as i64,
            events: state.events.len() as i64,
        })
    }

    async fn itinerary_timestamps(&self) -> PortResult<Vec<DateTime<Utc>>> {
        Ok(self.state().itineraries.iter().map(|i| i.created_at).collect())
    }
}

//=========================================================================================
// Scripted Generation Service
//=========================================================================================

/// A generation service that answers every prompt with a fixed reply (or a
/// failure) and remembers the prompts it received.
#[derive(Clone, Default)]
pub struct ScriptedGenerator {
    reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ItineraryGenerationService for ScriptedGenerator {
    async fn generate_itinerary(&self, prompt: &str) -> PortResult<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| PortError::Unexpected("generation service unavailable".to_string()))
    }
}
