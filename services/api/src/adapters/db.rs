//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! store ports from the `core` crate. It handles all interactions with the
//! PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use descubre_core::domain::{
    AdminRecord, BackOfficeCounts, District, DistrictEvent, ItineraryFeedback, ItineraryRecord,
    ItinerarySnapshot, Level, NewItinerary, NewItineraryFeedback, NewSupportRequest, Offer,
    OfferListing, Place, PlaceFeedback, Province, Rating, Role, SupportRequest, User,
    UserCredentials, UserProfile, UserSummary,
};
use descubre_core::lists::{normalize_list, ListField};
use descubre_core::ports::{
    BackOfficeStore, CatalogStore, DestinationFilter, IdentityStore, ItineraryStore, PortError,
    PortResult,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn rating_from(value: i16) -> PortResult<Rating> {
    u8::try_from(value)
        .ok()
        .and_then(Rating::new)
        .ok_or_else(|| PortError::Unexpected(format!("Stored rating {} is out of range", value)))
}

fn level_from(label: &str) -> PortResult<Level> {
    Level::from_label(label)
        .ok_or_else(|| PortError::Unexpected(format!("Stored level '{}' is not recognised", label)))
}

fn labels(max: Level) -> Vec<String> {
    max.inclusive().into_iter().map(|l| l.label().to_string()).collect()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct ProfileRecord {
    name: String,
    phone: String,
    country: String,
    region: String,
}
impl ProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            name: self.name,
            phone: self.phone,
            country: self.country,
            region: self.region,
        }
    }
}

#[derive(FromRow)]
struct UserSummaryRecord {
    id: Uuid,
    email: String,
    #[sqlx(flatten)]
    profile: ProfileRecord,
    created_at: DateTime<Utc>,
}
impl UserSummaryRecord {
    fn to_domain(self) -> UserSummary {
        UserSummary {
            user_id: self.id,
            email: Some(self.email),
            profile: self.profile.to_domain(),
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AdminRow {
    user_id: Uuid,
    email: String,
    name: String,
    role: String,
    created_at: DateTime<Utc>,
}
impl AdminRow {
    fn to_domain(self) -> PortResult<AdminRecord> {
        Ok(AdminRecord {
            user_id: self.user_id,
            email: self.email,
            name: self.name,
            role: self.role.parse().map_err(PortError::Unexpected)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ProvinceRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
}
impl ProvinceRecord {
    fn to_domain(self) -> Province {
        Province {
            id: self.id,
            name: self.name,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct DistrictRecord {
    id: Uuid,
    province_id: Uuid,
    name: String,
    description: Option<String>,
}
impl DistrictRecord {
    fn to_domain(self) -> District {
        District {
            id: self.id,
            province_id: self.province_id,
            name: self.name,
            description: self.description,
        }
    }
}

const PLACE_COLUMNS: &str = "id, district_id, name, type AS place_type, experience_type, effort_level, \
     price_range, description, local_foods, cultural_notes, is_active, latitude, longitude";

#[derive(FromRow)]
struct PlaceRecord {
    id: Uuid,
    district_id: Uuid,
    name: String,
    place_type: Option<String>,
    experience_type: String,
    effort_level: String,
    price_range: String,
    description: Option<String>,
    local_foods: Option<String>,
    cultural_notes: Option<String>,
    is_active: bool,
    latitude: Option<f64>,
    longitude: Option<f64>,
}
impl PlaceRecord {
    /// List-like columns are normalized here so nothing downstream sees the stored shape.
    fn to_domain(self) -> PortResult<Place> {
        let list = |raw: Option<String>| {
            raw.map(|r| normalize_list(&ListField::from_raw(&r)))
                .unwrap_or_default()
        };
        Ok(Place {
            id: self.id,
            district_id: self.district_id,
            name: self.name,
            place_type: self.place_type,
            experience_type: self.experience_type.parse().map_err(PortError::Unexpected)?,
            effort_level: level_from(&self.effort_level)?,
            price_range: level_from(&self.price_range)?,
            description: self.description,
            local_foods: list(self.local_foods),
            cultural_notes: list(self.cultural_notes),
            is_active: self.is_active,
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// Rows that no longer map onto the domain are skipped so one bad place cannot
/// take down a whole listing.
fn places_to_domain(records: Vec<PlaceRecord>) -> PortResult<Vec<Place>> {
    Ok(records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            match record.to_domain() {
                Ok(place) => Some(place),
                Err(e) => {
                    warn!("Skipping place {}: {}", id, e);
                    None
                }
            }
        })
        .collect())
}

const OFFER_COLUMNS: &str = "o.id, o.place_id, o.province_id, o.district_id, o.title, o.description, \
     o.offer_type, o.valid_from, o.valid_to, o.sponsor, o.url, o.is_active";

#[derive(FromRow)]
struct OfferRecord {
    id: Uuid,
    place_id: Option<Uuid>,
    province_id: Option<Uuid>,
    district_id: Option<Uuid>,
    title: String,
    description: Option<String>,
    offer_type: Option<String>,
    valid_from: Option<NaiveDate>,
    valid_to: Option<NaiveDate>,
    sponsor: Option<String>,
    url: Option<String>,
    is_active: bool,
}
impl OfferRecord {
    fn to_domain(self) -> Offer {
        Offer {
            id: self.id,
            place_id: self.place_id,
            province_id: self.province_id,
            district_id: self.district_id,
            title: self.title,
            description: self.description,
            offer_type: self.offer_type,
            valid_from: self.valid_from,
            valid_to: self.valid_to,
            sponsor: self.sponsor,
            url: self.url,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct OfferListingRecord {
    #[sqlx(flatten)]
    offer: OfferRecord,
    place_name: Option<String>,
    district_name: Option<String>,
    province_name: Option<String>,
}

#[derive(FromRow)]
struct EventRecord {
    id: Uuid,
    district_id: Uuid,
    name: String,
    event_type: String,
    description: Option<String>,
    date_range: String,
    district_name: Option<String>,
    province_name: Option<String>,
}
impl EventRecord {
    fn to_domain(self) -> DistrictEvent {
        DistrictEvent {
            id: self.id,
            district_id: self.district_id,
            name: self.name,
            event_type: self.event_type,
            description: self.description,
            date_range: self.date_range,
            district_name: self.district_name,
            province_name: self.province_name,
        }
    }
}

const ITINERARY_COLUMNS: &str = "id, user_id, district_id, generated_text, input_data, created_at";

#[derive(FromRow)]
struct ItineraryRow {
    id: Uuid,
    user_id: Uuid,
    district_id: Uuid,
    generated_text: String,
    input_data: Json<ItinerarySnapshot>,
    created_at: DateTime<Utc>,
}
impl ItineraryRow {
    fn to_domain(self) -> ItineraryRecord {
        ItineraryRecord {
            id: self.id,
            user_id: self.user_id,
            district_id: self.district_id,
            generated_text: self.generated_text,
            input_data: self.input_data.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ItineraryFeedbackRecord {
    id: Uuid,
    itinerary_id: Uuid,
    user_id: Uuid,
    user_name: Option<String>,
    rating: i16,
    was_useful: bool,
    comment: String,
    created_at: DateTime<Utc>,
}
impl ItineraryFeedbackRecord {
    fn to_domain(self) -> PortResult<ItineraryFeedback> {
        Ok(ItineraryFeedback {
            id: self.id,
            itinerary_id: self.itinerary_id,
            user_id: self.user_id,
            user_name: self.user_name,
            rating: rating_from(self.rating)?,
            was_useful: self.was_useful,
            comment: self.comment,
            created_at: self.created_at,
        })
    }
}

const PLACE_FEEDBACK_QUERY: &str = "SELECT f.id, f.place_id, p.name AS place_name, f.user_id, \
     NULLIF(u.name, '') AS user_name, f.rating, f.was_useful, f.experience, f.comment, f.created_at \
     FROM place_feedback f \
     LEFT JOIN places p ON p.id = f.place_id \
     LEFT JOIN users u ON u.id = f.user_id";

#[derive(FromRow)]
struct PlaceFeedbackRecord {
    id: Uuid,
    place_id: Uuid,
    place_name: Option<String>,
    user_id: Uuid,
    user_name: Option<String>,
    rating: i16,
    was_useful: Option<bool>,
    experience: Option<String>,
    comment: String,
    created_at: DateTime<Utc>,
}
impl PlaceFeedbackRecord {
    fn to_domain(self) -> PortResult<PlaceFeedback> {
        Ok(PlaceFeedback {
            id: self.id,
            place_id: self.place_id,
            place_name: self.place_name,
            user_id: self.user_id,
            user_name: self.user_name,
            rating: rating_from(self.rating)?,
            was_useful: self.was_useful,
            experience: self.experience,
            comment: self.comment,
            created_at: self.created_at,
        })
    }
}

const SUPPORT_QUERY: &str = "SELECT s.id, s.user_id, NULLIF(u.name, '') AS user_name, s.type AS kind, \
     s.subject, s.message, s.status, s.created_at \
     FROM support_requests s \
     LEFT JOIN users u ON u.id = s.user_id";

#[derive(FromRow)]
struct SupportRecord {
    id: Uuid,
    user_id: Uuid,
    user_name: Option<String>,
    kind: String,
    subject: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl SupportRecord {
    fn to_domain(self) -> PortResult<SupportRequest> {
        Ok(SupportRequest {
            id: self.id,
            user_id: self.user_id,
            user_name: self.user_name,
            kind: self.kind.parse().map_err(PortError::Unexpected)?,
            subject: self.subject,
            message: self.message,
            status: self.status,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CountsRecord {
    users: i64,
    active_places: i64,
    itineraries: i64,
    pending_support: i64,
    active_offers: i64,
    events: i64,
}

//=========================================================================================
// `IdentityStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        profile: &UserProfile,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password, name, phone, country, region) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.country)
        .bind(&profile.region)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(User {
            user_id: record.id,
            email: Some(record.email),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;

        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn role_for(&self, user_id: Uuid) -> PortResult<Option<Role>> {
        let role = sqlx::query_scalar::<_, String>("SELECT role FROM admins WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;

        // An unrecognised role string grants nothing.
        Ok(role.and_then(|r| r.parse::<Role>().ok()))
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT name, phone, country, region FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_profile(&self, user_id: Uuid, profile: &UserProfile) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET name = $1, phone = $2, country = $3, region = $4 WHERE id = $5",
        )
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.country)
        .bind(&profile.region)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn list_users(&self) -> PortResult<Vec<UserSummary>> {
        let records = sqlx::query_as::<_, UserSummaryRecord>(
            "SELECT id, email, name, phone, country, region, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn recent_users(&self, limit: i64) -> PortResult<Vec<UserSummary>> {
        let records = sqlx::query_as::<_, UserSummaryRecord>(
            "SELECT id, email, name, phone, country, region, created_at FROM users \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_admins(&self) -> PortResult<Vec<AdminRecord>> {
        let records = sqlx::query_as::<_, AdminRow>(
            "SELECT user_id, email, name, role, created_at FROM admins ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(AdminRow::to_domain).collect()
    }

    async fn grant_role(&self, user_id: Uuid, email: &str, name: &str, role: Role) -> PortResult<AdminRecord> {
        let record = sqlx::query_as::<_, AdminRow>(
            "INSERT INTO admins (user_id, email, name, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name, role = EXCLUDED.role \
             RETURNING user_id, email, name, role, created_at",
        )
        .bind(user_id)
        .bind(email)
        .bind(name)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }
}

//=========================================================================================
// `CatalogStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CatalogStore for DbAdapter {
    async fn list_provinces(&self) -> PortResult<Vec<Province>> {
        let records = sqlx::query_as::<_, ProvinceRecord>(
            "SELECT id, name, description FROM provinces ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_districts(&self, province_id: Option<Uuid>) -> PortResult<Vec<District>> {
        let records = sqlx::query_as::<_, DistrictRecord>(
            "SELECT id, province_id, name, description FROM districts \
             WHERE ($1::uuid IS NULL OR province_id = $1) ORDER BY name",
        )
        .bind(province_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_province(&self, province_id: Uuid) -> PortResult<Province> {
        let record = sqlx::query_as::<_, ProvinceRecord>(
            "SELECT id, name, description FROM provinces WHERE id = $1",
        )
        .bind(province_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Province {} not found", province_id)))?;
        Ok(record.to_domain())
    }

    async fn get_district(&self, district_id: Uuid) -> PortResult<District> {
        let record = sqlx::query_as::<_, DistrictRecord>(
            "SELECT id, province_id, name, description FROM districts WHERE id = $1",
        )
        .bind(district_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("District {} not found", district_id)))?;
        Ok(record.to_domain())
    }

    async fn find_destinations(&self, filter: &DestinationFilter) -> PortResult<Vec<Place>> {
        let sql = format!(
            "SELECT {} FROM places \
             WHERE district_id = $1 AND experience_type = $2 \
             AND effort_level = ANY($3) AND price_range = ANY($4) AND is_active = TRUE",
            PLACE_COLUMNS
        );
        let records = sqlx::query_as::<_, PlaceRecord>(&sql)
            .bind(filter.district_id)
            .bind(filter.experience_type.as_str())
            .bind(labels(filter.max_effort))
            .bind(labels(filter.max_budget))
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        places_to_domain(records)
    }

    async fn list_active_places(&self, district_id: Option<Uuid>) -> PortResult<Vec<Place>> {
        let sql = format!(
            "SELECT {} FROM places WHERE is_active = TRUE AND ($1::uuid IS NULL OR district_id = $1) ORDER BY name",
            PLACE_COLUMNS
        );
        let records = sqlx::query_as::<_, PlaceRecord>(&sql)
            .bind(district_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        places_to_domain(records)
    }

    async fn list_all_places(&self) -> PortResult<Vec<Place>> {
        let sql = format!("SELECT {} FROM places ORDER BY name", PLACE_COLUMNS);
        let records = sqlx::query_as::<_, PlaceRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        places_to_domain(records)
    }

    async fn active_offers_for_places(&self, place_ids: &[Uuid]) -> PortResult<Vec<Offer>> {
        let sql = format!(
            "SELECT {} FROM offers o WHERE o.place_id = ANY($1) AND o.is_active = TRUE",
            OFFER_COLUMNS
        );
        let records = sqlx::query_as::<_, OfferRecord>(&sql)
            .bind(place_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_active_offers(&self) -> PortResult<Vec<Offer>> {
        let sql = format!(
            "SELECT {} FROM offers o WHERE o.is_active = TRUE ORDER BY o.valid_from DESC NULLS LAST",
            OFFER_COLUMNS
        );
        let records = sqlx::query_as::<_, OfferRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_offer_listings(&self) -> PortResult<Vec<OfferListing>> {
        let sql = format!(
            "SELECT {}, p.name AS place_name, d.name AS district_name, pr.name AS province_name \
             FROM offers o \
             LEFT JOIN places p ON p.id = o.place_id \
             LEFT JOIN districts d ON d.id = o.district_id \
             LEFT JOIN provinces pr ON pr.id = o.province_id \
             ORDER BY o.valid_from DESC NULLS LAST",
            OFFER_COLUMNS
        );
        let records = sqlx::query_as::<_, OfferListingRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(|r| OfferListing {
                offer: r.offer.to_domain(),
                place_name: r.place_name,
                district_name: r.district_name,
                province_name: r.province_name,
            })
            .collect())
    }

    async fn list_events(&self) -> PortResult<Vec<DistrictEvent>> {
        let records = sqlx::query_as::<_, EventRecord>(
            "SELECT e.id, e.district_id, e.name, e.type AS event_type, e.description, e.date_range, \
             d.name AS district_name, p.name AS province_name \
             FROM district_events e \
             LEFT JOIN districts d ON d.id = e.district_id \
             LEFT JOIN provinces p ON p.id = d.province_id \
             ORDER BY e.date_range DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `ItineraryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ItineraryStore for DbAdapter {
    async fn save_itinerary(&self, itinerary: NewItinerary) -> PortResult<ItineraryRecord> {
        let sql = format!(
            "INSERT INTO itineraries (id, user_id, district_id, generated_text, input_data) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ITINERARY_COLUMNS
        );
        let record = sqlx::query_as::<_, ItineraryRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(itinerary.user_id)
            .bind(itinerary.district_id)
            .bind(&itinerary.generated_text)
            .bind(Json(&itinerary.input_data))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn latest_itinerary_for(&self, user_id: Uuid) -> PortResult<Option<ItineraryRecord>> {
        let sql = format!(
            "SELECT {} FROM itineraries WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
            ITINERARY_COLUMNS
        );
        let record = sqlx::query_as::<_, ItineraryRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(ItineraryRow::to_domain))
    }

    async fn itineraries_for(&self, user_id: Uuid) -> PortResult<Vec<ItineraryRecord>> {
        let sql = format!(
            "SELECT {} FROM itineraries WHERE user_id = $1 ORDER BY created_at DESC",
            ITINERARY_COLUMNS
        );
        let records = sqlx::query_as::<_, ItineraryRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(ItineraryRow::to_domain).collect())
    }

    async fn itinerary_for_owner(&self, itinerary_id: Uuid, user_id: Uuid) -> PortResult<ItineraryRecord> {
        let sql = format!(
            "SELECT {} FROM itineraries WHERE id = $1 AND user_id = $2",
            ITINERARY_COLUMNS
        );
        let record = sqlx::query_as::<_, ItineraryRow>(&sql)
            .bind(itinerary_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Itinerary {} not found", itinerary_id)))?;
        Ok(record.to_domain())
    }

    async fn save_itinerary_feedback(&self, feedback: NewItineraryFeedback) -> PortResult<ItineraryFeedback> {
        let record = sqlx::query_as::<_, ItineraryFeedbackRecord>(
            "INSERT INTO itinerary_feedback (id, itinerary_id, user_id, rating, was_useful, comment) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, itinerary_id, user_id, NULL::text AS user_name, rating, was_useful, comment, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(feedback.itinerary_id)
        .bind(feedback.user_id)
        .bind(i16::from(feedback.rating.value()))
        .bind(feedback.was_useful)
        .bind(&feedback.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }
}

//=========================================================================================
// `BackOfficeStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl BackOfficeStore for DbAdapter {
    async fn create_support_request(&self, request: NewSupportRequest) -> PortResult<SupportRequest> {
        let record = sqlx::query_as::<_, SupportRecord>(
            "INSERT INTO support_requests (id, user_id, type, subject, message) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, NULL::text AS user_name, type AS kind, subject, message, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.kind.as_str())
        .bind(&request.subject)
        .bind(&request.message)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn support_requests_for(&self, user_id: Uuid) -> PortResult<Vec<SupportRequest>> {
        let sql = format!("{} WHERE s.user_id = $1 ORDER BY s.created_at DESC", SUPPORT_QUERY);
        let records = sqlx::query_as::<_, SupportRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(SupportRecord::to_domain).collect()
    }

    async fn list_support_requests(&self) -> PortResult<Vec<SupportRequest>> {
        let sql = format!("{} ORDER BY s.created_at DESC", SUPPORT_QUERY);
        let records = sqlx::query_as::<_, SupportRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(SupportRecord::to_domain).collect()
    }

    async fn place_feedback_for(&self, user_id: Uuid) -> PortResult<Vec<PlaceFeedback>> {
        let sql = format!("{} WHERE f.user_id = $1 ORDER BY f.created_at DESC", PLACE_FEEDBACK_QUERY);
        let records = sqlx::query_as::<_, PlaceFeedbackRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(PlaceFeedbackRecord::to_domain).collect()
    }

    async fn list_place_feedback(&self) -> PortResult<Vec<PlaceFeedback>> {
        let sql = format!("{} ORDER BY f.created_at DESC", PLACE_FEEDBACK_QUERY);
        let records = sqlx::query_as::<_, PlaceFeedbackRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(PlaceFeedbackRecord::to_domain).collect()
    }

    async fn list_itinerary_feedback(&self) -> PortResult<Vec<ItineraryFeedback>> {
        let records = sqlx::query_as::<_, ItineraryFeedbackRecord>(
            "SELECT f.id, f.itinerary_id, f.user_id, NULLIF(u.name, '') AS user_name, f.rating, \
             f.was_useful, f.comment, f.created_at \
             FROM itinerary_feedback f \
             LEFT JOIN users u ON u.id = f.user_id \
             ORDER BY f.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ItineraryFeedbackRecord::to_domain).collect()
    }

    async fn back_office_counts(&self) -> PortResult<BackOfficeCounts> {
        let record = sqlx::query_as::<_, CountsRecord>(
            "SELECT \
             (SELECT COUNT(*) FROM users) AS users, \
             (SELECT COUNT(*) FROM places WHERE is_active) AS active_places, \
             (SELECT COUNT(*) FROM itineraries) AS itineraries, \
             (SELECT COUNT(*) FROM support_requests WHERE status = 'pendiente') AS pending_support, \
             (SELECT COUNT(*) FROM offers WHERE is_active) AS active_offers, \
             (SELECT COUNT(*) FROM district_events) AS events",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(BackOfficeCounts {
            users: record.users,
            active_places: record.active_places,
            itineraries: record.itineraries,
            pending_support: record.pending_support,
            active_offers: record.active_offers,
            events: record.events,
        })
    }

    async fn itinerary_timestamps(&self) -> PortResult<Vec<DateTime<Utc>>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT created_at FROM itineraries WHERE created_at > NOW() - INTERVAL '8 weeks'",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)
    }
}
