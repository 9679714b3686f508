//! crates/descubre_core/src/domain.rs
//!
//! Defines the core data structures for the tourism planner.
//! These structs are independent of any database driver; they derive `serde`
//! only because itinerary snapshots are stored and returned as JSON verbatim.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Enumerations
//=========================================================================================

/// A role granted through a record in the `admins` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The kind of experience a traveler is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceType {
    #[serde(rename = "cultura")]
    Culture,
    #[serde(rename = "gastronomía", alias = "gastronomia")]
    Gastronomy,
    #[serde(rename = "aventura")]
    Adventure,
    #[serde(rename = "naturaleza")]
    Nature,
}

impl ExperienceType {
    /// The value stored in `places.experience_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceType::Culture => "cultura",
            ExperienceType::Gastronomy => "gastronomía",
            ExperienceType::Adventure => "aventura",
            ExperienceType::Nature => "naturaleza",
        }
    }
}

impl fmt::Display for ExperienceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperienceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cultura" => Ok(ExperienceType::Culture),
            "gastronomía" | "gastronomia" => Ok(ExperienceType::Gastronomy),
            "aventura" => Ok(ExperienceType::Adventure),
            "naturaleza" => Ok(ExperienceType::Nature),
            other => Err(format!("unknown experience type '{}'", other)),
        }
    }
}

/// Ordinal used for both physical effort and budget.
///
/// Selecting a level matches every level at or below it, so `Medio` matches
/// places tagged `bajo` or `medio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    Bajo = 1,
    #[default]
    Medio = 2,
    Alto = 3,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Bajo, Level::Medio, Level::Alto];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// The label stored in `places.effort_level` / `places.price_range`.
    pub fn label(self) -> &'static str {
        match self {
            Level::Bajo => "bajo",
            Level::Medio => "medio",
            Level::Alto => "alto",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bajo" => Some(Level::Bajo),
            "medio" => Some(Level::Medio),
            "alto" => Some(Level::Alto),
            _ => None,
        }
    }

    /// Every level matched when this one is selected.
    pub fn inclusive(self) -> Vec<Level> {
        Level::ALL.into_iter().filter(|l| *l <= self).collect()
    }

    pub fn includes(self, other: Level) -> bool {
        other <= self
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::Bajo),
            2 => Ok(Level::Medio),
            3 => Ok(Level::Alto),
            other => Err(format!("level must be between 1 and 3, got {}", other)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.ordinal()
    }
}

/// What the traveler cares about most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "comodidad")]
    Comfort,
    #[serde(rename = "naturaleza")]
    Nature,
    #[serde(rename = "cultura")]
    Culture,
    #[serde(rename = "gastronomía", alias = "gastronomia")]
    Gastronomy,
    #[serde(rename = "aventura")]
    Adventure,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Comfort => "comodidad",
            Priority::Nature => "naturaleza",
            Priority::Culture => "cultura",
            Priority::Gastronomy => "gastronomía",
            Priority::Adventure => "aventura",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comodidad" => Ok(Priority::Comfort),
            "naturaleza" => Ok(Priority::Nature),
            "cultura" => Ok(Priority::Culture),
            "gastronomía" | "gastronomia" => Ok(Priority::Gastronomy),
            "aventura" => Ok(Priority::Adventure),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

//=========================================================================================
// Users and Roles
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Editable profile fields collected at registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
}

/// A user row as listed in the back-office.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user_id: Uuid,
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminRecord {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub id: Uuid,
    pub province_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Name and description of a province or district, as embedded in prompts and snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub name: String,
    pub description: Option<String>,
}

impl From<Province> for LocationInfo {
    fn from(p: Province) -> Self {
        Self { name: p.name, description: p.description }
    }
}

impl From<District> for LocationInfo {
    fn from(d: District) -> Self {
        Self { name: d.name, description: d.description }
    }
}

/// A point of interest eligible for inclusion in an itinerary.
///
/// `local_foods` and `cultural_notes` are always normalized lists here, whatever
/// shape the store keeps them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub district_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub experience_type: ExperienceType,
    pub effort_level: Level,
    pub price_range: Level,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "crate::lists::deserialize_list")]
    pub local_foods: Vec<String>,
    #[serde(default, deserialize_with = "crate::lists::deserialize_list")]
    pub cultural_notes: Vec<String>,
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub place_id: Option<Uuid>,
    pub province_id: Option<Uuid>,
    pub district_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub offer_type: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub sponsor: Option<String>,
    pub url: Option<String>,
    pub is_active: bool,
}

/// An offer with the names of what it is attached to, for the back-office.
#[derive(Debug, Clone, Serialize)]
pub struct OfferListing {
    #[serde(flatten)]
    pub offer: Offer,
    pub place_name: Option<String>,
    pub district_name: Option<String>,
    pub province_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistrictEvent {
    pub id: Uuid,
    pub district_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: Option<String>,
    pub date_range: String,
    pub district_name: Option<String>,
    pub province_name: Option<String>,
}

//=========================================================================================
// Itineraries
//=========================================================================================

/// The input data stored alongside a generated itinerary, kept verbatim for redisplay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItinerarySnapshot {
    pub province: LocationInfo,
    pub district: LocationInfo,
    pub places: Vec<Place>,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone)]
pub struct NewItinerary {
    pub user_id: Uuid,
    pub district_id: Uuid,
    pub generated_text: String,
    pub input_data: ItinerarySnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub district_id: Uuid,
    pub generated_text: String,
    pub input_data: ItinerarySnapshot,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Feedback and Support
//=========================================================================================

/// A star rating between 1 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value).ok_or_else(|| format!("rating must be between 1 and 5, got {}", value))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[derive(Debug, Clone)]
pub struct NewItineraryFeedback {
    pub itinerary_id: Uuid,
    pub user_id: Uuid,
    pub rating: Rating,
    pub was_useful: bool,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItineraryFeedback {
    pub id: Uuid,
    pub itinerary_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub rating: Rating,
    pub was_useful: bool,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceFeedback {
    pub id: Uuid,
    pub place_id: Uuid,
    pub place_name: Option<String>,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub rating: Rating,
    pub was_useful: Option<bool>,
    pub experience: Option<String>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportKind {
    Reclamo,
    Sugerencia,
    Problema,
}

impl SupportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportKind::Reclamo => "reclamo",
            SupportKind::Sugerencia => "sugerencia",
            SupportKind::Problema => "problema",
        }
    }
}

impl FromStr for SupportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reclamo" => Ok(SupportKind::Reclamo),
            "sugerencia" => Ok(SupportKind::Sugerencia),
            "problema" => Ok(SupportKind::Problema),
            other => Err(format!("unknown support request type '{}'", other)),
        }
    }
}

/// Status given to every new support request.
pub const SUPPORT_STATUS_PENDING: &str = "pendiente";

#[derive(Debug, Clone)]
pub struct NewSupportRequest {
    pub user_id: Uuid,
    pub kind: SupportKind,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: SupportKind,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Back-office
//=========================================================================================

/// Raw counters the back-office dashboard is built from.
#[derive(Debug, Clone, Default)]
pub struct BackOfficeCounts {
    pub users: i64,
    pub active_places: i64,
    pub itineraries: i64,
    pub pending_support: i64,
    pub active_offers: i64,
    pub events: i64,
}
