//! crates/descubre_core/src/planner.rs
//!
//! The itinerary pipeline: validate the trip request, select candidate
//! destinations and offers, compile the prompt, call the generation service and
//! persist the result together with a snapshot of its inputs.

use futures::try_join;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ItineraryRecord, ItinerarySnapshot, LocationInfo, NewItinerary, Offer, Place};
use crate::lists::{summarize, PlaceStats};
use crate::ports::{CatalogStore, ItineraryGenerationService, ItineraryStore, PortError};
use crate::prompt::{compile_prompt, PromptInput, UNKNOWN_CLIMATE};
use crate::trip::{TripError, TripRequest, ValidTrip};

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error(transparent)]
    InvalidTrip(#[from] TripError),
    #[error("the day count must be positive")]
    MissingDays,
    #[error("{given} day(s) requested but the dates span {expected}")]
    DayCountMismatch { expected: u32, given: u32 },
    #[error("no destinations found")]
    NoDestinations,
    #[error("province or district not found")]
    LocationNotFound,
    #[error("could not load data: {0}")]
    DataUnavailable(PortError),
    #[error("itinerary generation failed: {0}")]
    Generation(PortError),
    #[error("could not save itinerary: {source}")]
    Persistence {
        generated_text: String,
        source: PortError,
    },
}

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Everything gathered for a trip before generation. This is also the body
/// accepted by the stand-alone generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedTrip {
    pub form: TripRequest,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default)]
    pub stats: PlaceStats,
    #[serde(default = "default_climate")]
    pub climate: String,
    #[serde(default)]
    pub offers: Vec<Offer>,
}

fn default_climate() -> String {
    UNKNOWN_CLIMATE.to_string()
}

/// A completion plus the location data it was generated from.
#[derive(Debug, Clone)]
pub struct GeneratedItinerary {
    pub text: String,
    pub province: LocationInfo,
    pub district: LocationInfo,
    pub offers: Vec<Offer>,
}

/// Runs the pipeline against borrowed store and generator handles.
pub struct ItineraryPlanner<'a, S: ?Sized, G: ?Sized> {
    store: &'a S,
    generator: &'a G,
}

impl<'a, S, G> ItineraryPlanner<'a, S, G>
where
    S: CatalogStore + ItineraryStore + ?Sized,
    G: ItineraryGenerationService + ?Sized,
{
    pub fn new(store: &'a S, generator: &'a G) -> Self {
        Self { store, generator }
    }

    /// Active destinations for the trip, ordered by name (then id).
    pub async fn select_destinations(&self, trip: &ValidTrip) -> PlannerResult<Vec<Place>> {
        let filter = trip.destination_filter();
        let mut places = self
            .store
            .find_destinations(&filter)
            .await
            .map_err(PlannerError::DataUnavailable)?;

        places.retain(|p| filter.matches(p));
        places.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(places)
    }

    /// Active offers for the given places. A failed lookup yields no offers.
    pub async fn select_offers(&self, place_ids: &[Uuid]) -> Vec<Offer> {
        if place_ids.is_empty() {
            return Vec::new();
        }
        match self.store.active_offers_for_places(place_ids).await {
            Ok(offers) => offers,
            Err(e) => {
                warn!("Offer lookup failed, continuing without offers: {}", e);
                Vec::new()
            }
        }
    }

    /// Gathers destinations, offers and the summary without generating anything.
    pub async fn prepare(&self, request: &TripRequest) -> PlannerResult<PreparedTrip> {
        let trip = request.validate()?;
        let places = self.select_destinations(&trip).await?;
        let place_ids: Vec<Uuid> = places.iter().map(|p| p.id).collect();
        let offers = self.select_offers(&place_ids).await;
        let stats = summarize(&places);

        Ok(PreparedTrip {
            form: trip.to_request(),
            days: trip.days,
            places,
            stats,
            climate: default_climate(),
            offers,
        })
    }

    async fn load_locations(&self, trip: &ValidTrip) -> PlannerResult<(LocationInfo, LocationInfo)> {
        let (province, district) = try_join!(
            self.store.get_province(trip.province_id),
            self.store.get_district(trip.district_id)
        )
        .map_err(|e| match e {
            PortError::NotFound(_) => PlannerError::LocationNotFound,
            other => PlannerError::DataUnavailable(other),
        })?;
        Ok((province.into(), district.into()))
    }

    /// Compiles the prompt for prepared data and calls the generation service.
    pub async fn generate(&self, prepared: &PreparedTrip) -> PlannerResult<GeneratedItinerary> {
        let trip = prepared.form.validate()?;
        if prepared.days == 0 {
            return Err(PlannerError::MissingDays);
        }
        if prepared.days != trip.days {
            return Err(PlannerError::DayCountMismatch {
                expected: trip.days,
                given: prepared.days,
            });
        }
        if prepared.places.is_empty() {
            return Err(PlannerError::NoDestinations);
        }

        let (province, district) = self.load_locations(&trip).await?;
        let prompt = compile_prompt(&PromptInput {
            trip: &trip,
            province: &province,
            district: &district,
            stats: &prepared.stats,
            climate: &prepared.climate,
            destinations: &prepared.places,
        });

        let text = self
            .generator
            .generate_itinerary(&prompt)
            .await
            .map_err(PlannerError::Generation)?;

        Ok(GeneratedItinerary {
            text,
            province,
            district,
            offers: prepared.offers.clone(),
        })
    }

    /// The full pipeline. Nothing is generated or written when no destination matches.
    pub async fn plan(&self, user_id: Uuid, request: &TripRequest) -> PlannerResult<ItineraryRecord> {
        let prepared = self.prepare(request).await?;
        if prepared.places.is_empty() {
            return Err(PlannerError::NoDestinations);
        }

        let generated = self.generate(&prepared).await?;
        let district_id = prepared
            .form
            .district_id
            .ok_or(PlannerError::InvalidTrip(TripError::MissingLocation))?;

        let new_itinerary = NewItinerary {
            user_id,
            district_id,
            generated_text: generated.text.clone(),
            input_data: ItinerarySnapshot {
                province: generated.province,
                district: generated.district,
                places: prepared.places,
                offers: generated.offers,
            },
        };

        let record = self
            .store
            .save_itinerary(new_itinerary)
            .await
            .map_err(|source| PlannerError::Persistence {
                generated_text: generated.text,
                source,
            })?;

        info!("Saved itinerary {} for user {}", record.id, user_id);
        Ok(record)
    }
}
