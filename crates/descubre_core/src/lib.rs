pub mod access;
pub mod dashboard;
pub mod domain;
pub mod lists;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod planner;
pub mod ports;
pub mod prompt;
pub mod trip;

pub use access::{authorize, resolve_caller, Caller, GuardDecision, Zone};
pub use domain::{
    ExperienceType, ItineraryRecord, ItinerarySnapshot, Level, LocationInfo, Offer, Place, Priority, Rating, Role,
};
pub use planner::{ItineraryPlanner, PlannerError, PreparedTrip};
pub use ports::{
    BackOfficeStore, CatalogStore, DatabaseService, IdentityStore, ItineraryGenerationService, ItineraryStore,
    PortError, PortResult,
};
pub use trip::{TripError, TripRequest, ValidTrip};
