//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use descubre_core::ports::{DatabaseService, ItineraryGenerationService};
use descubre_core::ItineraryPlanner;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub generator: Arc<dyn ItineraryGenerationService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// A planner borrowing this state's store and generation handles.
    pub fn planner(&self) -> ItineraryPlanner<'_, dyn DatabaseService, dyn ItineraryGenerationService> {
        ItineraryPlanner::new(self.db.as_ref(), self.generator.as_ref())
    }
}
