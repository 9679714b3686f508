pub mod db;
pub mod itinerary_llm;

pub use db::DbAdapter;
pub use itinerary_llm::OpenAiItineraryAdapter;
