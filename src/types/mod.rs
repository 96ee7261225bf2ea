//! Core Types
//!
//! Data model and unified error types shared across the pipeline.

pub mod error;
pub mod itinerary;
pub mod request;

pub use error::{ErrorClassifier, ProviderError, ProviderErrorKind, Result, TripError};
pub use itinerary::{
    Activity, ActivityType, BudgetBreakdown, BudgetEstimate, DayPlan, EmergencyInfo,
    ItineraryResponse, Location,
};
pub use request::{
    AccommodationTier, Budget, GenerationOptions, GenerationRequest, TransportMode, TravelPace,
    Travelers,
};
