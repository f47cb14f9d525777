//! Error types for event providers.

use citypulse_core::error::CityPulseError;

#[derive(Debug, thiserror::Error)]
pub enum EventsError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("provider timed out after {0}s")]
    Timeout(u64),
    #[error("unsupported city: {0}")]
    UnsupportedCity(String),
}

impl From<EventsError> for CityPulseError {
    fn from(err: EventsError) -> Self {
        CityPulseError::Provider(err.to_string())
    }
}
