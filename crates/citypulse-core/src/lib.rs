//! CityPulse core crate - configuration, error taxonomy, shared domain types.

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{CityPulseError, Result};
pub use types::*;
