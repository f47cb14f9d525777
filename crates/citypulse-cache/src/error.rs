//! Error types for the cache subsystem.

use citypulse_core::error::CityPulseError;

/// Errors from cache tiers.
///
/// These surface only at the remote-tier trait boundary; the store itself
/// degrades on tier failure instead of propagating.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("disk tier error: {0}")]
    Disk(String),
    #[error("remote tier error: {0}")]
    Remote(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<CacheError> for CityPulseError {
    fn from(err: CacheError) -> Self {
        CityPulseError::Cache(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::Disk("permission denied".to_string());
        assert_eq!(err.to_string(), "disk tier error: permission denied");

        let err = CacheError::Remote("backend unreachable".to_string());
        assert_eq!(err.to_string(), "remote tier error: backend unreachable");
    }

    #[test]
    fn test_cache_error_into_core_error() {
        let err: CityPulseError = CacheError::Remote("timeout".to_string()).into();
        assert!(matches!(err, CityPulseError::Cache(_)));
        assert!(err.to_string().contains("timeout"));
    }
}
