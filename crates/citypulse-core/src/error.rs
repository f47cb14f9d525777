use thiserror::Error;

/// Top-level error type for the CityPulse system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// CityPulseError` so that the `?` operator works seamlessly across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CityPulseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Event provider error: {0}")]
    Provider(String),

    #[error("Ranking error: {0}")]
    Ranking(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<toml::de::Error> for CityPulseError {
    fn from(err: toml::de::Error) -> Self {
        CityPulseError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CityPulseError {
    fn from(err: toml::ser::Error) -> Self {
        CityPulseError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CityPulseError {
    fn from(err: serde_json::Error) -> Self {
        CityPulseError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for CityPulse operations.
pub type Result<T> = std::result::Result<T, CityPulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CityPulseError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = CityPulseError::Cache("tier unavailable".to_string());
        assert_eq!(err.to_string(), "Cache error: tier unavailable");

        let err = CityPulseError::ConversationNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Conversation not found: abc");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CityPulseError = io_err.into();
        assert!(matches!(err, CityPulseError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let bad_json = "{ invalid json }";
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str(bad_json);
        let err: CityPulseError = parse.unwrap_err().into();
        assert!(matches!(err, CityPulseError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let bad_toml = "invalid = [[[";
        let parse: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let err: CityPulseError = parse.unwrap_err().into();
        assert!(matches!(err, CityPulseError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
