//! Error types for fdql-core.
//!
//! Minimal error types without server dependencies (no HTTP, no storage).

use thiserror::Error;

/// FDQL error type
#[derive(Error, Debug)]
pub enum FdqlError {
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Semantic error: {0}")]
    SemanticError(String),

    #[error("Result too large: {0} rows exceed the limit")]
    ResultTooLarge(usize),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),
}

/// Result type for FDQL operations
pub type FdqlResult<T> = Result<T, FdqlError>;

impl serde::Serialize for FdqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FdqlError::MalformedQuery("WHERE is not an object".to_string());
        assert_eq!(err.to_string(), "Malformed query: WHERE is not an object");

        let err = FdqlError::SemanticError("mixed dataset ids".to_string());
        assert_eq!(err.to_string(), "Semantic error: mixed dataset ids");

        let err = FdqlError::ResultTooLarge(5001);
        assert_eq!(err.to_string(), "Result too large: 5001 rows exceed the limit");

        let err = FdqlError::DatasetNotFound("sections".to_string());
        assert_eq!(err.to_string(), "Dataset not found: sections");
    }

    #[test]
    fn test_result_type() {
        let ok_result: FdqlResult<i32> = Ok(42);
        assert_eq!(ok_result.unwrap(), 42);

        let err_result: FdqlResult<i32> = Err(FdqlError::SemanticError("test".to_string()));
        assert!(err_result.is_err());
    }

    #[test]
    fn test_error_serializes_as_string() {
        let err = FdqlError::ResultTooLarge(6000);
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Result too large: 6000 rows exceed the limit\"");
    }
}
