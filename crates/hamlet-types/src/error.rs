//! Error taxonomy shared by every node role
//!
//! Every variant except `Unreachable` is detected before any state
//! mutation, so local state is always left consistent on failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for hamlet operations
pub type Result<T> = std::result::Result<T, HamletError>;

/// Hamlet error types.
///
/// Serializable so a failed remote call surfaces the same variant the
/// remote node raised, not a flattened string.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HamletError {
    /// Unknown item, occupation, direction, or malformed input
    #[error("validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// Stamina, currency, or item shortfall; checked before any mutation
    #[error("insufficient {what}: required {required}, available {available}")]
    InsufficientResource {
        what: String,
        required: u64,
        available: u64,
    },

    /// The node already submitted its one action for this period
    #[error("node {node} already acted this period")]
    AlreadyActed { node: String },

    /// The villager already slept today
    #[error("already slept today")]
    AlreadySlept,

    /// Sleeping requires a house or a temp_room voucher in inventory
    #[error("no shelter: sleeping requires a house or a temp_room")]
    NoShelter,

    /// Eating requires bread in inventory
    #[error("no food: eating requires bread")]
    NoFood,

    /// Unknown trade or node id
    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    /// Operation attempted against a terminal or wrong-phase trade
    #[error("invalid trade state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    /// Remote call failed or timed out; never retried silently
    #[error("{target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },
}

impl HamletError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an insufficient-resource error
    pub fn insufficient(what: impl Into<String>, required: u64, available: u64) -> Self {
        Self::InsufficientResource {
            what: what.into(),
            required,
            available,
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create an unreachable error
    pub fn unreachable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error was raised before any local mutation
    pub fn is_pre_mutation(&self) -> bool {
        !matches!(self, Self::Unreachable { .. })
    }

    /// Get a stable machine-readable code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION",
            Self::InsufficientResource { .. } => "INSUFFICIENT_RESOURCE",
            Self::AlreadyActed { .. } => "ALREADY_ACTED",
            Self::AlreadySlept => "ALREADY_SLEPT",
            Self::NoShelter => "NO_SHELTER",
            Self::NoFood => "NO_FOOD",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Unreachable { .. } => "UNREACHABLE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = HamletError::insufficient("stamina", 20, 5);
        assert_eq!(err.error_code(), "INSUFFICIENT_RESOURCE");
        assert!(err.to_string().contains("20"));
    }

    #[test]
    fn test_error_round_trips_through_json() {
        let err = HamletError::insufficient("wheat", 5, 2);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("insufficient_resource"));
        let back: HamletError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.error_code(), "INSUFFICIENT_RESOURCE");
        assert_eq!(back.to_string(), err.to_string());
    }

    #[test]
    fn test_pre_mutation_classification() {
        assert!(HamletError::NoFood.is_pre_mutation());
        assert!(!HamletError::unreachable("bob", "timeout").is_pre_mutation());
    }
}
