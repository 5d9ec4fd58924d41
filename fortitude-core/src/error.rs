//! Error types for Fortitude operations.
//!
//! The taxonomy separates caller errors (never retried), cache errors
//! (always recovered locally), and provider errors (retryable or fatal).
//! `FortitudeError` is the umbrella surfaced to callers of the engine.

use crate::request::ProviderId;
use crate::Timestamp;
use thiserror::Error;

/// Input validation errors. Caller bugs - never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Cache layer errors.
///
/// These are never surfaced to `execute()` callers: the cache is strictly
/// an optimization, so every variant degrades to a miss at the engine
/// boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid cache key input: {reason}")]
    InvalidKeyInput { reason: String },

    #[error("Cache miss")]
    Miss,

    #[error("Cache tier {tier} unavailable: {reason}")]
    TierUnavailable { tier: String, reason: String },

    #[error("Cache serialization failed: {reason}")]
    SerializationFailed { reason: String },
}

/// Provider call errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Request to {provider} timed out after {elapsed_ms}ms")]
    Timeout { provider: String, elapsed_ms: u64 },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Request to {provider} failed with status {status}: {message}")]
    ServerError {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Malformed request rejected by {provider}: {message}")]
    InvalidRequest { provider: String, message: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Provider not registered: {provider}")]
    NotRegistered { provider: String },
}

impl ProviderError {
    /// Whether this failure should cascade to the next fallback candidate.
    ///
    /// Timeouts, rate limits, and server errors are transient; malformed
    /// requests and auth failures would fail identically against the rest
    /// of the chain and abort instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. }
                | ProviderError::RateLimited { .. }
                | ProviderError::ServerError { .. }
        )
    }

    /// The provider this error originated from.
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Timeout { provider, .. }
            | ProviderError::RateLimited { provider, .. }
            | ProviderError::ServerError { provider, .. }
            | ProviderError::InvalidRequest { provider, .. }
            | ProviderError::InvalidApiKey { provider }
            | ProviderError::NotRegistered { provider } => provider,
        }
    }
}

/// One failed attempt within a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// The provider that was attempted.
    pub provider: ProviderId,
    /// Why the attempt failed.
    pub error: ProviderError,
    /// When the attempt was made.
    pub attempted_at: Timestamp,
}

/// Top-level error for Fortitude operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FortitudeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every fallback candidate was consumed without a success.
    ///
    /// Carries one cause per attempted provider for diagnosis.
    #[error("All providers failed after {} attempt(s)", attempts.len())]
    AllProvidersFailed { attempts: Vec<AttemptFailure> },
}

/// Standard result type for Fortitude operations.
pub type FortitudeResult<T> = Result<T, FortitudeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_retryable_classification() {
        let timeout = ProviderError::Timeout {
            provider: "a".to_string(),
            elapsed_ms: 5000,
        };
        let rate_limited = ProviderError::RateLimited {
            provider: "a".to_string(),
            retry_after_ms: 1000,
        };
        let server = ProviderError::ServerError {
            provider: "a".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(rate_limited.is_retryable());
        assert!(server.is_retryable());
    }

    #[test]
    fn test_fatal_classification() {
        let malformed = ProviderError::InvalidRequest {
            provider: "a".to_string(),
            message: "bad payload".to_string(),
        };
        let auth = ProviderError::InvalidApiKey {
            provider: "a".to_string(),
        };
        assert!(!malformed.is_retryable());
        assert!(!auth.is_retryable());
    }

    #[test]
    fn test_all_providers_failed_display_counts_attempts() {
        let err = FortitudeError::AllProvidersFailed {
            attempts: vec![
                AttemptFailure {
                    provider: ProviderId::new("a"),
                    error: ProviderError::Timeout {
                        provider: "a".to_string(),
                        elapsed_ms: 100,
                    },
                    attempted_at: Utc::now(),
                },
                AttemptFailure {
                    provider: ProviderId::new("b"),
                    error: ProviderError::RateLimited {
                        provider: "b".to_string(),
                        retry_after_ms: 500,
                    },
                    attempted_at: Utc::now(),
                },
            ],
        };
        assert_eq!(err.to_string(), "All providers failed after 2 attempt(s)");
    }

    #[test]
    fn test_provider_accessor() {
        let err = ProviderError::ServerError {
            provider: "serper".to_string(),
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.provider(), "serper");
    }
}
