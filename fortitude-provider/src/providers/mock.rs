//! Scripted provider for testing.
//!
//! Behaves according to a queue of outcomes, then falls back to always
//! succeeding. Deterministic and side-effect free apart from its call
//! counters.

use crate::types::{ProviderMetadata, ResearchProvider};
use async_trait::async_trait;
use fortitude_core::{
    ProviderError, ProviderId, QualityScore, ResearchRequest, ResearchResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted call outcome.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Respond successfully with this content.
    Succeed(String),
    /// Fail with this error.
    Fail(ProviderError),
    /// Sleep for the duration, then respond successfully. Used to trip
    /// attempt timeouts.
    Hang(Duration),
}

/// Provider whose behavior follows a queue of [`ScriptedOutcome`]s.
pub struct ScriptedProvider {
    metadata: ProviderMetadata,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    healthy: AtomicBool,
    calls: AtomicU32,
    health_checks: AtomicU32,
}

impl ScriptedProvider {
    /// Create a provider with a script of outcomes. Once the script is
    /// exhausted, every call succeeds.
    pub fn new(metadata: ProviderMetadata, script: Vec<ScriptedOutcome>) -> Self {
        Self {
            metadata,
            script: Mutex::new(script.into()),
            healthy: AtomicBool::new(true),
            calls: AtomicU32::new(0),
            health_checks: AtomicU32::new(0),
        }
    }

    /// A provider that always succeeds.
    pub fn always_succeeding(name: &str) -> Self {
        Self::new(ProviderMetadata::new(ProviderId::new(name)), Vec::new())
    }

    /// A provider that always fails with a retryable server error.
    pub fn always_failing(name: &str) -> Self {
        let error = ProviderError::ServerError {
            provider: name.to_string(),
            status: 503,
            message: "scripted failure".to_string(),
        };
        let mut provider = Self::new(ProviderMetadata::new(ProviderId::new(name)), Vec::new());
        provider.script = Mutex::new(std::iter::repeat(ScriptedOutcome::Fail(error)).take(1000).collect());
        provider.healthy = AtomicBool::new(false);
        provider
    }

    /// Set the outcome of future health checks.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of `execute` calls observed.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `health_check` calls observed.
    pub fn health_checks(&self) -> u32 {
        self.health_checks.load(Ordering::SeqCst)
    }

    fn succeed(&self, content: String) -> ResearchResponse {
        ResearchResponse::new(content, self.metadata.id.clone(), QualityScore::uniform(0.9))
    }
}

#[async_trait]
impl ResearchProvider for ScriptedProvider {
    async fn execute(&self, request: &ResearchRequest) -> Result<ResearchResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        match outcome {
            None => Ok(self.succeed(format!("scripted response for {}", request.topic))),
            Some(ScriptedOutcome::Succeed(content)) => Ok(self.succeed(content)),
            Some(ScriptedOutcome::Fail(error)) => Err(error),
            Some(ScriptedOutcome::Hang(duration)) => {
                tokio::time::sleep(duration).await;
                Ok(self.succeed(format!("late response for {}", request.topic)))
            }
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::ServerError {
                provider: self.metadata.id.to_string(),
                status: 503,
                message: "health check failed".to_string(),
            })
        }
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }
}

impl std::fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("id", &self.metadata.id)
            .field("calls", &self.calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fortitude_core::ResearchType;

    #[tokio::test]
    async fn test_script_plays_in_order() {
        let provider = ScriptedProvider::new(
            ProviderMetadata::new(ProviderId::new("mock")),
            vec![
                ScriptedOutcome::Fail(ProviderError::RateLimited {
                    provider: "mock".to_string(),
                    retry_after_ms: 100,
                }),
                ScriptedOutcome::Succeed("second".to_string()),
            ],
        );
        let request = ResearchRequest::new("topic", ResearchType::Learning);

        assert!(provider.execute(&request).await.is_err());
        let response = provider.execute(&request).await.unwrap();
        assert_eq!(response.content, "second");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_succeeds() {
        let provider = ScriptedProvider::always_succeeding("mock");
        let request = ResearchRequest::new("topic", ResearchType::Learning);
        assert!(provider.execute(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_health_check_follows_flag() {
        let provider = ScriptedProvider::always_succeeding("mock");
        assert!(provider.health_check().await.is_ok());
        provider.set_healthy(false);
        assert!(provider.health_check().await.is_err());
        assert_eq!(provider.health_checks(), 2);
    }
}
