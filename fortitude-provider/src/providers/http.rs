//! HTTP-backed research provider with rate limiting.

use crate::types::{ProviderMetadata, ResearchProvider};
use async_trait::async_trait;
use fortitude_core::{
    AudienceLevel, ProviderError, QualityScore, ResearchRequest, ResearchResponse, ResearchType,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};

/// Research provider speaking a JSON-over-HTTP protocol.
pub struct HttpResearchProvider {
    client: Client,
    api_key: String,
    base_url: String,
    metadata: ProviderMetadata,
    rate_limiter: Arc<Semaphore>,
    last_request: Mutex<Option<Instant>>,
    min_request_interval: Duration,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    topic: &'a str,
    research_type: &'a str,
    audience: &'a str,
    domain: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: String,
    relevance: f64,
    accuracy: f64,
    completeness: f64,
    clarity: f64,
    composite: f64,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn research_type_label(research_type: ResearchType) -> &'static str {
    match research_type {
        ResearchType::Decision => "decision",
        ResearchType::Implementation => "implementation",
        ResearchType::Troubleshooting => "troubleshooting",
        ResearchType::Learning => "learning",
        ResearchType::Validation => "validation",
    }
}

fn audience_label(audience: AudienceLevel) -> &'static str {
    match audience {
        AudienceLevel::Beginner => "beginner",
        AudienceLevel::Intermediate => "intermediate",
        AudienceLevel::Advanced => "advanced",
        AudienceLevel::Unspecified => "unspecified",
    }
}

impl HttpResearchProvider {
    /// Create a provider against the given base URL.
    ///
    /// The rate limit from the metadata bounds both in-flight requests and
    /// the minimum interval between request starts.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        metadata: ProviderMetadata,
    ) -> Self {
        let rpm = metadata.rate_limit.requests_per_minute.max(1);
        let min_interval = Duration::from_millis((60_000 / u64::from(rpm)).max(10));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            rate_limiter: Arc::new(Semaphore::new(rpm as usize)),
            last_request: Mutex::new(None),
            min_request_interval: min_interval,
            metadata,
        }
    }

    fn name(&self) -> String {
        self.metadata.id.to_string()
    }

    /// Enforce the minimum interval between request starts.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_request_interval {
                tokio::time::sleep(self.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn classify_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = match serde_json::from_str::<ApiError>(&error_text) {
            Ok(api_error) => api_error.error.message,
            Err(_) => error_text,
        };

        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
                provider: self.name(),
                retry_after_ms: 1000,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::InvalidApiKey {
                provider: self.name(),
            },
            status if status.is_client_error() => ProviderError::InvalidRequest {
                provider: self.name(),
                message,
            },
            status => ProviderError::ServerError {
                provider: self.name(),
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl ResearchProvider for HttpResearchProvider {
    async fn execute(&self, request: &ResearchRequest) -> Result<ResearchResponse, ProviderError> {
        let _permit =
            self.rate_limiter
                .acquire()
                .await
                .map_err(|e| ProviderError::ServerError {
                    provider: self.name(),
                    status: 500,
                    message: format!("rate limiter closed: {e}"),
                })?;
        self.pace().await;

        let url = format!("{}/research", self.base_url);
        let body = ApiRequest {
            topic: &request.topic,
            research_type: research_type_label(request.research_type),
            audience: audience_label(request.audience),
            domain: request.domain.canonical(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ServerError {
                provider: self.name(),
                status: 502,
                message: format!("HTTP request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(self.classify_error(response).await);
        }

        let parsed: ApiResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::ServerError {
                    provider: self.name(),
                    status: 502,
                    message: format!("failed to parse response: {e}"),
                })?;

        Ok(ResearchResponse::new(
            parsed.content,
            self.metadata.id.clone(),
            QualityScore::new(
                parsed.relevance,
                parsed.accuracy,
                parsed.completeness,
                parsed.clarity,
                parsed.composite,
            ),
        ))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let url = format!("{}/healthz", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::ServerError {
                provider: self.name(),
                status: 502,
                message: format!("health check failed: {e}"),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.classify_error(response).await)
        }
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }
}

impl std::fmt::Debug for HttpResearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResearchProvider")
            .field("id", &self.metadata.id)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
