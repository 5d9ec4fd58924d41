//! Fortitude Provider - registry, health, selection, and fallback.
//!
//! This crate implements the multi-provider execution engine that sits in
//! front of the tiered cache. Providers are registered explicitly against a
//! closed trait - there is no discovery or reflection. Retry, backoff, and
//! circuit-breaking policy live in one place, `FallbackEngine`, shared by
//! every call site.

pub mod engine;
pub mod health;
pub mod providers;
pub mod registry;
pub mod selection;
pub mod types;

pub use engine::FallbackEngine;
pub use health::HealthMonitor;
pub use providers::http::HttpResearchProvider;
pub use providers::mock::{ScriptedOutcome, ScriptedProvider};
pub use registry::ProviderRegistry;
pub use selection::SelectionEngine;
pub use types::{CostModel, ProviderMetadata, RateLimitDescriptor, ResearchProvider};
