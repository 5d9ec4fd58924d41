//! Provider implementations.
//!
//! `http` is the production HTTP-backed provider; `mock` hosts the
//! scripted provider used throughout the test suites.

pub mod http;
pub mod mock;

pub use http::HttpResearchProvider;
pub use mock::{ScriptedOutcome, ScriptedProvider};
