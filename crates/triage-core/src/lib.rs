//! Triage library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types (Stable)
//! - [`Config`], [`ConfigError`] - Server configuration
//! - [`DecisionEngine`], [`RoutingDecision`], [`RoutingTier`] - Tiered routing
//! - [`PatternStore`], [`Pattern`], [`Severity`] - Error-pattern retrieval
//! - [`WeaknessMatcher`], [`WeaknessPattern`], [`WeaknessMatch`] - Curated
//!   weakness matching
//!
//! ## Embedding
//! - [`EmbeddingProvider`] - Provider seam (remote HTTP or mock)
//! - [`RemoteEmbedder`] - OpenAI-style `/embeddings` client with retry
//! - [`EmbeddingCache`] - Content-hash keyed disk cache over a provider
//!
//! ## Vector Index
//! - [`FlatIndex`] - Brute-force squared-L2 index with rkyv persistence
//!
//! ## Utilities
//! - [`PromptBuilder`] - Deterministic enhanced-prompt assembly
//! - Hashing functions for cache keys
//!
//! ## Test/Mock Support
//! [`MockEmbedder`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod embedding;
pub mod engine;
pub mod hashing;
pub mod index;
pub mod patterns;
pub mod prompt;
pub mod weakness;

pub use config::{Config, ConfigError};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;
pub use embedding::{EmbeddingCache, EmbeddingError, EmbeddingProvider, RemoteEmbedder};
pub use engine::{
    DecisionEngine, EngineError, EngineOptions, EngineStats, RoutingDecision, RoutingTier,
};
pub use hashing::{hash_decision_key, hash_text, hash_to_u64};
pub use index::{FlatIndex, IndexError};
pub use patterns::{
    NewPattern, Pattern, PatternStore, RetrievedPattern, Severity, StoreError, StoreStats,
};
pub use prompt::PromptBuilder;
pub use weakness::{
    WeaknessError, WeaknessMatch, WeaknessMatcher, WeaknessPattern, WeaknessStats,
    WeaknessTriggers,
};
