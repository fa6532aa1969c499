//! # scene-retrieval
//!
//! A hybrid multi-channel scene retrieval and fusion engine for video
//! search.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Concurrent fan-out across dense (cosine) and lexical (BM25) channels
//! - MinMax weighted-mean and reciprocal rank fusion
//! - Proportional weight redistribution when channels return empty
//! - Pluggable vector store, lexical store, and embedder backends
// Core modules
pub mod candidate;
pub mod channel;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod fusion;
pub mod hydrator;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod weights;

// Re-exports for the public API
pub use candidate::{Candidate, Channel, ChannelDebug, ChannelKind, FusedCandidate, ScoreType};
pub use channel::{ChannelDriver, ChannelQuery, DenseImageDriver, DenseTextDriver, LexicalDriver};
pub use collaborators::{
    FieldBoosts, ImageEmbedder, LexicalHit, LexicalStore, PreferencesStore, SceneRecord, SceneStore,
    SearchPreferences, TextEmbedder, VectorHit, VectorStore,
};
pub use config::{RetrievalConfig, RetrievalConfigBuilder};
pub use error::{ChannelDriverError, ChannelFailure, EmptyChannelCause, Result, RetrievalError};
pub use fusion::{ChannelResult, FusionMethod, FusionParams};
pub use orchestrator::{RetrievalMode, RetrievalOrchestrator, RetrievalOrchestratorBuilder};
pub use request::QueryRequest;
pub use response::{QueryResponse, ResultItem};
pub use weights::{DeclaredWeights, EffectiveWeights};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
