//! Collaborator interfaces consumed by the core (`spec.md` §6).
//!
//! Everything in this module is an external dependency boundary: the
//! concrete vector store, lexical store, embedders, scene store, and
//! preferences store are assumed to exist outside this crate. Production
//! code constructs `Arc<dyn Trait>` implementations and hands them to the
//! [`crate::orchestrator::RetrievalOrchestrator`]; tests use in-memory
//! fakes (see `tests/support`).

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::fusion::FusionMethod;

/// A single cosine-similarity hit from the vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub scene_id: String,
    /// Cosine similarity, expected in `[0, 1]`.
    pub similarity: f64,
}

/// A single BM25 hit from the lexical store.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalHit {
    pub scene_id: String,
    /// BM25 score, expected in `[0, inf)`.
    pub score: f64,
}

/// A field boost table for the lexical query, e.g. `{"tags": 4.0,
/// "transcript": 3.0, "visual_description": 2.0, "combined": 1.0}`.
pub type FieldBoosts = std::collections::BTreeMap<String, f64>;

/// Cosine k-NN search over a vector collection, tenant- and
/// (optionally) video-scoped.
///
/// Implementations MUST filter by `tenant_id` and, if provided,
/// `video_scope_id`; MUST exclude scenes lacking this channel's embedding;
/// and MUST be stable under fixed inputs.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn cosine_search(
        &self,
        query_vector: &[f32],
        tenant_id: &str,
        video_scope_id: Option<&str>,
        threshold: f64,
        k: usize,
    ) -> Result<Vec<VectorHit>>;
}

/// BM25 search over the lexical store, tenant- and (optionally)
/// video-scoped.
///
/// The tenant filter MUST be a mandatory clause, never optional.
#[async_trait]
pub trait LexicalStore: Send + Sync {
    async fn bm25_search(
        &self,
        query_text: &str,
        tenant_id: &str,
        video_scope_id: Option<&str>,
        k: usize,
        field_boosts: &FieldBoosts,
    ) -> Result<Vec<LexicalHit>>;

    /// Availability probe used by the orchestrator during mode selection.
    /// The core does not cache this result across requests; an
    /// implementation is free to cache internally.
    async fn probe_available(&self) -> bool;
}

/// Text-to-vector embedding for the dense-text channels (1536-d).
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Availability probe used by the orchestrator during mode selection.
    /// Default `true`; embedders fronting a remote model service should
    /// override this with a real liveness check.
    async fn probe_available(&self) -> bool {
        true
    }
}

/// Image-aligned text-to-vector embedding for the CLIP-style channel
/// (512-d).
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Availability probe used by the orchestrator during mode selection.
    async fn probe_available(&self) -> bool {
        true
    }
}

/// Opaque hydrated scene record. The core only guarantees the three fields
/// below; everything else the outer layer needs travels in `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecord {
    pub scene_id: String,
    pub video_id: String,
    pub tenant_id: String,
    pub fields: JsonValue,
}

/// Batch scene materialization, preserving the caller's requested order.
#[async_trait]
pub trait SceneStore: Send + Sync {
    /// Missing ids are silently dropped; implementations MUST NOT issue
    /// one round-trip per id.
    async fn get_many_preserve_order(&self, ids: &[String]) -> Result<Vec<SceneRecord>>;
}

/// A tenant's saved search preferences, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPreferences {
    pub channel_weights: Option<std::collections::HashMap<crate::candidate::Channel, f64>>,
    pub fusion_method: Option<FusionMethod>,
}

#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get_search_preferences(&self, tenant_id: &str) -> Result<Option<SearchPreferences>>;
}
