//! Channel drivers (`spec.md` §4.1): adapters translating a query into a
//! ranked [`Candidate`] list for a single retrieval channel.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::candidate::{Candidate, Channel};
use crate::collaborators::{FieldBoosts, ImageEmbedder, LexicalStore, TextEmbedder, VectorStore};
use crate::error::ChannelDriverError;

/// Parameters common to every channel driver invocation.
#[derive(Debug, Clone)]
pub struct ChannelQuery<'a> {
    pub query_text: &'a str,
    pub tenant_id: &'a str,
    pub video_scope_id: Option<&'a str>,
    pub k: usize,
    /// Only meaningful for dense channels (cosine similarity cutoff).
    pub dense_threshold: Option<f64>,
}

/// A single retrieval channel: given a query, produce up to `k` ranked
/// candidates. Implementations do not retry internally and do not enforce
/// their own wall-clock deadline — the orchestrator wraps every call in a
/// `tokio::time::timeout` using the channel's configured deadline.
#[async_trait]
pub trait ChannelDriver: Send + Sync {
    fn channel(&self) -> Channel;

    async fn search(&self, query: &ChannelQuery<'_>) -> Result<Vec<Candidate>, ChannelDriverError>;
}

/// Assigns contiguous 1-indexed ranks to an already-ordered list of
/// `(scene_id, score)` pairs and enforces the "no duplicate scene_id"
/// invariant (`spec.md` §3 invariant 2 and 3).
pub fn rank_and_validate(hits: Vec<(String, f64)>) -> Result<Vec<Candidate>, ChannelDriverError> {
    let mut seen = HashSet::with_capacity(hits.len());
    let mut candidates = Vec::with_capacity(hits.len());
    for (rank, (scene_id, score)) in hits.into_iter().enumerate() {
        if !seen.insert(scene_id.clone()) {
            return Err(ChannelDriverError::Malformed(format!(
                "duplicate scene_id '{scene_id}' in channel response"
            )));
        }
        candidates.push(Candidate::new(scene_id, rank + 1, score));
    }
    Ok(candidates)
}

/// A dense-text channel driver (Transcript, Visual, Summary): embeds the
/// query with a 1536-d text embedder, then queries the vector store with
/// cosine similarity.
pub struct DenseTextDriver {
    channel: Channel,
    embedder: Arc<dyn TextEmbedder>,
    store: Arc<dyn VectorStore>,
}

impl DenseTextDriver {
    pub fn new(channel: Channel, embedder: Arc<dyn TextEmbedder>, store: Arc<dyn VectorStore>) -> Self {
        assert!(
            matches!(channel, Channel::Transcript | Channel::Visual | Channel::Summary),
            "DenseTextDriver only supports text-embedded channels"
        );
        Self { channel, embedder, store }
    }
}

#[async_trait]
impl ChannelDriver for DenseTextDriver {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn search(&self, query: &ChannelQuery<'_>) -> Result<Vec<Candidate>, ChannelDriverError> {
        let vector = self
            .embedder
            .embed_text(query.query_text)
            .await
            .map_err(|e| ChannelDriverError::EmbeddingUnavailable(e.to_string()))?;

        let threshold = query.dense_threshold.unwrap_or(0.2);
        let hits = self
            .store
            .cosine_search(&vector, query.tenant_id, query.video_scope_id, threshold, query.k)
            .await
            .map_err(|e| ChannelDriverError::Unavailable(e.to_string()))?;

        rank_and_validate(hits.into_iter().map(|h| (h.scene_id, h.similarity)).collect())
    }
}

/// The CLIP-aligned dense-image channel driver: embeds the query with a
/// 512-d image-aligned embedder, otherwise identical to [`DenseTextDriver`].
pub struct DenseImageDriver {
    embedder: Arc<dyn ImageEmbedder>,
    store: Arc<dyn VectorStore>,
}

impl DenseImageDriver {
    pub fn new(embedder: Arc<dyn ImageEmbedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl ChannelDriver for DenseImageDriver {
    fn channel(&self) -> Channel {
        Channel::ClipVisual
    }

    async fn search(&self, query: &ChannelQuery<'_>) -> Result<Vec<Candidate>, ChannelDriverError> {
        let vector = self
            .embedder
            .embed_text(query.query_text)
            .await
            .map_err(|e| ChannelDriverError::EmbeddingUnavailable(e.to_string()))?;

        let threshold = query.dense_threshold.unwrap_or(0.2);
        let hits = self
            .store
            .cosine_search(&vector, query.tenant_id, query.video_scope_id, threshold, query.k)
            .await
            .map_err(|e| ChannelDriverError::Unavailable(e.to_string()))?;

        rank_and_validate(hits.into_iter().map(|h| (h.scene_id, h.similarity)).collect())
    }
}

/// The lexical (BM25) channel driver. Field boosts are fixed per
/// deployment (`spec.md` §4.1: tags 4x, transcript 3x, visual description
/// 2x, combined 1x).
pub struct LexicalDriver {
    store: Arc<dyn LexicalStore>,
    field_boosts: FieldBoosts,
}

impl LexicalDriver {
    pub fn new(store: Arc<dyn LexicalStore>, field_boosts: FieldBoosts) -> Self {
        Self { store, field_boosts }
    }

    /// The deployment's default field boost table.
    pub fn default_field_boosts() -> FieldBoosts {
        FieldBoosts::from([
            ("tags".to_string(), 4.0),
            ("transcript".to_string(), 3.0),
            ("visual_description".to_string(), 2.0),
            ("combined".to_string(), 1.0),
        ])
    }
}

#[async_trait]
impl ChannelDriver for LexicalDriver {
    fn channel(&self) -> Channel {
        Channel::Lexical
    }

    async fn search(&self, query: &ChannelQuery<'_>) -> Result<Vec<Candidate>, ChannelDriverError> {
        let hits = self
            .store
            .bm25_search(
                query.query_text,
                query.tenant_id,
                query.video_scope_id,
                query.k,
                &self.field_boosts,
            )
            .await
            .map_err(|e| ChannelDriverError::Unavailable(e.to_string()))?;

        rank_and_validate(hits.into_iter().map(|h| (h.scene_id, h.score)).collect())
    }
}
