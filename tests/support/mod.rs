//! In-memory fakes for the collaborator traits, shared across the
//! integration tests in this directory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use scene_retrieval::{
    FieldBoosts, LexicalHit, LexicalStore, PreferencesStore, Result, RetrievalError, SceneRecord, SceneStore,
    SearchPreferences, TextEmbedder, VectorHit, VectorStore,
};

/// A vector store that always returns a fixed, pre-ranked hit list
/// regardless of the query vector — the channel driver under test supplies
/// the embedding, fusion supplies the weighting.
pub struct FixedVectorStore {
    pub hits: Vec<VectorHit>,
}

impl FixedVectorStore {
    pub fn new(hits: Vec<(&str, f64)>) -> Arc<dyn VectorStore> {
        Arc::new(Self {
            hits: hits.into_iter().map(|(id, sim)| VectorHit { scene_id: id.to_string(), similarity: sim }).collect(),
        })
    }
}

#[async_trait]
impl VectorStore for FixedVectorStore {
    async fn cosine_search(
        &self,
        _query_vector: &[f32],
        _tenant_id: &str,
        _video_scope_id: Option<&str>,
        _threshold: f64,
        k: usize,
    ) -> Result<Vec<VectorHit>> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

/// A vector store whose `cosine_search` always fails, for failure-folding
/// tests.
pub struct FailingVectorStore;

#[async_trait]
impl VectorStore for FailingVectorStore {
    async fn cosine_search(
        &self,
        _query_vector: &[f32],
        _tenant_id: &str,
        _video_scope_id: Option<&str>,
        _threshold: f64,
        _k: usize,
    ) -> Result<Vec<VectorHit>> {
        Err(RetrievalError::internal("vector store unreachable"))
    }
}

/// A vector store that never returns, used to exercise per-channel
/// deadlines.
pub struct StallingVectorStore;

#[async_trait]
impl VectorStore for StallingVectorStore {
    async fn cosine_search(
        &self,
        _query_vector: &[f32],
        _tenant_id: &str,
        _video_scope_id: Option<&str>,
        _threshold: f64,
        _k: usize,
    ) -> Result<Vec<VectorHit>> {
        std::future::pending().await
    }
}

pub struct FixedLexicalStore {
    pub hits: Vec<LexicalHit>,
    pub available: AtomicBool,
}

impl FixedLexicalStore {
    pub fn new(hits: Vec<(&str, f64)>) -> Arc<dyn LexicalStore> {
        Arc::new(Self {
            hits: hits.into_iter().map(|(id, score)| LexicalHit { scene_id: id.to_string(), score }).collect(),
            available: AtomicBool::new(true),
        })
    }

    pub fn unavailable(hits: Vec<(&str, f64)>) -> Arc<dyn LexicalStore> {
        Arc::new(Self {
            hits: hits.into_iter().map(|(id, score)| LexicalHit { scene_id: id.to_string(), score }).collect(),
            available: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl LexicalStore for FixedLexicalStore {
    async fn bm25_search(
        &self,
        _query_text: &str,
        _tenant_id: &str,
        _video_scope_id: Option<&str>,
        k: usize,
        _field_boosts: &FieldBoosts,
    ) -> Result<Vec<LexicalHit>> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }

    async fn probe_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}

pub struct StubTextEmbedder;

#[async_trait]
impl TextEmbedder for StubTextEmbedder {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

pub struct UnavailableTextEmbedder;

#[async_trait]
impl TextEmbedder for UnavailableTextEmbedder {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RetrievalError::internal("embedder unreachable"))
    }

    async fn probe_available(&self) -> bool {
        false
    }
}

pub struct FixedSceneStore;

#[async_trait]
impl SceneStore for FixedSceneStore {
    async fn get_many_preserve_order(&self, ids: &[String]) -> Result<Vec<SceneRecord>> {
        Ok(ids
            .iter()
            .map(|id| SceneRecord {
                scene_id: id.clone(),
                video_id: "video-1".to_string(),
                tenant_id: "tenant-1".to_string(),
                fields: serde_json::json!({ "title": id }),
            })
            .collect())
    }
}

pub struct FixedPreferencesStore {
    pub preferences: Option<SearchPreferences>,
}

#[async_trait]
impl PreferencesStore for FixedPreferencesStore {
    async fn get_search_preferences(&self, _tenant_id: &str) -> Result<Option<SearchPreferences>> {
        Ok(self.preferences.clone())
    }
}
