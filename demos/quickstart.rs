//! Quickstart Example - wiring an orchestrator over in-memory fakes.
//!
//! This example demonstrates how to combine a dense text channel and the
//! lexical channel:
//! 1. Implement the collaborator traits with trivial in-memory fakes
//! 2. Build a `RetrievalOrchestrator` with a weighted channel configuration
//! 3. Run a query under reciprocal rank fusion

use std::sync::Arc;

use async_trait::async_trait;
use scene_retrieval::{
    Channel, DenseTextDriver, FieldBoosts, LexicalDriver, LexicalHit, LexicalStore, QueryRequest, Result,
    RetrievalConfig, RetrievalOrchestrator, SceneRecord, SceneStore, TextEmbedder, VectorHit, VectorStore,
};

struct FakeEmbedder;

#[async_trait]
impl TextEmbedder for FakeEmbedder {
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0, 0.0])
    }
}

struct FakeVectorStore;

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn cosine_search(
        &self,
        _query_vector: &[f32],
        _tenant_id: &str,
        _video_scope_id: Option<&str>,
        _threshold: f64,
        _k: usize,
    ) -> Result<Vec<VectorHit>> {
        Ok(vec![
            VectorHit { scene_id: "scene-1".to_string(), similarity: 0.91 },
            VectorHit { scene_id: "scene-2".to_string(), similarity: 0.74 },
        ])
    }
}

struct FakeLexicalStore;

#[async_trait]
impl LexicalStore for FakeLexicalStore {
    async fn bm25_search(
        &self,
        _query_text: &str,
        _tenant_id: &str,
        _video_scope_id: Option<&str>,
        _k: usize,
        _field_boosts: &FieldBoosts,
    ) -> Result<Vec<LexicalHit>> {
        Ok(vec![
            LexicalHit { scene_id: "scene-2".to_string(), score: 12.4 },
            LexicalHit { scene_id: "scene-3".to_string(), score: 8.1 },
        ])
    }

    async fn probe_available(&self) -> bool {
        true
    }
}

struct FakeSceneStore;

#[async_trait]
impl SceneStore for FakeSceneStore {
    async fn get_many_preserve_order(&self, ids: &[String]) -> Result<Vec<SceneRecord>> {
        Ok(ids
            .iter()
            .map(|id| SceneRecord {
                scene_id: id.clone(),
                video_id: "video-1".to_string(),
                tenant_id: "tenant-1".to_string(),
                fields: serde_json::json!({ "title": format!("Scene {id}") }),
            })
            .collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = RetrievalConfig::builder()
        .weight(Channel::Transcript, 0.7)
        .weight(Channel::Visual, 0.0)
        .weight(Channel::Summary, 0.0)
        .weight(Channel::ClipVisual, 0.0)
        .weight(Channel::Lexical, 0.3)
        .channel_enabled(Channel::Visual, false)
        .channel_enabled(Channel::Summary, false)
        .channel_enabled(Channel::ClipVisual, false)
        .build();

    let text_embedder: Arc<dyn TextEmbedder> = Arc::new(FakeEmbedder);
    let vector_store: Arc<dyn VectorStore> = Arc::new(FakeVectorStore);
    let lexical_store: Arc<dyn LexicalStore> = Arc::new(FakeLexicalStore);

    let transcript_driver = Arc::new(DenseTextDriver::new(
        Channel::Transcript,
        text_embedder.clone(),
        vector_store.clone(),
    ));
    let lexical_driver = Arc::new(LexicalDriver::new(lexical_store.clone(), LexicalDriver::default_field_boosts()));

    let orchestrator = RetrievalOrchestrator::builder()
        .config(config)
        .driver(Channel::Transcript, transcript_driver)
        .driver(Channel::Lexical, lexical_driver)
        .text_embedder_probe(text_embedder)
        .lexical_probe(lexical_store)
        .scene_store(Arc::new(FakeSceneStore))
        .build()?;

    let request = QueryRequest::new("a dog chasing a ball", "tenant-1").with_debug(true);
    let response = orchestrator.query(request).await?;

    println!("=== scene-retrieval quickstart ===\n");
    for (i, item) in response.results.iter().enumerate() {
        println!("{}. {} (score {:.4}, {:?})", i + 1, item.scene_id, item.fused_score, item.score_type);
    }
    println!("\nchannels active: {:?}", response.channels_active);
    println!("channels empty: {:?}", response.channels_empty);

    Ok(())
}
