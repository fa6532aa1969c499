//! End-to-end orchestrator behavior: mode selection, validation, and
//! per-channel failure folding.

mod support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scene_retrieval::{
    Channel, DenseTextDriver, LexicalDriver, QueryRequest, RetrievalConfig, RetrievalError, RetrievalOrchestrator,
};
use support::{FailingVectorStore, FixedLexicalStore, FixedSceneStore, FixedVectorStore, StallingVectorStore, StubTextEmbedder, UnavailableTextEmbedder};

fn single_channel_config(weight: f64) -> RetrievalConfig {
    RetrievalConfig {
        weights_default: HashMap::from([(Channel::Transcript, weight)]),
        ..RetrievalConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_query_text_is_rejected() {
    let orchestrator = RetrievalOrchestrator::builder()
        .config(single_channel_config(1.0))
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(
                Channel::Transcript,
                Arc::new(StubTextEmbedder),
                FixedVectorStore::new(vec![("A", 0.5)]),
            )),
        )
        .text_embedder_probe(Arc::new(StubTextEmbedder))
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("", "tenant-1");
    let err = orchestrator.query(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidRequest(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn limit_out_of_range_is_rejected() {
    let orchestrator = RetrievalOrchestrator::builder()
        .config(single_channel_config(1.0))
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(
                Channel::Transcript,
                Arc::new(StubTextEmbedder),
                FixedVectorStore::new(vec![("A", 0.5)]),
            )),
        )
        .text_embedder_probe(Arc::new(StubTextEmbedder))
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("a query", "tenant-1").with_limit(0);
    let err = orchestrator.query(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidRequest(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_embedder_falls_back_to_lexical_only_mode() {
    let lexical_store = FixedLexicalStore::new(vec![("A", 5.0)]);
    let config = RetrievalConfig {
        weights_default: HashMap::from([(Channel::Transcript, 0.5), (Channel::Lexical, 0.5)]),
        ..RetrievalConfig::default()
    };

    let orchestrator = RetrievalOrchestrator::builder()
        .config(config)
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(
                Channel::Transcript,
                Arc::new(UnavailableTextEmbedder),
                FixedVectorStore::new(vec![("B", 0.9)]),
            )),
        )
        .driver(Channel::Lexical, Arc::new(LexicalDriver::new(lexical_store.clone(), LexicalDriver::default_field_boosts())))
        .text_embedder_probe(Arc::new(UnavailableTextEmbedder))
        .lexical_probe(lexical_store)
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("a query", "tenant-1");
    let response = orchestrator.query(request).await.unwrap();

    assert_eq!(response.channels_active, vec![Channel::Lexical]);
    assert_eq!(response.results[0].scene_id, "A");
}

#[tokio::test(flavor = "multi_thread")]
async fn every_channel_unreachable_is_retrieval_unavailable() {
    let orchestrator = RetrievalOrchestrator::builder()
        .config(single_channel_config(1.0))
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(
                Channel::Transcript,
                Arc::new(UnavailableTextEmbedder),
                FixedVectorStore::new(vec![("A", 0.5)]),
            )),
        )
        .text_embedder_probe(Arc::new(UnavailableTextEmbedder))
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("a query", "tenant-1");
    let err = orchestrator.query(request).await.unwrap_err();
    assert!(matches!(err, RetrievalError::RetrievalUnavailable(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn sole_channel_failing_is_retrieval_unavailable_with_cause() {
    let orchestrator = RetrievalOrchestrator::builder()
        .config(single_channel_config(1.0))
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(Channel::Transcript, Arc::new(StubTextEmbedder), Arc::new(FailingVectorStore))),
        )
        .text_embedder_probe(Arc::new(StubTextEmbedder))
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("a query", "tenant-1");
    let err = orchestrator.query(request).await.unwrap_err();
    match err {
        RetrievalError::RetrievalUnavailable(message) => assert!(message.contains("Transcript")),
        other => panic!("expected RetrievalUnavailable, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn a_failing_channel_is_folded_not_propagated() {
    let lexical_store = FixedLexicalStore::new(vec![("A", 5.0)]);
    let config = RetrievalConfig {
        weights_default: HashMap::from([(Channel::Transcript, 0.5), (Channel::Lexical, 0.5)]),
        ..RetrievalConfig::default()
    };

    let orchestrator = RetrievalOrchestrator::builder()
        .config(config)
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(Channel::Transcript, Arc::new(StubTextEmbedder), Arc::new(FailingVectorStore))),
        )
        .driver(Channel::Lexical, Arc::new(LexicalDriver::new(lexical_store.clone(), LexicalDriver::default_field_boosts())))
        .text_embedder_probe(Arc::new(StubTextEmbedder))
        .lexical_probe(lexical_store)
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("a query", "tenant-1");
    let response = orchestrator.query(request).await.unwrap();

    assert_eq!(response.results[0].scene_id, "A");
    assert_eq!(response.channels_empty, vec![Channel::Transcript]);
}

#[tokio::test(flavor = "multi_thread")]
async fn a_stalled_channel_times_out_without_blocking_the_others() {
    let lexical_store = FixedLexicalStore::new(vec![("A", 5.0)]);
    let mut channel_deadline = HashMap::new();
    channel_deadline.insert(Channel::Transcript, Duration::from_millis(20));

    let config = RetrievalConfig {
        weights_default: HashMap::from([(Channel::Transcript, 0.5), (Channel::Lexical, 0.5)]),
        channel_deadline,
        ..RetrievalConfig::default()
    };

    let orchestrator = RetrievalOrchestrator::builder()
        .config(config)
        .driver(
            Channel::Transcript,
            Arc::new(DenseTextDriver::new(Channel::Transcript, Arc::new(StubTextEmbedder), Arc::new(StallingVectorStore))),
        )
        .driver(Channel::Lexical, Arc::new(LexicalDriver::new(lexical_store.clone(), LexicalDriver::default_field_boosts())))
        .text_embedder_probe(Arc::new(StubTextEmbedder))
        .lexical_probe(lexical_store)
        .scene_store(Arc::new(FixedSceneStore))
        .build()
        .unwrap();

    let request = QueryRequest::new("a query", "tenant-1");
    let response = orchestrator.query(request).await.unwrap();

    assert_eq!(response.results[0].scene_id, "A");
    assert_eq!(response.channels_empty, vec![Channel::Transcript]);
}
