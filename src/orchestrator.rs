//! The retrieval orchestrator (`spec.md` §4.4): mode selection, concurrent
//! fan-out under per-channel deadlines, fusion, and hydration.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use log::{debug, warn};

use crate::candidate::{Candidate, Channel};
use crate::channel::{ChannelDriver, ChannelQuery};
use crate::collaborators::{ImageEmbedder, LexicalStore, PreferencesStore, SceneStore, TextEmbedder};
use crate::config::RetrievalConfig;
use crate::error::{ChannelDriverError, ChannelFailure, EmptyChannelCause, Result, RetrievalError};
use crate::fusion::{self, ChannelResult, FusionMethod, FusionParams};
use crate::hydrator;
use crate::request::QueryRequest;
use crate::response::QueryResponse;
use crate::weights::{self, DeclaredWeights};

/// Which combination of channels this query was actually served from
/// (`spec.md` §4.4 "Mode selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Two or more dense channels plus a reachable lexical store.
    MultiChannel,
    /// Exactly one dense channel plus a reachable lexical store.
    Hybrid,
    /// No dense channel reachable; lexical store reachable.
    LexicalOnly,
    /// Lexical store unreachable; at least one dense channel reachable.
    DenseOnly,
}

#[derive(Debug, Clone)]
enum ChannelOutcome {
    Candidates(Vec<Candidate>),
    Empty(EmptyChannelCause),
}

/// Fixed priority order used to break ties when more than one dense
/// channel shares the largest declared weight (`SPEC_FULL.md` §3).
const DENSE_PRIORITY: [Channel; 4] = [Channel::Transcript, Channel::Visual, Channel::Summary, Channel::ClipVisual];

fn pick_tie_break_channel(weights: &BTreeMap<Channel, f64>) -> Option<Channel> {
    DENSE_PRIORITY
        .iter()
        .copied()
        .filter(|c| weights.contains_key(c))
        .max_by(|a, b| {
            weights[a]
                .partial_cmp(&weights[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    // Lower priority index wins ties; DENSE_PRIORITY is
                    // already in descending-priority order, so flip the
                    // comparison to prefer the earlier entry.
                    let a_idx = DENSE_PRIORITY.iter().position(|x| x == a).unwrap();
                    let b_idx = DENSE_PRIORITY.iter().position(|x| x == b).unwrap();
                    b_idx.cmp(&a_idx)
                })
        })
}

/// A value-typed, dependency-injected orchestrator. Constructed once via
/// [`RetrievalOrchestratorBuilder`] and reused across queries; it holds no
/// per-query mutable state beyond local variables in [`Self::query`].
pub struct RetrievalOrchestrator {
    config: RetrievalConfig,
    drivers: HashMap<Channel, Arc<dyn ChannelDriver>>,
    text_embedder_probe: Option<Arc<dyn TextEmbedder>>,
    image_embedder_probe: Option<Arc<dyn ImageEmbedder>>,
    lexical_probe: Option<Arc<dyn LexicalStore>>,
    scene_store: Arc<dyn SceneStore>,
    preferences_store: Option<Arc<dyn PreferencesStore>>,
}

impl RetrievalOrchestrator {
    pub fn builder() -> RetrievalOrchestratorBuilder {
        RetrievalOrchestratorBuilder::default()
    }

    /// Execute a single query end to end.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let started = Instant::now();
        let query_id = uuid::Uuid::new_v4();
        self.validate_request(&request)?;

        let preferences = match &self.preferences_store {
            Some(store) => store.get_search_preferences(&request.tenant_id).await?,
            None => None,
        };

        let declared = weights::resolve_declared_weights(
            &self.config,
            request.channel_weights.as_ref(),
            preferences.as_ref(),
            self.config.weight_sum_tolerance,
        )?;

        let fusion_method = request
            .fusion_method
            .or_else(|| preferences.as_ref().and_then(|p| p.fusion_method))
            .unwrap_or(self.config.fusion_method_default);
        let dense_threshold = request.dense_threshold.unwrap_or(self.config.dense_threshold_default);

        let (mode, active_channels) = self.determine_active_channels(&declared).await?;
        debug!("[{query_id}] resolved retrieval mode {mode:?} over channels {active_channels:?}");

        let fan_out = self.fan_out(&request, &active_channels, dense_threshold).await;

        let non_empty: Vec<Channel> = active_channels
            .iter()
            .copied()
            .filter(|c| matches!(fan_out.get(c), Some(ChannelOutcome::Candidates(v)) if !v.is_empty()))
            .collect();
        let channels_empty: Vec<Channel> = active_channels
            .iter()
            .copied()
            .filter(|c| !non_empty.contains(c))
            .collect();

        let debug_requested = request.debug && self.config.debug_enabled;

        if non_empty.is_empty() {
            let failures: Vec<ChannelFailure> = fan_out
                .iter()
                .filter_map(|(channel, outcome)| match outcome {
                    ChannelOutcome::Empty(EmptyChannelCause::Failed(error)) => {
                        Some(ChannelFailure { channel: *channel, error: error.clone() })
                    }
                    ChannelOutcome::Empty(EmptyChannelCause::Timeout) => {
                        Some(ChannelFailure { channel: *channel, error: ChannelDriverError::Timeout })
                    }
                    _ => None,
                })
                .collect();
            if !failures.is_empty() {
                let detail = failures
                    .iter()
                    .map(|f| format!("{:?}: {}", f.channel, f.error))
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(RetrievalError::RetrievalUnavailable(format!(
                    "every active channel returned empty and at least one channel failed ({detail})"
                )));
            }
            return Ok(self.build_response(
                &request,
                Vec::new(),
                &declared,
                None,
                mode,
                &fan_out,
                active_channels,
                channels_empty,
                debug_requested,
                fusion_method,
                started,
            ));
        }

        let effective = weights::redistribute(&declared, &non_empty);
        if effective.weights.is_empty() {
            return Ok(self.build_response(
                &request,
                Vec::new(),
                &declared,
                None,
                mode,
                &fan_out,
                active_channels,
                channels_empty,
                debug_requested,
                fusion_method,
                started,
            ));
        }

        let tie_break_channel = pick_tie_break_channel(&effective.weights);

        let channel_results: Vec<ChannelResult> = non_empty
            .iter()
            .map(|channel| {
                let candidates = match fan_out.get(channel) {
                    Some(ChannelOutcome::Candidates(v)) => v.clone(),
                    _ => unreachable!("non_empty channels always carry Candidates"),
                };
                ChannelResult { channel: *channel, candidates }
            })
            .collect();

        let fused = fusion::fuse(
            &channel_results,
            &effective.weights,
            fusion_method,
            &FusionParams {
                rrf_k: self.config.rrf_k,
                epsilon: self.config.minmax_epsilon,
                tie_break_channel,
            },
            request.limit,
            debug_requested,
        );

        let results = hydrator::hydrate(&self.scene_store, fused).await?;

        Ok(self.build_response(
            &request,
            results,
            &declared,
            Some(&effective.weights),
            mode,
            &fan_out,
            active_channels,
            channels_empty,
            debug_requested,
            fusion_method,
            started,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_response(
        &self,
        request: &QueryRequest,
        results: Vec<crate::response::ResultItem>,
        declared: &DeclaredWeights,
        effective_weights: Option<&BTreeMap<Channel, f64>>,
        mode: RetrievalMode,
        fan_out: &BTreeMap<Channel, ChannelOutcome>,
        channels_active: Vec<Channel>,
        channels_empty: Vec<Channel>,
        debug_requested: bool,
        fusion_method: FusionMethod,
        started: Instant,
    ) -> QueryResponse {
        let _ = mode; // mode is surfaced to logs, not the wire contract (spec.md §6)
        let channel_candidate_counts = debug_requested.then(|| {
            fan_out
                .iter()
                .map(|(c, o)| {
                    let n = match o {
                        ChannelOutcome::Candidates(v) => v.len(),
                        ChannelOutcome::Empty(_) => 0,
                    };
                    (*c, n)
                })
                .collect()
        });

        QueryResponse {
            query: request.query_text.clone(),
            total: results.len(),
            results,
            latency_ms: started.elapsed().as_millis() as u64,
            fusion_method,
            fusion_weights: declared.weights.clone(),
            effective_weights: debug_requested.then(|| effective_weights.cloned().unwrap_or_default()),
            channel_candidate_counts,
            channels_active,
            channels_empty,
        }
    }

    fn validate_request(&self, request: &QueryRequest) -> Result<()> {
        if request.query_text.trim().is_empty() {
            return Err(RetrievalError::invalid_request("query_text must not be empty"));
        }
        if request.tenant_id.trim().is_empty() {
            return Err(RetrievalError::invalid_request("tenant_id must not be empty"));
        }
        if !(1..=100).contains(&request.limit) {
            return Err(RetrievalError::invalid_request(format!(
                "limit must be in 1..=100, got {}",
                request.limit
            )));
        }
        if let Some(threshold) = request.dense_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(RetrievalError::invalid_request(format!(
                    "dense_threshold must be in [0, 1], got {threshold}"
                )));
            }
        }
        Ok(())
    }

    /// Mode selection (`spec.md` §4.4). Probes embedder/store reachability
    /// and intersects it with the declared + enabled + driver-registered
    /// channel set.
    async fn determine_active_channels(
        &self,
        declared: &DeclaredWeights,
    ) -> Result<(RetrievalMode, Vec<Channel>)> {
        let is_candidate = |channel: &Channel| {
            declared.weights.contains_key(channel) && self.config.is_enabled(*channel) && self.drivers.contains_key(channel)
        };

        let dense_text_enabled = [Channel::Transcript, Channel::Visual, Channel::Summary]
            .into_iter()
            .any(|c| is_candidate(&c));
        let text_reachable = dense_text_enabled
            && match &self.text_embedder_probe {
                Some(probe) => probe.probe_available().await,
                None => false,
            };

        let image_enabled = is_candidate(&Channel::ClipVisual);
        let image_reachable = image_enabled
            && match &self.image_embedder_probe {
                Some(probe) => probe.probe_available().await,
                None => false,
            };

        let lexical_enabled = is_candidate(&Channel::Lexical);
        let lexical_reachable = lexical_enabled
            && match &self.lexical_probe {
                Some(probe) => probe.probe_available().await,
                None => false,
            };

        let mut dense_active: Vec<Channel> = Vec::new();
        if text_reachable {
            dense_active.extend([Channel::Transcript, Channel::Visual, Channel::Summary].into_iter().filter(&is_candidate));
        }
        if image_reachable {
            dense_active.push(Channel::ClipVisual);
        }
        dense_active.sort();
        dense_active.dedup();

        if dense_active.is_empty() && !lexical_reachable {
            warn!("no channel is reachable for this query");
            return Err(RetrievalError::RetrievalUnavailable(
                "neither a dense embedder nor the lexical store is reachable".to_string(),
            ));
        }

        let mode = match (dense_active.len(), lexical_reachable) {
            (n, true) if n >= 2 => RetrievalMode::MultiChannel,
            (1, true) => RetrievalMode::Hybrid,
            (0, true) => RetrievalMode::LexicalOnly,
            (_, false) => RetrievalMode::DenseOnly,
        };

        let mut active_channels = dense_active;
        if lexical_reachable {
            active_channels.push(Channel::Lexical);
        }
        active_channels.sort();

        Ok((mode, active_channels))
    }

    /// Fan out to every active channel concurrently. Every task runs to
    /// its own completion (success, failure, or deadline) regardless of
    /// its siblings — no task is cancelled by another's return
    /// (`spec.md` §4.4 "A task MUST NOT be cancelled by the return of
    /// peers").
    async fn fan_out(
        &self,
        request: &QueryRequest,
        active_channels: &[Channel],
        dense_threshold: f64,
    ) -> BTreeMap<Channel, ChannelOutcome> {
        let handles: Vec<(Channel, tokio::task::JoinHandle<(Channel, ChannelOutcome)>)> = active_channels
            .iter()
            .map(|channel| {
                let channel = *channel;
                let driver = self.drivers.get(&channel).cloned();
                let deadline = self.config.deadline(channel);
                let query_text = request.query_text.clone();
                let tenant_id = request.tenant_id.clone();
                let video_scope_id = request.video_scope_id.clone();
                let k = if channel.is_dense() {
                    self.config.dense_candidate_k
                } else {
                    self.config.lexical_candidate_k
                };
                // Each channel runs in its own spawned task so a slow or
                // timed-out sibling never blocks the others (spec.md §4.4:
                // no task is cancelled by a sibling's completion).
                let handle = tokio::spawn(async move {
                    let Some(driver) = driver else {
                        return (channel, ChannelOutcome::Empty(EmptyChannelCause::NotActive));
                    };

                    let query = ChannelQuery {
                        query_text: &query_text,
                        tenant_id: &tenant_id,
                        video_scope_id: video_scope_id.as_deref(),
                        k,
                        dense_threshold: channel.is_dense().then_some(dense_threshold),
                    };

                    match tokio::time::timeout(deadline, driver.search(&query)).await {
                        Ok(Ok(candidates)) if candidates.is_empty() => {
                            (channel, ChannelOutcome::Empty(EmptyChannelCause::NoCandidates))
                        }
                        Ok(Ok(candidates)) => (channel, ChannelOutcome::Candidates(candidates)),
                        Ok(Err(error)) => {
                            warn!("channel {channel:?} failed: {error}");
                            (channel, ChannelOutcome::Empty(EmptyChannelCause::Failed(error)))
                        }
                        Err(_elapsed) => {
                            warn!("channel {channel:?} timed out after {deadline:?}");
                            (channel, ChannelOutcome::Empty(EmptyChannelCause::Timeout))
                        }
                    }
                });

                (channel, handle)
            })
            .collect();

        let (channels, futures): (Vec<Channel>, Vec<_>) = handles.into_iter().unzip();
        join_all(futures)
            .await
            .into_iter()
            .zip(channels)
            .map(|(joined, channel)| match joined {
                Ok(pair) => pair,
                Err(join_error) => {
                    warn!("channel {channel:?} task panicked: {join_error}");
                    (channel, ChannelOutcome::Empty(EmptyChannelCause::Failed(ChannelDriverError::Unavailable(
                        "driver task panicked".to_string(),
                    ))))
                }
            })
            .collect()
    }
}

/// Builder for [`RetrievalOrchestrator`] (teacher convention: an
/// injected value, never a global singleton).
#[derive(Default)]
pub struct RetrievalOrchestratorBuilder {
    config: Option<RetrievalConfig>,
    drivers: HashMap<Channel, Arc<dyn ChannelDriver>>,
    text_embedder_probe: Option<Arc<dyn TextEmbedder>>,
    image_embedder_probe: Option<Arc<dyn ImageEmbedder>>,
    lexical_probe: Option<Arc<dyn LexicalStore>>,
    scene_store: Option<Arc<dyn SceneStore>>,
    preferences_store: Option<Arc<dyn PreferencesStore>>,
}

impl RetrievalOrchestratorBuilder {
    pub fn config(mut self, config: RetrievalConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn driver(mut self, channel: Channel, driver: Arc<dyn ChannelDriver>) -> Self {
        self.drivers.insert(channel, driver);
        self
    }

    pub fn text_embedder_probe(mut self, embedder: Arc<dyn TextEmbedder>) -> Self {
        self.text_embedder_probe = Some(embedder);
        self
    }

    pub fn image_embedder_probe(mut self, embedder: Arc<dyn ImageEmbedder>) -> Self {
        self.image_embedder_probe = Some(embedder);
        self
    }

    pub fn lexical_probe(mut self, store: Arc<dyn LexicalStore>) -> Self {
        self.lexical_probe = Some(store);
        self
    }

    pub fn scene_store(mut self, store: Arc<dyn SceneStore>) -> Self {
        self.scene_store = Some(store);
        self
    }

    pub fn preferences_store(mut self, store: Arc<dyn PreferencesStore>) -> Self {
        self.preferences_store = Some(store);
        self
    }

    pub fn build(self) -> Result<RetrievalOrchestrator> {
        let scene_store = self
            .scene_store
            .ok_or_else(|| RetrievalError::internal("RetrievalOrchestrator requires a scene_store"))?;

        Ok(RetrievalOrchestrator {
            config: self.config.unwrap_or_default(),
            drivers: self.drivers,
            text_embedder_probe: self.text_embedder_probe,
            image_embedder_probe: self.image_embedder_probe,
            lexical_probe: self.lexical_probe,
            scene_store,
            preferences_store: self.preferences_store,
        })
    }
}
