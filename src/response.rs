//! The response contract (`spec.md` §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidate::{Channel, ChannelDebug, ScoreType};
use crate::fusion::FusionMethod;

/// One hydrated, scored result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub scene_id: String,
    pub fused_score: f64,
    pub score_type: ScoreType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<BTreeMap<Channel, ChannelDebug>>,
    /// Outer-layer display fields carried opaquely from the scene store.
    pub fields: serde_json::Value,
}

/// The full query response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<ResultItem>,
    pub total: usize,
    pub latency_ms: u64,
    pub fusion_method: FusionMethod,
    /// Declared weights (pre-redistribution).
    pub fusion_weights: BTreeMap<Channel, f64>,
    /// Post-redistribution weights; debug only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_weights: Option<BTreeMap<Channel, f64>>,
    /// Per-channel candidate counts before fusion; debug only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_candidate_counts: Option<BTreeMap<Channel, usize>>,
    pub channels_active: Vec<Channel>,
    pub channels_empty: Vec<Channel>,
}
