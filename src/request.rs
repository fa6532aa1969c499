//! The query input contract (`spec.md` §3 / §6).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::candidate::Channel;
use crate::fusion::FusionMethod;

fn default_limit() -> usize {
    10
}

/// A single natural-language scene query, scoped to one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_text: String,
    pub tenant_id: String,
    #[serde(default)]
    pub video_scope_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum cosine similarity for dense channels. `None` means "use the
    /// deployment's `RetrievalConfig::dense_threshold_default`" — resolved
    /// by the orchestrator, not here, since this type has no config access.
    #[serde(default)]
    pub dense_threshold: Option<f64>,
    #[serde(default)]
    pub fusion_method: Option<FusionMethod>,
    #[serde(default)]
    pub channel_weights: Option<HashMap<Channel, f64>>,
    #[serde(default)]
    pub debug: bool,
}

impl QueryRequest {
    pub fn new(query_text: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            tenant_id: tenant_id.into(),
            video_scope_id: None,
            limit: default_limit(),
            dense_threshold: None,
            fusion_method: None,
            channel_weights: None,
            debug: false,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_video_scope(mut self, video_scope_id: impl Into<String>) -> Self {
        self.video_scope_id = Some(video_scope_id.into());
        self
    }

    pub fn with_dense_threshold(mut self, threshold: f64) -> Self {
        self.dense_threshold = Some(threshold);
        self
    }

    pub fn with_fusion_method(mut self, method: FusionMethod) -> Self {
        self.fusion_method = Some(method);
        self
    }

    pub fn with_channel_weights(mut self, weights: HashMap<Channel, f64>) -> Self {
        self.channel_weights = Some(weights);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
