//! Crate-level configuration.
//!
//! A plain value constructed with the builder, injected into the
//! [`crate::orchestrator::RetrievalOrchestrator`] at construction time —
//! there is no global/static configuration anywhere in this crate.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidate::Channel;
use crate::fusion::FusionMethod;

fn default_dense_candidate_k() -> usize {
    200
}

fn default_lexical_candidate_k() -> usize {
    200
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_minmax_epsilon() -> f64 {
    1e-9
}

fn default_weight_tolerance() -> f64 {
    1e-6
}

/// Configuration enumerated in the specification's "Configuration" section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub fusion_method_default: FusionMethod,
    pub weights_default: HashMap<Channel, f64>,
    #[serde(default = "default_dense_candidate_k")]
    pub dense_candidate_k: usize,
    #[serde(default = "default_lexical_candidate_k")]
    pub lexical_candidate_k: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
    #[serde(default = "default_minmax_epsilon")]
    pub minmax_epsilon: f64,
    pub channel_enabled: HashMap<Channel, bool>,
    #[serde(with = "duration_ms_map")]
    pub channel_deadline: HashMap<Channel, Duration>,
    pub debug_enabled: bool,
    /// Tolerance used when checking that declared weights sum to 1.0.
    #[serde(default = "default_weight_tolerance")]
    pub weight_sum_tolerance: f64,
    /// Minimum cosine similarity for dense channels (`spec.md` default 0.2).
    pub dense_threshold_default: f64,
}

impl RetrievalConfig {
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.channel_enabled.get(&channel).copied().unwrap_or(false)
    }

    pub fn deadline(&self, channel: Channel) -> Duration {
        self.channel_deadline
            .get(&channel)
            .copied()
            .unwrap_or_else(|| default_deadline_for(channel))
    }
}

fn default_deadline_for(channel: Channel) -> Duration {
    match channel {
        Channel::Transcript | Channel::Visual | Channel::Summary => Duration::from_millis(3_000),
        Channel::ClipVisual => Duration::from_millis(1_500),
        Channel::Lexical => Duration::from_millis(1_000),
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let weights_default = HashMap::from([
            (Channel::Transcript, 0.4),
            (Channel::Visual, 0.25),
            (Channel::Summary, 0.15),
            (Channel::ClipVisual, 0.1),
            (Channel::Lexical, 0.1),
        ]);
        let channel_enabled = Channel::ALL.iter().map(|c| (*c, true)).collect();
        let channel_deadline = Channel::ALL
            .iter()
            .map(|c| (*c, default_deadline_for(*c)))
            .collect();

        Self {
            fusion_method_default: FusionMethod::ReciprocalRankFusion,
            weights_default,
            dense_candidate_k: default_dense_candidate_k(),
            lexical_candidate_k: default_lexical_candidate_k(),
            rrf_k: default_rrf_k(),
            minmax_epsilon: default_minmax_epsilon(),
            channel_enabled,
            channel_deadline,
            debug_enabled: false,
            weight_sum_tolerance: default_weight_tolerance(),
            dense_threshold_default: 0.2,
        }
    }
}

/// Builder for [`RetrievalConfig`]. Starts from the default and overrides
/// fields incrementally, mirroring the teacher's `IndexConfigBuilder`.
#[derive(Default)]
pub struct RetrievalConfigBuilder {
    config: Option<RetrievalConfig>,
}

impl RetrievalConfigBuilder {
    fn base(&mut self) -> &mut RetrievalConfig {
        self.config.get_or_insert_with(RetrievalConfig::default)
    }

    pub fn fusion_method_default(mut self, method: FusionMethod) -> Self {
        self.base().fusion_method_default = method;
        self
    }

    pub fn weight(mut self, channel: Channel, weight: f64) -> Self {
        self.base().weights_default.insert(channel, weight);
        self
    }

    pub fn channel_enabled(mut self, channel: Channel, enabled: bool) -> Self {
        self.base().channel_enabled.insert(channel, enabled);
        self
    }

    pub fn channel_deadline(mut self, channel: Channel, deadline: Duration) -> Self {
        self.base().channel_deadline.insert(channel, deadline);
        self
    }

    pub fn dense_candidate_k(mut self, k: usize) -> Self {
        self.base().dense_candidate_k = k;
        self
    }

    pub fn lexical_candidate_k(mut self, k: usize) -> Self {
        self.base().lexical_candidate_k = k;
        self
    }

    pub fn rrf_k(mut self, k: f64) -> Self {
        self.base().rrf_k = k;
        self
    }

    pub fn debug_enabled(mut self, enabled: bool) -> Self {
        self.base().debug_enabled = enabled;
        self
    }

    pub fn build(mut self) -> RetrievalConfig {
        self.base();
        self.config.unwrap()
    }
}

mod duration_ms_map {
    use std::collections::HashMap;
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::candidate::Channel;

    pub fn serialize<S: Serializer>(
        map: &HashMap<Channel, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let as_ms: HashMap<Channel, u64> =
            map.iter().map(|(c, d)| (*c, d.as_millis() as u64)).collect();
        as_ms.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<Channel, Duration>, D::Error> {
        let as_ms: HashMap<Channel, u64> = HashMap::deserialize(deserializer)?;
        Ok(as_ms
            .into_iter()
            .map(|(c, ms)| (c, Duration::from_millis(ms)))
            .collect())
    }
}
