//! Core value types: [`Channel`], [`Candidate`], and [`FusedCandidate`].
//!
//! These are immutable value types with no dynamically typed payloads —
//! per-channel debug attribution is a strongly typed struct keyed by the
//! closed [`Channel`] enum, never a dict-of-dicts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The closed set of retrieval channels the orchestrator knows how to fan
/// out to. A deployment may enable any subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Transcript,
    Visual,
    Summary,
    ClipVisual,
    Lexical,
}

impl Channel {
    /// All channels the orchestrator is aware of, in a fixed priority order
    /// used to break ties when nothing else distinguishes two channels.
    pub const ALL: [Channel; 5] = [
        Channel::Transcript,
        Channel::Visual,
        Channel::Summary,
        Channel::ClipVisual,
        Channel::Lexical,
    ];

    /// Whether this channel's raw scores are dense-text cosine similarities.
    pub fn kind(self) -> ChannelKind {
        match self {
            Channel::Transcript | Channel::Visual | Channel::Summary => ChannelKind::DenseText,
            Channel::ClipVisual => ChannelKind::DenseImage,
            Channel::Lexical => ChannelKind::Lexical,
        }
    }

    pub fn is_dense(self) -> bool {
        matches!(self.kind(), ChannelKind::DenseText | ChannelKind::DenseImage)
    }
}

/// The semantic type of a channel's raw score, used to decide whether a
/// `dense_threshold` applies and how single-channel fallbacks normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    DenseText,
    DenseImage,
    Lexical,
}

/// A single scored result from one channel driver.
///
/// Immutable once produced. Ranks within a channel's list form a contiguous
/// `1..N` sequence and `scene_id` never repeats within a channel — both are
/// invariants enforced by each channel driver before it returns (see
/// [`crate::channel::rank_and_validate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub scene_id: String,
    /// 1-indexed rank within the channel's own ordering.
    pub rank: usize,
    /// Channel-native score: cosine similarity in `[0, 1]` for dense
    /// channels, BM25 in `[0, inf)` for the lexical channel.
    pub raw_score: f64,
}

impl Candidate {
    pub fn new(scene_id: impl Into<String>, rank: usize, raw_score: f64) -> Self {
        Self {
            scene_id: scene_id.into(),
            rank,
            raw_score,
        }
    }
}

/// How a [`FusedCandidate`]'s score was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    /// Min-max normalized, weighted sum across two or more channels.
    MinMaxMean,
    /// Reciprocal rank fusion across two or more channels.
    Rrf,
    /// Degenerate fallback: only a dense channel produced candidates.
    DenseOnly,
    /// Degenerate fallback: only the lexical channel produced candidates.
    LexicalOnly,
}

/// Per-channel attribution for one fused scene, emitted only when the
/// request asked for `debug = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDebug {
    /// Whether the scene appeared in this channel's candidate list.
    pub present: bool,
    /// The channel-native raw score, if present.
    pub raw: Option<f64>,
    /// The min-max (or rank-reciprocal) normalized score, if present.
    pub normalized: Option<f64>,
    /// The post-redistribution weight applied to this channel.
    pub weight: f64,
    /// `weight * normalized`, i.e. this channel's share of the fused score.
    pub contribution: f64,
    /// The 1-indexed rank within the channel, if present.
    pub rank: Option<usize>,
}

/// A single ranked, scored scene produced by the fusion engine.
///
/// Immutable. `fused_score` is monotone non-increasing with output
/// position by construction (the fusion engine sorts before returning).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub scene_id: String,
    pub fused_score: f64,
    pub score_type: ScoreType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<BTreeMap<Channel, ChannelDebug>>,
}
