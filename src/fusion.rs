//! The fusion engine (`spec.md` §4.3).
//!
//! Pure, deterministic, no I/O. Combines per-channel [`Candidate`] lists —
//! already restricted to the non-empty channel set `A` and already weighted
//! by the post-redistribution vector — into a single totally ordered list
//! of [`FusedCandidate`]s.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, Channel, ChannelDebug, FusedCandidate, ScoreType};

/// Algorithm used to combine per-channel scores into one fused score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    MinMaxWeightedMean,
    ReciprocalRankFusion,
}

/// One channel's contribution to a fusion call: its identity and its
/// channel-native ordered candidate list (rank 1..N, no duplicates).
#[derive(Debug, Clone)]
pub struct ChannelResult {
    pub channel: Channel,
    pub candidates: Vec<Candidate>,
}

/// Tunables threaded in from [`crate::config::RetrievalConfig`].
#[derive(Debug, Clone)]
pub struct FusionParams {
    pub rrf_k: f64,
    pub epsilon: f64,
    /// The dense channel supplying the first tie-break rank in the
    /// ordering key (`spec.md` §9 Open Question, resolved in
    /// `SPEC_FULL.md` §3: the declared channel with the largest declared
    /// weight among those present, fixed-order ties broken by
    /// `Transcript > Visual > Summary > ClipVisual`).
    pub tie_break_channel: Option<Channel>,
}

/// A scene's per-channel raw score, normalized score, and rank, keyed by
/// scene_id. Shared shape for both fusion methods so downstream debug
/// construction and `contribution = weight * normalized` stay uniform.
type PerSceneChannelStats = HashMap<String, (f64 /* raw */, f64 /* normalized */, usize /* rank */)>;

fn minmax_normalize(candidates: &[Candidate], epsilon: f64) -> PerSceneChannelStats {
    if candidates.is_empty() {
        return HashMap::new();
    }
    let min = candidates.iter().map(|c| c.raw_score).fold(f64::INFINITY, f64::min);
    let max = candidates
        .iter()
        .map(|c| c.raw_score)
        .fold(f64::NEG_INFINITY, f64::max);

    candidates
        .iter()
        .map(|c| {
            let normalized = if candidates.len() == 1 || max == min {
                1.0
            } else {
                (c.raw_score - min) / (max - min + epsilon)
            };
            (c.scene_id.clone(), (c.raw_score, normalized, c.rank))
        })
        .collect()
}

fn rrf_normalize(candidates: &[Candidate], k: f64) -> PerSceneChannelStats {
    candidates
        .iter()
        .map(|c| {
            let normalized = 1.0 / (k + c.rank as f64);
            (c.scene_id.clone(), (c.raw_score, normalized, c.rank))
        })
        .collect()
}

/// Fuse `channel_results` (restricted to the non-empty channel set `A`)
/// under `weights` (the post-redistribution vector, summing to 1.0 over
/// the same channel set) into at most `limit` [`FusedCandidate`]s.
///
/// Callers MUST NOT invoke this with an empty `channel_results` — an
/// empty union is the orchestrator's responsibility to short-circuit
/// before calling fusion at all (`spec.md` §4.4 "Empty union ... is a
/// valid outcome").
pub fn fuse(
    channel_results: &[ChannelResult],
    weights: &BTreeMap<Channel, f64>,
    method: FusionMethod,
    params: &FusionParams,
    limit: usize,
    debug: bool,
) -> Vec<FusedCandidate> {
    if channel_results.len() == 1 {
        return fuse_single_channel(&channel_results[0], params.epsilon, limit, debug);
    }

    let mut stats: BTreeMap<Channel, PerSceneChannelStats> = BTreeMap::new();
    for cr in channel_results {
        let normalized = match method {
            FusionMethod::MinMaxWeightedMean => minmax_normalize(&cr.candidates, params.epsilon),
            FusionMethod::ReciprocalRankFusion => rrf_normalize(&cr.candidates, params.rrf_k),
        };
        stats.insert(cr.channel, normalized);
    }

    let mut union: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    for per_channel in stats.values() {
        union.extend(per_channel.keys().cloned());
    }

    let score_type = match method {
        FusionMethod::MinMaxWeightedMean => ScoreType::MinMaxMean,
        FusionMethod::ReciprocalRankFusion => ScoreType::Rrf,
    };

    let mut fused: Vec<FusedCandidate> = union
        .into_iter()
        .map(|scene_id| {
            let mut fused_score = 0.0;
            let mut debug_map: BTreeMap<Channel, ChannelDebug> = BTreeMap::new();

            for (channel, weight) in weights {
                let entry = stats.get(channel).and_then(|m| m.get(&scene_id));
                let (raw, normalized, rank, contribution) = match entry {
                    Some((raw, normalized, rank)) => {
                        let contribution = weight * normalized;
                        (Some(*raw), Some(*normalized), Some(*rank), contribution)
                    }
                    None => (None, None, None, 0.0),
                };
                fused_score += contribution;
                if debug {
                    debug_map.insert(
                        *channel,
                        ChannelDebug {
                            present: entry.is_some(),
                            raw,
                            normalized,
                            weight: *weight,
                            contribution,
                            rank,
                        },
                    );
                }
            }

            FusedCandidate {
                scene_id,
                fused_score,
                score_type,
                debug: debug.then_some(debug_map),
            }
        })
        .collect();

    sort_and_truncate(&mut fused, &stats, params.tie_break_channel, limit);
    fused
}

fn fuse_single_channel(
    result: &ChannelResult,
    epsilon: f64,
    limit: usize,
    debug: bool,
) -> Vec<FusedCandidate> {
    let (score_type, scored): (ScoreType, Vec<(String, f64, f64, usize)>) = if result.channel.is_dense() {
        (
            ScoreType::DenseOnly,
            result
                .candidates
                .iter()
                .map(|c| (c.scene_id.clone(), c.raw_score, c.raw_score, c.rank))
                .collect(),
        )
    } else {
        let normalized = minmax_normalize(&result.candidates, epsilon);
        (
            ScoreType::LexicalOnly,
            result
                .candidates
                .iter()
                .map(|c| {
                    let (raw, norm, rank) = normalized[&c.scene_id];
                    (c.scene_id.clone(), raw, norm, rank)
                })
                .collect(),
        )
    };

    let mut fused: Vec<FusedCandidate> = scored
        .into_iter()
        .map(|(scene_id, raw, fused_score, rank)| {
            let debug_map = debug.then(|| {
                BTreeMap::from([(
                    result.channel,
                    ChannelDebug {
                        present: true,
                        raw: Some(raw),
                        normalized: Some(fused_score),
                        weight: 1.0,
                        contribution: fused_score,
                        rank: Some(rank),
                    },
                )])
            });
            FusedCandidate {
                scene_id,
                fused_score,
                score_type,
                debug: debug_map,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.scene_id.cmp(&b.scene_id))
    });
    fused.truncate(limit);
    fused
}

fn sort_and_truncate(
    fused: &mut Vec<FusedCandidate>,
    stats: &BTreeMap<Channel, PerSceneChannelStats>,
    tie_break_channel: Option<Channel>,
    limit: usize,
) {
    let rank_in = |channel: Channel, scene_id: &str| -> usize {
        stats
            .get(&channel)
            .and_then(|m| m.get(scene_id))
            .map(|(_, _, rank)| *rank)
            .unwrap_or(usize::MAX)
    };

    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let a_rank = tie_break_channel.map(|c| rank_in(c, &a.scene_id)).unwrap_or(usize::MAX);
                let b_rank = tie_break_channel.map(|c| rank_in(c, &b.scene_id)).unwrap_or(usize::MAX);
                a_rank.cmp(&b_rank)
            })
            .then_with(|| {
                let a_rank = rank_in(Channel::Lexical, &a.scene_id);
                let b_rank = rank_in(Channel::Lexical, &b.scene_id);
                a_rank.cmp(&b_rank)
            })
            .then_with(|| a.scene_id.cmp(&b.scene_id))
    });
    fused.truncate(limit);
}
