//! The weight resolver (`spec.md` §4.2).

use std::collections::BTreeMap;
use std::collections::HashMap;

use log::warn;

use crate::candidate::Channel;
use crate::collaborators::SearchPreferences;
use crate::config::RetrievalConfig;
use crate::error::{RetrievalError, Result};

/// The declared weight vector resolved before fan-out: request override,
/// then tenant preferences, then system default, first non-null wins per
/// channel. Always sums to 1.0 within tolerance over the declared channel
/// set, or resolution fails with [`RetrievalError::InvalidWeights`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredWeights {
    pub weights: BTreeMap<Channel, f64>,
}

/// Resolve the declared weight vector for a query.
///
/// `request_override` takes priority per channel over `preferences`, which
/// takes priority over `config.weights_default`. Channels absent from all
/// three sources are not part of the declared set.
pub fn resolve_declared_weights(
    config: &RetrievalConfig,
    request_override: Option<&HashMap<Channel, f64>>,
    preferences: Option<&SearchPreferences>,
    weight_sum_tolerance: f64,
) -> Result<DeclaredWeights> {
    let mut weights: BTreeMap<Channel, f64> = config
        .weights_default
        .iter()
        .map(|(c, w)| (*c, *w))
        .collect();

    if let Some(pref) = preferences.and_then(|p| p.channel_weights.as_ref()) {
        for (channel, weight) in pref {
            weights.insert(*channel, *weight);
        }
    }

    if let Some(overrides) = request_override {
        for (channel, weight) in overrides {
            weights.insert(*channel, *weight);
        }
    }

    for channel in weights.keys() {
        if !config.weights_default.contains_key(channel) {
            return Err(RetrievalError::invalid_weights(format!(
                "unknown channel in declared weights: {channel:?}"
            )));
        }
    }

    for (channel, weight) in &weights {
        if *weight < 0.0 {
            return Err(RetrievalError::invalid_weights(format!(
                "channel {channel:?} has negative weight {weight}"
            )));
        }
    }

    let sum: f64 = weights.values().sum();
    if (sum - 1.0).abs() > weight_sum_tolerance {
        return Err(RetrievalError::invalid_weights(format!(
            "declared weights sum to {sum}, expected 1.0 +/- {weight_sum_tolerance}"
        )));
    }

    Ok(DeclaredWeights { weights })
}

/// Result of redistributing declared weight away from empty channels
/// (`spec.md` §4.2 "Redistribution rule").
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveWeights {
    /// Non-empty channel set `A`, each mapped to its post-redistribution
    /// weight. Sums to 1.0 within tolerance, or is empty if `A` is empty.
    pub weights: BTreeMap<Channel, f64>,
}

/// Redistribute weight proportionally from the empty channel set `E` onto
/// the non-empty channel set `A`. Returns an empty map if `A` is empty —
/// this is the "all channels empty" boundary case, not an error.
pub fn redistribute(
    declared: &DeclaredWeights,
    non_empty_channels: &[Channel],
) -> EffectiveWeights {
    let non_empty: std::collections::HashSet<Channel> = non_empty_channels.iter().copied().collect();

    let a_sum: f64 = declared
        .weights
        .iter()
        .filter(|(c, _)| non_empty.contains(c))
        .map(|(_, w)| *w)
        .sum();

    if a_sum <= 0.0 {
        if !non_empty.is_empty() {
            warn!(
                "non-empty channels {:?} carry zero declared weight; nothing to redistribute onto",
                non_empty
            );
        }
        return EffectiveWeights {
            weights: BTreeMap::new(),
        };
    }

    let weights = declared
        .weights
        .iter()
        .filter(|(c, _)| non_empty.contains(c))
        .map(|(c, w)| (*c, w / a_sum))
        .collect();

    EffectiveWeights { weights }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(weights: &[(Channel, f64)]) -> RetrievalConfig {
        RetrievalConfig {
            weights_default: weights.iter().copied().collect(),
            ..RetrievalConfig::default()
        }
    }

    #[test]
    fn resolution_order_request_beats_preferences_beats_default() {
        let config = config_with(&[(Channel::Transcript, 0.5), (Channel::Lexical, 0.5)]);
        let preferences = SearchPreferences {
            channel_weights: Some(HashMap::from([(Channel::Transcript, 0.3), (Channel::Lexical, 0.7)])),
            fusion_method: None,
        };
        let overrides = HashMap::from([(Channel::Transcript, 0.9)]);

        let resolved =
            resolve_declared_weights(&config, Some(&overrides), Some(&preferences), 1e-6).unwrap();

        assert_eq!(resolved.weights[&Channel::Transcript], 0.9);
        assert_eq!(resolved.weights[&Channel::Lexical], 0.7);
    }

    #[test]
    fn non_summing_weights_are_rejected() {
        let config = config_with(&[(Channel::Transcript, 0.5), (Channel::Lexical, 0.4)]);
        let err = resolve_declared_weights(&config, None, None, 1e-6).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidWeights(_)));
    }

    #[test]
    fn unknown_channel_override_is_rejected() {
        let config = config_with(&[(Channel::Transcript, 1.0)]);
        let overrides = HashMap::from([(Channel::Lexical, 1.0), (Channel::Transcript, 0.0)]);
        let err = resolve_declared_weights(&config, Some(&overrides), None, 1e-6).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidWeights(_)));
    }

    #[test]
    fn unknown_channel_in_preferences_is_rejected() {
        let config = config_with(&[(Channel::Transcript, 1.0)]);
        let preferences = SearchPreferences {
            channel_weights: Some(HashMap::from([(Channel::Lexical, 1.0), (Channel::Transcript, 0.0)])),
            fusion_method: None,
        };
        let err = resolve_declared_weights(&config, None, Some(&preferences), 1e-6).unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidWeights(_)));
    }

    /// Scenario 3 from `spec.md` §8.
    #[test]
    fn redistribution_is_proportional() {
        let declared = DeclaredWeights {
            weights: BTreeMap::from([
                (Channel::Transcript, 0.5),
                (Channel::Visual, 0.3),
                (Channel::Lexical, 0.2),
            ]),
        };
        let effective = redistribute(&declared, &[Channel::Transcript, Channel::Lexical]);
        assert!((effective.weights[&Channel::Transcript] - 0.5 / 0.7).abs() < 1e-9);
        assert!((effective.weights[&Channel::Lexical] - 0.2 / 0.7).abs() < 1e-9);
        assert!(!effective.weights.contains_key(&Channel::Visual));
    }

    #[test]
    fn all_channels_empty_yields_empty_effective_weights() {
        let declared = DeclaredWeights {
            weights: BTreeMap::from([(Channel::Transcript, 1.0)]),
        };
        let effective = redistribute(&declared, &[]);
        assert!(effective.weights.is_empty());
    }

    /// Scenario 6 from `spec.md` §8: single channel at weight 1.0, empty.
    #[test]
    fn single_channel_weight_one_with_empty_target_yields_empty() {
        let declared = DeclaredWeights {
            weights: BTreeMap::from([(Channel::Transcript, 1.0)]),
        };
        let effective = redistribute(&declared, &[]);
        assert!(effective.weights.is_empty());
    }
}
