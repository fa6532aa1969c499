//! Error taxonomy for the retrieval core.

use thiserror::Error;

use crate::candidate::Channel;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Terminal errors that can escape the retrieval core to the caller.
///
/// Per-channel failures do not appear here: the orchestrator folds them into
/// an empty candidate list plus a debug-recorded cause (see
/// [`ChannelDriverError`]) and only raises one of these variants when the
/// failure is terminal for the whole query.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetrievalError {
    /// The request itself was malformed (empty query, illegal limit, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The resolved weight vector did not sum to 1.0 within tolerance,
    /// referenced an unknown channel, or contained a negative weight.
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// Text-to-vector embedding failed for a dense channel.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// No channel produced any candidates and at least one channel failed
    /// with a non-empty cause — there is nothing usable to return.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// An invariant was violated by a driver or upstream response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RetrievalError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_weights(msg: impl Into<String>) -> Self {
        Self::InvalidWeights(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Per-channel failure classes. Caught and folded by the orchestrator; never
/// propagated directly to the caller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelDriverError {
    /// The channel's wall-clock deadline elapsed before it produced a result.
    #[error("channel timed out")]
    Timeout,

    /// The backing store was unreachable.
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    /// Text/image embedding failed (dense channels only).
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The driver or store returned structurally invalid data (e.g.
    /// duplicate scene_id, non-contiguous ranks).
    #[error("malformed channel response: {0}")]
    Malformed(String),
}

/// The cause recorded in debug output for a channel that contributed no
/// candidates to fusion, whether empty-by-design or empty-by-failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EmptyChannelCause {
    /// The driver ran to completion and simply found nothing.
    NoCandidates,
    /// The channel's deadline elapsed.
    Timeout,
    /// The driver failed; the failure class is preserved for attribution.
    Failed(ChannelDriverError),
    /// The channel was not part of the active set for this query's mode.
    NotActive,
}

/// Attaches the channel identifier to a driver error, used when folding
/// fan-out results for `RetrievalUnavailable` construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub error: ChannelDriverError,
}
