use thiserror::Error;

use super::types::{Rank, Tag};

/// Failure of the underlying message fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("rank {0} is not part of the fabric")]
    UnknownRank(Rank),
    #[error("peer {rank} disconnected ({tag:?} channel)")]
    Disconnected { rank: Rank, tag: Tag },
}

/// A frame that cannot be what the protocol requires. Fatal to the current
/// round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid {field}: {value} (must be positive)")]
    NonPositiveSize { field: &'static str, value: i32 },
    #[error("invalid {field}: {value} (must be non-negative)")]
    NegativeSize { field: &'static str, value: i32 },
    #[error("{field} frame has {actual} bytes, expected {expected}")]
    FrameLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("unknown command byte {0:#04x}")]
    UnknownCommand(u8),
    #[error("answer key is not valid UTF-8")]
    InvalidKeyEncoding,
    #[error("{field} {value} does not fit a 32-bit size frame")]
    Oversize { field: &'static str, value: usize },
}

/// Anything that can abort a coordination operation. Transport failures
/// carry the name of the operation that hit them.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("{op} failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: BusError,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("invalid answer key blob: {0}")]
    InvalidAnswerKey(#[from] serde_json::Error),
    #[error("dispatcher requires the master endpoint, got rank {0}")]
    NotMaster(Rank),
    #[error("scoring workers cannot run on the master endpoint")]
    NotWorker,
}
