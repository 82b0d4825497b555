//! Build/init error taxonomy (spec.md §7, `IceResult`).

use thiserror::Error;

use crate::stun;

/// Errors returned by context setup and request-builder calls.
///
/// Mirrors `IceResult_t` in the original C implementation, expressed as a
/// `thiserror` enum the way the teacher's STUN codec error type is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IceError {
    #[error("bad parameter")]
    BadParam,
    #[error("local/remote candidate array is at capacity")]
    MaxCandidateThreshold,
    #[error("candidate pair array is at capacity")]
    MaxCandidatePairThreshold,
    #[error("relay candidate has exhausted its TURN channel number range")]
    MaxChannelNumberThreshold,
    #[error("stun codec error: {0}")]
    Stun(#[from] stun::Error),
    #[error("random number generation failed")]
    RandomError,
    #[error("crc32 computation failed")]
    Crc32Error,
    #[error("hmac computation failed")]
    HmacError,
    #[error("transaction id store is full")]
    TransactionIdStoreError,
    #[error("candidate is not in a state that supports this operation")]
    InvalidCandidate,
    #[error("candidate credentials are incomplete")]
    InvalidCandidateCredential,
    #[error("output buffer is too small")]
    OutOfMemory,
    #[error("candidate/pair has no next action to take")]
    NoNextAction,
}
