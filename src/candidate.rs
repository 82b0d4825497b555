//! Candidate and candidate-pair entities (spec.md §3, `IceCandidate_t` /
//! `IceCandidatePair_t` in the original header).

use crate::address::Endpoint;
use crate::transaction::TransactionId;

/// `IceCandidateType_t`, extended with `PeerReflexive` per RFC 5245 §7.2.1.3
/// (the original header's three-variant enum lacks it; spec.md §3 requires
/// it for auto-added remote candidates and check-response promotion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Host,
    PeerReflexive,
    ServerReflexive,
    Relay,
}

/// `IceCandidateState_t`, extended with `Allocating`/`Releasing` (spec.md §3)
/// to track TURN allocation lifecycle and graceful candidate retirement,
/// neither of which exist in the original three-state enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateState {
    New,
    Allocating,
    Valid,
    Releasing,
    Invalid,
}

/// `IceCandidatePairState_t`, extended with `CreatePermission`/`ChannelBind`
/// (spec.md §3) for the TURN relay-pair setup sub-sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairState {
    Invalid,
    Frozen,
    Waiting,
    Valid,
    Nominated,
    Succeeded,
    CreatePermission,
    ChannelBind,
}

/// Connectivity-check bitmask (`ICE_STUN_*_FLAG` in the original header). A
/// pair completes the 4-way handshake once all four bits are set.
pub mod check_flags {
    pub const REQUEST_SENT: u8 = 1 << 0;
    pub const RESPONSE_RECEIVED: u8 = 1 << 1;
    pub const REQUEST_RECEIVED: u8 = 1 << 2;
    pub const RESPONSE_SENT: u8 = 1 << 3;
    pub const COMPLETE: u8 = REQUEST_SENT | RESPONSE_RECEIVED | REQUEST_RECEIVED | RESPONSE_SENT;
}

/// Per-candidate TURN server state (spec.md §3, `pTurnServer`; I5). Owned
/// only by `Relay` candidates.
#[derive(Debug, Clone)]
pub struct TurnServerBlock {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub password: String,
    pub long_term_key: [u8; 16],
    pub next_turn_channel_number: u16,
    pub turn_allocation_expiration_time_seconds: u64,
}

impl TurnServerBlock {
    pub fn new(username: String, password: String, channel_number_min: u16) -> Self {
        Self {
            username,
            realm: String::new(),
            nonce: String::new(),
            password,
            long_term_key: [0u8; 16],
            next_turn_channel_number: channel_number_min,
            turn_allocation_expiration_time_seconds: 0,
        }
    }

    /// Consumes and returns the next channel number (I5): monotonically
    /// increasing, bounded by `channel_number_max`.
    pub fn take_channel_number(&mut self, channel_number_max: u16) -> Option<u16> {
        if self.next_turn_channel_number > channel_number_max {
            return None;
        }

        let number = self.next_turn_channel_number;
        self.next_turn_channel_number += 1;
        Some(number)
    }
}

/// One network vantage point (spec.md §3, `IceCandidate_t`).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub is_remote: bool,
    pub endpoint: Endpoint,
    pub state: CandidateState,
    pub priority: u32,
    pub transaction_id: TransactionId,
    pub turn_server: Option<TurnServerBlock>,
}

impl Candidate {
    pub fn is_valid(&self) -> bool {
        self.state == CandidateState::Valid
    }
}

/// Append-only index into [`crate::context::Context`]'s candidate storage
/// (spec.md I1: indices never shift, so this stays valid for the context's
/// lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateRef {
    pub is_remote: bool,
    pub index: usize,
}

/// One probing relationship between a local and a remote candidate (spec.md
/// §3, `IceCandidatePair_t`).
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub local: CandidateRef,
    pub remote: CandidateRef,
    pub priority: u64,
    pub state: PairState,
    pub connectivity_check_flags: u8,
    pub transaction_id: TransactionId,
    pub turn_channel_number: Option<u16>,
    pub turn_permission_expiration_seconds: u64,
}

impl CandidatePair {
    pub fn is_complete(&self) -> bool {
        self.connectivity_check_flags == check_flags::COMPLETE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_channel_numbers_increase_and_saturate() {
        let mut turn = TurnServerBlock::new("u".into(), "p".into(), 0x4000);
        assert_eq!(turn.take_channel_number(0x4001), Some(0x4000));
        assert_eq!(turn.take_channel_number(0x4001), Some(0x4001));
        assert_eq!(turn.take_channel_number(0x4001), None);
    }

    #[test]
    fn pair_completion_requires_all_four_flags() {
        let mut pair = CandidatePair {
            local: CandidateRef { is_remote: false, index: 0 },
            remote: CandidateRef { is_remote: true, index: 0 },
            priority: 0,
            state: PairState::Waiting,
            connectivity_check_flags: check_flags::REQUEST_SENT | check_flags::RESPONSE_RECEIVED,
            transaction_id: [0u8; 12],
            turn_channel_number: None,
            turn_permission_expiration_seconds: 0,
        };
        assert!(!pair.is_complete());

        pair.connectivity_check_flags |= check_flags::REQUEST_RECEIVED | check_flags::RESPONSE_SENT;
        assert!(pair.is_complete());
    }
}
