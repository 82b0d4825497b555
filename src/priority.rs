//! Priority computation (spec.md §4.D, RFC 5245 §4.1.2 and Appendix B.5).

use crate::candidate::CandidateKind;

/// Component ID is fixed at 1 for this engine (no RTP/RTCP component
/// splitting), so the low byte of the priority is always `256 - 1 = 255`.
const COMPONENT_TERM: u32 = 255;

fn type_preference(kind: CandidateKind) -> u32 {
    match kind {
        CandidateKind::Host => 126,
        CandidateKind::PeerReflexive => 110,
        CandidateKind::ServerReflexive => 100,
        CandidateKind::Relay => 0,
    }
}

/// `priority = (typePref << 24) | (localPref << 8) | (256 - componentId)`.
///
/// ```
/// use ice_agent::candidate::CandidateKind;
/// use ice_agent::priority::candidate_priority;
///
/// assert_eq!(candidate_priority(CandidateKind::Host, false), 2130706431);
/// assert_eq!(candidate_priority(CandidateKind::Host, true), 2113929471);
/// ```
pub fn candidate_priority(kind: CandidateKind, is_point_to_point: bool) -> u32 {
    let type_pref = type_preference(kind);
    let local_pref: u32 = if is_point_to_point { 0 } else { 65535 };
    (type_pref << 24) | (local_pref << 8) | COMPONENT_TERM
}

/// `priority = 2^32 * min(G, D) + 2 * max(G, D) + (G > D ? 1 : 0)`, where `G`
/// is the controlling agent's candidate priority and `D` the controlled
/// agent's (RFC 5245 Appendix B.5).
pub fn pair_priority(local_priority: u32, remote_priority: u32, is_controlling: bool) -> u64 {
    let (g, d) = if is_controlling {
        (local_priority as u64, remote_priority as u64)
    } else {
        (remote_priority as u64, local_priority as u64)
    };

    let min = g.min(d);
    let max = g.max(d);
    let tiebreak = if g > d { 1 } else { 0 };

    (1u64 << 32) * min + 2 * max + tiebreak
}
