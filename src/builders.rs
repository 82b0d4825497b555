//! Request/response builders (spec.md §4.G). Every function writes a
//! complete wire message into a caller-provided buffer and returns its
//! length, mirroring the original `Create*Request(ctx, pair, buf, &bufLen)`
//! calling convention.

use bytes::BytesMut;

use crate::candidate::{check_flags, CandidateKind, CandidateRef, PairState};
use crate::context::{Context, PairRef};
use crate::error::IceError;
use crate::stun::attributes::{
    ChannelNumber, IceControlled, IceControlling, Lifetime, Nonce, Priority as PriorityAttr,
    Realm, RequestedTransport, UseCandidate, UserName, XorMappedAddress, XorPeerAddress, TRANSPORT_UDP,
};
use crate::stun::channel_data::wrap_channel_data;
use crate::stun::message::MessageEncoder;
use crate::stun::methods::{ALLOCATE_REQUEST, BINDING_REQUEST, BINDING_RESPONSE, CHANNEL_BIND_REQUEST, CREATE_PERMISSION_REQUEST, REFRESH_REQUEST};
use crate::transaction::TransactionId;

/// Wraps `body` in a TURN ChannelData header when `local` is a relay
/// candidate with an assigned channel number (spec.md §4.G: "the builder
/// reserves a 4-byte prefix ... for relay pairs").
fn finish(ctx: &Context, local: CandidateRef, channel_number: Option<u16>, body: BytesMut, out: &mut BytesMut) -> usize {
    match (ctx.candidate(local).kind, channel_number) {
        (CandidateKind::Relay, Some(number)) => {
            wrap_channel_data(number, &body, out);
        }
        _ => {
            out.clear();
            out.extend_from_slice(&body);
        }
    }

    out.len()
}

/// `ServerReflexiveBindingRequest`: no attributes, no integrity. Always
/// regenerates the candidate's transaction id before building, collapsing
/// the original header's two near-identical `CreateServerReflexiveBindingRequest`
/// variants (fresh vs. retransmit) into one.
pub fn server_reflexive_binding_request(ctx: &mut Context, candidate: CandidateRef, out: &mut BytesMut) -> Result<usize, IceError> {
    let token = ctx.regenerate_candidate_transaction_id(candidate)?;
    let mut body = BytesMut::with_capacity(20);
    let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
    message.flush(ctx.crypto(), None)?;
    Ok(finish(ctx, candidate, None, body, out))
}

/// `AllocationRequest`: long-term credentials only once a realm has been
/// learned from a prior 401.
pub fn allocation_request(ctx: &Context, candidate: CandidateRef, lifetime: u32, out: &mut BytesMut) -> Result<usize, IceError> {
    let cand = ctx.candidate(candidate);
    let token = cand.transaction_id;
    let turn = cand.turn_server.as_ref().ok_or(IceError::InvalidCandidate)?;

    let mut body = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(ALLOCATE_REQUEST, &token, &mut body);
    message.append::<Lifetime>(lifetime);
    message.append::<RequestedTransport>(TRANSPORT_UDP);

    let key = if turn.realm.is_empty() {
        None
    } else {
        message.append::<UserName>(&turn.username);
        message.append::<Realm>(&turn.realm);
        message.append::<Nonce>(&turn.nonce);
        Some(&turn.long_term_key[..])
    };

    message.flush(ctx.crypto(), key)?;
    Ok(finish(ctx, candidate, None, body, out))
}

/// `RefreshRequest`: always long-term (realm/nonce already known).
pub fn refresh_request(ctx: &Context, candidate: CandidateRef, lifetime: u32, out: &mut BytesMut) -> Result<usize, IceError> {
    let cand = ctx.candidate(candidate);
    let token = cand.transaction_id;
    let turn = cand.turn_server.as_ref().ok_or(IceError::InvalidCandidate)?;

    let mut body = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(REFRESH_REQUEST, &token, &mut body);
    message.append::<Lifetime>(lifetime);
    message.append::<UserName>(&turn.username);
    message.append::<Realm>(&turn.realm);
    message.append::<Nonce>(&turn.nonce);
    message.flush(ctx.crypto(), Some(&turn.long_term_key[..]))?;
    Ok(finish(ctx, candidate, None, body, out))
}

/// `ConnectivityCheck`: sets `REQUEST_SENT` on the pair.
pub fn connectivity_check(ctx: &mut Context, pair: PairRef, out: &mut BytesMut) -> Result<usize, IceError> {
    let (local, token, local_priority, tie_breaker, is_controlling, channel_number) = {
        let p = ctx.pair(pair);
        (p.local, p.transaction_id, ctx.candidate(p.local).priority, ctx.tie_breaker, ctx.is_controlling, p.turn_channel_number)
    };

    let mut body = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
    message.append::<UserName>(&ctx.credentials.combined_username());
    message.append::<PriorityAttr>(local_priority);
    if is_controlling {
        message.append::<IceControlling>(tie_breaker);
    } else {
        message.append::<IceControlled>(tie_breaker);
    }

    let remote_password = ctx.credentials.remote_password.clone();
    message.flush(ctx.crypto(), Some(remote_password.as_bytes()))?;

    ctx.pair_mut(pair).connectivity_check_flags |= check_flags::REQUEST_SENT;
    Ok(finish(ctx, local, channel_number, body, out))
}

/// `Nomination`: identical to a connectivity check plus `USE-CANDIDATE`.
pub fn nomination(ctx: &mut Context, pair: PairRef, out: &mut BytesMut) -> Result<usize, IceError> {
    let (local, token, local_priority, tie_breaker, channel_number) = {
        let p = ctx.pair(pair);
        (p.local, p.transaction_id, ctx.candidate(p.local).priority, ctx.tie_breaker, p.turn_channel_number)
    };

    let mut body = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
    message.append::<UserName>(&ctx.credentials.combined_username());
    message.append::<PriorityAttr>(local_priority);
    message.append::<IceControlling>(tie_breaker);
    message.append::<UseCandidate>(());

    let remote_password = ctx.credentials.remote_password.clone();
    message.flush(ctx.crypto(), Some(remote_password.as_bytes()))?;

    ctx.pair_mut(pair).connectivity_check_flags |= check_flags::REQUEST_SENT;
    Ok(finish(ctx, local, channel_number, body, out))
}

/// `Response` (Binding Success Response) to an incoming request. `remote` is
/// the requester's mapped address; `token` is the request's transaction id.
pub fn response(
    ctx: &Context,
    pair: PairRef,
    token: &TransactionId,
    remote: crate::address::TransportAddress,
    out: &mut BytesMut,
) -> Result<usize, IceError> {
    let p = ctx.pair(pair);
    let mut body = BytesMut::with_capacity(64);
    let mut message = MessageEncoder::new(BINDING_RESPONSE, token, &mut body);
    message.append::<XorMappedAddress>(remote);
    if ctx.is_controlling {
        message.append::<IceControlling>(ctx.tie_breaker);
    } else {
        message.append::<IceControlled>(ctx.tie_breaker);
    }

    message.flush(ctx.crypto(), Some(ctx.credentials.local_password.as_bytes()))?;
    Ok(finish(ctx, p.local, p.turn_channel_number, body, out))
}

/// `CreatePermissionRequest`.
pub fn create_permission_request(ctx: &Context, pair: PairRef, peer: crate::address::TransportAddress, out: &mut BytesMut) -> Result<usize, IceError> {
    let p = ctx.pair(pair);
    let turn = ctx.candidate(p.local).turn_server.as_ref().ok_or(IceError::InvalidCandidate)?;

    let mut body = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(CREATE_PERMISSION_REQUEST, &p.transaction_id, &mut body);
    message.append::<XorPeerAddress>(peer);
    message.append::<UserName>(&turn.username);
    message.append::<Realm>(&turn.realm);
    message.append::<Nonce>(&turn.nonce);
    message.flush(ctx.crypto(), Some(&turn.long_term_key[..]))?;
    Ok(finish(ctx, p.local, None, body, out))
}

/// `ChannelBindRequest`.
pub fn channel_bind_request(ctx: &Context, pair: PairRef, peer: crate::address::TransportAddress, out: &mut BytesMut) -> Result<usize, IceError> {
    let p = ctx.pair(pair);
    let channel_number = p.turn_channel_number.ok_or(IceError::InvalidCandidate)?;
    let turn = ctx.candidate(p.local).turn_server.as_ref().ok_or(IceError::InvalidCandidate)?;

    let mut body = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(CHANNEL_BIND_REQUEST, &p.transaction_id, &mut body);
    message.append::<XorPeerAddress>(peer);
    message.append::<ChannelNumber>(channel_number);
    message.append::<UserName>(&turn.username);
    message.append::<Realm>(&turn.realm);
    message.append::<Nonce>(&turn.nonce);
    message.flush(ctx.crypto(), Some(&turn.long_term_key[..]))?;
    Ok(finish(ctx, p.local, None, body, out))
}

/// Result of dispatching on a candidate's kind/state (`NextCandidateRequest`).
pub enum NextCandidateAction {
    ServerReflexiveBindingRequest,
    AllocationRequest,
    NoNextAction,
}

/// `NextCandidateRequest`: dispatches on candidate kind and state.
pub fn next_candidate_request(ctx: &Context, candidate: CandidateRef) -> NextCandidateAction {
    let c = ctx.candidate(candidate);
    match (c.kind, c.state) {
        (CandidateKind::ServerReflexive, s) if s != crate::candidate::CandidateState::Valid => {
            NextCandidateAction::ServerReflexiveBindingRequest
        }
        (CandidateKind::Relay, s) if s != crate::candidate::CandidateState::Valid => NextCandidateAction::AllocationRequest,
        _ => NextCandidateAction::NoNextAction,
    }
}

/// Result of dispatching on a pair's state (`NextPairRequest`).
pub enum NextPairAction {
    ConnectivityCheck,
    Nomination,
    NoNextAction,
}

/// `NextPairRequest`: dispatches on pair state.
pub fn next_pair_request(ctx: &Context, pair: PairRef) -> NextPairAction {
    match ctx.pair(pair).state {
        PairState::Waiting => NextPairAction::ConnectivityCheck,
        PairState::Nominated if ctx.is_controlling => NextPairAction::Nomination,
        _ => NextPairAction::NoNextAction,
    }
}
