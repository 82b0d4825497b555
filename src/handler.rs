//! Packet handler state machine (spec.md §4.H). Parses an inbound STUN
//! message, validates it, mutates candidate/pair state, and returns a
//! result tag telling the caller what to do next — the engine never
//! performs I/O itself.

use crate::address::{same_ip_address, Endpoint, TransportAddress};
use crate::candidate::{check_flags, Candidate, CandidateKind, CandidateRef, CandidateState, PairState};
use crate::context::{Context, PairRef, RemoteCandidateInfo, SocketProtocol};
use crate::credentials::long_term_key;
use crate::stun::attributes::{
    error_code, ErrorCode, Lifetime, Nonce, Priority as PriorityAttr, Realm, UseCandidate, XorMappedAddress,
    XorRelayedAddress,
};
use crate::stun::message::Message;
use crate::stun::methods::{Kind, Method};
use crate::stun::Attributes;
use crate::transaction::TransactionId;

/// `IceHandleStunPacketResult_t`, split into info / error / action-directive
/// groups per spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    // Info.
    Ok,
    FoundPeerReflexiveCandidate(CandidateRef),
    UpdatedServerReflexiveCandidateAddress(CandidateRef),
    UpdatedRelayCandidateAddress(CandidateRef),
    ValidCandidatePair(PairRef),
    CandidatePairReady(PairRef),
    /// Reserved for parity with the original taxonomy; every completion path
    /// this engine actually reaches is distinguishable as either
    /// `CandidatePairReady` (completed via a response) or folded into
    /// `SendResponseForRemoteRequest` (completed via an incoming request,
    /// where the caller must respond regardless of completion).
    FreshComplete,
    StunBindingIndication,
    FreshChannelBindComplete(PairRef),
    TurnSessionTerminated(CandidateRef),

    // Errors.
    DeserializeError,
    IntegrityMismatch,
    FingerprintMismatch,
    InvalidPacketType,
    CandidateNotFound,
    CandidatePairNotFound,
    AddressAttributeNotFound,
    MatchingTransactionIdNotFound,
    InvalidResponse,
    UnexpectedResponse,
    AllocateUnknownError,
    RefreshUnknownError,

    // Action directives: the caller must build and send the named message.
    SendTriggeredCheck(PairRef),
    SendResponseForRemoteRequest(PairRef, TransactionId),
    SendResponseAndStartNomination(PairRef, TransactionId),
    StartNomination(PairRef),
    SendAllocationRequest(CandidateRef),
    SendChannelBindRequest(PairRef),
    SendConnectivityCheckRequest(PairRef),
}

fn token_of(message: &Message<'_>) -> TransactionId {
    message.token().try_into().expect("STUN header guarantees a 12-byte transaction id")
}

/// Entry point (`HandleStunPacket`). `io_pair`, when given, bypasses
/// endpoint-based pair lookup for TURN-relayed connectivity-check responses
/// (their source is the TURN server, not the peer). `on_candidate_close` is
/// the `Ice_CloseCandidate` embedder hook, invoked for every local candidate
/// that loses the nomination race.
pub fn handle_stun_packet(
    ctx: &mut Context,
    bytes: &[u8],
    local_endpoint: TransportAddress,
    remote_endpoint: TransportAddress,
    now: u64,
    io_pair: Option<PairRef>,
    on_candidate_close: &mut dyn FnMut(&mut Candidate),
) -> HandleOutcome {
    let mut attrs = Attributes::default();
    let message = match Message::decode(bytes, &mut attrs) {
        Ok(message) => message,
        Err(_) => return HandleOutcome::DeserializeError,
    };

    match message.method() {
        Method::Binding(Kind::Request) => handle_binding_request(ctx, &message, local_endpoint, remote_endpoint, on_candidate_close),
        Method::Binding(Kind::Response) => {
            if ctx.transaction_ids().has_id(&token_of(&message)) {
                handle_server_reflexive_response(ctx, &message)
            } else {
                handle_connectivity_check_response(ctx, &message, local_endpoint, remote_endpoint, io_pair, on_candidate_close)
            }
        }
        Method::Binding(Kind::Indication) => HandleOutcome::StunBindingIndication,
        Method::Allocate(Kind::Response) => handle_turn_allocate_success(ctx, &message, now),
        Method::Allocate(Kind::Error) => handle_turn_allocate_error(ctx, &message),
        Method::CreatePermission(Kind::Response) => handle_turn_create_permission(ctx, &message, false, now),
        Method::CreatePermission(Kind::Error) => handle_turn_create_permission(ctx, &message, true, now),
        Method::ChannelBind(Kind::Response) => handle_turn_channel_bind(ctx, &message, false),
        Method::ChannelBind(Kind::Error) => handle_turn_channel_bind(ctx, &message, true),
        Method::Refresh(Kind::Response) => handle_turn_refresh(ctx, &message, false, now),
        Method::Refresh(Kind::Error) => handle_turn_refresh(ctx, &message, true, now),
        _ => HandleOutcome::InvalidPacketType,
    }
}

/// `HandleBindingRequest`: an incoming connectivity check (or nomination).
fn handle_binding_request(
    ctx: &mut Context,
    message: &Message<'_>,
    local_endpoint: TransportAddress,
    remote_endpoint: TransportAddress,
    on_candidate_close: &mut dyn FnMut(&mut Candidate),
) -> HandleOutcome {
    if message.checksum(ctx.crypto(), ctx.credentials.local_password.as_bytes()).is_err() {
        log::warn!("binding request from {remote_endpoint:?} failed integrity check");
        return HandleOutcome::IntegrityMismatch;
    }
    if message.verify_fingerprint(ctx.crypto()).is_err() {
        log::warn!("binding request from {remote_endpoint:?} failed fingerprint check");
        return HandleOutcome::FingerprintMismatch;
    }

    if ctx.find_remote_candidate_by_address(remote_endpoint).is_none() {
        let priority = message.get::<PriorityAttr>().unwrap_or(0);
        let added = ctx.add_remote_candidate(RemoteCandidateInfo {
            kind: CandidateKind::PeerReflexive,
            remote_protocol: SocketProtocol::Udp,
            priority,
            endpoint: Endpoint { transport_address: remote_endpoint, is_point_to_point: false },
        });
        if added.is_err() {
            return HandleOutcome::CandidateNotFound;
        }
    }

    let Some(pair_ref) = ctx.find_pair_by_endpoints(local_endpoint, remote_endpoint) else {
        log::debug!("no candidate pair for {local_endpoint:?} <-> {remote_endpoint:?}");
        return HandleOutcome::CandidatePairNotFound;
    };

    let use_candidate = message.get::<UseCandidate>().is_some();
    let request_token = token_of(message);

    if use_candidate && !ctx.is_controlling {
        ctx.pair_mut(pair_ref).state = PairState::Nominated;
        ctx.nominated_pair = Some(pair_ref);
    }

    let req_sent_before = ctx.pair(pair_ref).connectivity_check_flags & check_flags::REQUEST_SENT != 0;
    ctx.pair_mut(pair_ref).connectivity_check_flags |= check_flags::REQUEST_RECEIVED;

    if !req_sent_before {
        ctx.pair_mut(pair_ref).connectivity_check_flags |= check_flags::REQUEST_SENT | check_flags::RESPONSE_SENT;
        return HandleOutcome::SendTriggeredCheck(pair_ref);
    }

    ctx.pair_mut(pair_ref).connectivity_check_flags |= check_flags::RESPONSE_SENT;
    let complete = ctx.pair(pair_ref).is_complete();

    if ctx.is_controlling {
        if complete && ctx.nominated_pair.is_none() {
            ctx.pair_mut(pair_ref).state = PairState::Nominated;
            let _ = ctx.regenerate_pair_transaction_id(pair_ref);
            ctx.nominated_pair = Some(pair_ref);
            return HandleOutcome::SendResponseAndStartNomination(pair_ref, request_token);
        }

        return HandleOutcome::SendResponseForRemoteRequest(pair_ref, request_token);
    }

    if complete {
        if ctx.pair(pair_ref).state == PairState::Nominated {
            ctx.pair_mut(pair_ref).state = PairState::Succeeded;
            ctx.selected_pair = Some(pair_ref);
            let local_ref = ctx.pair(pair_ref).local;
            ctx.release_other_candidates(local_ref, on_candidate_close);
        } else {
            ctx.pair_mut(pair_ref).state = PairState::Valid;
        }
    }

    HandleOutcome::SendResponseForRemoteRequest(pair_ref, request_token)
}

/// `HandleServerReflexiveResponse`.
fn handle_server_reflexive_response(ctx: &mut Context, message: &Message<'_>) -> HandleOutcome {
    let token = token_of(message);
    let Some(candidate_ref) = ctx.find_local_candidate_by_transaction_id(CandidateKind::ServerReflexive, &token) else {
        log::debug!("server-reflexive response with unknown transaction id {token:?}");
        return HandleOutcome::MatchingTransactionIdNotFound;
    };

    if message.verify_fingerprint(ctx.crypto()).is_err() {
        log::warn!("server-reflexive response from candidate {candidate_ref:?} failed fingerprint check");
        return HandleOutcome::FingerprintMismatch;
    }

    let Some(mapped) = message.get::<XorMappedAddress>() else {
        return HandleOutcome::AddressAttributeNotFound;
    };

    let _ = ctx.regenerate_candidate_transaction_id(candidate_ref);

    let endpoint = Endpoint { transport_address: mapped, is_point_to_point: false };
    if ctx.validate_local_candidate(candidate_ref, endpoint).is_err() {
        return HandleOutcome::CandidateNotFound;
    }

    HandleOutcome::UpdatedServerReflexiveCandidateAddress(candidate_ref)
}

/// `HandleConnectivityCheckResponse`.
fn handle_connectivity_check_response(
    ctx: &mut Context,
    message: &Message<'_>,
    local_endpoint: TransportAddress,
    remote_endpoint: TransportAddress,
    io_pair: Option<PairRef>,
    on_candidate_close: &mut dyn FnMut(&mut Candidate),
) -> HandleOutcome {
    if message.checksum(ctx.crypto(), ctx.credentials.remote_password.as_bytes()).is_err() {
        log::warn!("connectivity check response from {remote_endpoint:?} failed integrity check");
        return HandleOutcome::IntegrityMismatch;
    }
    if message.verify_fingerprint(ctx.crypto()).is_err() {
        log::warn!("connectivity check response from {remote_endpoint:?} failed fingerprint check");
        return HandleOutcome::FingerprintMismatch;
    }

    let pair_ref = match io_pair.or_else(|| ctx.find_pair_by_endpoints(local_endpoint, remote_endpoint)) {
        Some(pair_ref) => pair_ref,
        None => {
            log::debug!("no candidate pair for connectivity check response {local_endpoint:?} <-> {remote_endpoint:?}");
            return HandleOutcome::CandidatePairNotFound;
        }
    };

    if ctx.pair(pair_ref).transaction_id != token_of(message) {
        log::debug!("connectivity check response transaction id mismatch on pair");
        return HandleOutcome::MatchingTransactionIdNotFound;
    }

    let _ = ctx.regenerate_pair_transaction_id(pair_ref);
    ctx.pair_mut(pair_ref).connectivity_check_flags |= check_flags::RESPONSE_RECEIVED;

    let complete = ctx.pair(pair_ref).is_complete();
    let was_nominated = ctx.pair(pair_ref).state == PairState::Nominated;

    if complete {
        if was_nominated {
            ctx.pair_mut(pair_ref).state = PairState::Succeeded;
            ctx.selected_pair = Some(pair_ref);
            let local_ref = ctx.pair(pair_ref).local;
            ctx.release_other_candidates(local_ref, on_candidate_close);
            return HandleOutcome::CandidatePairReady(pair_ref);
        }

        if ctx.is_controlling {
            ctx.pair_mut(pair_ref).state = PairState::Nominated;
            let _ = ctx.regenerate_pair_transaction_id(pair_ref);
            return HandleOutcome::StartNomination(pair_ref);
        }

        ctx.pair_mut(pair_ref).state = PairState::Valid;
        return HandleOutcome::ValidCandidatePair(pair_ref);
    }

    let Some(mapped) = message.get::<XorMappedAddress>() else {
        return HandleOutcome::AddressAttributeNotFound;
    };

    let local_ref = ctx.pair(pair_ref).local;
    let remote_ref = ctx.pair(pair_ref).remote;
    let both_srflx = ctx.candidate(local_ref).kind == CandidateKind::ServerReflexive
        && ctx.candidate(remote_ref).kind == CandidateKind::ServerReflexive;

    if both_srflx && !same_ip_address(&ctx.candidate(local_ref).endpoint.transport_address, &mapped) {
        ctx.candidate_mut(local_ref).kind = CandidateKind::PeerReflexive;
        ctx.candidate_mut(local_ref).endpoint.transport_address = mapped;
        return HandleOutcome::FoundPeerReflexiveCandidate(local_ref);
    }

    HandleOutcome::Ok
}

/// `HandleTurnAllocateSuccess`.
fn handle_turn_allocate_success(ctx: &mut Context, message: &Message<'_>, now: u64) -> HandleOutcome {
    let token = token_of(message);
    let Some(candidate_ref) = ctx.find_local_candidate_by_transaction_id(CandidateKind::Relay, &token) else {
        log::debug!("allocate success with unknown transaction id {token:?}");
        return HandleOutcome::MatchingTransactionIdNotFound;
    };

    if ctx.candidate(candidate_ref).state != CandidateState::Allocating {
        log::debug!("allocate success for relay candidate not in Allocating state");
        return HandleOutcome::UnexpectedResponse;
    }

    let Some(key) = ctx.candidate(candidate_ref).turn_server.as_ref().map(|t| t.long_term_key) else {
        return HandleOutcome::CandidateNotFound;
    };

    if message.checksum(ctx.crypto(), &key).is_err() {
        log::warn!("allocate success for relay candidate failed integrity check");
        return HandleOutcome::IntegrityMismatch;
    }

    let Some(relayed) = message.get::<XorRelayedAddress>() else {
        return HandleOutcome::AddressAttributeNotFound;
    };

    let lifetime = message.get::<Lifetime>().unwrap_or(crate::config::DEFAULT_TURN_ALLOCATION_LIFETIME_SECONDS as u32);

    {
        let turn = ctx
            .candidate_mut(candidate_ref)
            .turn_server
            .as_mut()
            .expect("relay candidate always carries a turn server block");
        turn.turn_allocation_expiration_time_seconds = now + lifetime as u64;
        turn.next_turn_channel_number = crate::config::ICE_DEFAULT_TURN_CHANNEL_NUMBER_MIN;
    }

    let endpoint = Endpoint { transport_address: relayed, is_point_to_point: false };
    if ctx.validate_local_candidate(candidate_ref, endpoint).is_err() {
        return HandleOutcome::CandidateNotFound;
    }

    HandleOutcome::UpdatedRelayCandidateAddress(candidate_ref)
}

/// `HandleTurnAllocateError`.
fn handle_turn_allocate_error(ctx: &mut Context, message: &Message<'_>) -> HandleOutcome {
    let token = token_of(message);
    let Some(candidate_ref) = ctx.find_local_candidate_by_transaction_id(CandidateKind::Relay, &token) else {
        log::debug!("allocate error with unknown transaction id {token:?}");
        return HandleOutcome::MatchingTransactionIdNotFound;
    };

    if ctx.candidate(candidate_ref).state != CandidateState::Allocating {
        log::debug!("allocate error for relay candidate not in Allocating state");
        return HandleOutcome::UnexpectedResponse;
    }

    challenge_long_term_credentials(ctx, candidate_ref, message, HandleOutcome::AllocateUnknownError)
}

/// `TURN Refresh` (§4.H, success and 401/438 error branches).
fn handle_turn_refresh(ctx: &mut Context, message: &Message<'_>, is_error: bool, now: u64) -> HandleOutcome {
    let token = token_of(message);
    let Some(candidate_ref) = ctx.find_local_candidate_by_transaction_id(CandidateKind::Relay, &token) else {
        log::debug!("refresh response with unknown transaction id {token:?}");
        return HandleOutcome::MatchingTransactionIdNotFound;
    };

    if is_error {
        return challenge_long_term_credentials(ctx, candidate_ref, message, HandleOutcome::RefreshUnknownError);
    }

    let lifetime = message.get::<Lifetime>().unwrap_or(0);

    {
        let turn = ctx
            .candidate_mut(candidate_ref)
            .turn_server
            .as_mut()
            .expect("relay candidate always carries a turn server block");
        turn.turn_allocation_expiration_time_seconds = now + lifetime as u64;
    }

    if ctx.candidate(candidate_ref).state == CandidateState::Releasing && lifetime == 0 {
        ctx.candidate_mut(candidate_ref).state = CandidateState::Invalid;
        return HandleOutcome::TurnSessionTerminated(candidate_ref);
    }

    HandleOutcome::Ok
}

/// Shared 401/438 realm+nonce refresh for Allocate and Refresh error
/// responses (spec.md §4.H: "updates credentials identically to Allocate").
fn challenge_long_term_credentials(
    ctx: &mut Context,
    candidate_ref: CandidateRef,
    message: &Message<'_>,
    unknown_error: HandleOutcome,
) -> HandleOutcome {
    let Some((code, _reason)) = message.get::<ErrorCode>() else {
        log::debug!("turn error response missing ERROR-CODE attribute");
        return HandleOutcome::InvalidResponse;
    };

    if code == 0 {
        return HandleOutcome::InvalidResponse;
    }

    if code != error_code::UNAUTHORIZED && code != error_code::STALE_NONCE {
        log::debug!("turn error response with unexpected code {code}");
        return unknown_error;
    }

    let Some(realm) = message.get::<Realm>() else {
        log::debug!("turn 401/438 response missing REALM attribute");
        return HandleOutcome::InvalidResponse;
    };
    let Some(nonce) = message.get::<Nonce>() else {
        log::debug!("turn 401/438 response missing NONCE attribute");
        return HandleOutcome::InvalidResponse;
    };
    let realm_owned = realm.to_string();
    let nonce_owned = nonce.to_string();

    let (username, password) = {
        let turn = ctx
            .candidate_mut(candidate_ref)
            .turn_server
            .as_mut()
            .expect("relay candidate always carries a turn server block");
        turn.realm = realm_owned.clone();
        turn.nonce = nonce_owned;
        (turn.username.clone(), turn.password.clone())
    };

    match long_term_key(ctx.crypto(), &username, &realm_owned, &password) {
        Ok(key) => {
            ctx.candidate_mut(candidate_ref).turn_server.as_mut().unwrap().long_term_key = key;
            HandleOutcome::SendAllocationRequest(candidate_ref)
        }
        Err(_) => HandleOutcome::InvalidResponse,
    }
}

/// `TURN CreatePermission / ChannelBind` — matched by TxID, not endpoint.
fn handle_turn_create_permission(ctx: &mut Context, message: &Message<'_>, is_error: bool, now: u64) -> HandleOutcome {
    let token = token_of(message);
    let Some(pair_ref) = ctx.find_pair_by_transaction_id(&token) else {
        log::debug!("create permission response with unknown transaction id {token:?}");
        return HandleOutcome::MatchingTransactionIdNotFound;
    };

    if is_error {
        log::debug!("create permission error response for pair, invalidating");
        ctx.invalidate_pair(pair_ref);
        return HandleOutcome::UnexpectedResponse;
    }

    let state = ctx.pair(pair_ref).state;
    if state != PairState::CreatePermission && state != PairState::Succeeded {
        log::debug!("create permission success for pair not in CreatePermission/Succeeded state");
        return HandleOutcome::UnexpectedResponse;
    }

    ctx.pair_mut(pair_ref).turn_permission_expiration_seconds = now + crate::config::DEFAULT_TURN_PERMISSION_LIFETIME_SECONDS;
    ctx.pair_mut(pair_ref).state = PairState::ChannelBind;
    HandleOutcome::SendChannelBindRequest(pair_ref)
}

fn handle_turn_channel_bind(ctx: &mut Context, message: &Message<'_>, is_error: bool) -> HandleOutcome {
    let token = token_of(message);
    let Some(pair_ref) = ctx.find_pair_by_transaction_id(&token) else {
        log::debug!("channel bind response with unknown transaction id {token:?}");
        return HandleOutcome::MatchingTransactionIdNotFound;
    };

    if is_error {
        log::debug!("channel bind error response for pair, invalidating");
        ctx.invalidate_pair(pair_ref);
        return HandleOutcome::UnexpectedResponse;
    }

    if ctx.pair(pair_ref).state != PairState::ChannelBind {
        log::debug!("channel bind success for pair not in ChannelBind state");
        return HandleOutcome::UnexpectedResponse;
    }

    if ctx.selected_pair == Some(pair_ref) {
        ctx.pair_mut(pair_ref).state = PairState::Succeeded;
        HandleOutcome::FreshChannelBindComplete(pair_ref)
    } else {
        ctx.pair_mut(pair_ref).state = PairState::Waiting;
        HandleOutcome::SendConnectivityCheckRequest(pair_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TransportAddress;
    use crate::candidate::check_flags;
    use crate::config::InitInfo;
    use crate::context::RemoteCandidateInfo;
    use crate::credentials::CredentialBlock;
    use crate::crypto::DefaultCrypto;
    use crate::stun::attributes::{ErrorCode, Nonce, Priority as PriorityAttr, Realm, UseCandidate, XorMappedAddress};
    use crate::stun::message::MessageEncoder;
    use crate::stun::methods::{ALLOCATE_ERROR, BINDING_REQUEST, BINDING_RESPONSE};
    use bytes::BytesMut;

    fn test_init(is_controlling: bool) -> InitInfo {
        InitInfo {
            credentials: CredentialBlock {
                local_username: "lu".into(),
                local_password: "lp".into(),
                remote_username: "ru".into(),
                remote_password: "rp".into(),
            },
            max_local_candidates: 8,
            max_remote_candidates: 8,
            max_candidate_pairs: 16,
            transaction_id_store_capacity: 8,
            is_controlling,
        }
    }

    fn endpoint(port: u16) -> Endpoint {
        Endpoint { transport_address: TransportAddress::new_v4([192, 0, 2, 1], port), is_point_to_point: false }
    }

    fn no_close(_: &mut Candidate) {}

    fn host_pair(ctx: &mut Context) -> PairRef {
        ctx.add_host_candidate(endpoint(8000)).unwrap();
        ctx.add_remote_candidate(RemoteCandidateInfo {
            kind: CandidateKind::Host,
            remote_protocol: SocketProtocol::Udp,
            priority: 100,
            endpoint: endpoint(9000),
        })
        .unwrap();
        ctx.find_pair_by_endpoints(endpoint(8000).transport_address, endpoint(9000).transport_address).unwrap()
    }

    #[test]
    fn binding_request_without_prior_check_triggers_triggered_check() {
        let mut ctx = Context::new(test_init(true), Box::new(DefaultCrypto)).unwrap();
        let pair_ref = host_pair(&mut ctx);

        let token = [9u8; 12];
        let mut body = BytesMut::with_capacity(128);
        let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
        message.append::<PriorityAttr>(500);
        message.flush(&DefaultCrypto, Some(b"lp")).unwrap();

        let outcome = handle_stun_packet(&mut ctx, &body, endpoint(8000).transport_address, endpoint(9000).transport_address, 0, None, &mut no_close);

        assert_eq!(outcome, HandleOutcome::SendTriggeredCheck(pair_ref));
        let flags = ctx.pair(pair_ref).connectivity_check_flags;
        assert_eq!(flags, check_flags::REQUEST_SENT | check_flags::RESPONSE_SENT | check_flags::REQUEST_RECEIVED);
    }

    #[test]
    fn binding_request_fingerprint_mismatch_is_rejected() {
        let mut ctx = Context::new(test_init(true), Box::new(DefaultCrypto)).unwrap();
        host_pair(&mut ctx);

        let token = [3u8; 12];
        let mut body = BytesMut::with_capacity(128);
        let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
        message.flush(&DefaultCrypto, Some(b"lp")).unwrap();
        let last = body.len() - 1;
        body[last] ^= 0xFF;

        let outcome = handle_stun_packet(&mut ctx, &body, endpoint(8000).transport_address, endpoint(9000).transport_address, 0, None, &mut no_close);
        assert_eq!(outcome, HandleOutcome::FingerprintMismatch);
    }

    #[test]
    fn controlled_agent_completes_nomination_on_use_candidate() {
        let mut ctx = Context::new(test_init(false), Box::new(DefaultCrypto)).unwrap();
        let pair_ref = host_pair(&mut ctx);

        // A prior check round already completed REQUEST_SENT/RESPONSE_RECEIVED;
        // this incoming request supplies REQUEST_RECEIVED/RESPONSE_SENT.
        ctx.pair_mut(pair_ref).connectivity_check_flags = check_flags::REQUEST_SENT | check_flags::RESPONSE_RECEIVED;

        let token = [5u8; 12];
        let mut body = BytesMut::with_capacity(128);
        let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
        message.append::<UseCandidate>(());
        message.flush(&DefaultCrypto, Some(b"lp")).unwrap();

        let outcome = handle_stun_packet(&mut ctx, &body, endpoint(8000).transport_address, endpoint(9000).transport_address, 0, None, &mut no_close);

        assert_eq!(outcome, HandleOutcome::SendResponseForRemoteRequest(pair_ref, token));
        assert_eq!(ctx.pair(pair_ref).state, PairState::Succeeded);
        assert_eq!(ctx.selected_pair, Some(pair_ref));
        assert_eq!(ctx.nominated_pair, Some(pair_ref));
    }

    #[test]
    fn server_reflexive_response_updates_candidate_address() {
        let mut ctx = Context::new(test_init(true), Box::new(DefaultCrypto)).unwrap();
        let candidate_ref = ctx.add_server_reflexive_candidate(endpoint(8000)).unwrap();
        let token = ctx.candidate(candidate_ref).transaction_id;

        let mapped = TransportAddress::new_v4([203, 0, 113, 5], 12345);
        let mut body = BytesMut::with_capacity(128);
        let mut message = MessageEncoder::new(BINDING_RESPONSE, &token, &mut body);
        message.append::<XorMappedAddress>(mapped);
        message.flush(&DefaultCrypto, None).unwrap();

        let outcome = handle_stun_packet(&mut ctx, &body, endpoint(8000).transport_address, endpoint(3478).transport_address, 0, None, &mut no_close);

        assert_eq!(outcome, HandleOutcome::UpdatedServerReflexiveCandidateAddress(candidate_ref));
        assert_eq!(ctx.candidate(candidate_ref).state, CandidateState::Valid);
        assert_eq!(ctx.candidate(candidate_ref).endpoint.transport_address, mapped);
    }

    #[test]
    fn turn_allocate_unauthorized_error_refreshes_credentials() {
        let mut ctx = Context::new(test_init(true), Box::new(DefaultCrypto)).unwrap();
        let candidate_ref = ctx.add_relay_candidate(endpoint(3478), "turnuser".into(), "turnpass".into()).unwrap();
        let token = ctx.candidate(candidate_ref).transaction_id;

        let mut body = BytesMut::with_capacity(128);
        let mut message = MessageEncoder::new(ALLOCATE_ERROR, &token, &mut body);
        message.append::<ErrorCode>((401, "Unauthorized"));
        message.append::<Realm>("example.org");
        message.append::<Nonce>("abcd1234");
        message.flush(&DefaultCrypto, None).unwrap();

        let outcome = handle_stun_packet(&mut ctx, &body, endpoint(3478).transport_address, endpoint(3478).transport_address, 0, None, &mut no_close);

        assert_eq!(outcome, HandleOutcome::SendAllocationRequest(candidate_ref));
        let turn = ctx.candidate(candidate_ref).turn_server.as_ref().unwrap();
        assert_eq!(turn.realm, "example.org");
        assert_eq!(turn.nonce, "abcd1234");
    }

    #[test]
    fn turn_allocate_non_credential_error_is_reported_unknown() {
        let mut ctx = Context::new(test_init(true), Box::new(DefaultCrypto)).unwrap();
        let candidate_ref = ctx.add_relay_candidate(endpoint(3478), "turnuser".into(), "turnpass".into()).unwrap();
        let token = ctx.candidate(candidate_ref).transaction_id;

        let mut body = BytesMut::with_capacity(128);
        let mut message = MessageEncoder::new(ALLOCATE_ERROR, &token, &mut body);
        message.append::<ErrorCode>((486, "Allocation Quota Reached"));
        message.flush(&DefaultCrypto, None).unwrap();

        let outcome = handle_stun_packet(&mut ctx, &body, endpoint(3478).transport_address, endpoint(3478).transport_address, 0, None, &mut no_close);

        assert_eq!(outcome, HandleOutcome::AllocateUnknownError);
    }
}
