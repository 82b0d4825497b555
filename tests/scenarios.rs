//! End-to-end scenarios exercising the public API surface, one per
//! concrete example in the component design (connectivity checks,
//! server-reflexive discovery, nomination, TURN challenge, tamper
//! detection).

use bytes::BytesMut;

use ice_agent::address::{Endpoint, TransportAddress};
use ice_agent::builders;
use ice_agent::candidate::{CandidateKind, CandidateState, PairState};
use ice_agent::config::InitInfo;
use ice_agent::context::{Context, RemoteCandidateInfo, SocketProtocol};
use ice_agent::credentials::CredentialBlock;
use ice_agent::crypto::{Crypto, DefaultCrypto};
use ice_agent::handler::{handle_stun_packet, HandleOutcome};
use ice_agent::priority::pair_priority;
use ice_agent::stun::attributes::{ErrorCode, MessageIntegrity, Nonce, Realm, XorMappedAddress};
use ice_agent::stun::message::{Message, MessageEncoder};
use ice_agent::stun::methods::{ALLOCATE_ERROR, ALLOCATE_REQUEST, BINDING_REQUEST, BINDING_RESPONSE};
use ice_agent::stun::Attributes;

fn init(is_controlling: bool) -> InitInfo {
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

fn endpoint(port: u16, p2p: bool) -> Endpoint {
    Endpoint { transport_address: TransportAddress::new_v4([192, 0, 2, 1], port), is_point_to_point: p2p }
}

#[test]
fn host_plus_host_pairing() {
    let mut ctx = Context::new(init(true), Box::new(DefaultCrypto)).unwrap();
    ctx.add_host_candidate(endpoint(8080, true)).unwrap();
    ctx.add_remote_candidate(RemoteCandidateInfo {
        kind: CandidateKind::Host,
        remote_protocol: SocketProtocol::Udp,
        priority: 55,
        endpoint: endpoint(9090, false),
    })
    .unwrap();

    assert_eq!(ctx.pair_count(), 1);
    let (_, pair) = ctx.pairs().next().unwrap();
    assert_eq!(pair.state, PairState::Waiting);
    assert_eq!(pair.priority, pair_priority(2_113_929_471, 55, true));
}

#[test]
fn server_reflexive_discovery() {
    let mut ctx = Context::new(init(true), Box::new(DefaultCrypto)).unwrap();
    let candidate_ref = ctx.add_server_reflexive_candidate(endpoint(8080, false)).unwrap();

    let mut request = BytesMut::new();
    builders::server_reflexive_binding_request(&mut ctx, candidate_ref, &mut request).unwrap();

    let mut attrs = Attributes::default();
    let decoded = Message::decode(&request, &mut attrs).unwrap();
    assert_eq!(decoded.method(), BINDING_REQUEST);
    assert!(decoded.get::<MessageIntegrity>().is_none());

    let token = ctx.candidate(candidate_ref).transaction_id;
    assert!(ctx.transaction_ids().has_id(&token));
    drop(decoded);

    let mapped = TransportAddress::new_v4([192, 0, 2, 1], 1234);
    let mut response = BytesMut::new();
    let mut message = MessageEncoder::new(BINDING_RESPONSE, &token, &mut response);
    message.append::<XorMappedAddress>(mapped);
    message.flush(&DefaultCrypto, None).unwrap();

    let outcome = handle_stun_packet(
        &mut ctx,
        &response,
        endpoint(8080, false).transport_address,
        endpoint(3478, false).transport_address,
        0,
        None,
        &mut |_| {},
    );

    assert_eq!(outcome, HandleOutcome::UpdatedServerReflexiveCandidateAddress(candidate_ref));
    assert_eq!(ctx.candidate(candidate_ref).state, CandidateState::Valid);
    assert_eq!(ctx.candidate(candidate_ref).endpoint.transport_address, mapped);
}

#[test]
fn controlled_agent_sends_triggered_check_on_first_inbound_request() {
    let mut ctx = Context::new(init(false), Box::new(DefaultCrypto)).unwrap();
    ctx.add_host_candidate(endpoint(8080, false)).unwrap();
    ctx.add_remote_candidate(RemoteCandidateInfo {
        kind: CandidateKind::Host,
        remote_protocol: SocketProtocol::Udp,
        priority: 100,
        endpoint: endpoint(9090, false),
    })
    .unwrap();
    let pair_ref = ctx.find_pair_by_endpoints(endpoint(8080, false).transport_address, endpoint(9090, false).transport_address).unwrap();
    assert_eq!(ctx.pair(pair_ref).connectivity_check_flags, 0);

    let token = [1u8; 12];
    let mut body = BytesMut::new();
    let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
    message.flush(&DefaultCrypto, Some(b"lp")).unwrap();

    let outcome = handle_stun_packet(
        &mut ctx,
        &body,
        endpoint(8080, false).transport_address,
        endpoint(9090, false).transport_address,
        0,
        None,
        &mut |_| {},
    );

    assert_eq!(outcome, HandleOutcome::SendTriggeredCheck(pair_ref));
    assert_eq!(
        ctx.pair(pair_ref).connectivity_check_flags,
        ice_agent::candidate::check_flags::REQUEST_SENT | ice_agent::candidate::check_flags::REQUEST_RECEIVED | ice_agent::candidate::check_flags::RESPONSE_SENT
    );
}

#[test]
fn controlling_agent_completes_nomination_then_selects_pair() {
    let mut ctx = Context::new(init(true), Box::new(DefaultCrypto)).unwrap();
    ctx.add_host_candidate(endpoint(8080, false)).unwrap();
    ctx.add_remote_candidate(RemoteCandidateInfo {
        kind: CandidateKind::Host,
        remote_protocol: SocketProtocol::Udp,
        priority: 100,
        endpoint: endpoint(9090, false),
    })
    .unwrap();
    let pair_ref = ctx.find_pair_by_endpoints(endpoint(8080, false).transport_address, endpoint(9090, false).transport_address).unwrap();

    ctx.pair_mut(pair_ref).connectivity_check_flags =
        ice_agent::candidate::check_flags::REQUEST_SENT | ice_agent::candidate::check_flags::RESPONSE_RECEIVED;
    let prior_token = ctx.pair(pair_ref).transaction_id;

    let request_token = [2u8; 12];
    let mut body = BytesMut::new();
    let mut message = MessageEncoder::new(BINDING_REQUEST, &request_token, &mut body);
    message.flush(&DefaultCrypto, Some(b"lp")).unwrap();

    let outcome = handle_stun_packet(
        &mut ctx,
        &body,
        endpoint(8080, false).transport_address,
        endpoint(9090, false).transport_address,
        0,
        None,
        &mut |_| {},
    );

    assert_eq!(outcome, HandleOutcome::SendResponseAndStartNomination(pair_ref, request_token));
    assert_eq!(ctx.pair(pair_ref).state, PairState::Nominated);
    assert_eq!(ctx.nominated_pair, Some(pair_ref));
    let nomination_token = ctx.pair(pair_ref).transaction_id;
    assert_ne!(nomination_token, prior_token);

    let mut success = BytesMut::new();
    let mut response = MessageEncoder::new(BINDING_RESPONSE, &nomination_token, &mut success);
    response.flush(&DefaultCrypto, Some(b"rp")).unwrap();

    let outcome = handle_stun_packet(
        &mut ctx,
        &success,
        endpoint(8080, false).transport_address,
        endpoint(9090, false).transport_address,
        0,
        Some(pair_ref),
        &mut |_| {},
    );

    assert_eq!(outcome, HandleOutcome::CandidatePairReady(pair_ref));
    assert_eq!(ctx.selected_pair, Some(pair_ref));
    assert_eq!(ctx.pair(pair_ref).state, PairState::Succeeded);
}

#[test]
fn turn_allocate_401_challenge_drives_next_allocate_with_long_term_credentials() {
    let mut ctx = Context::new(init(true), Box::new(DefaultCrypto)).unwrap();
    let candidate_ref = ctx.add_relay_candidate(endpoint(3478, false), "u".into(), "p".into()).unwrap();

    let mut first_request = BytesMut::new();
    builders::allocation_request(&ctx, candidate_ref, 600, &mut first_request).unwrap();
    {
        let mut attrs = Attributes::default();
        let decoded = Message::decode(&first_request, &mut attrs).unwrap();
        assert_eq!(decoded.method(), ALLOCATE_REQUEST);
        assert!(decoded.get::<Realm>().is_none());
    }

    let token = ctx.candidate(candidate_ref).transaction_id;
    let mut error = BytesMut::new();
    let mut message = MessageEncoder::new(ALLOCATE_ERROR, &token, &mut error);
    message.append::<ErrorCode>((401, "Unauthorized"));
    message.append::<Realm>("R");
    message.append::<Nonce>("N");
    message.flush(&DefaultCrypto, None).unwrap();

    let outcome = handle_stun_packet(
        &mut ctx,
        &error,
        endpoint(3478, false).transport_address,
        endpoint(3478, false).transport_address,
        0,
        None,
        &mut |_| {},
    );
    assert_eq!(outcome, HandleOutcome::SendAllocationRequest(candidate_ref));

    let expected_key = DefaultCrypto.md5(b"u:R:p").unwrap();
    assert_eq!(ctx.candidate(candidate_ref).turn_server.as_ref().unwrap().long_term_key, expected_key);

    let mut second_request = BytesMut::new();
    builders::allocation_request(&ctx, candidate_ref, 600, &mut second_request).unwrap();
    let mut attrs = Attributes::default();
    let decoded = Message::decode(&second_request, &mut attrs).unwrap();
    assert_eq!(decoded.get::<Realm>(), Some("R"));
    assert_eq!(decoded.get::<Nonce>(), Some("N"));
    decoded.checksum(&DefaultCrypto, &expected_key).unwrap();
}

#[test]
fn fingerprint_tamper_is_rejected_without_mutating_pair_state() {
    let mut ctx = Context::new(init(false), Box::new(DefaultCrypto)).unwrap();
    ctx.add_host_candidate(endpoint(8080, false)).unwrap();
    ctx.add_remote_candidate(RemoteCandidateInfo {
        kind: CandidateKind::Host,
        remote_protocol: SocketProtocol::Udp,
        priority: 100,
        endpoint: endpoint(9090, false),
    })
    .unwrap();
    let pair_ref = ctx.find_pair_by_endpoints(endpoint(8080, false).transport_address, endpoint(9090, false).transport_address).unwrap();
    let state_before = ctx.pair(pair_ref).state;

    let token = [4u8; 12];
    let mut body = BytesMut::new();
    let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut body);
    message.flush(&DefaultCrypto, Some(b"lp")).unwrap();
    let last = body.len() - 1;
    body[last] ^= 0xFF;

    let outcome = handle_stun_packet(
        &mut ctx,
        &body,
        endpoint(8080, false).transport_address,
        endpoint(9090, false).transport_address,
        0,
        None,
        &mut |_| {},
    );

    assert_eq!(outcome, HandleOutcome::FingerprintMismatch);
    assert_eq!(ctx.pair(pair_ref).state, state_before);
}
