//! Context lifecycle and candidate/pair registry (spec.md §3 `Context`,
//! §4.F, §4.I; `IceContext_t`/`IceInitInfo_t` in the original header).

use crate::address::{same_transport_address, Endpoint};
use crate::candidate::{
    check_flags, Candidate, CandidateKind, CandidateRef, CandidatePair, CandidateState, PairState,
    TurnServerBlock,
};
use crate::config::InitInfo;
use crate::credentials::CredentialBlock;
use crate::crypto::Crypto;
use crate::error::IceError;
use crate::priority::{candidate_priority, pair_priority};
use crate::transaction::{TransactionId, TransactionIdStore};

/// `IceSocketProtocol_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketProtocol {
    None,
    Tcp,
    Udp,
}

/// `IceRemoteCandidateInfo_t`: everything the caller supplies about a
/// newly-discovered remote candidate.
pub struct RemoteCandidateInfo {
    pub kind: CandidateKind,
    pub remote_protocol: SocketProtocol,
    pub priority: u32,
    pub endpoint: Endpoint,
}

/// Stable reference into [`Context`]'s append-only pair storage (I1). Kept
/// distinct from the priority-sorted view (I2) so that `nominated_pair` /
/// `selected_pair` and any caller-held reference survive re-sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairRef(usize);

/// Aggregate engine state (spec.md §3 `Context`).
pub struct Context {
    pub credentials: CredentialBlock,
    pub is_controlling: bool,
    pub tie_breaker: u64,

    local_candidates: Vec<Candidate>,
    max_local_candidates: usize,
    remote_candidates: Vec<Candidate>,
    max_remote_candidates: usize,

    /// Append-only pair storage; `PairRef` indexes here and never shifts (I1).
    pair_storage: Vec<CandidatePair>,
    /// Indices into `pair_storage`, kept sorted by descending priority (I2).
    pair_order: Vec<usize>,
    max_candidate_pairs: usize,

    pub nominated_pair: Option<PairRef>,
    pub selected_pair: Option<PairRef>,

    transaction_ids: TransactionIdStore,
    crypto: Box<dyn Crypto>,
}

impl Context {
    /// `Init`: validates capacities, zeros counters, randomizes the
    /// tiebreaker via the injected RNG.
    pub fn new(init: InitInfo, crypto: Box<dyn Crypto>) -> Result<Self, IceError> {
        init.validate()?;

        let tie_breaker = crypto.random_u64().map_err(|_| IceError::RandomError)?;

        Ok(Self {
            credentials: init.credentials,
            is_controlling: init.is_controlling,
            tie_breaker,
            local_candidates: Vec::with_capacity(init.max_local_candidates),
            max_local_candidates: init.max_local_candidates,
            remote_candidates: Vec::with_capacity(init.max_remote_candidates),
            max_remote_candidates: init.max_remote_candidates,
            pair_storage: Vec::with_capacity(init.max_candidate_pairs),
            pair_order: Vec::with_capacity(init.max_candidate_pairs),
            max_candidate_pairs: init.max_candidate_pairs,
            nominated_pair: None,
            selected_pair: None,
            transaction_ids: TransactionIdStore::new(init.transaction_id_store_capacity),
            crypto,
        })
    }

    pub fn crypto(&self) -> &dyn Crypto {
        self.crypto.as_ref()
    }

    pub fn transaction_ids(&mut self) -> &mut TransactionIdStore {
        &mut self.transaction_ids
    }

    pub fn local_candidate_count(&self) -> usize {
        self.local_candidates.len()
    }

    pub fn remote_candidate_count(&self) -> usize {
        self.remote_candidates.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pair_storage.len()
    }

    fn candidate_array(&self, is_remote: bool) -> &Vec<Candidate> {
        if is_remote {
            &self.remote_candidates
        } else {
            &self.local_candidates
        }
    }

    fn candidate_array_mut(&mut self, is_remote: bool) -> &mut Vec<Candidate> {
        if is_remote {
            &mut self.remote_candidates
        } else {
            &mut self.local_candidates
        }
    }

    pub fn candidate(&self, r: CandidateRef) -> &Candidate {
        &self.candidate_array(r.is_remote)[r.index]
    }

    pub fn candidate_mut(&mut self, r: CandidateRef) -> &mut Candidate {
        &mut self.candidate_array_mut(r.is_remote)[r.index]
    }

    /// Candidate pairs in priority order, highest first (I2).
    pub fn pairs(&self) -> impl Iterator<Item = (PairRef, &CandidatePair)> {
        self.pair_order.iter().map(|&i| (PairRef(i), &self.pair_storage[i]))
    }

    /// Local candidates in insertion order, for embedder introspection (e.g.
    /// building an SDP candidate line); grounded on `ice_api.c`'s
    /// `Ice_GetLocalCandidate`-style index accessors.
    pub fn local_candidates(&self) -> impl Iterator<Item = (CandidateRef, &Candidate)> {
        self.local_candidates.iter().enumerate().map(|(index, c)| (CandidateRef { is_remote: false, index }, c))
    }

    pub fn remote_candidates(&self) -> impl Iterator<Item = (CandidateRef, &Candidate)> {
        self.remote_candidates.iter().enumerate().map(|(index, c)| (CandidateRef { is_remote: true, index }, c))
    }

    pub fn pair(&self, r: PairRef) -> &CandidatePair {
        &self.pair_storage[r.0]
    }

    pub fn pair_mut(&mut self, r: PairRef) -> &mut CandidatePair {
        &mut self.pair_storage[r.0]
    }

    pub fn invalidate_pair(&mut self, r: PairRef) {
        self.pair_mut(r).state = PairState::Invalid;
    }

    /// Finds a pair by its local/remote candidates' transport addresses
    /// (spec.md §4.H step 2 for incoming requests and check responses).
    pub fn find_pair_by_endpoints(&self, local: crate::address::TransportAddress, remote: crate::address::TransportAddress) -> Option<PairRef> {
        self.pairs()
            .find(|(_, p)| {
                same_transport_address(&self.candidate(p.local).endpoint.transport_address, &local)
                    && same_transport_address(&self.candidate(p.remote).endpoint.transport_address, &remote)
            })
            .map(|(r, _)| r)
    }

    /// Finds a pair awaiting a TURN response by its current transaction id
    /// (spec.md §4.H: TURN CreatePermission/ChannelBind responses are
    /// matched by TxID, not endpoint, since their source is the TURN server).
    pub fn find_pair_by_transaction_id(&self, id: &TransactionId) -> Option<PairRef> {
        self.pairs().find(|(_, p)| &p.transaction_id == id).map(|(r, _)| r)
    }

    /// Finds a remote candidate by transport address (for auto-adding
    /// peer-reflexive candidates and for check-response address comparisons).
    pub fn find_remote_candidate_by_address(&self, address: crate::address::TransportAddress) -> Option<CandidateRef> {
        self.remote_candidates
            .iter()
            .position(|c| same_transport_address(&c.endpoint.transport_address, &address))
            .map(|index| CandidateRef { is_remote: true, index })
    }

    /// Finds a local candidate of the given kind currently awaiting a
    /// response for `id` (candidate-level transaction, spec.md §4.B).
    pub fn find_local_candidate_by_transaction_id(&self, kind: CandidateKind, id: &TransactionId) -> Option<CandidateRef> {
        self.local_candidates
            .iter()
            .position(|c| c.kind == kind && &c.transaction_id == id)
            .map(|index| CandidateRef { is_remote: false, index })
    }

    /// `AddHostCandidate`: appended `Valid` immediately, paired with every
    /// existing remote candidate.
    pub fn add_host_candidate(&mut self, endpoint: Endpoint) -> Result<CandidateRef, IceError> {
        let priority = candidate_priority(CandidateKind::Host, endpoint.is_point_to_point);
        let candidate_ref = self.push_local(Candidate {
            kind: CandidateKind::Host,
            is_remote: false,
            endpoint,
            state: CandidateState::Valid,
            priority,
            transaction_id: [0u8; 12],
            turn_server: None,
        })?;

        self.pair_with_all_remotes(candidate_ref)?;
        Ok(candidate_ref)
    }

    /// `AddServerReflexiveCandidate`: appended `New`; the caller builds and
    /// sends the Binding Request this call's transaction id was reserved for
    /// (`builders::server_reflexive_binding_request`).
    pub fn add_server_reflexive_candidate(&mut self, endpoint: Endpoint) -> Result<CandidateRef, IceError> {
        let transaction_id = self.fresh_transaction_id()?;
        let priority = candidate_priority(CandidateKind::ServerReflexive, endpoint.is_point_to_point);

        self.push_local(Candidate {
            kind: CandidateKind::ServerReflexive,
            is_remote: false,
            endpoint,
            state: CandidateState::New,
            priority,
            transaction_id,
            turn_server: None,
        })
    }

    /// `AddRelayCandidate`: appended `Allocating`; the first Allocate attempt
    /// will 401 and supply the realm/nonce §4.E needs.
    pub fn add_relay_candidate(&mut self, endpoint: Endpoint, username: String, password: String) -> Result<CandidateRef, IceError> {
        let transaction_id = self.fresh_transaction_id()?;
        let priority = candidate_priority(CandidateKind::Relay, endpoint.is_point_to_point);
        let (channel_min, _) = (crate::config::ICE_DEFAULT_TURN_CHANNEL_NUMBER_MIN, crate::config::ICE_DEFAULT_TURN_CHANNEL_NUMBER_MAX);

        self.push_local(Candidate {
            kind: CandidateKind::Relay,
            is_remote: false,
            endpoint,
            state: CandidateState::Allocating,
            priority,
            transaction_id,
            turn_server: Some(TurnServerBlock::new(username, password, channel_min)),
        })
    }

    /// `AddRemoteCandidate`: de-duplicated by transport address (idempotent),
    /// paired with every `Valid` local candidate.
    pub fn add_remote_candidate(&mut self, info: RemoteCandidateInfo) -> Result<CandidateRef, IceError> {
        if let Some(index) = self
            .remote_candidates
            .iter()
            .position(|c| same_transport_address(&c.endpoint.transport_address, &info.endpoint.transport_address))
        {
            return Ok(CandidateRef { is_remote: true, index });
        }

        let candidate_ref = self.push_remote(Candidate {
            kind: info.kind,
            is_remote: true,
            endpoint: info.endpoint,
            state: CandidateState::Valid,
            priority: info.priority,
            transaction_id: [0u8; 12],
            turn_server: None,
        })?;

        let valid_locals: Vec<CandidateRef> = self
            .local_candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_valid())
            .map(|(index, _)| CandidateRef { is_remote: false, index })
            .collect();

        for local in valid_locals {
            self.add_candidate_pair(local, candidate_ref)?;
        }

        Ok(candidate_ref)
    }

    /// `AddCandidatePair`: priority-ordered insertion (I2); relay locals
    /// consume a TURN channel number and start at `CreatePermission`.
    pub fn add_candidate_pair(&mut self, local: CandidateRef, remote: CandidateRef) -> Result<PairRef, IceError> {
        if self.pair_storage.len() >= self.max_candidate_pairs {
            return Err(IceError::MaxCandidatePairThreshold);
        }

        let priority = pair_priority(self.candidate(local).priority, self.candidate(remote).priority, self.is_controlling);
        let transaction_id = self.crypto.random_transaction_id().map_err(|_| IceError::RandomError)?;

        let local_candidate = self.candidate_mut(local);
        let (state, turn_channel_number) = if local_candidate.kind == CandidateKind::Relay {
            let turn = local_candidate
                .turn_server
                .as_mut()
                .ok_or(IceError::InvalidCandidate)?;
            let channel = turn
                .take_channel_number(crate::config::ICE_DEFAULT_TURN_CHANNEL_NUMBER_MAX)
                .ok_or(IceError::MaxChannelNumberThreshold)?;
            (PairState::CreatePermission, Some(channel))
        } else {
            (PairState::Waiting, None)
        };

        let pair = CandidatePair {
            local,
            remote,
            priority,
            state,
            connectivity_check_flags: 0,
            transaction_id,
            turn_channel_number,
            turn_permission_expiration_seconds: 0,
        };

        let storage_index = self.pair_storage.len();
        self.pair_storage.push(pair);

        let insertion_index = self
            .pair_order
            .iter()
            .position(|&i| priority >= self.pair_storage[i].priority)
            .unwrap_or(self.pair_order.len());
        self.pair_order.insert(insertion_index, storage_index);

        Ok(PairRef(storage_index))
    }

    /// Replaces a local candidate's endpoint, flips it to `Valid`, and pairs
    /// it with every existing remote candidate (spec.md §4.H
    /// `HandleServerReflexiveResponse` / `HandleTurnAllocateSuccess`).
    pub fn validate_local_candidate(&mut self, candidate: CandidateRef, endpoint: Endpoint) -> Result<(), IceError> {
        {
            let c = self.candidate_mut(candidate);
            c.endpoint = endpoint;
            c.state = CandidateState::Valid;
        }

        self.pair_with_all_remotes(candidate)
    }

    /// I3: regenerates a candidate's outstanding transaction id, replacing
    /// its entry in the candidate-level store.
    pub fn regenerate_candidate_transaction_id(&mut self, candidate: CandidateRef) -> Result<TransactionId, IceError> {
        self.transaction_ids.remove(&self.candidate(candidate).transaction_id);
        let id = self.fresh_transaction_id()?;
        self.candidate_mut(candidate).transaction_id = id;
        Ok(id)
    }

    /// I3: regenerates a pair's outstanding transaction id (not tracked in
    /// the shared store; pair-level transactions live on the pair itself).
    pub fn regenerate_pair_transaction_id(&mut self, pair: PairRef) -> Result<TransactionId, IceError> {
        let id = self.crypto.random_transaction_id().map_err(|_| IceError::RandomError)?;
        self.pair_mut(pair).transaction_id = id;
        Ok(id)
    }

    pub(crate) fn pair_with_all_remotes(&mut self, local: CandidateRef) -> Result<(), IceError> {
        let remotes: Vec<CandidateRef> = (0..self.remote_candidates.len())
            .map(|index| CandidateRef { is_remote: true, index })
            .collect();

        for remote in remotes {
            self.add_candidate_pair(local, remote)?;
        }

        Ok(())
    }

    /// `ReleaseOtherCandidates`: drives every non-nominated local candidate
    /// toward `Releasing`, invoking `on_close` (the `Ice_CloseCandidate`
    /// embedder hook) on each one so the caller can tear down sockets/relays
    /// for candidates that lost the nomination race.
    pub fn release_other_candidates(&mut self, nominated: CandidateRef, mut on_close: impl FnMut(&mut Candidate)) {
        for (index, candidate) in self.local_candidates.iter_mut().enumerate() {
            if index != nominated.index && candidate.state != CandidateState::Invalid {
                candidate.state = CandidateState::Releasing;
                on_close(candidate);
            }
        }
    }

    fn fresh_transaction_id(&mut self) -> Result<TransactionId, IceError> {
        loop {
            let id = self.crypto.random_transaction_id().map_err(|_| IceError::RandomError)?;
            if !self.transaction_ids.has_id(&id) {
                self.transaction_ids.insert(id);
                return Ok(id);
            }
        }
    }

    fn push_local(&mut self, candidate: Candidate) -> Result<CandidateRef, IceError> {
        if self.local_candidates.len() >= self.max_local_candidates {
            return Err(IceError::MaxCandidateThreshold);
        }

        let index = self.local_candidates.len();
        self.local_candidates.push(candidate);
        Ok(CandidateRef { is_remote: false, index })
    }

    fn push_remote(&mut self, candidate: Candidate) -> Result<CandidateRef, IceError> {
        if self.remote_candidates.len() >= self.max_remote_candidates {
            return Err(IceError::MaxCandidateThreshold);
        }

        let index = self.remote_candidates.len();
        self.remote_candidates.push(candidate);
        Ok(CandidateRef { is_remote: true, index })
    }
}
