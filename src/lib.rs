//! ## Interactive Connectivity Establishment (ICE)
//!
//! [RFC8445]: https://tools.ietf.org/html/rfc8445
//! [RFC5245]: https://tools.ietf.org/html/rfc5245
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//! [RFC5766]: https://tools.ietf.org/html/rfc5766
//!
//! A sans-I/O ICE agent: candidate/candidate-pair state machine and
//! connectivity-check handshake per [RFC8445]/[RFC5245], with a STUN message
//! codec ([RFC5389]) and TURN relay support ([RFC5766]) underneath it. The
//! engine performs no socket I/O and owns no timers — every entry point is a
//! synchronous function over a caller-supplied [`context::Context`] and
//! caller-supplied buffers. Sending packets, scheduling retransmits, and
//! multiplexing sockets are the embedder's job; this crate only tracks
//! state and builds/parses wire messages.
//!
//! A session looks roughly like:
//!
//! ```
//! use ice_agent::config::InitInfo;
//! use ice_agent::context::Context;
//! use ice_agent::credentials::CredentialBlock;
//! use ice_agent::crypto::DefaultCrypto;
//!
//! let init = InitInfo {
//!     credentials: CredentialBlock {
//!         local_username: "lu".into(),
//!         local_password: "lp".into(),
//!         remote_username: "ru".into(),
//!         remote_password: "rp".into(),
//!     },
//!     max_local_candidates: 8,
//!     max_remote_candidates: 8,
//!     max_candidate_pairs: 16,
//!     transaction_id_store_capacity: 8,
//!     is_controlling: true,
//! };
//!
//! let mut ctx = Context::new(init, Box::new(DefaultCrypto)).unwrap();
//! ```

pub mod address;
pub mod builders;
pub mod candidate;
pub mod config;
pub mod context;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod priority;
pub mod stun;
pub mod transaction;
