//! Injected crypto primitives (spec.md §6).
//!
//! The engine never calls a crypto library directly from the state machine
//! or codec; instead every call site takes a `&dyn Crypto`, mirroring the
//! original C `IceCryptoFunctions_t` function table that is copied into the
//! context at `Init`. [`DefaultCrypto`] is a ready-made implementation over
//! the same crates the teacher's codec uses (`rand`, `crc32fast`, `hmac` +
//! `sha1`, `md-5`), provided so embedders and tests don't have to supply
//! their own unless they want a different backend.

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

use crate::error::IceError;

/// Length of an HMAC-SHA1 digest, in bytes.
pub const HMAC_SHA1_LEN: usize = 20;
/// Length of an MD5 digest, in bytes.
pub const MD5_LEN: usize = 16;

/// The four primitives `Init` requires (spec.md §6): cryptographic
/// randomness, CRC-32, HMAC-SHA1, and MD5.
pub trait Crypto {
    fn random(&self, buf: &mut [u8]) -> Result<(), IceError>;
    fn crc32(&self, buf: &[u8]) -> Result<u32, IceError>;
    fn hmac_sha1(&self, key: &[u8], buf: &[u8]) -> Result<[u8; HMAC_SHA1_LEN], IceError>;
    fn md5(&self, buf: &[u8]) -> Result<[u8; MD5_LEN], IceError>;

    fn random_u64(&self) -> Result<u64, IceError> {
        let mut buf = [0u8; 8];
        self.random(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    fn random_transaction_id(&self) -> Result<[u8; 12], IceError> {
        let mut buf = [0u8; 12];
        self.random(&mut buf)?;
        Ok(buf)
    }
}

/// Default [`Crypto`] backend, built from the same crates the teacher
/// crate's STUN codec uses (`crates/codec/src/crypto.rs`): `crc32fast` for
/// the fingerprint, `hmac`/`sha1` for message integrity, `md-5` for TURN
/// long-term credentials, and `rand` for transaction ids and the tiebreaker.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCrypto;

impl Crypto for DefaultCrypto {
    fn random(&self, buf: &mut [u8]) -> Result<(), IceError> {
        use rand::RngCore;
        rand::rng().fill_bytes(buf);
        Ok(())
    }

    fn crc32(&self, buf: &[u8]) -> Result<u32, IceError> {
        Ok(crc32fast::hash(buf))
    }

    fn hmac_sha1(&self, key: &[u8], buf: &[u8]) -> Result<[u8; HMAC_SHA1_LEN], IceError> {
        let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| IceError::HmacError)?;
        mac.update(buf);
        let out = mac.finalize().into_bytes();
        let mut result = [0u8; HMAC_SHA1_LEN];
        result.copy_from_slice(&out);
        Ok(result)
    }

    fn md5(&self, buf: &[u8]) -> Result<[u8; MD5_LEN], IceError> {
        let mut hasher = Md5::new();
        hasher.update(buf);
        Ok(hasher.finalize().into())
    }
}

/// RFC 5389 §15.5 fingerprint: CRC-32 of the message XOR'd with a fixed
/// constant, to distinguish STUN traffic from other protocols multiplexed
/// on the same port.
pub fn fingerprint(crypto: &dyn Crypto, bytes: &[u8]) -> Result<u32, IceError> {
    Ok(crypto.crc32(bytes)? ^ 0x5354_554E)
}
