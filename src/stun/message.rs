//! STUN message encoder/decoder (RFC 5389 §6). Grounded on
//! `crates/codec/src/message/mod.rs`'s `MessageEncoder`/`Message`, with
//! `flush`/`checksum` taking an injected `&dyn Crypto` (spec.md §6) instead of
//! calling `hmac_sha1`/`fingerprint` free functions directly.

use bytes::{BufMut, BytesMut};

use crate::crypto::{self, Crypto};
use crate::stun::attributes::{Attribute, AttributeType, Fingerprint, MessageIntegrity};
use crate::stun::methods::Method;
use crate::stun::{Attributes, Error};

const MAGIC_COOKIE: u32 = 0x2112_A442;

/// RFC 5766 §14.7: attribute values are padded to a 4-byte boundary.
#[inline(always)]
pub fn alignment_32(size: usize) -> usize {
    let rem = size % 4;
    if size == 0 || rem == 0 {
        0
    } else {
        4 - rem
    }
}

pub struct MessageEncoder<'a> {
    token: &'a [u8],
    bytes: &'a mut BytesMut,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(method: Method, token: &'a [u8; 12], bytes: &'a mut BytesMut) -> Self {
        bytes.clear();
        bytes.put_u16(method.into());
        bytes.put_u16(0);
        bytes.put_u32(MAGIC_COOKIE);
        bytes.put(token.as_slice());
        Self { bytes, token }
    }

    pub fn extend(method: Method, reader: &Message<'a>, bytes: &'a mut BytesMut) -> Self {
        let token = reader.token();
        bytes.clear();
        bytes.put_u16(method.into());
        bytes.put_u16(0);
        bytes.put_u32(MAGIC_COOKIE);
        bytes.put(token);
        Self { bytes, token }
    }

    pub fn append<'c, T: Attribute<'c>>(&'c mut self, value: T::Item) {
        self.bytes.put_u16(T::TYPE as u16);

        let os = self.bytes.len();
        self.bytes.put_u16(0);
        T::serialize(value, self.bytes, self.token);

        let size = self.bytes.len() - os - 2;
        let size_buf = (size as u16).to_be_bytes();
        self.bytes[os] = size_buf[0];
        self.bytes[os + 1] = size_buf[1];

        let psize = alignment_32(size);
        if psize > 0 {
            self.bytes.put(&[0u8; 3][..psize]);
        }
    }

    /// Finalizes the message, optionally appending `MESSAGE-INTEGRITY` (when
    /// `key` is given) and always appending `FINGERPRINT` (spec.md §4.C:
    /// these two are always the last two attributes, in that order).
    pub fn flush(&mut self, crypto: &dyn Crypto, key: Option<&[u8]>) -> Result<(), Error> {
        assert!(self.bytes.len() >= 20);
        let base_len = self.bytes.len();
        self.set_len(base_len - 20);

        if let Some(key) = key {
            self.checksum(crypto, key, base_len)?;
        }

        self.fingerprint(crypto, base_len, key.is_some())
    }

    /// `base_len` is the total buffer length before any trailer attribute
    /// was appended; the STUN length field must cover each trailer as if it
    /// were already present while that trailer's own digest is computed.
    fn checksum(&mut self, crypto: &dyn Crypto, key: &[u8], base_len: usize) -> Result<(), Error> {
        self.set_len(base_len - 20 + 4 + crypto::HMAC_SHA1_LEN);
        let hmac = crypto
            .hmac_sha1(key, self.bytes)
            .map_err(|_| Error::SummaryFailed)?;

        self.bytes.put_u16(AttributeType::MessageIntegrity as u16);
        self.bytes.put_u16(crypto::HMAC_SHA1_LEN as u16);
        self.bytes.put(&hmac[..]);

        Ok(())
    }

    fn fingerprint(&mut self, crypto: &dyn Crypto, base_len: usize, had_integrity: bool) -> Result<(), Error> {
        let integrity_span = if had_integrity { 4 + crypto::HMAC_SHA1_LEN } else { 0 };
        self.set_len(base_len - 20 + integrity_span + 4 + 4);

        let fingerprint = crypto::fingerprint(crypto, self.bytes).map_err(|_| Error::SummaryFailed)?;
        self.bytes.put_u16(AttributeType::Fingerprint as u16);
        self.bytes.put_u16(4);
        self.bytes.put_u32(fingerprint);

        Ok(())
    }

    fn set_len(&mut self, len: usize) {
        self.bytes[2..4].copy_from_slice((len as u16).to_be_bytes().as_slice());
    }
}

/// A decoded STUN message borrowing from the original buffer and an
/// externally-owned [`Attributes`] index.
pub struct Message<'a> {
    method: Method,
    bytes: &'a [u8],
    size: u16,
    fingerprint_size: u16,
    attributes: &'a Attributes,
}

impl<'a> Message<'a> {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn token(&self) -> &'a [u8] {
        &self.bytes[8..20]
    }

    pub fn get<T: Attribute<'a>>(&self) -> Option<T::Item> {
        let range = self.attributes.get(&T::TYPE)?;
        T::deserialize(&self.bytes[range], self.token()).ok()
    }

    pub fn get_all<T: Attribute<'a>>(&self) -> impl Iterator<Item = T::Item> {
        self.attributes
            .get_all(&T::TYPE)
            .map(|range| T::deserialize(&self.bytes[range.clone()], self.token()))
            .filter_map(Result::ok)
    }

    /// Verifies `MESSAGE-INTEGRITY` against `key` (spec.md §4.C,
    /// `ValidateStunMessageIntegrity`).
    pub fn checksum(&self, crypto: &dyn Crypto, key: &[u8]) -> Result<(), Error> {
        if self.bytes.is_empty() || self.size < 20 {
            return Err(Error::InvalidInput);
        }

        let integrity = self.get::<MessageIntegrity>().ok_or(Error::NotFoundIntegrity)?;

        let size_buf = (self.size + 4).to_be_bytes();
        let mut body = Vec::with_capacity(self.size as usize + 4);
        body.extend_from_slice(&self.bytes[0..2]);
        body.extend_from_slice(&size_buf);
        body.extend_from_slice(&self.bytes[4..self.size as usize]);

        let expected = crypto.hmac_sha1(key, &body).map_err(|_| Error::SummaryFailed)?;
        if integrity != expected {
            return Err(Error::IntegrityFailed);
        }

        Ok(())
    }

    /// Verifies `FINGERPRINT` (spec.md §4.C, `ValidateStunMessageFingerprint`).
    pub fn verify_fingerprint(&self, crypto: &dyn Crypto) -> Result<(), Error> {
        if self.bytes.is_empty() || self.fingerprint_size < 20 {
            return Err(Error::InvalidInput);
        }

        let expected = self.get::<Fingerprint>().ok_or(Error::NotFoundFingerprint)?;

        let size_buf = (self.fingerprint_size + 4).to_be_bytes();
        let mut body = Vec::with_capacity(self.fingerprint_size as usize + 4);
        body.extend_from_slice(&self.bytes[0..2]);
        body.extend_from_slice(&size_buf);
        body.extend_from_slice(&self.bytes[4..self.fingerprint_size as usize]);

        let actual = crypto::fingerprint(crypto, &body).map_err(|_| Error::SummaryFailed)?;
        if actual != expected {
            return Err(Error::FingerprintFailed);
        }

        Ok(())
    }

    pub fn decode(bytes: &'a [u8], attributes: &'a mut Attributes) -> Result<Self, Error> {
        let len = bytes.len();
        if len < 20 {
            return Err(Error::InvalidInput);
        }

        let method = Method::try_from(u16::from_be_bytes(bytes[..2].try_into()?))?;

        let size = u16::from_be_bytes(bytes[2..4].try_into()?) as usize + 20;
        if len < size {
            return Err(Error::InvalidInput);
        }

        if bytes[4..8] != MAGIC_COOKIE.to_be_bytes() {
            return Err(Error::NotFoundMagicCookie);
        }

        let mut found_integrity = false;
        let mut found_fingerprint = false;
        let mut content_len = 0u16;
        let mut fingerprint_len = 0u16;
        let mut offset = 20;

        loop {
            if len - offset < 4 {
                break;
            }

            let key = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);

            if !found_integrity {
                content_len = offset as u16;
            }
            if !found_fingerprint {
                fingerprint_len = offset as u16;
            }

            let attr_size = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;

            offset += 4;
            if len - offset < attr_size {
                break;
            }

            let range = offset..(offset + attr_size);
            if attr_size > 0 {
                offset += attr_size + alignment_32(attr_size);
            }

            let Ok(kind) = AttributeType::try_from(key) else {
                continue;
            };

            if kind == AttributeType::MessageIntegrity {
                found_integrity = true;
            }
            if kind == AttributeType::Fingerprint {
                found_fingerprint = true;
            }

            attributes.append(kind, range);
        }

        Ok(Self {
            size: content_len,
            fingerprint_size: fingerprint_len,
            attributes,
            method,
            bytes,
        })
    }

    pub fn message_size(bytes: &[u8]) -> Result<usize, Error> {
        if bytes[0] >> 6 != 0 || bytes.len() < 20 {
            return Err(Error::InvalidInput);
        }

        Ok((u16::from_be_bytes(bytes[2..4].try_into()?) as usize) + 20)
    }
}
