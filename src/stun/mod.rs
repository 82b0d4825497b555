//! STUN message codec (spec.md §4.C): RFC 5389 wire format plus the RFC 5766
//! ChannelData framing TURN layers on top. Grounded on
//! `crates/codec/src/lib.rs` and `crates/codec/src/message/mod.rs` in the
//! teacher crate, trimmed to the attribute/method set spec.md requires and
//! with a `thiserror`-derived error type in place of the teacher's
//! hand-written `Display` impl.

pub mod attributes;
pub mod channel_data;
pub mod message;
pub mod methods;

use std::{array::TryFromSliceError, ops::Range, str::Utf8Error};

use thiserror::Error;

use self::{attributes::AttributeType, channel_data::ChannelData, message::Message};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("input is too short or otherwise malformed")]
    InvalidInput,
    #[error("hmac computation failed")]
    SummaryFailed,
    #[error("no MESSAGE-INTEGRITY attribute present")]
    NotFoundIntegrity,
    #[error("MESSAGE-INTEGRITY check failed")]
    IntegrityFailed,
    #[error("no FINGERPRINT attribute present")]
    NotFoundFingerprint,
    #[error("FINGERPRINT check failed")]
    FingerprintFailed,
    #[error("magic cookie missing or mismatched")]
    NotFoundMagicCookie,
    #[error("unrecognized STUN method")]
    UnknownMethod,
    #[error("invalid utf8: {0}")]
    Utf8Error(#[from] Utf8Error),
    #[error("slice conversion failed: {0}")]
    TryFromSliceError(#[from] TryFromSliceError),
}

pub enum DecodeResult<'a> {
    Message(Message<'a>),
    ChannelData(ChannelData<'a>),
}

/// A cache of `(attribute type, byte range)` pairs found while decoding a
/// message — storing ranges rather than slices sidesteps the borrow-checker
/// friction of storing `&[u8]` subslices alongside the buffer they borrow
/// from.
#[derive(Debug, Clone)]
pub struct Attributes(Vec<(AttributeType, Range<usize>)>);

impl Default for Attributes {
    fn default() -> Self {
        Self(Vec::with_capacity(16))
    }
}

impl Attributes {
    pub fn append(&mut self, kind: AttributeType, range: Range<usize>) {
        self.0.push((kind, range));
    }

    pub fn get(&self, kind: &AttributeType) -> Option<Range<usize>> {
        self.0.iter().find(|(k, _)| k == kind).map(|(_, v)| v.clone())
    }

    pub fn get_all<'a>(&'a self, kind: &'a AttributeType) -> impl Iterator<Item = &'a Range<usize>> {
        self.0.iter().filter(move |(k, _)| k == kind).map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Dispatches a received datagram to either the STUN message decoder or the
/// TURN ChannelData decoder, based on the top two bits of the first byte
/// (RFC 5766 §11: `0b00` is a STUN message, `0b01`/`0b10` is ChannelData).
#[derive(Default)]
pub struct Decoder(Attributes);

impl Decoder {
    pub fn decode<'a>(&'a mut self, bytes: &'a [u8]) -> Result<DecodeResult<'a>, Error> {
        if bytes.len() < 4 {
            return Err(Error::InvalidInput);
        }

        let flag = bytes[0] >> 6;
        if flag > 3 {
            return Err(Error::InvalidInput);
        }

        Ok(if flag == 0 {
            self.0.clear();
            DecodeResult::Message(Message::decode(bytes, &mut self.0)?)
        } else {
            DecodeResult::ChannelData(ChannelData::decode(bytes)?)
        })
    }

    pub fn message_size(bytes: &[u8], is_tcp: bool) -> Result<usize, Error> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput);
        }

        let flag = bytes[0] >> 6;
        if flag > 3 {
            return Err(Error::InvalidInput);
        }

        Ok(if flag == 0 {
            Message::message_size(bytes)?
        } else {
            ChannelData::message_size(bytes, is_tcp)?
        })
    }
}
