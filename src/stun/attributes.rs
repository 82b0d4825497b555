//! STUN/TURN attribute registry and codec (spec.md §4.C).
//!
//! Each attribute is a zero-sized marker type implementing [`Attribute`],
//! following the shape of `crates/codec/src/message/mod.rs`'s `Attribute<'a>`
//! trait in the teacher crate: a `TYPE` tag plus symmetric
//! `serialize`/`deserialize` functions operating directly on the message
//! buffer and the 12-byte transaction id (needed for XOR'd addresses).

use std::convert::TryFrom;

use bytes::{BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::address::{Family, TransportAddress};
use crate::stun::Error;

const MAGIC_COOKIE: u32 = 0x2112_A442;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum AttributeType {
    UserName = 0x0006,
    MessageIntegrity = 0x0008,
    ErrorCode = 0x0009,
    ChannelNumber = 0x000C,
    Lifetime = 0x000D,
    XorPeerAddress = 0x0012,
    Realm = 0x0014,
    Nonce = 0x0015,
    XorRelayedAddress = 0x0016,
    RequestedTransport = 0x0019,
    XorMappedAddress = 0x0020,
    Priority = 0x0024,
    UseCandidate = 0x0025,
    Fingerprint = 0x8028,
    IceControlled = 0x8029,
    IceControlling = 0x802A,
}

/// Encodes/decodes one attribute's value in place, inside a complete STUN
/// message buffer. `token` is the message's 12-byte transaction id, needed
/// to XOR IPv6 addresses.
pub trait Attribute<'a> {
    type Item;
    const TYPE: AttributeType;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, token: &[u8]);
    fn deserialize(buf: &'a [u8], token: &[u8]) -> Result<Self::Item, Error>;
}

fn xor_port(port: u16) -> u16 {
    port ^ ((MAGIC_COOKIE >> 16) as u16)
}

fn xor_v4(addr: [u8; 4]) -> [u8; 4] {
    let cookie = MAGIC_COOKIE.to_be_bytes();
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = addr[i] ^ cookie[i];
    }
    out
}

fn xor_v6(addr: [u8; 16], token: &[u8]) -> [u8; 16] {
    let mut pad = [0u8; 16];
    pad[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
    pad[4..16].copy_from_slice(&token[..12]);

    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = addr[i] ^ pad[i];
    }
    out
}

fn encode_xor_address(addr: TransportAddress, bytes: &mut BytesMut, token: &[u8]) {
    bytes.put_u8(0);

    match addr.family {
        Family::V4 => {
            bytes.put_u8(0x01);
            bytes.put_u16(xor_port(addr.port));
            let mut octets = [0u8; 4];
            octets.copy_from_slice(&addr.address[..4]);
            bytes.put(&xor_v4(octets)[..]);
        }
        Family::V6 => {
            bytes.put_u8(0x02);
            bytes.put_u16(xor_port(addr.port));
            bytes.put(&xor_v6(addr.address, token)[..]);
        }
    }
}

fn decode_xor_address(buf: &[u8], token: &[u8]) -> Result<TransportAddress, Error> {
    if buf.len() < 4 {
        return Err(Error::InvalidInput);
    }

    let port = xor_port(u16::from_be_bytes([buf[2], buf[3]]));
    match buf[1] {
        0x01 if buf.len() >= 8 => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(&buf[4..8]);
            Ok(TransportAddress::new_v4(xor_v4(octets), port))
        }
        0x02 if buf.len() >= 20 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&buf[4..20]);
            Ok(TransportAddress::new_v6(xor_v6(octets, token), port))
        }
        _ => Err(Error::InvalidInput),
    }
}

pub struct XorMappedAddress;
impl<'a> Attribute<'a> for XorMappedAddress {
    type Item = TransportAddress;
    const TYPE: AttributeType = AttributeType::XorMappedAddress;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, token: &[u8]) {
        encode_xor_address(value, bytes, token)
    }

    fn deserialize(buf: &'a [u8], token: &[u8]) -> Result<Self::Item, Error> {
        decode_xor_address(buf, token)
    }
}

pub struct XorPeerAddress;
impl<'a> Attribute<'a> for XorPeerAddress {
    type Item = TransportAddress;
    const TYPE: AttributeType = AttributeType::XorPeerAddress;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, token: &[u8]) {
        encode_xor_address(value, bytes, token)
    }

    fn deserialize(buf: &'a [u8], token: &[u8]) -> Result<Self::Item, Error> {
        decode_xor_address(buf, token)
    }
}

pub struct XorRelayedAddress;
impl<'a> Attribute<'a> for XorRelayedAddress {
    type Item = TransportAddress;
    const TYPE: AttributeType = AttributeType::XorRelayedAddress;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, token: &[u8]) {
        encode_xor_address(value, bytes, token)
    }

    fn deserialize(buf: &'a [u8], token: &[u8]) -> Result<Self::Item, Error> {
        decode_xor_address(buf, token)
    }
}

pub struct UserName;
impl<'a> Attribute<'a> for UserName {
    type Item = &'a str;
    const TYPE: AttributeType = AttributeType::UserName;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put(value.as_bytes());
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(std::str::from_utf8(buf)?)
    }
}

pub struct Realm;
impl<'a> Attribute<'a> for Realm {
    type Item = &'a str;
    const TYPE: AttributeType = AttributeType::Realm;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put(value.as_bytes());
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(std::str::from_utf8(buf)?)
    }
}

pub struct Nonce;
impl<'a> Attribute<'a> for Nonce {
    type Item = &'a str;
    const TYPE: AttributeType = AttributeType::Nonce;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put(value.as_bytes());
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(std::str::from_utf8(buf)?)
    }
}

pub struct MessageIntegrity;
impl<'a> Attribute<'a> for MessageIntegrity {
    type Item = &'a [u8];
    const TYPE: AttributeType = AttributeType::MessageIntegrity;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put(value);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(buf)
    }
}

pub struct Fingerprint;
impl<'a> Attribute<'a> for Fingerprint {
    type Item = u32;
    const TYPE: AttributeType = AttributeType::Fingerprint;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u32(value);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(u32::from_be_bytes(buf.try_into()?))
    }
}

pub struct Lifetime;
impl<'a> Attribute<'a> for Lifetime {
    type Item = u32;
    const TYPE: AttributeType = AttributeType::Lifetime;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u32(value);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(u32::from_be_bytes(buf.try_into()?))
    }
}

/// `REQUESTED-TRANSPORT` (RFC 5766 §14.7): protocol number in the top byte,
/// three reserved zero bytes. Only UDP (17) is meaningful here.
pub struct RequestedTransport;
impl<'a> Attribute<'a> for RequestedTransport {
    type Item = u8;
    const TYPE: AttributeType = AttributeType::RequestedTransport;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u8(value);
        bytes.put(&[0u8; 3][..]);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        buf.first().copied().ok_or(Error::InvalidInput)
    }
}

pub const TRANSPORT_UDP: u8 = 17;

pub struct ChannelNumber;
impl<'a> Attribute<'a> for ChannelNumber {
    type Item = u16;
    const TYPE: AttributeType = AttributeType::ChannelNumber;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u16(value);
        bytes.put_u16(0);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(u16::from_be_bytes(buf.get(0..2).ok_or(Error::InvalidInput)?.try_into()?))
    }
}

pub struct Priority;
impl<'a> Attribute<'a> for Priority {
    type Item = u32;
    const TYPE: AttributeType = AttributeType::Priority;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u32(value);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(u32::from_be_bytes(buf.try_into()?))
    }
}

/// `USE-CANDIDATE` (RFC 5245 §7.1.2.1.2): a flag attribute with no value.
pub struct UseCandidate;
impl<'a> Attribute<'a> for UseCandidate {
    type Item = ();
    const TYPE: AttributeType = AttributeType::UseCandidate;

    fn serialize(_value: Self::Item, _bytes: &mut BytesMut, _token: &[u8]) {}

    fn deserialize(_buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(())
    }
}

pub struct IceControlling;
impl<'a> Attribute<'a> for IceControlling {
    type Item = u64;
    const TYPE: AttributeType = AttributeType::IceControlling;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u64(value);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(u64::from_be_bytes(buf.try_into()?))
    }
}

pub struct IceControlled;
impl<'a> Attribute<'a> for IceControlled {
    type Item = u64;
    const TYPE: AttributeType = AttributeType::IceControlled;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        bytes.put_u64(value);
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        Ok(u64::from_be_bytes(buf.try_into()?))
    }
}

/// `ERROR-CODE` (RFC 5389 §15.6): class (hundreds digit) in byte 2, number
/// (tens+units) in byte 3, followed by a UTF-8 reason phrase.
pub struct ErrorCode;
impl<'a> Attribute<'a> for ErrorCode {
    type Item = (u16, &'a str);
    const TYPE: AttributeType = AttributeType::ErrorCode;

    fn serialize(value: Self::Item, bytes: &mut BytesMut, _token: &[u8]) {
        let (code, reason) = value;
        bytes.put_u16(0);
        bytes.put_u8((code / 100) as u8);
        bytes.put_u8((code % 100) as u8);
        bytes.put(reason.as_bytes());
    }

    fn deserialize(buf: &'a [u8], _token: &[u8]) -> Result<Self::Item, Error> {
        if buf.len() < 4 {
            return Err(Error::InvalidInput);
        }

        let code = buf[2] as u16 * 100 + buf[3] as u16;
        let reason = std::str::from_utf8(&buf[4..])?;
        Ok((code, reason))
    }
}

/// Well-known STUN/TURN error codes used by the handler (RFC 5389 §15.6,
/// RFC 5766 §14.5/§14.9).
pub mod error_code {
    pub const UNAUTHORIZED: u16 = 401;
    pub const STALE_NONCE: u16 = 438;
}
