//! TURN ChannelData framing (RFC 5766 §11). Grounded on
//! `crates/codec/src/channel_data.rs`.

use bytes::{BufMut, BytesMut};

use crate::stun::Error;

/// Lowest valid TURN channel number (RFC 5766 §11).
pub const CHANNEL_NUMBER_MIN: u16 = 0x4000;
/// Highest valid TURN channel number (RFC 5766 §11, also spec.md's
/// `ICE_DEFAULT_TURN_CHANNEL_NUMBER_MAX`).
pub const CHANNEL_NUMBER_MAX: u16 = 0x7FFF;

/// `{u16 channelNumber, u16 length}` header followed by the application
/// payload (no padding on UDP; rounded up to 4 bytes on TCP).
pub struct ChannelData<'a> {
    pub number: u16,
    pub bytes: &'a [u8],
}

impl<'a> ChannelData<'a> {
    pub fn message_size(bytes: &[u8], is_tcp: bool) -> Result<usize, Error> {
        if bytes.len() < 4 {
            return Err(Error::InvalidInput);
        }

        if !(1..3).contains(&(bytes[0] >> 6)) {
            return Err(Error::InvalidInput);
        }

        let mut size = (u16::from_be_bytes(bytes[2..4].try_into()?) as usize) + 4;
        if is_tcp && (size % 4) > 0 {
            size += 4 - (size % 4);
        }

        Ok(size)
    }

    pub fn encode(self, bytes: &mut BytesMut) {
        bytes.clear();
        bytes.put_u16(self.number);
        bytes.put_u16(self.bytes.len() as u16);
        bytes.extend_from_slice(self.bytes);
    }

    pub fn decode(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < 4 {
            return Err(Error::InvalidInput);
        }

        let number = u16::from_be_bytes(bytes[..2].try_into()?);
        if !(CHANNEL_NUMBER_MIN..0xFFFF).contains(&number) {
            return Err(Error::InvalidInput);
        }

        let size = u16::from_be_bytes(bytes[2..4].try_into()?) as usize;
        if size > bytes.len() - 4 {
            return Err(Error::InvalidInput);
        }

        Ok(Self {
            number,
            bytes: &bytes[4..4 + size],
        })
    }
}

/// `ConstructTurnChannelMessage` (spec.md §9 open question): wrap an
/// application payload in its ChannelData header for transmission over a
/// channel-bound TURN pair.
pub fn wrap_channel_data(channel_number: u16, payload: &[u8], out: &mut BytesMut) {
    ChannelData {
        number: channel_number,
        bytes: payload,
    }
    .encode(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let data = [0xAAu8; 4];
        let mut bytes = BytesMut::with_capacity(16);
        wrap_channel_data(0x4000, &data, &mut bytes);

        let decoded = ChannelData::decode(&bytes).unwrap();
        assert_eq!(decoded.number, 0x4000);
        assert_eq!(decoded.bytes, &data[..]);
    }

    #[test]
    fn rejects_channel_number_below_min() {
        let mut bytes = BytesMut::with_capacity(16);
        bytes.put_u16(0x3FFF);
        bytes.put_u16(0);
        assert!(ChannelData::decode(&bytes).is_err());
    }
}
