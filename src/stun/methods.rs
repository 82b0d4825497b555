//! STUN/TURN method registry (RFC 5389 §18.1, RFC 5766 §13).

use crate::stun::Error;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Kind {
    Request,
    Indication,
    Response,
    Error,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Method {
    Binding(Kind),
    Allocate(Kind),
    CreatePermission(Kind),
    ChannelBind(Kind),
    Refresh(Kind),
}

pub const BINDING_REQUEST: Method = Method::Binding(Kind::Request);
/// RFC 5389 §10: a keepalive carrying no response obligation.
pub const BINDING_INDICATION: Method = Method::Binding(Kind::Indication);
pub const BINDING_RESPONSE: Method = Method::Binding(Kind::Response);
pub const BINDING_ERROR: Method = Method::Binding(Kind::Error);
pub const ALLOCATE_REQUEST: Method = Method::Allocate(Kind::Request);
pub const ALLOCATE_RESPONSE: Method = Method::Allocate(Kind::Response);
pub const ALLOCATE_ERROR: Method = Method::Allocate(Kind::Error);
pub const CREATE_PERMISSION_REQUEST: Method = Method::CreatePermission(Kind::Request);
pub const CREATE_PERMISSION_RESPONSE: Method = Method::CreatePermission(Kind::Response);
pub const CREATE_PERMISSION_ERROR: Method = Method::CreatePermission(Kind::Error);
pub const CHANNEL_BIND_REQUEST: Method = Method::ChannelBind(Kind::Request);
pub const CHANNEL_BIND_RESPONSE: Method = Method::ChannelBind(Kind::Response);
pub const CHANNEL_BIND_ERROR: Method = Method::ChannelBind(Kind::Error);
pub const REFRESH_REQUEST: Method = Method::Refresh(Kind::Request);
pub const REFRESH_RESPONSE: Method = Method::Refresh(Kind::Response);
pub const REFRESH_ERROR: Method = Method::Refresh(Kind::Error);

impl Method {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Method::Binding(Kind::Error)
                | Method::Allocate(Kind::Error)
                | Method::CreatePermission(Kind::Error)
                | Method::ChannelBind(Kind::Error)
                | Method::Refresh(Kind::Error)
        )
    }
}

impl TryFrom<u16> for Method {
    type Error = Error;

    /// ```
    /// use ice_agent::stun::methods::*;
    ///
    /// assert_eq!(Method::try_from(0x0001).unwrap(), BINDING_REQUEST);
    /// assert_eq!(Method::try_from(0x0113).unwrap(), ALLOCATE_ERROR);
    /// assert_eq!(Method::try_from(0x0009).unwrap(), CHANNEL_BIND_REQUEST);
    /// ```
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0x0001 => BINDING_REQUEST,
            0x0011 => BINDING_INDICATION,
            0x0101 => BINDING_RESPONSE,
            0x0111 => BINDING_ERROR,
            0x0003 => ALLOCATE_REQUEST,
            0x0103 => ALLOCATE_RESPONSE,
            0x0113 => ALLOCATE_ERROR,
            0x0008 => CREATE_PERMISSION_REQUEST,
            0x0108 => CREATE_PERMISSION_RESPONSE,
            0x0118 => CREATE_PERMISSION_ERROR,
            0x0009 => CHANNEL_BIND_REQUEST,
            0x0109 => CHANNEL_BIND_RESPONSE,
            0x0119 => CHANNEL_BIND_ERROR,
            0x0004 => REFRESH_REQUEST,
            0x0104 => REFRESH_RESPONSE,
            0x0114 => REFRESH_ERROR,
            _ => return Err(Error::UnknownMethod),
        })
    }
}

impl From<Method> for u16 {
    fn from(value: Method) -> u16 {
        match value {
            Method::Binding(Kind::Request) => 0x0001,
            Method::Binding(Kind::Indication) => 0x0011,
            Method::Binding(Kind::Response) => 0x0101,
            Method::Binding(Kind::Error) => 0x0111,
            Method::Allocate(Kind::Request) => 0x0003,
            Method::Allocate(Kind::Response) => 0x0103,
            Method::Allocate(Kind::Error) => 0x0113,
            Method::CreatePermission(Kind::Request) => 0x0008,
            Method::CreatePermission(Kind::Response) => 0x0108,
            Method::CreatePermission(Kind::Error) => 0x0118,
            Method::ChannelBind(Kind::Request) => 0x0009,
            Method::ChannelBind(Kind::Response) => 0x0109,
            Method::ChannelBind(Kind::Error) => 0x0119,
            Method::Refresh(Kind::Request) => 0x0004,
            Method::Refresh(Kind::Response) => 0x0104,
            Method::Refresh(Kind::Error) => 0x0114,

            // TURN/Refresh have no indication form; only Binding does.
            Method::Allocate(Kind::Indication)
            | Method::CreatePermission(Kind::Indication)
            | Method::ChannelBind(Kind::Indication)
            | Method::Refresh(Kind::Indication) => unreachable!("method has no indication form"),
        }
    }
}
