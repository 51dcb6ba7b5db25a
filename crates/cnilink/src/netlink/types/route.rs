//! Route message types.

use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::netlink::endian::ByteOrder;
use crate::netlink::error::{Error, Result};

/// Route message (struct rtmsg).
///
/// Serialization goes through zerocopy's layout-checked `as_bytes`.
/// Deserialization is explicit field-by-field decoding in [`parse`]
/// (RtMsg::parse); inbound kernel bytes are never reinterpreted in place.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    /// Address family (AF_INET or AF_INET6).
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// Type of service.
    pub rtm_tos: u8,
    /// Routing table id (rt_table::* for the well-known ones).
    pub rtm_table: u8,
    /// Routing protocol (who installed the route).
    pub rtm_protocol: u8,
    /// Route scope.
    pub rtm_scope: u8,
    /// Route type.
    pub rtm_type: u8,
    /// Route flags (RTM_F_*).
    pub rtm_flags: u32,
}

impl RtMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a route message with the conventional defaults for a normal
    /// unicast static route: table MAIN, protocol static, scope universe,
    /// type unicast.
    ///
    /// `RtMsg::default()` is the all-zero ABI struct; use it as the parse
    /// baseline, not as a route template.
    pub fn new() -> Self {
        Self {
            rtm_table: rt_table::MAIN,
            rtm_protocol: RouteProtocol::Static as u8,
            rtm_scope: RouteScope::Universe as u8,
            rtm_type: RouteType::Unicast as u8,
            ..Self::default()
        }
    }

    /// Set the address family.
    pub fn with_family(mut self, family: u8) -> Self {
        self.rtm_family = family;
        self
    }

    /// Set the destination prefix length.
    pub fn with_dst_len(mut self, dst_len: u8) -> Self {
        self.rtm_dst_len = dst_len;
        self
    }

    /// Set the routing table.
    pub fn with_table(mut self, table: u8) -> Self {
        self.rtm_table = table;
        self
    }

    /// Set the routing protocol.
    pub fn with_protocol(mut self, protocol: u8) -> Self {
        self.rtm_protocol = protocol;
        self
    }

    /// Set the route scope.
    pub fn with_scope(mut self, scope: u8) -> Self {
        self.rtm_scope = scope;
        self
    }

    /// Set the route type.
    pub fn with_type(mut self, rtype: u8) -> Self {
        self.rtm_type = rtype;
        self
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }

    /// Decode a route message from kernel bytes.
    ///
    /// Length is validated up front; every field is read explicitly at its
    /// ABI offset, with `rtm_flags` going through the resolved byte order.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let order = ByteOrder::host();
        Ok(Self {
            rtm_family: data[0],
            rtm_dst_len: data[1],
            rtm_src_len: data[2],
            rtm_tos: data[3],
            rtm_table: data[4],
            rtm_protocol: data[5],
            rtm_scope: data[6],
            rtm_type: data[7],
            rtm_flags: order.u32([data[8], data[9], data[10], data[11]]),
        })
    }
}

/// Route attributes (RTA_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RtaAttr {
    Unspec = 0,
    Dst = 1,
    Src = 2,
    Iif = 3,
    Oif = 4,
    Gateway = 5,
    Priority = 6,
    Prefsrc = 7,
    Metrics = 8,
    Multipath = 9,
    Flow = 11,
    Cacheinfo = 12,
    /// Full 32-bit table id, used when the table does not fit rtm_table.
    Table = 15,
    Mark = 16,
    Pref = 20,
    Expires = 23,
}

/// Route types (RTN_*).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum RouteType {
    Unspec = 0,
    #[default]
    Unicast = 1,
    Local = 2,
    Broadcast = 3,
    Anycast = 4,
    Multicast = 5,
    Blackhole = 6,
    Unreachable = 7,
    Prohibit = 8,
    Throw = 9,
    Nat = 10,
}

impl From<u8> for RouteType {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::Unicast,
            2 => Self::Local,
            3 => Self::Broadcast,
            4 => Self::Anycast,
            5 => Self::Multicast,
            6 => Self::Blackhole,
            7 => Self::Unreachable,
            8 => Self::Prohibit,
            9 => Self::Throw,
            10 => Self::Nat,
            _ => Self::Unspec,
        }
    }
}

/// Route origin protocols (RTPROT_*).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum RouteProtocol {
    Unspec = 0,
    Redirect = 1,
    Kernel = 2,
    Boot = 3,
    #[default]
    Static = 4,
    Dhcp = 16,
}

impl From<u8> for RouteProtocol {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::Redirect,
            2 => Self::Kernel,
            3 => Self::Boot,
            4 => Self::Static,
            16 => Self::Dhcp,
            _ => Self::Unspec,
        }
    }
}

/// Route scopes (RT_SCOPE_*).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum RouteScope {
    #[default]
    Universe = 0,
    Site = 200,
    Link = 253,
    Host = 254,
    Nowhere = 255,
}

impl From<u8> for RouteScope {
    fn from(val: u8) -> Self {
        match val {
            200 => Self::Site,
            253 => Self::Link,
            254 => Self::Host,
            255 => Self::Nowhere,
            _ => Self::Universe,
        }
    }
}

/// Well-known routing tables (RT_TABLE_*).
pub mod rt_table {
    pub const UNSPEC: u8 = 0;
    pub const COMPAT: u8 = 252;
    pub const DEFAULT: u8 = 253;
    pub const MAIN: u8 = 254;
    pub const LOCAL: u8 = 255;
}
