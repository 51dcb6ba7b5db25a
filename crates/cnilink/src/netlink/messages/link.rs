//! Strongly-typed link message.

use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::netlink::attr::{AttrIter, NLA_HDRLEN, get};
use crate::netlink::message::Message;
use crate::netlink::parse::{FromNetlink, PResult, parse_attr};
use crate::netlink::types::link::{IfInfoMsg, iff};

/// Attribute IDs for IFLA_* constants.
mod attr_ids {
    pub const IFLA_ADDRESS: u16 = 1;
    pub const IFLA_IFNAME: u16 = 3;
    pub const IFLA_MTU: u16 = 4;
    pub const IFLA_LINK: u16 = 5;
    pub const IFLA_MASTER: u16 = 10;
    pub const IFLA_LINKINFO: u16 = 18;
}

/// Nested IFLA_INFO_* attribute IDs.
mod info_ids {
    pub const IFLA_INFO_KIND: u16 = 1;
}

/// Strongly-typed link message parsed from an RTM_NEWLINK reply.
#[derive(Debug, Clone, Default)]
pub struct LinkMessage {
    /// Fixed-size header.
    pub(crate) header: IfInfoMsg,
    /// Interface name (IFLA_IFNAME).
    pub(crate) name: Option<String>,
    /// Hardware address (IFLA_ADDRESS).
    pub(crate) address: Option<Vec<u8>>,
    /// MTU (IFLA_MTU).
    pub(crate) mtu: Option<u32>,
    /// Underlying device index for stacked devices (IFLA_LINK); for a veth
    /// this is the peer's index in its namespace.
    pub(crate) link: Option<u32>,
    /// Master device index (IFLA_MASTER).
    pub(crate) master: Option<u32>,
    /// Link kind from IFLA_LINKINFO (e.g. "veth", "bridge").
    pub(crate) kind: Option<String>,
}

impl LinkMessage {
    /// Create a new empty link message.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Get the interface index.
    pub fn ifindex(&self) -> u32 {
        self.header.ifi_index as u32
    }

    /// Get the interface name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the interface name, or a default placeholder.
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(default)
    }

    /// Get the hardware address.
    pub fn address(&self) -> Option<&[u8]> {
        self.address.as_deref()
    }

    /// Get the MTU.
    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    /// Get the underlying device index (veth peer, vlan parent).
    pub fn link(&self) -> Option<u32> {
        self.link
    }

    /// Get the master device index (bridge enslavement).
    pub fn master(&self) -> Option<u32> {
        self.master
    }

    /// Get the link kind (e.g. "veth", "bridge").
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Get the raw interface flags (IFF_*).
    pub fn flags(&self) -> u32 {
        self.header.ifi_flags
    }

    /// Check if the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.header.ifi_flags & iff::UP != 0
    }

    /// Check if this is the loopback interface.
    pub fn is_loopback(&self) -> bool {
        self.header.ifi_flags & iff::LOOPBACK != 0
    }

    /// Check if the interface is in promiscuous mode.
    pub fn is_promiscuous(&self) -> bool {
        self.header.ifi_flags & iff::PROMISC != 0
    }
}

impl FromNetlink for LinkMessage {
    fn write_dump_header(msg: &mut Message) {
        // RTM_GETLINK dumps take an all-zero ifinfomsg
        msg.add_payload(IfInfoMsg::new());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        if input.len() < IfInfoMsg::SIZE {
            return Err(ErrMode::Cut(ContextError::new()));
        }

        let header_bytes: &[u8] = take(IfInfoMsg::SIZE).parse_next(input)?;
        let header =
            *IfInfoMsg::from_bytes(header_bytes).map_err(|_| ErrMode::Cut(ContextError::new()))?;

        let mut msg = LinkMessage {
            header,
            ..Default::default()
        };

        while input.len() >= NLA_HDRLEN {
            let (attr_type, attr_data) = parse_attr(input)?;
            match attr_type {
                attr_ids::IFLA_IFNAME => {
                    msg.name = get::string(attr_data).ok().map(String::from);
                }
                attr_ids::IFLA_ADDRESS => {
                    msg.address = Some(attr_data.to_vec());
                }
                attr_ids::IFLA_MTU => {
                    msg.mtu = get::u32_ne(attr_data).ok();
                }
                attr_ids::IFLA_LINK => {
                    msg.link = get::u32_ne(attr_data).ok();
                }
                attr_ids::IFLA_MASTER => {
                    msg.master = get::u32_ne(attr_data).ok();
                }
                attr_ids::IFLA_LINKINFO => {
                    for (kind, data) in AttrIter::new(attr_data) {
                        if kind == info_ids::IFLA_INFO_KIND {
                            msg.kind = get::string(data).ok().map(String::from);
                        }
                    }
                }
                _ => {} // Ignore unknown attributes
            }
        }

        Ok(msg)
    }
}
