//! Strongly-typed address message.

use std::net::IpAddr;

use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::netlink::attr::{NLA_HDRLEN, get};
use crate::netlink::message::Message;
use crate::netlink::parse::{FromNetlink, PResult, parse_attr, parse_ip_addr};
use crate::netlink::types::addr::IfAddrMsg;
use crate::netlink::types::{AF_INET, AF_INET6};

/// Attribute IDs for IFA_* constants.
mod attr_ids {
    pub const IFA_ADDRESS: u16 = 1;
    pub const IFA_LOCAL: u16 = 2;
    pub const IFA_LABEL: u16 = 3;
    pub const IFA_BROADCAST: u16 = 4;
    pub const IFA_FLAGS: u16 = 8;
}

/// Strongly-typed address message parsed from an RTM_NEWADDR reply.
#[derive(Debug, Clone, Default)]
pub struct AddressMessage {
    /// Fixed-size header.
    pub(crate) header: IfAddrMsg,
    /// Peer or interface address (IFA_ADDRESS).
    pub(crate) address: Option<IpAddr>,
    /// Address actually assigned to the interface (IFA_LOCAL).
    pub(crate) local: Option<IpAddr>,
    /// Interface label (IFA_LABEL), IPv4 only.
    pub(crate) label: Option<String>,
    /// Broadcast address (IFA_BROADCAST).
    pub(crate) broadcast: Option<IpAddr>,
    /// Extended 32-bit flags (IFA_FLAGS), superseding the header byte.
    pub(crate) flags: Option<u32>,
}

impl AddressMessage {
    /// Create a new empty address message.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Get the interface index.
    pub fn ifindex(&self) -> u32 {
        self.header.ifa_index
    }

    /// Get the prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.header.ifa_prefixlen
    }

    /// Get the address family.
    pub fn family(&self) -> u8 {
        self.header.ifa_family
    }

    /// Get the address scope.
    pub fn scope(&self) -> u8 {
        self.header.ifa_scope
    }

    /// Get the address assigned to the interface.
    ///
    /// IPv4 replies carry it in IFA_LOCAL (IFA_ADDRESS is the peer on
    /// point-to-point links); IPv6 replies carry it in IFA_ADDRESS.
    pub fn ip(&self) -> Option<IpAddr> {
        self.local.or(self.address)
    }

    /// Get the IFA_ADDRESS value.
    pub fn address(&self) -> Option<&IpAddr> {
        self.address.as_ref()
    }

    /// Get the IFA_LOCAL value.
    pub fn local(&self) -> Option<&IpAddr> {
        self.local.as_ref()
    }

    /// Get the broadcast address.
    pub fn broadcast(&self) -> Option<&IpAddr> {
        self.broadcast.as_ref()
    }

    /// Get the interface label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the address flags (IFA_F_*), preferring the extended attribute.
    pub fn flags(&self) -> u32 {
        self.flags.unwrap_or(self.header.ifa_flags as u32)
    }

    /// Check if this is an IPv4 address.
    pub fn is_ipv4(&self) -> bool {
        self.header.ifa_family == AF_INET
    }

    /// Check if this is an IPv6 address.
    pub fn is_ipv6(&self) -> bool {
        self.header.ifa_family == AF_INET6
    }
}

impl FromNetlink for AddressMessage {
    fn write_dump_header(msg: &mut Message) {
        // An all-zero ifaddrmsg dumps every family on every interface
        msg.add_payload(IfAddrMsg::new());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        if input.len() < IfAddrMsg::SIZE {
            return Err(ErrMode::Cut(ContextError::new()));
        }

        let header_bytes: &[u8] = take(IfAddrMsg::SIZE).parse_next(input)?;
        let header =
            *IfAddrMsg::from_bytes(header_bytes).map_err(|_| ErrMode::Cut(ContextError::new()))?;

        let mut msg = AddressMessage {
            header,
            ..Default::default()
        };

        while input.len() >= NLA_HDRLEN {
            let (attr_type, attr_data) = parse_attr(input)?;
            match attr_type {
                attr_ids::IFA_ADDRESS => {
                    msg.address = parse_ip_addr(header.ifa_family, attr_data).ok();
                }
                attr_ids::IFA_LOCAL => {
                    msg.local = parse_ip_addr(header.ifa_family, attr_data).ok();
                }
                attr_ids::IFA_LABEL => {
                    msg.label = get::string(attr_data).ok().map(String::from);
                }
                attr_ids::IFA_BROADCAST => {
                    msg.broadcast = parse_ip_addr(header.ifa_family, attr_data).ok();
                }
                attr_ids::IFA_FLAGS => {
                    msg.flags = get::u32_ne(attr_data).ok();
                }
                _ => {} // Ignore unknown attributes
            }
        }

        Ok(msg)
    }
}
