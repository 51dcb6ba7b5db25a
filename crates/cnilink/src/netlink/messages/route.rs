//! Strongly-typed route message.

use std::net::IpAddr;

use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::netlink::attr::{NLA_HDRLEN, get};
use crate::netlink::message::Message;
use crate::netlink::parse::{FromNetlink, PResult, parse_attr, parse_ip_addr};
use crate::netlink::types::route::{RouteProtocol, RouteScope, RouteType, RtMsg};
use crate::netlink::types::{AF_INET, AF_INET6};

/// Attribute IDs for RTA_* constants.
mod attr_ids {
    pub const RTA_DST: u16 = 1;
    pub const RTA_OIF: u16 = 4;
    pub const RTA_GATEWAY: u16 = 5;
    pub const RTA_PRIORITY: u16 = 6;
    pub const RTA_PREFSRC: u16 = 7;
    pub const RTA_TABLE: u16 = 15;
}

/// Strongly-typed route message parsed from an RTM_NEWROUTE reply.
#[derive(Debug, Clone, Default)]
pub struct RouteMessage {
    /// Fixed-size header.
    pub(crate) header: RtMsg,
    /// Destination address (RTA_DST).
    pub(crate) destination: Option<IpAddr>,
    /// Gateway address (RTA_GATEWAY).
    pub(crate) gateway: Option<IpAddr>,
    /// Preferred source address (RTA_PREFSRC).
    pub(crate) prefsrc: Option<IpAddr>,
    /// Output interface index (RTA_OIF).
    pub(crate) oif: Option<u32>,
    /// Priority/metric (RTA_PRIORITY).
    pub(crate) priority: Option<u32>,
    /// Full 32-bit table ID (RTA_TABLE).
    pub(crate) table: Option<u32>,
}

impl RouteMessage {
    /// Create a new empty route message.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessor methods
    // =========================================================================

    /// Get the address family.
    pub fn family(&self) -> u8 {
        self.header.rtm_family
    }

    /// Get the destination prefix length.
    pub fn dst_len(&self) -> u8 {
        self.header.rtm_dst_len
    }

    /// Get the route type.
    pub fn route_type(&self) -> RouteType {
        RouteType::from(self.header.rtm_type)
    }

    /// Get the route protocol (who installed it).
    pub fn protocol(&self) -> RouteProtocol {
        RouteProtocol::from(self.header.rtm_protocol)
    }

    /// Get the route scope.
    pub fn scope(&self) -> RouteScope {
        RouteScope::from(self.header.rtm_scope)
    }

    /// Get the routing table ID, preferring the full 32-bit attribute.
    pub fn table_id(&self) -> u32 {
        self.table.unwrap_or(self.header.rtm_table as u32)
    }

    /// Get the destination address.
    pub fn destination(&self) -> Option<&IpAddr> {
        self.destination.as_ref()
    }

    /// Get the gateway address.
    pub fn gateway(&self) -> Option<&IpAddr> {
        self.gateway.as_ref()
    }

    /// Get the preferred source address.
    pub fn prefsrc(&self) -> Option<&IpAddr> {
        self.prefsrc.as_ref()
    }

    /// Get the output interface index.
    pub fn oif(&self) -> Option<u32> {
        self.oif
    }

    /// Get the priority/metric.
    pub fn priority(&self) -> Option<u32> {
        self.priority
    }

    // =========================================================================
    // Boolean checks
    // =========================================================================

    /// Check if this is an IPv4 route.
    pub fn is_ipv4(&self) -> bool {
        self.header.rtm_family == AF_INET
    }

    /// Check if this is an IPv6 route.
    pub fn is_ipv6(&self) -> bool {
        self.header.rtm_family == AF_INET6
    }

    /// Check if this is a default route (0.0.0.0/0 or ::/0).
    pub fn is_default(&self) -> bool {
        self.header.rtm_dst_len == 0 && self.destination.is_none()
    }

    /// Check if this route has a gateway.
    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    /// Format the destination as a CIDR string (e.g. "10.0.0.0/8" or "default").
    pub fn destination_str(&self) -> String {
        if self.is_default() {
            "default".to_string()
        } else if let Some(dst) = &self.destination {
            format!("{}/{}", dst, self.dst_len())
        } else {
            format!("0.0.0.0/{}", self.dst_len())
        }
    }
}

impl FromNetlink for RouteMessage {
    fn write_dump_header(msg: &mut Message) {
        // The dump filter is the all-zero rtmsg. RtMsg::new's static-route
        // defaults describe created routes, not a query.
        msg.add_payload(RtMsg::default());
    }

    fn parse(input: &mut &[u8]) -> PResult<Self> {
        if input.len() < RtMsg::SIZE {
            return Err(ErrMode::Cut(ContextError::new()));
        }

        let header_bytes: &[u8] = take(RtMsg::SIZE).parse_next(input)?;
        let header = RtMsg::parse(header_bytes).map_err(|_| ErrMode::Cut(ContextError::new()))?;

        let mut msg = RouteMessage {
            header,
            ..Default::default()
        };

        while input.len() >= NLA_HDRLEN {
            let (attr_type, attr_data) = parse_attr(input)?;
            match attr_type {
                attr_ids::RTA_DST => {
                    msg.destination = parse_ip_addr(header.rtm_family, attr_data).ok();
                }
                attr_ids::RTA_GATEWAY => {
                    msg.gateway = parse_ip_addr(header.rtm_family, attr_data).ok();
                }
                attr_ids::RTA_PREFSRC => {
                    msg.prefsrc = parse_ip_addr(header.rtm_family, attr_data).ok();
                }
                attr_ids::RTA_OIF => {
                    msg.oif = get::u32_ne(attr_data).ok();
                }
                attr_ids::RTA_PRIORITY => {
                    msg.priority = get::u32_ne(attr_data).ok();
                }
                attr_ids::RTA_TABLE => {
                    msg.table = get::u32_ne(attr_data).ok();
                }
                _ => {} // Ignore unknown attributes
            }
        }

        Ok(msg)
    }
}
