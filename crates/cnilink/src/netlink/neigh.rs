//! Neighbor (ARP/NDP) operations.
//!
//! Container dataplanes pin gateway and peer MACs with permanent entries
//! so traffic flows before any ARP exchange. Adds use NLM_F_REPLACE, so
//! re-pinning an address to a new MAC is a plain add.

use std::net::IpAddr;

use super::addr::normalize_ip;
use super::attr::Attr;
use super::connection::Connection;
use super::error::Result;
use super::interface_ref::InterfaceRef;
use super::message::{Message, NLM_F_ACK, NLM_F_CREATE, NLM_F_REPLACE, NlMsgType};
use super::parse::format_mac_addr;
use super::types::{AF_INET, AF_INET6};
use super::types::neigh::{NdMsg, NdaAttr, nud};

fn family_of(addr: IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => AF_INET,
        IpAddr::V6(_) => AF_INET6,
    }
}

/// Build the RTM_NEWNEIGH message for a permanent entry.
pub(crate) fn build_neigh_add(ifindex: u32, addr: IpAddr, lladdr: [u8; 6]) -> Message {
    let ndmsg = NdMsg::new()
        .with_family(family_of(addr))
        .with_ifindex(ifindex as i32)
        .with_state(nud::PERMANENT);

    let mut msg = Message::request(
        NlMsgType::NewNeigh as u16,
        NLM_F_ACK | NLM_F_CREATE | NLM_F_REPLACE,
    );
    msg.add_payload(ndmsg);
    msg.add_attr(Attr::ip(NdaAttr::Dst as u16, addr));
    msg.add_attr(Attr::bytes(NdaAttr::Lladdr as u16, lladdr));
    msg
}

/// Build the RTM_DELNEIGH message for an entry.
pub(crate) fn build_neigh_del(ifindex: u32, addr: IpAddr) -> Message {
    let ndmsg = NdMsg::new()
        .with_family(family_of(addr))
        .with_ifindex(ifindex as i32);

    let mut msg = Message::request(NlMsgType::DelNeigh as u16, NLM_F_ACK);
    msg.add_payload(ndmsg);
    msg.add_attr(Attr::ip(NdaAttr::Dst as u16, addr));
    msg
}

impl Connection {
    /// Add a permanent neighbor entry (static ARP for IPv4, static NDP
    /// for IPv6).
    ///
    /// An existing entry for the address is replaced, so repeating the
    /// call, or moving the address to a new MAC, both succeed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.add_static_arp("ceth0", "10.22.0.1".parse()?, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x01])
    ///     .await?;
    /// ```
    pub async fn add_static_arp(
        &self,
        iface: impl Into<InterfaceRef>,
        addr: IpAddr,
        lladdr: [u8; 6],
    ) -> Result<()> {
        let addr = normalize_ip(addr);
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let msg = build_neigh_add(ifindex, addr, lladdr);
        let operation = format!(
            "adding neighbor {} -> {} on {}",
            addr,
            format_mac_addr(&lladdr),
            iface
        );
        self.request_ack(msg, &operation).await
    }

    /// Delete a neighbor entry.
    ///
    /// Idempotent: deleting an entry that does not exist succeeds.
    pub async fn del_static_arp(
        &self,
        iface: impl Into<InterfaceRef>,
        addr: IpAddr,
    ) -> Result<()> {
        let addr = normalize_ip(addr);
        let iface = iface.into();
        let ifindex = match self.resolve_interface(&iface).await {
            Ok(idx) => idx,
            Err(ref e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        let msg = build_neigh_del(ifindex, addr);
        let operation = format!("deleting neighbor {} on {}", addr, iface);

        match self.request_ack(msg, &operation).await {
            Err(ref e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
