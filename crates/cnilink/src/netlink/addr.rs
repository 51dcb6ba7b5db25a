//! IP address operations.
//!
//! Addresses are assigned with `IFA_LOCAL`/`IFA_ADDRESS`; IPv4 assignments
//! on shared networks also get a computed `IFA_BROADCAST`. Add tolerates
//! an already-present address and delete tolerates an absent one, so a
//! plugin setup or teardown can be re-run safely.

use std::net::{IpAddr, Ipv4Addr};

use super::attr::Attr;
use super::connection::Connection;
use super::error::{Error, Result};
use super::interface_ref::InterfaceRef;
use super::message::{Message, NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NlMsgType};
use super::types::{AF_INET, AF_INET6};
use super::types::addr::{IfAddrMsg, IfaAttr};

/// Collapse IPv4-mapped IPv6 addresses into their IPv4 form.
///
/// Family byte and attribute payload width must agree, and the mapped
/// form would claim AF_INET6 while encoding 4 bytes.
pub(crate) fn normalize_ip(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => addr,
        },
        v4 => v4,
    }
}

/// Reject prefix lengths beyond the family's address width.
pub(crate) fn validate_prefix(addr: IpAddr, prefix_len: u8) -> Result<()> {
    let max = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    if prefix_len > max {
        return Err(Error::InvalidInput(format!(
            "prefix length /{} out of range for {}",
            prefix_len, addr
        )));
    }
    Ok(())
}

/// Broadcast address for an IPv4 network.
fn v4_broadcast(addr: Ipv4Addr, prefix_len: u8) -> Ipv4Addr {
    let host_mask = if prefix_len == 0 {
        u32::MAX
    } else {
        u32::MAX >> prefix_len
    };
    Ipv4Addr::from(u32::from(addr) | host_mask)
}

/// Build the RTM_NEWADDR message for one assignment.
pub(crate) fn build_addr_add(ifindex: u32, addr: IpAddr, prefix_len: u8) -> Message {
    let family = match addr {
        IpAddr::V4(_) => AF_INET,
        IpAddr::V6(_) => AF_INET6,
    };

    let ifaddr = IfAddrMsg::new()
        .with_family(family)
        .with_prefixlen(prefix_len)
        .with_index(ifindex);

    let mut msg = Message::request(
        NlMsgType::NewAddr as u16,
        NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
    );
    msg.add_payload(ifaddr);

    // IFA_LOCAL is the assigned address; IFA_ADDRESS mirrors it on
    // non-point-to-point links
    msg.add_attr(Attr::ip(IfaAttr::Local as u16, addr));
    msg.add_attr(Attr::ip(IfaAttr::Address as u16, addr));

    // Broadcast only makes sense where the network has host bits beyond
    // a /31 pair
    if let IpAddr::V4(v4) = addr {
        if prefix_len <= 30 {
            msg.add_attr(Attr::ip(
                IfaAttr::Broadcast as u16,
                IpAddr::V4(v4_broadcast(v4, prefix_len)),
            ));
        }
    }

    msg
}

/// Build the RTM_DELADDR message for one assignment.
pub(crate) fn build_addr_del(ifindex: u32, addr: IpAddr, prefix_len: u8) -> Message {
    let family = match addr {
        IpAddr::V4(_) => AF_INET,
        IpAddr::V6(_) => AF_INET6,
    };

    let ifaddr = IfAddrMsg::new()
        .with_family(family)
        .with_prefixlen(prefix_len)
        .with_index(ifindex);

    let mut msg = Message::request(NlMsgType::DelAddr as u16, NLM_F_ACK);
    msg.add_payload(ifaddr);

    // IPv4 matches on IFA_LOCAL, IPv6 on IFA_ADDRESS; send both
    msg.add_attr(Attr::ip(IfaAttr::Local as u16, addr));
    msg.add_attr(Attr::ip(IfaAttr::Address as u16, addr));

    msg
}

impl Connection {
    /// Add an IP address to an interface.
    ///
    /// Names are resolved in this connection's namespace. Adding an
    /// address that is already present succeeds.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.add_ip_address("ceth0", "10.22.0.7".parse()?, 24).await?;
    /// conn.add_ip_address("ceth0", "fd00:22::7".parse()?, 64).await?;
    /// ```
    pub async fn add_ip_address(
        &self,
        iface: impl Into<InterfaceRef>,
        addr: IpAddr,
        prefix_len: u8,
    ) -> Result<()> {
        let addr = normalize_ip(addr);
        validate_prefix(addr, prefix_len)?;

        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let msg = build_addr_add(ifindex, addr, prefix_len);
        let operation = format!("adding address {}/{} to {}", addr, prefix_len, iface);

        match self.request_ack(msg, &operation).await {
            Err(ref e) if e.is_already_exists() => Ok(()),
            other => other,
        }
    }

    /// Delete an IP address from an interface.
    ///
    /// Idempotent: removing an address that is not assigned succeeds, as
    /// does removing from an interface that does not exist.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.del_ip_address("ceth0", "10.22.0.7".parse()?, 24).await?;
    /// ```
    pub async fn del_ip_address(
        &self,
        iface: impl Into<InterfaceRef>,
        addr: IpAddr,
        prefix_len: u8,
    ) -> Result<()> {
        let addr = normalize_ip(addr);
        validate_prefix(addr, prefix_len)?;

        let iface = iface.into();
        let ifindex = match self.resolve_interface(&iface).await {
            Ok(idx) => idx,
            Err(ref e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        let msg = build_addr_del(ifindex, addr, prefix_len);
        let operation = format!("deleting address {}/{} from {}", addr, prefix_len, iface);

        match self.request_ack(msg, &operation).await {
            Err(ref e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
