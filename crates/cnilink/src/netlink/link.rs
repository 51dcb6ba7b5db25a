//! Link (network interface) operations.
//!
//! Creation goes through [`LinkConfig`] implementations ([`Veth`],
//! [`Bridge`]) whose `build()` produces the RTM_NEWLINK message. Everything
//! else is a method on [`Connection`], taking `impl Into<InterfaceRef>` so
//! names and pre-resolved indices both work.

use std::os::unix::io::RawFd;

use super::attr::Attr;
use super::connection::Connection;
use super::error::{Error, Result};
use super::interface_ref::InterfaceRef;
use super::message::{Message, NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NlMsgType};
use super::types::AF_BRIDGE;
use super::types::link::{IfInfoMsg, IflaAttr, IflaInfo, brport, iff, veth};

/// Reject names the kernel would refuse: empty, too long for IFNAMSIZ,
/// or containing a path separator or whitespace.
pub(crate) fn validate_ifname(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("interface name is empty".into()));
    }
    // IFNAMSIZ is 16 including the NUL terminator
    if name.len() >= 16 {
        return Err(Error::InvalidInput(format!(
            "interface name '{}' is too long ({} bytes, max 15)",
            name,
            name.len()
        )));
    }
    if name.contains('/') || name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!(
            "interface name '{}' contains invalid characters",
            name
        )));
    }
    Ok(())
}

/// Trait for link configurations that can be added to the system.
pub trait LinkConfig {
    /// Get the name of this interface.
    fn name(&self) -> &str;

    /// Get the kind string for this link type (e.g., "veth", "bridge").
    fn kind(&self) -> &str;

    /// Build the netlink message for creating this link.
    fn build(&self) -> Result<Message>;
}

/// Create the base RTM_NEWLINK message with ifinfomsg body and name.
fn create_link_message(name: &str) -> Message {
    let mut msg = Message::request(
        NlMsgType::NewLink as u16,
        NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
    );
    msg.add_payload(IfInfoMsg::new());
    msg.add_attr(Attr::string_z(IflaAttr::Ifname as u16, name));
    msg
}

// ============================================================================
// Veth Pair
// ============================================================================

/// Configuration for a veth (virtual ethernet) pair.
///
/// Veth devices are created in pairs; whatever enters one end comes out
/// the other. This is the standard way to connect a container namespace to
/// the host: create the pair, move one end into the container.
///
/// # Example
///
/// ```ignore
/// use cnilink::netlink::link::Veth;
///
/// // Host end stays, container end is born inside the target namespace
/// let veth = Veth::new("hveth0", "ceth0")
///     .mtu(1450)
///     .peer_netns_fd(netns_fd);
/// conn.add_link(veth).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Veth {
    name: String,
    peer_name: String,
    mtu: Option<u32>,
    address: Option<[u8; 6]>,
    peer_address: Option<[u8; 6]>,
    peer_netns_fd: Option<RawFd>,
    peer_netns_pid: Option<u32>,
}

impl Veth {
    /// Create a new veth pair configuration.
    ///
    /// # Arguments
    ///
    /// * `name` - Name for the first interface
    /// * `peer_name` - Name for the peer interface
    pub fn new(name: impl Into<String>, peer_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            peer_name: peer_name.into(),
            mtu: None,
            address: None,
            peer_address: None,
            peer_netns_fd: None,
            peer_netns_pid: None,
        }
    }

    /// Set the MTU for both interfaces.
    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Set the MAC address for the first interface.
    pub fn address(mut self, addr: [u8; 6]) -> Self {
        self.address = Some(addr);
        self
    }

    /// Set the MAC address for the peer interface.
    pub fn peer_address(mut self, addr: [u8; 6]) -> Self {
        self.peer_address = Some(addr);
        self
    }

    /// Create the peer directly in another network namespace, by fd.
    ///
    /// This avoids the create-then-move race: the peer name only has to be
    /// unique inside the target namespace.
    pub fn peer_netns_fd(mut self, fd: RawFd) -> Self {
        self.peer_netns_fd = Some(fd);
        self.peer_netns_pid = None;
        self
    }

    /// Create the peer directly in another network namespace, by PID.
    pub fn peer_netns_pid(mut self, pid: u32) -> Self {
        self.peer_netns_pid = Some(pid);
        self.peer_netns_fd = None;
        self
    }
}

impl LinkConfig for Veth {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "veth"
    }

    fn build(&self) -> Result<Message> {
        validate_ifname(&self.name)?;
        validate_ifname(&self.peer_name)?;

        let mut msg = create_link_message(&self.name);

        // Add optional attributes
        if let Some(mtu) = self.mtu {
            msg.add_attr(Attr::u32(IflaAttr::Mtu as u16, mtu));
        }
        if let Some(addr) = self.address {
            msg.add_attr(Attr::bytes(IflaAttr::Address as u16, addr));
        }

        // IFLA_INFO_DATA -> VETH_INFO_PEER -> nested ifinfomsg + attrs
        let mut peer = Attr::nested(veth::VETH_INFO_PEER)
            .add_nested(IfInfoMsg::new())
            .add_nested(Attr::string_z(IflaAttr::Ifname as u16, &self.peer_name));

        if let Some(mtu) = self.mtu {
            peer = peer.add_nested(Attr::u32(IflaAttr::Mtu as u16, mtu));
        }
        if let Some(addr) = self.peer_address {
            peer = peer.add_nested(Attr::bytes(IflaAttr::Address as u16, addr));
        }
        if let Some(fd) = self.peer_netns_fd {
            peer = peer.add_nested(Attr::u32(IflaAttr::NetNsFd as u16, fd as u32));
        } else if let Some(pid) = self.peer_netns_pid {
            peer = peer.add_nested(Attr::u32(IflaAttr::NetNsPid as u16, pid));
        }

        // IFLA_LINKINFO wraps kind + data
        msg.add_attr(
            Attr::nested(IflaAttr::Linkinfo as u16)
                .add_nested(Attr::string(IflaInfo::Kind as u16, "veth"))
                .add_nested(Attr::nested(IflaInfo::Data as u16).add_nested(peer)),
        );

        Ok(msg)
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Configuration for a bridge interface.
///
/// A bridge is a virtual switch that forwards packets between attached
/// interfaces. Container dataplanes typically run one bridge per node
/// with the host-side veth ends enslaved to it.
///
/// # Example
///
/// ```ignore
/// use cnilink::netlink::link::Bridge;
///
/// conn.add_link(Bridge::new("cni0").mtu(1500)).await?;
/// conn.set_link_master("hveth0", "cni0").await?;
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    name: String,
    mtu: Option<u32>,
    address: Option<[u8; 6]>,
}

impl Bridge {
    /// Create a new bridge configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mtu: None,
            address: None,
        }
    }

    /// Set the MTU for this bridge.
    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }

    /// Set the MAC address for this bridge.
    ///
    /// Without an explicit address the bridge inherits the lowest MAC of
    /// its ports, which changes as ports come and go.
    pub fn address(mut self, addr: [u8; 6]) -> Self {
        self.address = Some(addr);
        self
    }
}

impl LinkConfig for Bridge {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "bridge"
    }

    fn build(&self) -> Result<Message> {
        validate_ifname(&self.name)?;

        let mut msg = create_link_message(&self.name);

        if let Some(mtu) = self.mtu {
            msg.add_attr(Attr::u32(IflaAttr::Mtu as u16, mtu));
        }
        if let Some(addr) = self.address {
            msg.add_attr(Attr::bytes(IflaAttr::Address as u16, addr));
        }

        msg.add_attr(
            Attr::nested(IflaAttr::Linkinfo as u16)
                .add_nested(Attr::string(IflaInfo::Kind as u16, "bridge")),
        );

        Ok(msg)
    }
}

// ============================================================================
// Connection Methods
// ============================================================================

impl Connection {
    /// Add a new network interface.
    ///
    /// Creation is exclusive: if an interface with the same name already
    /// exists the kernel answers EEXIST and the error surfaces, since the
    /// existing device may be configured differently than requested.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use cnilink::netlink::link::{Bridge, Veth};
    ///
    /// conn.add_link(Bridge::new("cni0")).await?;
    /// conn.add_link(Veth::new("hveth0", "ceth0").peer_netns_fd(ns_fd)).await?;
    /// ```
    pub async fn add_link<L: LinkConfig>(&self, config: L) -> Result<()> {
        let msg = config.build()?;
        let operation = format!("creating {} {}", config.kind(), config.name());
        self.request_ack(msg, &operation).await
    }

    /// Delete a network interface.
    ///
    /// Idempotent: deleting an interface that does not exist succeeds.
    /// Deleting one end of a veth pair removes both ends.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.del_link("hveth0").await?;
    /// ```
    pub async fn del_link(&self, iface: impl Into<InterfaceRef>) -> Result<()> {
        let iface = iface.into();
        let ifindex = match self.resolve_interface(&iface).await {
            Ok(idx) => idx,
            Err(ref e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        let mut msg = Message::request(NlMsgType::DelLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));

        let result = self
            .request_ack(msg, &format!("deleting link {}", iface))
            .await;
        match result {
            // The link vanished between resolution and delete
            Err(ref e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    /// Rename a network interface.
    ///
    /// The interface must be down to be renamed.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.set_link_name("ceth0", "eth0").await?;
    /// ```
    pub async fn set_link_name(
        &self,
        iface: impl Into<InterfaceRef>,
        new_name: &str,
    ) -> Result<()> {
        validate_ifname(new_name)?;
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::string_z(IflaAttr::Ifname as u16, new_name));

        self.request_ack(msg, &format!("renaming {} to {}", iface, new_name))
            .await
    }

    /// Set the administrative state of an interface.
    ///
    /// Only the IFF_UP bit is touched; the change mask leaves every other
    /// flag alone.
    pub async fn set_link_state(&self, iface: impl Into<InterfaceRef>, up: bool) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let flags = if up { iff::UP } else { 0 };
        let ifinfo = IfInfoMsg::new()
            .with_index(ifindex as i32)
            .with_flags(flags)
            .with_change(iff::UP);

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(ifinfo);

        let operation = if up {
            format!("setting link up on {}", iface)
        } else {
            format!("setting link down on {}", iface)
        };
        self.request_ack(msg, &operation).await
    }

    /// Bring an interface up.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.set_link_up("ceth0").await?;
    /// ```
    pub async fn set_link_up(&self, iface: impl Into<InterfaceRef>) -> Result<()> {
        self.set_link_state(iface, true).await
    }

    /// Bring an interface down.
    pub async fn set_link_down(&self, iface: impl Into<InterfaceRef>) -> Result<()> {
        self.set_link_state(iface, false).await
    }

    /// Set the MTU of an interface.
    pub async fn set_link_mtu(&self, iface: impl Into<InterfaceRef>, mtu: u32) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::u32(IflaAttr::Mtu as u16, mtu));

        self.request_ack(msg, &format!("setting mtu on {}", iface))
            .await
    }

    /// Set the master (controller) device for an interface.
    ///
    /// This is how a veth end is attached to a bridge.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.set_link_master("hveth0", "cni0").await?;
    /// ```
    pub async fn set_link_master(
        &self,
        iface: impl Into<InterfaceRef>,
        master: impl Into<InterfaceRef>,
    ) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;
        let master_index = self.resolve_interface(&master.into()).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::u32(IflaAttr::Master as u16, master_index));

        self.request_ack(msg, &format!("setting master for {}", iface))
            .await
    }

    /// Remove an interface from its master device.
    ///
    /// A master index of zero detaches the port.
    pub async fn set_link_nomaster(&self, iface: impl Into<InterfaceRef>) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::u32(IflaAttr::Master as u16, 0));

        self.request_ack(msg, &format!("detaching {} from master", iface))
            .await
    }

    /// Move a network interface to a namespace by file descriptor.
    ///
    /// After the move the interface is gone from this connection's
    /// namespace; further configuration needs a connection bound to the
    /// target namespace.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let ns = std::fs::File::open("/var/run/netns/pod-a1")?;
    /// conn.set_link_netns_fd("ceth0", ns.as_raw_fd()).await?;
    /// ```
    pub async fn set_link_netns_fd(&self, iface: impl Into<InterfaceRef>, fd: RawFd) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::u32(IflaAttr::NetNsFd as u16, fd as u32));

        self.request_ack(msg, &format!("moving {} to namespace", iface))
            .await
    }

    /// Move a network interface to the namespace of a process.
    pub async fn set_link_netns_pid(&self, iface: impl Into<InterfaceRef>, pid: u32) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::u32(IflaAttr::NetNsPid as u16, pid));

        self.request_ack(msg, &format!("moving {} to namespace", iface))
            .await
    }

    /// Set the MAC address of a network interface.
    ///
    /// # Example
    ///
    /// ```ignore
    /// conn.set_link_address("ceth0", [0x0a, 0x58, 0x0a, 0x01, 0x00, 0x02]).await?;
    /// ```
    pub async fn set_link_address(
        &self,
        iface: impl Into<InterfaceRef>,
        address: [u8; 6],
    ) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(IfInfoMsg::new().with_index(ifindex as i32));
        msg.add_attr(Attr::bytes(IflaAttr::Address as u16, address));

        self.request_ack(msg, &format!("setting address on {}", iface))
            .await
    }

    /// Enable or disable promiscuous mode on an interface.
    pub async fn set_link_promisc(
        &self,
        iface: impl Into<InterfaceRef>,
        enabled: bool,
    ) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        let flags = if enabled { iff::PROMISC } else { 0 };
        let ifinfo = IfInfoMsg::new()
            .with_index(ifindex as i32)
            .with_flags(flags)
            .with_change(iff::PROMISC);

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(ifinfo);

        self.request_ack(msg, &format!("setting promiscuous mode on {}", iface))
            .await
    }

    /// Enable or disable hairpin (reflective relay) mode on a bridge port.
    ///
    /// With hairpin on, the bridge may forward a frame back out the port
    /// it arrived on. Service-hairpin traffic in container networks needs
    /// this on the veth port. The interface must already be attached to a
    /// bridge, otherwise the kernel answers EINVAL.
    pub async fn set_link_hairpin(
        &self,
        iface: impl Into<InterfaceRef>,
        enabled: bool,
    ) -> Result<()> {
        let iface = iface.into();
        let ifindex = self.resolve_interface(&iface).await?;

        // Bridge port options travel under AF_BRIDGE in IFLA_PROTINFO
        let ifinfo = IfInfoMsg::new()
            .with_family(AF_BRIDGE)
            .with_index(ifindex as i32);

        let mut msg = Message::request(NlMsgType::SetLink as u16, NLM_F_ACK);
        msg.add_payload(ifinfo);
        msg.add_attr(
            Attr::nested(IflaAttr::Protinfo as u16)
                .add_nested(Attr::u8(brport::IFLA_BRPORT_MODE, enabled as u8)),
        );

        self.request_ack(msg, &format!("setting hairpin mode on {}", iface))
            .await
    }
}
