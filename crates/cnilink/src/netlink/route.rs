//! Route operations.
//!
//! Routes are described with [`IpRoute`] and installed or removed through
//! the [`Connection`] methods. The builder covers the container-dataplane
//! set: prefix routes, default routes via a gateway, device routes, and
//! alternate tables.

use std::fmt;
use std::net::IpAddr;

use super::addr::{normalize_ip, validate_prefix};
use super::attr::Attr;
use super::connection::Connection;
use super::error::{Error, Result};
use super::interface_ref::InterfaceRef;
use super::message::{Message, NLM_F_ACK, NLM_F_CREATE, NLM_F_EXCL, NlMsgType};
use super::types::{AF_INET, AF_INET6};
use super::types::route::{RouteProtocol, RouteScope, RouteType, RtMsg, RtaAttr, rt_table};

/// A route to install or remove.
///
/// Constructed with [`IpRoute::new`] for a prefix or
/// [`IpRoute::default_route`] for 0.0.0.0/0 (or ::/0), then refined with
/// the builder methods.
///
/// # Example
///
/// ```ignore
/// use cnilink::netlink::route::IpRoute;
///
/// // Pod-to-pod subnet via the node gateway
/// let route = IpRoute::new("10.1.0.0".parse()?, 16)
///     .gateway("10.22.0.1".parse()?);
/// conn.add_route(route).await?;
///
/// // Default route out of the container
/// conn.add_route(IpRoute::default_route("10.22.0.1".parse()?)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct IpRoute {
    destination: Option<(IpAddr, u8)>,
    gateway: Option<IpAddr>,
    prefsrc: Option<IpAddr>,
    device: Option<InterfaceRef>,
    priority: Option<u32>,
    table: u32,
    protocol: RouteProtocol,
    scope: Option<RouteScope>,
    kind: RouteType,
}

impl IpRoute {
    /// Route to a destination prefix.
    pub fn new(destination: IpAddr, prefix_len: u8) -> Self {
        Self {
            destination: Some((normalize_ip(destination), prefix_len)),
            gateway: None,
            prefsrc: None,
            device: None,
            priority: None,
            table: rt_table::MAIN as u32,
            protocol: RouteProtocol::Static,
            scope: None,
            kind: RouteType::Unicast,
        }
    }

    /// Default route (zero-length destination) via a gateway.
    pub fn default_route(gateway: IpAddr) -> Self {
        Self {
            destination: None,
            gateway: Some(normalize_ip(gateway)),
            prefsrc: None,
            device: None,
            priority: None,
            table: rt_table::MAIN as u32,
            protocol: RouteProtocol::Static,
            scope: None,
            kind: RouteType::Unicast,
        }
    }

    /// Route packets via this next-hop gateway.
    pub fn gateway(mut self, gateway: IpAddr) -> Self {
        self.gateway = Some(normalize_ip(gateway));
        self
    }

    /// Preferred source address for traffic using this route.
    pub fn prefsrc(mut self, source: IpAddr) -> Self {
        self.prefsrc = Some(normalize_ip(source));
        self
    }

    /// Output device for this route.
    pub fn dev(mut self, iface: impl Into<InterfaceRef>) -> Self {
        self.device = Some(iface.into());
        self
    }

    /// Route priority (metric). Lower wins.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Alias for [`priority`](Self::priority), matching `ip route` wording.
    pub fn metric(self, metric: u32) -> Self {
        self.priority(metric)
    }

    /// Install into a specific routing table instead of main.
    pub fn table(mut self, table: u32) -> Self {
        self.table = table;
        self
    }

    /// Set the route scope explicitly, overriding the inferred one.
    pub fn scope(mut self, scope: RouteScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Set the routing protocol (origin marker).
    pub fn protocol(mut self, protocol: RouteProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the route type.
    pub fn route_type(mut self, kind: RouteType) -> Self {
        self.kind = kind;
        self
    }

    /// The device reference, for resolution by the connection.
    pub(crate) fn device_ref(&self) -> Option<&InterfaceRef> {
        self.device.as_ref()
    }

    /// Address family, taken from the destination or the gateway.
    fn family(&self) -> Result<u8> {
        let probe = self
            .destination
            .map(|(addr, _)| addr)
            .or(self.gateway)
            .ok_or_else(|| {
                Error::InvalidInput("route needs a destination or a gateway".into())
            })?;
        Ok(match probe {
            IpAddr::V4(_) => AF_INET,
            IpAddr::V6(_) => AF_INET6,
        })
    }

    /// Check family agreement and prefix bounds before anything is sent.
    pub(crate) fn validate(&self) -> Result<()> {
        let family = self.family()?;

        if let Some((dst, prefix)) = self.destination {
            validate_prefix(dst, prefix)?;
        }

        for addr in [
            self.destination.map(|(addr, _)| addr),
            self.gateway,
            self.prefsrc,
        ]
        .into_iter()
        .flatten()
        {
            let addr_family = match addr {
                IpAddr::V4(_) => AF_INET,
                IpAddr::V6(_) => AF_INET6,
            };
            if addr_family != family {
                return Err(Error::InvalidInput(format!(
                    "route mixes address families: {} in a {} route",
                    addr,
                    if family == AF_INET { "IPv4" } else { "IPv6" }
                )));
            }
        }

        Ok(())
    }

    /// Scope the kernel should see. An explicit scope wins; otherwise
    /// gatewayed unicast is universe and direct unicast is link.
    fn effective_scope(&self) -> RouteScope {
        if let Some(scope) = self.scope {
            return scope;
        }
        match self.kind {
            RouteType::Local | RouteType::Nat => RouteScope::Host,
            RouteType::Broadcast | RouteType::Multicast | RouteType::Anycast => RouteScope::Link,
            _ => {
                if self.gateway.is_some() {
                    RouteScope::Universe
                } else {
                    RouteScope::Link
                }
            }
        }
    }

    /// Table byte for the fixed body; wide IDs overflow into RTA_TABLE.
    fn table_byte(&self) -> u8 {
        if self.table > 255 {
            rt_table::UNSPEC
        } else {
            self.table as u8
        }
    }

    /// Build the RTM_NEWROUTE message.
    pub(crate) fn build(&self, oif: Option<u32>) -> Result<Message> {
        let family = self.family()?;
        let dst_len = self.destination.map(|(_, prefix)| prefix).unwrap_or(0);

        let rtmsg = RtMsg::new()
            .with_family(family)
            .with_dst_len(dst_len)
            .with_table(self.table_byte())
            .with_protocol(self.protocol as u8)
            .with_scope(self.effective_scope() as u8)
            .with_type(self.kind as u8);

        let mut msg = Message::request(
            NlMsgType::NewRoute as u16,
            NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
        );
        msg.add_payload(rtmsg);

        if let Some((dst, prefix)) = self.destination {
            // A zero-length prefix is the default route; the body's
            // dst_len already says so
            if prefix > 0 {
                msg.add_attr(Attr::ip(RtaAttr::Dst as u16, dst));
            }
        }
        if let Some(gateway) = self.gateway {
            msg.add_attr(Attr::ip(RtaAttr::Gateway as u16, gateway));
        }
        if let Some(source) = self.prefsrc {
            msg.add_attr(Attr::ip(RtaAttr::Prefsrc as u16, source));
        }
        if let Some(oif) = oif {
            msg.add_attr(Attr::u32(RtaAttr::Oif as u16, oif));
        }
        if self.table > 255 {
            msg.add_attr(Attr::u32(RtaAttr::Table as u16, self.table));
        }
        if let Some(priority) = self.priority {
            msg.add_attr(Attr::u32(RtaAttr::Priority as u16, priority));
        }

        Ok(msg)
    }

    /// Build the RTM_DELROUTE message.
    ///
    /// The body's scope is NOWHERE, the kernel's wildcard for deletion;
    /// protocol and type stay zero so any matching route is removed.
    pub(crate) fn build_delete(&self, oif: Option<u32>) -> Result<Message> {
        let family = self.family()?;
        let dst_len = self.destination.map(|(_, prefix)| prefix).unwrap_or(0);

        let rtmsg = RtMsg::default()
            .with_family(family)
            .with_dst_len(dst_len)
            .with_table(self.table_byte())
            .with_scope(RouteScope::Nowhere as u8);

        let mut msg = Message::request(NlMsgType::DelRoute as u16, NLM_F_ACK);
        msg.add_payload(rtmsg);

        if let Some((dst, prefix)) = self.destination {
            if prefix > 0 {
                msg.add_attr(Attr::ip(RtaAttr::Dst as u16, dst));
            }
        }
        if let Some(gateway) = self.gateway {
            msg.add_attr(Attr::ip(RtaAttr::Gateway as u16, gateway));
        }
        if let Some(oif) = oif {
            msg.add_attr(Attr::u32(RtaAttr::Oif as u16, oif));
        }
        if self.table > 255 {
            msg.add_attr(Attr::u32(RtaAttr::Table as u16, self.table));
        }
        if let Some(priority) = self.priority {
            msg.add_attr(Attr::u32(RtaAttr::Priority as u16, priority));
        }

        Ok(msg)
    }
}

impl fmt::Display for IpRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.destination {
            Some((dst, prefix)) => write!(f, "{}/{}", dst, prefix)?,
            None => write!(f, "default")?,
        }
        if let Some(gateway) = self.gateway {
            write!(f, " via {}", gateway)?;
        }
        if let Some(ref device) = self.device {
            write!(f, " dev {}", device)?;
        }
        if self.table != rt_table::MAIN as u32 {
            write!(f, " table {}", self.table)?;
        }
        Ok(())
    }
}

impl Connection {
    /// Install a route.
    ///
    /// A route identical to an existing one succeeds; a conflicting route
    /// to the same destination surfaces EEXIST.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use cnilink::netlink::route::IpRoute;
    ///
    /// conn.add_route(
    ///     IpRoute::new("10.1.0.0".parse()?, 16)
    ///         .gateway("10.22.0.1".parse()?)
    ///         .dev("ceth0"),
    /// ).await?;
    /// ```
    pub async fn add_route(&self, route: IpRoute) -> Result<()> {
        route.validate()?;

        let oif = match route.device_ref() {
            Some(iface) => Some(self.resolve_interface(iface).await?),
            None => None,
        };

        let msg = route.build(oif)?;
        let operation = format!("adding route {}", route);

        match self.request_ack(msg, &operation).await {
            Err(ref e) if e.is_already_exists() => Ok(()),
            other => other,
        }
    }

    /// Remove a route.
    ///
    /// Idempotent: removing a route that is not installed succeeds (the
    /// kernel answers ESRCH for an unknown route).
    pub async fn del_route(&self, route: IpRoute) -> Result<()> {
        route.validate()?;

        let oif = match route.device_ref() {
            Some(iface) => match self.resolve_interface(iface).await {
                Ok(idx) => Some(idx),
                Err(ref e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            },
            None => None,
        };

        let msg = route.build_delete(oif)?;
        let operation = format!("deleting route {}", route);

        match self.request_ack(msg, &operation).await {
            Err(ref e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
