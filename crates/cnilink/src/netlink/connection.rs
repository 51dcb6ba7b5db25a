//! High-level netlink connection with request/response handling.

use std::os::unix::io::RawFd;
use std::path::Path;
use std::time::Duration;

use super::error::{Error, Result};
use super::interface_ref::InterfaceRef;
use super::message::{
    Message, MessageIter, NLM_F_DUMP, NLMSG_HDRLEN, NlMsgError, NlMsgHdr, NlMsgType,
};
use super::messages::{AddressMessage, LinkMessage, RouteMessage};
use super::parse::FromNetlink;
use super::socket::{NetlinkSocket, Protocol};

/// High-level netlink connection.
///
/// Owns one socket and drives blocking request/response exchanges over it:
/// each request gets a fresh sequence number, and responses are matched
/// against it. Operations are the methods on this type (spread across the
/// `link`, `addr`, `route` and `neigh` modules).
///
/// A connection is bound to one network namespace for its lifetime. For
/// container setups, create one connection per namespace being configured.
pub struct Connection {
    socket: NetlinkSocket,
    timeout: Option<Duration>,
}

impl Connection {
    /// Create a new connection for the given protocol.
    pub fn new(protocol: Protocol) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new(protocol)?,
            timeout: None,
        })
    }

    /// Create a connection that operates in a specific network namespace.
    ///
    /// The namespace is specified by an open file descriptor to a namespace
    /// file (e.g., `/proc/<pid>/ns/net` or `/var/run/netns/<name>`).
    ///
    /// # Example
    ///
    /// ```ignore
    /// use std::fs::File;
    /// use std::os::unix::io::AsRawFd;
    /// use cnilink::netlink::{Connection, Protocol};
    ///
    /// let ns_file = File::open("/var/run/netns/pod-a1")?;
    /// let conn = Connection::new_in_namespace(Protocol::Route, ns_file.as_raw_fd())?;
    ///
    /// // All operations now occur inside pod-a1
    /// let links = conn.get_links().await?;
    /// ```
    pub fn new_in_namespace(protocol: Protocol, ns_fd: RawFd) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new_in_namespace(protocol, ns_fd)?,
            timeout: None,
        })
    }

    /// Create a connection that operates in a network namespace specified by path.
    ///
    /// This is a convenience method that opens the namespace file and calls
    /// [`new_in_namespace`](Self::new_in_namespace).
    ///
    /// # Example
    ///
    /// ```ignore
    /// use cnilink::netlink::{Connection, Protocol};
    ///
    /// // For a named namespace (created via `ip netns add`)
    /// let conn = Connection::new_in_namespace_path(
    ///     Protocol::Route,
    ///     "/var/run/netns/pod-a1"
    /// )?;
    ///
    /// // For a container's namespace by PID
    /// let conn = Connection::new_in_namespace_path(
    ///     Protocol::Route,
    ///     "/proc/4242/ns/net"
    /// )?;
    /// ```
    pub fn new_in_namespace_path<P: AsRef<Path>>(protocol: Protocol, ns_path: P) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new_in_namespace_path(protocol, ns_path)?,
            timeout: None,
        })
    }

    /// Set a deadline for every request on this connection.
    ///
    /// When the kernel does not answer within the limit, the pending
    /// operation fails with [`Error::Timeout`] naming the operation.
    /// Without a deadline, requests wait indefinitely.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use std::time::Duration;
    ///
    /// let conn = Connection::new(Protocol::Route)?
    ///     .with_timeout(Duration::from_secs(5));
    /// ```
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the underlying socket.
    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }

    /// Receive one datagram, honoring the connection deadline.
    async fn recv_with_timeout(&self, operation: &str) -> Result<Vec<u8>> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.socket.recv_msg())
                .await
                .map_err(|_| Error::Timeout {
                    operation: operation.to_string(),
                })?,
            None => self.socket.recv_msg().await,
        }
    }

    /// Send a request that expects an ACK only (no data response).
    ///
    /// Kernel errors come back wrapped with the operation name.
    pub async fn request_ack(&self, mut msg: Message, operation: &str) -> Result<()> {
        let seq = self.socket.next_seq();
        msg.set_seq(seq);
        msg.set_pid(self.socket.pid());

        tracing::debug!(operation, seq, "sending netlink request");
        self.socket.send(&msg.to_bytes()).await?;

        let response = self.recv_with_timeout(operation).await?;
        self.process_ack(&response, seq)
            .map_err(|e| e.with_context(operation))
    }

    /// Send a dump request and collect all response messages.
    ///
    /// Dumps are multi-part: the kernel streams messages flagged
    /// NLM_F_MULTI and finishes with NLMSG_DONE. Each returned entry is a
    /// full message (header plus payload).
    pub async fn dump(&self, mut msg: Message, operation: &str) -> Result<Vec<Vec<u8>>> {
        let seq = self.socket.next_seq();
        msg.set_seq(seq);
        msg.set_pid(self.socket.pid());

        tracing::debug!(operation, seq, "sending netlink dump");
        self.socket.send(&msg.to_bytes()).await?;

        let mut responses = Vec::new();

        loop {
            let data = self.recv_with_timeout(operation).await?;
            let mut done = false;

            for (header, payload) in MessageIter::new(&data) {
                // Not ours; stale reply from an interrupted exchange
                if header.nlmsg_seq != seq {
                    continue;
                }

                if header.is_error() {
                    let err = NlMsgError::from_bytes(payload)?;
                    if !err.is_ack() {
                        return Err(Error::from_errno(err.error).with_context(operation));
                    }
                }

                if header.is_done() {
                    done = true;
                    break;
                }

                // Collect the full message (header + payload)
                let msg_len = header.nlmsg_len as usize;
                let msg_start = payload.as_ptr() as usize
                    - data.as_ptr() as usize
                    - std::mem::size_of::<NlMsgHdr>();
                if msg_start + msg_len <= data.len() {
                    responses.push(data[msg_start..msg_start + msg_len].to_vec());
                }
            }

            if done {
                break;
            }
        }

        Ok(responses)
    }

    /// Process an ACK response.
    fn process_ack(&self, data: &[u8], expected_seq: u32) -> Result<()> {
        for (header, payload) in MessageIter::new(data) {
            if header.nlmsg_seq != expected_seq {
                continue;
            }

            if header.is_error() {
                let err = NlMsgError::from_bytes(payload)?;
                if !err.is_ack() {
                    return Err(Error::from_errno(err.error));
                }
                return Ok(());
            }
        }

        Err(Error::InvalidMessage("expected ACK message".into()))
    }

    // ========================================================================
    // Strongly-typed API
    // ========================================================================

    /// Send a dump request and parse all responses into typed messages.
    ///
    /// The type supplies its own dump body via
    /// [`FromNetlink::write_dump_header`]. Messages that fail to parse are
    /// skipped; a dump must not die on one unparseable entry.
    pub async fn dump_typed<T: FromNetlink>(&self, msg_type: u16, operation: &str) -> Result<Vec<T>> {
        let mut msg = Message::request(msg_type, NLM_F_DUMP);
        T::write_dump_header(&mut msg);

        let responses = self.dump(msg, operation).await?;

        let mut parsed = Vec::with_capacity(responses.len());
        for response in responses {
            if response.len() < NLMSG_HDRLEN {
                continue;
            }
            let payload = &response[NLMSG_HDRLEN..];
            if let Ok(msg) = T::from_bytes(payload) {
                parsed.push(msg);
            }
        }

        Ok(parsed)
    }

    /// Resolve an interface reference to an index.
    ///
    /// Resolution runs over this connection, so names are looked up in the
    /// connection's namespace. An unknown name yields
    /// [`Error::InterfaceNotFound`].
    pub async fn resolve_interface(&self, iface: &InterfaceRef) -> Result<u32> {
        match iface {
            InterfaceRef::Index(idx) => Ok(*idx),
            InterfaceRef::Name(name) => match self.get_link_by_name(name).await? {
                Some(link) => Ok(link.ifindex()),
                None => Err(Error::InterfaceNotFound { name: name.clone() }),
            },
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get all network interfaces in the connection's namespace.
    pub async fn get_links(&self) -> Result<Vec<LinkMessage>> {
        self.dump_typed(NlMsgType::GetLink as u16, "listing links")
            .await
    }

    /// Get a network interface by name.
    ///
    /// Returns `Ok(None)` when no interface has that name.
    pub async fn get_link_by_name(&self, name: &str) -> Result<Option<LinkMessage>> {
        let links = self.get_links().await?;
        Ok(links.into_iter().find(|link| link.name() == Some(name)))
    }

    /// Get a network interface by index.
    pub async fn get_link_by_index(&self, index: u32) -> Result<Option<LinkMessage>> {
        let links = self.get_links().await?;
        Ok(links.into_iter().find(|link| link.ifindex() == index))
    }

    /// Get the names of all interfaces in the connection's namespace.
    pub async fn get_interface_names(&self) -> Result<Vec<String>> {
        let links = self.get_links().await?;
        Ok(links
            .into_iter()
            .filter_map(|link| link.name().map(String::from))
            .collect())
    }

    /// Get all addresses, across every interface and family.
    pub async fn get_addresses(&self) -> Result<Vec<AddressMessage>> {
        self.dump_typed(NlMsgType::GetAddr as u16, "listing addresses")
            .await
    }

    /// Get the addresses assigned to one interface.
    pub async fn get_addresses_for(
        &self,
        iface: impl Into<InterfaceRef>,
    ) -> Result<Vec<AddressMessage>> {
        let ifindex = self.resolve_interface(&iface.into()).await?;
        let addrs = self.get_addresses().await?;
        Ok(addrs
            .into_iter()
            .filter(|addr| addr.ifindex() == ifindex)
            .collect())
    }

    /// Get all routes, across every table.
    pub async fn get_routes(&self) -> Result<Vec<RouteMessage>> {
        self.dump_typed(NlMsgType::GetRoute as u16, "listing routes")
            .await
    }

    /// Get the routes in one table.
    ///
    /// The kernel's route dump is not filtered server-side for high table
    /// IDs, so this filters on the effective table of each entry.
    pub async fn get_routes_for(&self, table: u32) -> Result<Vec<RouteMessage>> {
        let routes = self.get_routes().await?;
        Ok(routes
            .into_iter()
            .filter(|route| route.table_id() == table)
            .collect())
    }
}
