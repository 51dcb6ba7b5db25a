//! Netlink link/address/route programming for container networking dataplanes.
//!
//! This crate is the kernel-boundary layer of a CNI plugin stack. It builds
//! byte-exact rtnetlink requests (links, addresses, routes, neighbors),
//! transmits them over an async netlink socket, and interprets the kernel's
//! acknowledgement or error reply. Higher layers (endpoint setup, bridge
//! plumbing, IPAM application) are expected to call through it rather than
//! shell out to `ip`.
//!
//! # Example
//!
//! ```ignore
//! use cnilink::netlink::{Connection, Protocol};
//! use cnilink::netlink::link::Veth;
//!
//! #[tokio::main]
//! async fn main() -> cnilink::netlink::Result<()> {
//!     let conn = Connection::new(Protocol::Route)?;
//!
//!     // Plumb a veth pair for a new endpoint
//!     conn.add_link(Veth::new("hveth0", "ceth0")).await?;
//!     conn.set_link_up("hveth0").await?;
//!     conn.set_link_master("hveth0", "cni0").await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Namespaces
//!
//! Container-side configuration happens through a connection opened inside
//! the target network namespace:
//!
//! ```ignore
//! let conn = Connection::new_in_namespace_path(Protocol::Route, "/proc/4242/ns/net")?;
//! conn.add_ip_address("ceth0", "10.22.0.7".parse()?, 24).await?;
//! conn.set_link_up("ceth0").await?;
//! ```

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::{Connection, Error, InterfaceRef, Protocol, Result};
