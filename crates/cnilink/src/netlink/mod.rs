//! Async rtnetlink implementation for Linux.
//!
//! Everything the kernel sees is assembled here: the 16-byte message
//! envelope, the fixed-layout bodies (link/address/route/neighbor), and the
//! TLV attribute trees that hang off them. The layering is strict; each
//! level only composes the ones below it:
//!
//! 1. [`endian`] resolves the host byte order once per process.
//! 2. [`attr`] builds and walks TLV attributes, nested trees included.
//! 3. [`message`] frames payload segments behind a netlink header.
//! 4. [`types`] holds the kernel ABI structs the bodies serialize to.
//! 5. [`Connection`] owns the socket and the operation surface.
//!
//! # Quick Start
//!
//! ```ignore
//! use cnilink::netlink::{Connection, Protocol};
//!
//! let conn = Connection::new(Protocol::Route)?;
//!
//! // Query interfaces
//! let links = conn.get_links().await?;
//! for link in &links {
//!     println!("{}: {}", link.ifindex(), link.name_or("?"));
//! }
//!
//! // Program an address and a default route
//! conn.add_ip_address("ceth0", "10.22.0.7".parse()?, 24).await?;
//! conn.add_route(
//!     cnilink::netlink::route::IpRoute::default_route("10.22.0.1".parse()?)
//! ).await?;
//! ```

pub mod addr;
pub mod attr;
pub mod connection;
pub mod endian;
mod error;
#[cfg(test)]
mod fixtures;
mod interface_ref;
pub mod link;
pub mod message;
pub mod messages;
pub mod neigh;
pub mod parse;
pub mod route;
mod socket;
pub mod types;

pub use attr::{Attr, AttrIter, NlAttr, Payload};
pub use connection::Connection;
pub use endian::ByteOrder;
pub use error::{Error, Result};
pub use interface_ref::InterfaceRef;
pub use message::{Message, MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use parse::FromNetlink;
pub use socket::{NetlinkSocket, Protocol};
