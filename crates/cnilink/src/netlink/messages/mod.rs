//! Strongly-typed inbound netlink messages.
//!
//! Dump replies arrive as a fixed body followed by a TLV attribute run;
//! the types here parse both into plain Rust fields. They implement
//! [`FromNetlink`](crate::netlink::parse::FromNetlink), so
//! [`Connection::dump_typed`](crate::netlink::Connection::dump_typed) can
//! collect them directly.
//!
//! # Example
//!
//! ```ignore
//! use cnilink::netlink::messages::LinkMessage;
//! use cnilink::netlink::parse::FromNetlink;
//!
//! // Parse one dump entry (payload after the nlmsghdr)
//! let link = LinkMessage::from_bytes(&payload)?;
//! println!("{}: mtu {:?}", link.name_or("?"), link.mtu());
//! ```

mod addr;
mod link;
mod route;

pub use addr::*;
pub use link::*;
pub use route::*;
