//! Fixed-layout kernel ABI structures.
//!
//! Each body struct mirrors its `struct ifinfomsg` / `ifaddrmsg` / `rtmsg`
//! / `ndmsg` counterpart byte for byte. Field order is part of the wire
//! contract; do not reorder.

pub mod addr;
pub mod link;
pub mod neigh;
pub mod route;

/// Address families used in rtnetlink bodies.
pub const AF_UNSPEC: u8 = 0;
pub const AF_INET: u8 = 2;
pub const AF_BRIDGE: u8 = 7;
pub const AF_INET6: u8 = 10;
