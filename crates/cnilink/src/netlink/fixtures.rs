//! Canned kernel-reply payloads for parser tests.
//!
//! Each helper produces the payload of one dump entry, exactly as it sits
//! after the nlmsghdr in a receive buffer: fixed body, then attributes with
//! alignment padding.

use bytes::BytesMut;

use super::attr::Attr;
use super::types::addr::IfAddrMsg;
use super::types::link::IfInfoMsg;
use super::types::route::RtMsg;

fn payload(body: &[u8], attrs: &[Attr]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(body);
    for attr in attrs {
        attr.write_to(&mut buf);
    }
    buf.to_vec()
}

/// Payload of one RTM_NEWLINK dump entry.
pub fn link_reply(header: IfInfoMsg, attrs: &[Attr]) -> Vec<u8> {
    payload(header.as_bytes(), attrs)
}

/// Payload of one RTM_NEWADDR dump entry.
pub fn addr_reply(header: IfAddrMsg, attrs: &[Attr]) -> Vec<u8> {
    payload(header.as_bytes(), attrs)
}

/// Payload of one RTM_NEWROUTE dump entry.
pub fn route_reply(header: RtMsg, attrs: &[Attr]) -> Vec<u8> {
    payload(header.as_bytes(), attrs)
}
