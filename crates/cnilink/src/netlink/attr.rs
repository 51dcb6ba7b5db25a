//! Netlink attribute (nlattr/rtattr) handling.
//!
//! The outbound side is the [`Attr`] tree: leaf attributes hold raw value
//! bytes, container attributes hold an ordered list of child payloads, and
//! [`Attr::write_to`] emits the TLV stream with 4-byte alignment padding.
//! The inbound side is the bounds-checked [`AttrIter`] plus the typed
//! accessors in [`get`].

use std::net::IpAddr;

use bytes::BytesMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::endian::ByteOrder;
use super::error::{Error, Result};
use super::types::addr::IfAddrMsg;
use super::types::link::IfInfoMsg;
use super::types::neigh::NdMsg;
use super::types::route::RtMsg;

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = 4; // nla_align(size_of::<NlAttr>())

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// An outbound TLV attribute: either a leaf carrying value bytes or a
/// container carrying child payloads, never both.
///
/// Built bottom-up with the consuming constructors, then serialized once.
/// The emitted length field is the logical length (header + payload,
/// unpadded); padding bytes appear only in the stream.
///
/// # Example
///
/// ```ignore
/// use cnilink::netlink::Attr;
/// use cnilink::netlink::types::link::{IflaAttr, IflaInfo};
///
/// let linkinfo = Attr::nested(IflaAttr::Linkinfo as u16)
///     .add_nested(Attr::string_z(IflaInfo::Kind as u16, "bridge"));
/// ```
#[derive(Debug, Clone)]
pub struct Attr {
    kind: u16,
    value: AttrValue,
}

#[derive(Debug, Clone)]
enum AttrValue {
    Leaf(Vec<u8>),
    Nested(Vec<Payload>),
}

impl Attr {
    /// Leaf attribute with raw value bytes.
    pub fn bytes(kind: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            value: AttrValue::Leaf(value.into()),
        }
    }

    /// Leaf attribute holding a string without terminator.
    pub fn string(kind: u16, value: &str) -> Self {
        Self::bytes(kind, value.as_bytes())
    }

    /// Leaf attribute holding a NUL-terminated string.
    pub fn string_z(kind: u16, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        Self::bytes(kind, data)
    }

    /// Leaf attribute holding a u16 in the resolved byte order.
    pub fn u16(kind: u16, value: u16) -> Self {
        Self::bytes(kind, ByteOrder::host().u16_bytes(value))
    }

    /// Leaf attribute holding a u32 in the resolved byte order.
    pub fn u32(kind: u16, value: u32) -> Self {
        Self::bytes(kind, ByteOrder::host().u32_bytes(value))
    }

    /// Leaf attribute holding a u8.
    pub fn u8(kind: u16, value: u8) -> Self {
        Self::bytes(kind, [value])
    }

    /// Leaf attribute holding an IP address.
    ///
    /// Addresses with an IPv4 form (including IPv4-mapped IPv6) encode as
    /// 4 bytes; everything else as 16.
    pub fn ip(kind: u16, addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::bytes(kind, v4.octets()),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self::bytes(kind, v4.octets()),
                None => Self::bytes(kind, v6.octets()),
            },
        }
    }

    /// Empty container attribute. The emitted type carries NLA_F_NESTED.
    pub fn nested(kind: u16) -> Self {
        Self {
            kind,
            value: AttrValue::Nested(Vec::new()),
        }
    }

    /// Attach a child payload to a container, preserving attachment order.
    ///
    /// The kernel reads repeated attribute types positionally, so order is
    /// significant.
    ///
    /// # Panics
    ///
    /// Panics when called on a leaf attribute. A leaf holds value bytes
    /// and can never hold children; hitting this is a bug at the call
    /// site, not a runtime condition.
    pub fn add_nested(mut self, child: impl Into<Payload>) -> Self {
        match &mut self.value {
            AttrValue::Nested(children) => children.push(child.into()),
            AttrValue::Leaf(_) => panic!("add_nested called on a leaf attribute"),
        }
        self
    }

    /// The attribute type tag (without flag bits).
    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// Whether this attribute is a container.
    pub fn is_nested(&self) -> bool {
        matches!(self.value, AttrValue::Nested(_))
    }

    /// The type field as emitted on the wire (NLA_F_NESTED for containers).
    fn wire_type(&self) -> u16 {
        match self.value {
            AttrValue::Leaf(_) => self.kind,
            AttrValue::Nested(_) => self.kind | NLA_F_NESTED,
        }
    }

    /// Logical length: header plus unpadded payload. This is the value of
    /// the emitted length field.
    fn logical_len(&self) -> usize {
        match &self.value {
            AttrValue::Leaf(value) => NLA_HDRLEN + value.len(),
            // Children are padded in the stream, so the container's logical
            // payload is the sum of aligned child sizes.
            AttrValue::Nested(children) => {
                NLA_HDRLEN + children.iter().map(Payload::netlink_len).sum::<usize>()
            }
        }
    }

    /// Serialized size: logical length rounded up to the alignment boundary.
    pub fn netlink_len(&self) -> usize {
        nla_align(self.logical_len())
    }

    /// Emit the attribute: length, type, payload, zero padding.
    pub fn write_to(&self, buf: &mut BytesMut) {
        let order = ByteOrder::host();
        order.put_u16(buf, self.logical_len() as u16);
        order.put_u16(buf, self.wire_type());
        match &self.value {
            AttrValue::Leaf(value) => {
                buf.extend_from_slice(value);
                buf.resize(nla_align(buf.len()), 0);
            }
            AttrValue::Nested(children) => {
                for child in children {
                    child.write_to(buf);
                }
            }
        }
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.netlink_len());
        self.write_to(&mut buf);
        buf
    }
}

/// One payload segment of a netlink message: a fixed-layout body or an
/// attribute tree. Every variant knows its serialized size and how to
/// write itself.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Link body (struct ifinfomsg).
    Link(IfInfoMsg),
    /// Address body (struct ifaddrmsg).
    Addr(IfAddrMsg),
    /// Route body (struct rtmsg).
    Route(RtMsg),
    /// Neighbor body (struct ndmsg).
    Neigh(NdMsg),
    /// TLV attribute.
    Attr(Attr),
}

impl Payload {
    /// Serialized size of this segment.
    pub fn netlink_len(&self) -> usize {
        match self {
            Payload::Link(_) => IfInfoMsg::SIZE,
            Payload::Addr(_) => IfAddrMsg::SIZE,
            Payload::Route(_) => RtMsg::SIZE,
            Payload::Neigh(_) => NdMsg::SIZE,
            Payload::Attr(attr) => attr.netlink_len(),
        }
    }

    /// Append this segment's bytes to the buffer.
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Payload::Link(body) => buf.extend_from_slice(body.as_bytes()),
            Payload::Addr(body) => buf.extend_from_slice(body.as_bytes()),
            Payload::Route(body) => buf.extend_from_slice(body.as_bytes()),
            Payload::Neigh(body) => buf.extend_from_slice(body.as_bytes()),
            Payload::Attr(attr) => attr.write_to(buf),
        }
    }

    /// The attribute, if this segment is one.
    pub fn as_attr(&self) -> Option<&Attr> {
        match self {
            Payload::Attr(attr) => Some(attr),
            _ => None,
        }
    }
}

impl From<IfInfoMsg> for Payload {
    fn from(body: IfInfoMsg) -> Self {
        Payload::Link(body)
    }
}

impl From<IfAddrMsg> for Payload {
    fn from(body: IfAddrMsg) -> Self {
        Payload::Addr(body)
    }
}

impl From<RtMsg> for Payload {
    fn from(body: RtMsg) -> Self {
        Payload::Route(body)
    }
}

impl From<NdMsg> for Payload {
    fn from(body: NdMsg) -> Self {
        Payload::Neigh(body)
    }
}

impl From<Attr> for Payload {
    fn from(attr: Attr) -> Self {
        Payload::Attr(attr)
    }
}

/// Netlink attribute header (mirrors struct nlattr / struct rtattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header.
    pub nla_len: u16,
    /// Attribute type.
    pub nla_type: u16,
}

impl NlAttr {
    /// Get the attribute type without flags.
    pub fn kind(&self) -> u16 {
        self.nla_type & NLA_TYPE_MASK
    }

    /// Check if this is a nested attribute.
    pub fn is_nested(&self) -> bool {
        self.nla_type & NLA_F_NESTED != 0
    }

    /// Get the payload length (total length minus header).
    pub fn payload_len(&self) -> usize {
        (self.nla_len as usize).saturating_sub(NLA_HDRLEN)
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }
}

/// Iterator over netlink attributes in a received buffer.
pub struct AttrIter<'a> {
    data: &'a [u8],
}

impl<'a> AttrIter<'a> {
    /// Create a new attribute iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Check if there are no more attributes.
    pub fn is_empty(&self) -> bool {
        self.data.len() < NLA_HDRLEN
    }
}

impl<'a> Iterator for AttrIter<'a> {
    /// Returns (attribute type, payload data).
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLA_HDRLEN {
            return None;
        }

        let attr = match NlAttr::from_bytes(self.data) {
            Ok(a) => a,
            Err(_) => return None,
        };

        let len = attr.nla_len as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            return None;
        }

        let payload = &self.data[NLA_HDRLEN..len];
        let aligned_len = nla_align(len);

        // Move to next attribute
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((attr.kind(), payload))
    }
}

/// Helper functions for extracting typed values from attribute payloads.
pub mod get {
    use super::*;

    /// Extract a u8 value.
    pub fn u8(data: &[u8]) -> Result<u8> {
        if data.is_empty() {
            return Err(Error::InvalidAttribute("empty u8 attribute".into()));
        }
        Ok(data[0])
    }

    /// Extract a u16 value (native endian).
    pub fn u16_ne(data: &[u8]) -> Result<u16> {
        if data.len() < 2 {
            return Err(Error::InvalidAttribute("truncated u16 attribute".into()));
        }
        Ok(u16::from_ne_bytes([data[0], data[1]]))
    }

    /// Extract a u32 value (native endian).
    pub fn u32_ne(data: &[u8]) -> Result<u32> {
        if data.len() < 4 {
            return Err(Error::InvalidAttribute("truncated u32 attribute".into()));
        }
        Ok(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Extract an i32 value (native endian).
    pub fn i32_ne(data: &[u8]) -> Result<i32> {
        if data.len() < 4 {
            return Err(Error::InvalidAttribute("truncated i32 attribute".into()));
        }
        Ok(i32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
    }

    /// Extract a null-terminated string.
    pub fn string(data: &[u8]) -> Result<&str> {
        // Find null terminator or use whole buffer
        let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        std::str::from_utf8(&data[..len])
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }

    /// Extract bytes (no interpretation).
    pub fn bytes(data: &[u8]) -> &[u8] {
        data
    }
}
