//! Netlink message framing.
//!
//! Outbound messages are assembled with [`Message`]: a header followed by
//! ordered payload segments (fixed-layout bodies and attribute trees). The
//! length field is always computed at serialization time from the segments.
//! Inbound buffers are walked with [`MessageIter`], which validates lengths
//! before yielding each header/payload pair.

use bytes::BytesMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attr::{Attr, AttrIter, Payload};
use super::endian::ByteOrder;
use super::error::{Error, Result};

/// Netlink message alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Align a length to NLMSG_ALIGNTO boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = 16;

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Total message length including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sender port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Payload length (total minus header).
    pub fn payload_len(&self) -> usize {
        (self.nlmsg_len as usize).saturating_sub(NLMSG_HDRLEN)
    }

    /// Check if this is an error/ACK message.
    pub fn is_error(&self) -> bool {
        self.nlmsg_type == NlMsgType::Error as u16
    }

    /// Check if this is a done message (end of multi-part).
    pub fn is_done(&self) -> bool {
        self.nlmsg_type == NlMsgType::Done as u16
    }

    /// Check if this message is part of a multi-part response.
    pub fn is_multi(&self) -> bool {
        self.nlmsg_flags & NLM_F_MULTI != 0
    }

    /// Serialize to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
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

/// Netlink message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NlMsgType {
    /// No operation.
    Noop = 1,
    /// Error message (also carries ACKs).
    Error = 2,
    /// End of multi-part message.
    Done = 3,
    /// Data lost.
    Overrun = 4,

    // rtnetlink link messages
    NewLink = 16,
    DelLink = 17,
    GetLink = 18,
    SetLink = 19,

    // rtnetlink address messages
    NewAddr = 20,
    DelAddr = 21,
    GetAddr = 22,

    // rtnetlink route messages
    NewRoute = 24,
    DelRoute = 25,
    GetRoute = 26,

    // rtnetlink neighbor messages
    NewNeigh = 28,
    DelNeigh = 29,
    GetNeigh = 30,
}

// Netlink message flags
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_ECHO: u16 = 0x08;
pub const NLM_F_DUMP_INTR: u16 = 0x10;
pub const NLM_F_DUMP_FILTERED: u16 = 0x20;

// Flags for GET requests
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_ATOMIC: u16 = 0x400;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

// Flags for NEW requests
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;
pub const NLM_F_APPEND: u16 = 0x800;

/// An outbound netlink message under construction.
///
/// Segments are emitted in the order they were added. The header length
/// field is never caller-supplied; [`Message::write_to`] computes it as
/// header size plus the sum of segment sizes on every call.
///
/// # Example
///
/// ```ignore
/// use cnilink::netlink::message::{Message, NlMsgType, NLM_F_ACK};
/// use cnilink::netlink::types::link::IfInfoMsg;
/// use cnilink::netlink::Attr;
///
/// let mut msg = Message::request(NlMsgType::NewLink as u16, NLM_F_ACK);
/// msg.add_payload(IfInfoMsg::new());
/// msg.add_attr(Attr::string_z(3, "cni0"));
/// let bytes = msg.to_bytes();
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    kind: u16,
    flags: u16,
    seq: u32,
    pid: u32,
    segments: Vec<Payload>,
}

impl Message {
    /// New message with the given type and flags.
    pub fn new(kind: u16, flags: u16) -> Self {
        Self {
            kind,
            flags,
            seq: 0,
            pid: 0,
            segments: Vec::new(),
        }
    }

    /// New request message. NLM_F_REQUEST is always set, whatever
    /// `flags` says.
    pub fn request(kind: u16, flags: u16) -> Self {
        Self::new(kind, flags | NLM_F_REQUEST)
    }

    /// Append a payload segment.
    pub fn add_payload(&mut self, payload: impl Into<Payload>) -> &mut Self {
        self.segments.push(payload.into());
        self
    }

    /// Append a payload segment if present. `None` leaves the message
    /// untouched.
    pub fn add_payload_opt<T: Into<Payload>>(&mut self, payload: Option<T>) -> &mut Self {
        if let Some(p) = payload {
            self.segments.push(p.into());
        }
        self
    }

    /// Append an attribute segment.
    pub fn add_attr(&mut self, attr: Attr) -> &mut Self {
        self.segments.push(Payload::Attr(attr));
        self
    }

    /// Message type.
    pub fn kind(&self) -> u16 {
        self.kind
    }

    /// Header flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Sequence number.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Set the sequence number. Assigned per request by the connection.
    pub fn set_seq(&mut self, seq: u32) {
        self.seq = seq;
    }

    /// Set the sender port ID. This is the socket's kernel-assigned ID,
    /// not the process ID.
    pub fn set_pid(&mut self, pid: u32) {
        self.pid = pid;
    }

    /// Iterate over the attribute segments, skipping fixed bodies.
    pub fn attrs(&self) -> impl Iterator<Item = &Attr> {
        self.segments.iter().filter_map(Payload::as_attr)
    }

    /// Total serialized size.
    pub fn netlink_len(&self) -> usize {
        NLMSG_HDRLEN + self.segments.iter().map(Payload::netlink_len).sum::<usize>()
    }

    /// Append header and segments to the buffer.
    pub fn write_to(&self, buf: &mut BytesMut) {
        let order = ByteOrder::host();
        order.put_u32(buf, self.netlink_len() as u32);
        order.put_u16(buf, self.kind);
        order.put_u16(buf, self.flags);
        order.put_u32(buf, self.seq);
        order.put_u32(buf, self.pid);
        for segment in &self.segments {
            segment.write_to(buf);
        }
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.netlink_len());
        self.write_to(&mut buf);
        buf
    }
}

/// Iterator over netlink messages in a received buffer.
pub struct MessageIter<'a> {
    data: &'a [u8],
}

impl<'a> MessageIter<'a> {
    /// Create a new message iterator.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for MessageIter<'a> {
    /// Returns (header, payload).
    type Item = (&'a NlMsgHdr, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < NLMSG_HDRLEN {
            return None;
        }

        let header = match NlMsgHdr::from_bytes(self.data) {
            Ok(h) => h,
            Err(_) => return None,
        };

        let msg_len = header.nlmsg_len as usize;
        if msg_len < NLMSG_HDRLEN || msg_len > self.data.len() {
            return None;
        }

        let payload = &self.data[NLMSG_HDRLEN..msg_len];
        let aligned_len = nlmsg_align(msg_len);

        // Move to next message
        if aligned_len >= self.data.len() {
            self.data = &[];
        } else {
            self.data = &self.data[aligned_len..];
        }

        Some((header, payload))
    }
}

/// Netlink error message payload (struct nlmsgerr).
///
/// A zero error code is an ACK. The original request header follows the
/// code; with extended ACKs enabled, attributes follow that.
#[derive(Debug)]
pub struct NlMsgError<'a> {
    /// Error code (negative errno, or 0 for ACK).
    pub error: i32,
    /// Original message header that caused the error.
    pub msg: &'a [u8],
    /// Extended ACK attributes, if present.
    pub ext_ack: &'a [u8],
}

impl<'a> NlMsgError<'a> {
    /// Parse from an error message payload.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::Truncated {
                expected: 4,
                actual: data.len(),
            });
        }

        let error = ByteOrder::host().i32([data[0], data[1], data[2], data[3]]);

        let rest = &data[4..];
        let (msg, ext_ack) = if rest.len() >= NLMSG_HDRLEN {
            let copied = NLMSG_HDRLEN.min(rest.len());
            (&rest[..copied], &rest[copied..])
        } else {
            (rest, &[][..])
        };

        Ok(Self {
            error,
            msg,
            ext_ack,
        })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// Iterate over extended ACK attributes.
    pub fn attrs(&self) -> AttrIter<'a> {
        AttrIter::new(self.ext_ack)
    }
}

// Extended ACK attribute types
pub const NLMSGERR_ATTR_MSG: u16 = 1;
pub const NLMSGERR_ATTR_OFFS: u16 = 2;
