//! Parsing primitives for inbound netlink payloads.
//!
//! Built on winnow combinators. Attribute walks and typed message parsers
//! consume `&[u8]` input and fail with `ErrMode` on malformed data; the
//! crate boundary converts those into [`Error::Parse`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use super::attr::{NLA_HDRLEN, NLA_TYPE_MASK, nla_align};
use super::error::{Error, Result};
use super::message::Message;

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// A message type that can be parsed from a netlink payload.
pub trait FromNetlink: Sized {
    /// Parse from a payload (after the nlmsghdr).
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from a complete payload slice.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut input = data;
        Self::parse(&mut input).map_err(|e| Error::Parse(format!("{}", e)))
    }

    /// Attach the fixed body used when dumping this message type
    /// (e.g. an all-zero ifinfomsg for links).
    fn write_dump_header(msg: &mut Message);
}

/// Parse one attribute: header, payload, alignment padding. Returns the
/// type (flag bits masked off) and the payload slice.
pub fn parse_attr<'a>(input: &mut &'a [u8]) -> PResult<(u16, &'a [u8])> {
    let attr_len = parse_u16_ne(input)? as usize;
    let attr_type = parse_u16_ne(input)?;

    if attr_len < NLA_HDRLEN {
        return Err(ErrMode::Cut(ContextError::new()));
    }

    let payload_len = attr_len - NLA_HDRLEN;
    let payload = take(payload_len).parse_next(input)?;

    // Skip alignment padding (not counted in attr_len)
    let padding = nla_align(attr_len) - attr_len;
    if padding > 0 && input.len() >= padding {
        let _ = take(padding).parse_next(input)?;
    }

    Ok((attr_type & NLA_TYPE_MASK, payload))
}

/// Parse a u8.
pub fn parse_u8(input: &mut &[u8]) -> PResult<u8> {
    take(1usize).parse_next(input).map(|b: &[u8]| b[0])
}

/// Parse a native-endian u16.
pub fn parse_u16_ne(input: &mut &[u8]) -> PResult<u16> {
    take(2usize)
        .parse_next(input)
        .map(|b: &[u8]| u16::from_ne_bytes([b[0], b[1]]))
}

/// Parse a native-endian u32.
pub fn parse_u32_ne(input: &mut &[u8]) -> PResult<u32> {
    take(4usize)
        .parse_next(input)
        .map(|b: &[u8]| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
}

/// Parse a native-endian i32.
pub fn parse_i32_ne(input: &mut &[u8]) -> PResult<i32> {
    take(4usize)
        .parse_next(input)
        .map(|b: &[u8]| i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
}

/// Extract an IP address from an attribute payload. The expected width
/// comes from the message's address family.
pub fn parse_ip_addr(family: u8, data: &[u8]) -> Result<IpAddr> {
    match family {
        2 => {
            // AF_INET
            if data.len() < 4 {
                return Err(Error::Truncated {
                    expected: 4,
                    actual: data.len(),
                });
            }
            Ok(IpAddr::V4(Ipv4Addr::new(data[0], data[1], data[2], data[3])))
        }
        10 => {
            // AF_INET6
            if data.len() < 16 {
                return Err(Error::Truncated {
                    expected: 16,
                    actual: data.len(),
                });
            }
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&data[..16]);
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        other => Err(Error::InvalidMessage(format!(
            "unknown address family: {}",
            other
        ))),
    }
}

/// Extract a MAC address from an attribute payload.
pub fn parse_mac_addr(data: &[u8]) -> Result<[u8; 6]> {
    if data.len() < 6 {
        return Err(Error::Truncated {
            expected: 6,
            actual: data.len(),
        });
    }
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[..6]);
    Ok(mac)
}

/// Format a MAC address as colon-separated hex.
pub fn format_mac_addr(mac: &[u8; 6]) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}
