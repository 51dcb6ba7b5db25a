//! Host byte-order resolution.
//!
//! Netlink headers and integer attributes travel in the host's native byte
//! order. Rather than sprinkle `to_ne_bytes` calls through every codec, the
//! order is resolved once per process from the in-memory representation of
//! a probe integer and handed to the encode/decode paths as an explicit
//! value. [`ByteOrder::host()`] always returns the same resolved order.

use std::sync::LazyLock;

use bytes::BytesMut;

static HOST: LazyLock<ByteOrder> = LazyLock::new(ByteOrder::detect);

/// A resolved byte order for fixed-width integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first (x86, aarch64, riscv).
    Little,
    /// Most significant byte first (s390x).
    Big,
}

impl ByteOrder {
    /// The byte order of this host, resolved once per process.
    #[inline]
    pub fn host() -> Self {
        *HOST
    }

    /// Inspect the native layout of a known integer and decide the order.
    fn detect() -> Self {
        let probe: u16 = 0x00ff;
        if probe.to_ne_bytes()[0] == 0xff {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    /// Encode a u16 in this order.
    #[inline]
    pub const fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    /// Encode a u32 in this order.
    #[inline]
    pub const fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }

    /// Append a u16 to the buffer in this order.
    #[inline]
    pub fn put_u16(self, buf: &mut BytesMut, value: u16) {
        buf.extend_from_slice(&self.u16_bytes(value));
    }

    /// Append a u32 to the buffer in this order.
    #[inline]
    pub fn put_u32(self, buf: &mut BytesMut, value: u32) {
        buf.extend_from_slice(&self.u32_bytes(value));
    }

    /// Decode a u16 in this order.
    #[inline]
    pub const fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(bytes),
            ByteOrder::Big => u16::from_be_bytes(bytes),
        }
    }

    /// Decode a u32 in this order.
    #[inline]
    pub const fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    /// Decode an i32 in this order.
    #[inline]
    pub const fn i32(self, bytes: [u8; 4]) -> i32 {
        self.u32(bytes) as i32
    }
}
