//! Interface reference type for namespace-safe operations.
//!
//! [`InterfaceRef`] holds either an interface name or an interface index.
//! Names are resolved to indices via netlink at operation time, on the
//! connection performing the operation. That matters for container setups:
//! a name like `eth0` exists in nearly every namespace, so resolution must
//! go through the socket bound to the namespace being configured, never
//! through sysfs on the host.
//!
//! # Example
//!
//! ```ignore
//! use cnilink::netlink::InterfaceRef;
//!
//! // By name (resolved inside the connection's namespace)
//! conn.set_link_up("ceth0").await?;
//!
//! // By index (pre-resolved, skips the lookup)
//! let link = conn.get_link_by_name("ceth0").await?.unwrap();
//! conn.set_link_up(link.ifindex()).await?;
//! ```

use std::fmt;

/// A reference to a network interface, either by name or by index.
///
/// Operation methods take `impl Into<InterfaceRef>`, so plain `&str` and
/// `u32` arguments work directly. A `Name` is resolved to an index via
/// netlink before the operation runs; an `Index` is used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterfaceRef {
    /// Interface specified by name (will be resolved via netlink).
    Name(String),
    /// Interface specified by index (already resolved).
    Index(u32),
}

impl InterfaceRef {
    /// Create an interface reference from a name.
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Create an interface reference from an index.
    #[inline]
    pub fn index(index: u32) -> Self {
        Self::Index(index)
    }

    /// Returns `true` if this is a name reference that needs resolution.
    #[inline]
    pub fn is_name(&self) -> bool {
        matches!(self, Self::Name(_))
    }

    /// Returns `true` if this is an already-resolved index.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Get the name if this is a name reference.
    #[inline]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    /// Get the index if this is an index reference.
    #[inline]
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Name(_) => None,
            Self::Index(idx) => Some(*idx),
        }
    }
}

impl fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Index(idx) => write!(f, "ifindex:{}", idx),
        }
    }
}

// Convenient From implementations

impl From<&str> for InterfaceRef {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for InterfaceRef {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for InterfaceRef {
    #[inline]
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<u32> for InterfaceRef {
    #[inline]
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_ref_name() {
        let iface = InterfaceRef::name("ceth0");
        assert!(iface.is_name());
        assert!(!iface.is_index());
        assert_eq!(iface.as_name(), Some("ceth0"));
        assert_eq!(iface.as_index(), None);
        assert_eq!(iface.to_string(), "ceth0");
    }

    #[test]
    fn test_interface_ref_index() {
        let iface = InterfaceRef::index(42);
        assert!(!iface.is_name());
        assert!(iface.is_index());
        assert_eq!(iface.as_name(), None);
        assert_eq!(iface.as_index(), Some(42));
        assert_eq!(iface.to_string(), "ifindex:42");
    }

    #[test]
    fn test_from_impls() {
        let iface: InterfaceRef = "ceth0".into();
        assert_eq!(iface, InterfaceRef::Name("ceth0".to_string()));

        let iface: InterfaceRef = String::from("ceth0").into();
        assert_eq!(iface, InterfaceRef::Name("ceth0".to_string()));

        let iface: InterfaceRef = 42u32.into();
        assert_eq!(iface, InterfaceRef::Index(42));
    }

    #[test]
    fn test_equality() {
        assert_eq!(InterfaceRef::name("cni0"), InterfaceRef::name("cni0"));
        assert_eq!(InterfaceRef::index(1), InterfaceRef::index(1));
        assert_ne!(InterfaceRef::name("cni0"), InterfaceRef::index(1));
    }
}
