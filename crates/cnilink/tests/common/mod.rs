//! Common test utilities for integration tests.
//!
//! Provides `TestNamespace` for isolated network namespace testing
//! and a helper macro for conditional test execution.

use std::io;
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use cnilink::{Connection, Protocol, Result};

/// Global counter for unique namespace names.
static NAMESPACE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique namespace name for this test.
fn unique_ns_name(prefix: &str) -> String {
    let id = NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    format!("cnilink-test-{}-{}-{}", prefix, pid, id)
}

/// A test network namespace with automatic cleanup.
///
/// Creates an isolated network namespace for testing netlink operations.
/// The namespace is automatically deleted when the struct is dropped.
///
/// # Example
///
/// ```ignore
/// let ns = TestNamespace::new("mytest")?;
/// let conn = ns.connection()?;
///
/// // Perform netlink operations in isolation
/// conn.add_link(Veth::new("hveth0", "ceth0")).await?;
/// ```
pub struct TestNamespace {
    name: String,
}

impl TestNamespace {
    /// Create a new test namespace with a unique name.
    ///
    /// The `prefix` is used to generate a unique namespace name
    /// that includes the process ID and a counter.
    pub fn new(prefix: &str) -> Result<Self> {
        let name = unique_ns_name(prefix);

        let status = Command::new("ip")
            .args(["netns", "add", &name])
            .status()
            .map_err(|e| cnilink::Error::Io(io::Error::from(e.kind())))?;

        if !status.success() {
            return Err(cnilink::Error::InvalidMessage(format!(
                "failed to create namespace: {}",
                name
            )));
        }

        Ok(Self { name })
    }

    /// Get the namespace name.
    #[allow(dead_code)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem path of the namespace handle.
    pub fn path(&self) -> String {
        format!("/var/run/netns/{}", self.name)
    }

    /// Get a connection to this namespace.
    pub fn connection(&self) -> Result<Connection> {
        Connection::new_in_namespace_path(Protocol::Route, self.path())
    }

    /// Run a command in the namespace and return its output.
    pub fn exec(&self, cmd: &str, args: &[&str]) -> Result<String> {
        let output = Command::new("ip")
            .args(["netns", "exec", &self.name, cmd])
            .args(args)
            .output()
            .map_err(|e| cnilink::Error::Io(io::Error::from(e.kind())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(cnilink::Error::InvalidMessage(format!(
                "command failed: {} {:?}: {}",
                cmd, args, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Drop for TestNamespace {
    fn drop(&mut self) {
        // Clean up the namespace
        let _ = Command::new("ip")
            .args(["netns", "del", &self.name])
            .status();
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ns_name() {
        let name1 = unique_ns_name("test");
        let name2 = unique_ns_name("test");
        assert_ne!(name1, name2);
        assert!(name1.starts_with("cnilink-test-test-"));
    }
}
