//! Neighbor integration tests.
//!
//! Static ARP and NDP entry management using real network namespaces.
//! The crate has no neighbor dump, so kernel state is checked through
//! `ip neigh show` inside the namespace.

use std::net::IpAddr;

use cnilink::netlink::link::Veth;
use cnilink::{Connection, Result};

use crate::common::TestNamespace;

/// Set up a namespace with a veth pair, both ends up.
async fn setup_veth_ns(prefix: &str) -> Result<(TestNamespace, Connection)> {
    let ns = TestNamespace::new(prefix)?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;
    conn.set_link_up("hveth0").await?;
    conn.set_link_up("ceth0").await?;

    Ok((ns, conn))
}

#[tokio::test]
async fn test_add_static_arp() -> Result<()> {
    require_root!();

    let (ns, conn) = setup_veth_ns("arp").await?;

    let ip: IpAddr = "10.22.0.1".parse().unwrap();
    conn.add_static_arp("ceth0", ip, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x01])
        .await?;

    let shown = ns.exec("ip", &["neigh", "show", "dev", "ceth0"])?;
    assert!(shown.contains("10.22.0.1"), "entry missing: {shown}");
    assert!(shown.contains("0a:58:0a:16:00:01"), "wrong lladdr: {shown}");
    assert!(shown.contains("PERMANENT"), "entry not static: {shown}");

    Ok(())
}

#[tokio::test]
async fn test_replace_static_arp() -> Result<()> {
    require_root!();

    let (ns, conn) = setup_veth_ns("arprepl").await?;

    let ip: IpAddr = "10.22.0.1".parse().unwrap();
    conn.add_static_arp("ceth0", ip, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x01])
        .await?;

    // Re-adding with a new MAC replaces the entry
    conn.add_static_arp("ceth0", ip, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x02])
        .await?;

    let shown = ns.exec("ip", &["neigh", "show", "dev", "ceth0"])?;
    assert!(shown.contains("0a:58:0a:16:00:02"), "new lladdr missing: {shown}");
    assert!(!shown.contains("0a:58:0a:16:00:01"), "old lladdr kept: {shown}");

    Ok(())
}

#[tokio::test]
async fn test_delete_static_arp() -> Result<()> {
    require_root!();

    let (ns, conn) = setup_veth_ns("arpdel").await?;

    let ip: IpAddr = "10.22.0.1".parse().unwrap();
    conn.add_static_arp("ceth0", ip, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x01])
        .await?;
    conn.del_static_arp("ceth0", ip).await?;

    let shown = ns.exec("ip", &["neigh", "show", "dev", "ceth0"])?;
    assert!(!shown.contains("10.22.0.1"), "entry should be gone: {shown}");

    // Deleting an entry that does not exist succeeds
    conn.del_static_arp("ceth0", ip).await?;

    Ok(())
}

#[tokio::test]
async fn test_static_ndp_entry() -> Result<()> {
    require_root!();

    let (ns, conn) = setup_veth_ns("ndp").await?;

    let ip: IpAddr = "fd00:22::1".parse().unwrap();
    conn.add_static_arp("ceth0", ip, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x01])
        .await?;

    let shown = ns.exec("ip", &["-6", "neigh", "show", "dev", "ceth0"])?;
    assert!(shown.contains("fd00:22::1"), "entry missing: {shown}");
    assert!(shown.contains("PERMANENT"), "entry not static: {shown}");

    conn.del_static_arp("ceth0", ip).await?;

    Ok(())
}

#[tokio::test]
async fn test_arp_on_missing_interface() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("arpghost")?;
    let conn = ns.connection()?;

    let ip: IpAddr = "10.22.0.1".parse().unwrap();
    let err = conn
        .add_static_arp("ghost0", ip, [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x01])
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected a not-found error, got: {err}");

    // Deletes stay idempotent even when the interface is gone
    conn.del_static_arp("ghost0", ip).await?;

    Ok(())
}
