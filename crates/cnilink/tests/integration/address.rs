//! Address integration tests.
//!
//! IP address management using real network namespaces.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

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
async fn test_add_ipv4_address() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_veth_ns("addr4").await?;

    let ip = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    conn.add_ip_address("ceth0", ip, 24).await?;

    let addrs = conn.get_addresses_for("ceth0").await?;
    let addr = addrs.iter().find(|a| a.ip() == Some(ip));
    assert!(addr.is_some(), "address should be assigned");

    let addr = addr.unwrap();
    assert_eq!(addr.prefix_len(), 24);
    assert!(addr.is_ipv4());

    Ok(())
}

#[tokio::test]
async fn test_add_address_is_idempotent() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_veth_ns("addridem").await?;

    let ip = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    conn.add_ip_address("ceth0", ip, 24).await?;
    conn.add_ip_address("ceth0", ip, 24).await?;

    // Still exactly one assignment
    let addrs = conn.get_addresses_for("ceth0").await?;
    let matching: Vec<_> = addrs.iter().filter(|a| a.ip() == Some(ip)).collect();
    assert_eq!(matching.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_address() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_veth_ns("addrdel").await?;

    let ip = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    conn.add_ip_address("ceth0", ip, 24).await?;
    conn.del_ip_address("ceth0", ip, 24).await?;

    let addrs = conn.get_addresses_for("ceth0").await?;
    assert!(
        !addrs.iter().any(|a| a.ip() == Some(ip)),
        "address should be gone"
    );

    // Deleting an address that is no longer assigned succeeds
    conn.del_ip_address("ceth0", ip, 24).await?;

    Ok(())
}

#[tokio::test]
async fn test_delete_address_missing_interface() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("addrghost")?;
    let conn = ns.connection()?;

    let ip = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    conn.del_ip_address("ghost0", ip, 24).await?;

    Ok(())
}

#[tokio::test]
async fn test_add_ipv6_address() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_veth_ns("addr6").await?;

    let ip: IpAddr = "fd00:22::7".parse::<Ipv6Addr>().unwrap().into();
    conn.add_ip_address("ceth0", ip, 64).await?;

    let addrs = conn.get_addresses_for("ceth0").await?;
    let addr = addrs.iter().find(|a| a.ip() == Some(ip));
    assert!(addr.is_some(), "IPv6 address should be assigned");

    let addr = addr.unwrap();
    assert_eq!(addr.prefix_len(), 64);
    assert!(addr.is_ipv6());

    Ok(())
}

#[tokio::test]
async fn test_ipv4_broadcast_is_derived() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_veth_ns("bcast").await?;

    let ip = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    conn.add_ip_address("ceth0", ip, 24).await?;

    let addrs = conn.get_addresses_for("ceth0").await?;
    let addr = addrs.iter().find(|a| a.ip() == Some(ip)).unwrap();

    let bcast = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 255));
    assert_eq!(addr.broadcast(), Some(&bcast));

    Ok(())
}

#[tokio::test]
async fn test_get_addresses_for_interface() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_veth_ns("addrscope").await?;

    conn.add_ip_address("ceth0", "10.22.0.7".parse().unwrap(), 24)
        .await?;
    conn.add_ip_address("hveth0", "10.23.0.1".parse().unwrap(), 24)
        .await?;

    // Only ceth0's address, ignoring IPv6 link-locals
    let addrs = conn.get_addresses_for("ceth0").await?;
    let v4: Vec<_> = addrs.iter().filter(|a| a.is_ipv4()).collect();
    assert_eq!(v4.len(), 1);
    assert_eq!(v4[0].ip(), Some(IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7))));

    Ok(())
}

#[tokio::test]
async fn test_loopback_address() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("loaddr")?;
    let conn = ns.connection()?;

    conn.set_link_up("lo").await?;

    let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2));
    conn.add_ip_address("lo", ip, 8).await?;

    let addrs = conn.get_addresses_for("lo").await?;
    assert!(addrs.iter().any(|a| a.ip() == Some(ip)));

    Ok(())
}
