//! Link integration tests.
//!
//! Veth, bridge, and link attribute management using real network
//! namespaces.

use std::os::fd::AsRawFd;

use cnilink::Result;
use cnilink::netlink::link::{Bridge, Veth};

use crate::common::TestNamespace;

#[tokio::test]
async fn test_create_veth_pair() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("veth")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    let links = conn.get_links().await?;
    let host = links.iter().find(|l| l.name() == Some("hveth0"));
    let cont = links.iter().find(|l| l.name() == Some("ceth0"));
    assert!(host.is_some(), "host end should exist");
    assert!(cont.is_some(), "container end should exist");

    let host = host.unwrap();
    let cont = cont.unwrap();
    assert_eq!(host.kind(), Some("veth"));
    assert_eq!(cont.kind(), Some("veth"));

    // Each end reports the other as its underlying link
    assert_eq!(host.link(), Some(cont.ifindex()));
    assert_eq!(cont.link(), Some(host.ifindex()));

    Ok(())
}

#[tokio::test]
async fn test_veth_with_options() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("vethopt")?;
    let conn = ns.connection()?;

    let mac = [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x07];
    conn.add_link(Veth::new("hveth0", "ceth0").mtu(1400).address(mac))
        .await?;

    let link = conn.get_link_by_name("hveth0").await?;
    assert!(link.is_some(), "veth should exist");

    let link = link.unwrap();
    assert_eq!(link.mtu(), Some(1400));
    assert_eq!(link.address(), Some(&mac[..]));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_veth_fails() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("vethdup")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    let err = conn
        .add_link(Veth::new("hveth0", "ceth0"))
        .await
        .unwrap_err();
    assert!(
        err.is_already_exists(),
        "duplicate veth should report EEXIST, got: {err}"
    );

    Ok(())
}

#[tokio::test]
async fn test_delete_veth_removes_peer() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("vethdel")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;
    conn.del_link("ceth0").await?;

    // Deleting one end of a veth pair removes both
    let links = conn.get_links().await?;
    assert!(!links.iter().any(|l| l.name() == Some("ceth0")));
    assert!(!links.iter().any(|l| l.name() == Some("hveth0")));

    Ok(())
}

#[tokio::test]
async fn test_delete_missing_link() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("delmiss")?;
    let conn = ns.connection()?;

    // Deleting an interface that never existed succeeds
    conn.del_link("ghost0").await?;
    conn.del_link("ghost0").await?;

    Ok(())
}

#[tokio::test]
async fn test_create_bridge() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("bridge")?;
    let conn = ns.connection()?;

    conn.add_link(Bridge::new("cni0")).await?;

    let bridge = conn.get_link_by_name("cni0").await?;
    assert!(bridge.is_some(), "bridge should exist");
    assert_eq!(bridge.unwrap().kind(), Some("bridge"));

    Ok(())
}

#[tokio::test]
async fn test_bridge_master() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("master")?;
    let conn = ns.connection()?;

    conn.add_link(Bridge::new("cni0")).await?;
    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    conn.set_link_master("hveth0", "cni0").await?;

    let bridge = conn.get_link_by_name("cni0").await?.unwrap();
    let port = conn.get_link_by_name("hveth0").await?.unwrap();
    assert_eq!(
        port.master(),
        Some(bridge.ifindex()),
        "port should report the bridge as master"
    );

    conn.set_link_nomaster("hveth0").await?;

    let port = conn.get_link_by_name("hveth0").await?.unwrap();
    assert_eq!(port.master(), None, "port should be detached");

    Ok(())
}

#[tokio::test]
async fn test_link_up_down() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("updown")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert!(!link.is_up(), "fresh link should be down");

    conn.set_link_up("ceth0").await?;
    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert!(link.is_up(), "link should be up");

    conn.set_link_down("ceth0").await?;
    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert!(!link.is_up(), "link should be down again");

    Ok(())
}

#[tokio::test]
async fn test_set_link_mtu() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("mtu")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;
    conn.set_link_mtu("ceth0", 1400).await?;

    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert_eq!(link.mtu(), Some(1400));

    Ok(())
}

#[tokio::test]
async fn test_rename_link() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("rename")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    // Renaming requires the link down; fresh links start down
    conn.set_link_name("ceth0", "eth0").await?;

    assert!(conn.get_link_by_name("eth0").await?.is_some());
    assert!(conn.get_link_by_name("ceth0").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_set_link_address() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("lladdr")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    let mac = [0x0a, 0x58, 0x0a, 0x16, 0x00, 0x21];
    conn.set_link_address("ceth0", mac).await?;

    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert_eq!(link.address(), Some(&mac[..]));

    Ok(())
}

#[tokio::test]
async fn test_promiscuous_mode() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("promisc")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    conn.set_link_promisc("ceth0", true).await?;
    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert!(link.is_promiscuous(), "promiscuous flag should be set");

    conn.set_link_promisc("ceth0", false).await?;
    let link = conn.get_link_by_name("ceth0").await?.unwrap();
    assert!(!link.is_promiscuous(), "promiscuous flag should be cleared");

    Ok(())
}

#[tokio::test]
async fn test_hairpin_mode() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("hairpin")?;
    let conn = ns.connection()?;

    conn.add_link(Bridge::new("cni0")).await?;
    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    // Hairpin is a bridge port setting, so attach the port first
    conn.set_link_master("hveth0", "cni0").await?;

    conn.set_link_hairpin("hveth0", true).await?;
    conn.set_link_hairpin("hveth0", false).await?;

    Ok(())
}

#[tokio::test]
async fn test_move_link_to_namespace() -> Result<()> {
    require_root!();

    let ns_a = TestNamespace::new("mvsrc")?;
    let ns_b = TestNamespace::new("mvdst")?;
    let conn_a = ns_a.connection()?;
    let conn_b = ns_b.connection()?;

    conn_a.add_link(Veth::new("hveth0", "ceth0")).await?;

    let handle = std::fs::File::open(ns_b.path())?;
    conn_a
        .set_link_netns_fd("ceth0", handle.as_raw_fd())
        .await?;

    // The moved end leaves the source namespace, its peer stays
    assert!(conn_a.get_link_by_name("ceth0").await?.is_none());
    assert!(conn_a.get_link_by_name("hveth0").await?.is_some());
    assert!(
        conn_b.get_link_by_name("ceth0").await?.is_some(),
        "moved end should appear in the target namespace"
    );

    Ok(())
}

#[tokio::test]
async fn test_get_link_by_index() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("byindex")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    let by_name = conn.get_link_by_name("ceth0").await?.unwrap();
    let by_index = conn.get_link_by_index(by_name.ifindex()).await?;
    assert!(by_index.is_some());
    assert_eq!(by_index.unwrap().name(), Some("ceth0"));

    // An index no namespace-fresh interface can have
    assert!(conn.get_link_by_index(9999).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_loopback_is_reported() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("lo")?;
    let conn = ns.connection()?;

    let lo = conn.get_link_by_name("lo").await?;
    assert!(lo.is_some(), "every namespace has a loopback");
    assert!(lo.unwrap().is_loopback());

    conn.set_link_up("lo").await?;
    let lo = conn.get_link_by_name("lo").await?.unwrap();
    assert!(lo.is_up());

    Ok(())
}

#[tokio::test]
async fn test_get_interface_names() -> Result<()> {
    require_root!();

    let ns = TestNamespace::new("names")?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;

    let names = conn.get_interface_names().await?;
    assert!(names.iter().any(|n| n == "lo"));
    assert!(names.iter().any(|n| n == "hveth0"));
    assert!(names.iter().any(|n| n == "ceth0"));

    Ok(())
}
