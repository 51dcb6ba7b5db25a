//! Route integration tests.
//!
//! Route management using real network namespaces.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use cnilink::netlink::link::Veth;
use cnilink::netlink::route::IpRoute;
use cnilink::netlink::types::route::{RouteProtocol, RouteScope, RouteType, rt_table};
use cnilink::{Connection, Result};

use crate::common::TestNamespace;

/// Set up a namespace with an addressed veth pair, both ends up.
///
/// `ceth0` carries 10.22.0.7/24, so 10.22.0.0/24 gateways resolve.
async fn setup_routed_ns(prefix: &str) -> Result<(TestNamespace, Connection)> {
    let ns = TestNamespace::new(prefix)?;
    let conn = ns.connection()?;

    conn.add_link(Veth::new("hveth0", "ceth0")).await?;
    conn.set_link_up("hveth0").await?;
    conn.set_link_up("ceth0").await?;
    conn.add_ip_address("ceth0", "10.22.0.7".parse().unwrap(), 24)
        .await?;

    Ok((ns, conn))
}

#[tokio::test]
async fn test_add_route_via_interface() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtdev").await?;

    conn.add_route(IpRoute::new("10.1.0.0".parse().unwrap(), 16).dev("ceth0"))
        .await?;

    let routes = conn.get_routes().await?;
    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0));
    let route = routes
        .iter()
        .find(|r| r.destination() == Some(&target) && r.dst_len() == 16);
    assert!(route.is_some(), "route should exist");

    let route = route.unwrap();
    assert_eq!(route.route_type(), RouteType::Unicast);
    assert_eq!(route.protocol(), RouteProtocol::Static);
    assert_eq!(route.table_id(), rt_table::MAIN as u32);

    Ok(())
}

#[tokio::test]
async fn test_add_route_via_gateway() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtgw").await?;

    let gw = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 1));
    conn.add_route(IpRoute::new("10.96.0.0".parse().unwrap(), 16).gateway(gw))
        .await?;

    let routes = conn.get_routes().await?;
    let target = IpAddr::V4(Ipv4Addr::new(10, 96, 0, 0));
    let route = routes
        .iter()
        .find(|r| r.destination() == Some(&target) && r.dst_len() == 16);
    assert!(route.is_some(), "route should exist");
    assert_eq!(route.unwrap().gateway(), Some(&gw));

    Ok(())
}

#[tokio::test]
async fn test_default_route() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtdefault").await?;

    let gw = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 1));
    conn.add_route(IpRoute::default_route(gw)).await?;

    let routes = conn.get_routes().await?;
    let default = routes.iter().find(|r| r.is_default() && r.is_ipv4());
    assert!(default.is_some(), "default route should exist");

    let default = default.unwrap();
    assert_eq!(default.gateway(), Some(&gw));
    assert!(default.has_gateway());
    assert_eq!(default.destination_str(), "default");

    Ok(())
}

#[tokio::test]
async fn test_route_with_priority_and_source() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtmetric").await?;

    let src = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    conn.add_route(
        IpRoute::new("10.1.0.0".parse().unwrap(), 16)
            .dev("ceth0")
            .prefsrc(src)
            .priority(100),
    )
    .await?;

    let routes = conn.get_routes().await?;
    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0));
    let route = routes
        .iter()
        .find(|r| r.destination() == Some(&target) && r.dst_len() == 16);
    assert!(route.is_some());

    let route = route.unwrap();
    assert_eq!(route.prefsrc(), Some(&src));
    assert_eq!(route.priority(), Some(100));

    Ok(())
}

#[tokio::test]
async fn test_route_in_custom_table() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rttable").await?;

    // Table IDs above 255 only fit in the RTA_TABLE attribute
    conn.add_route(
        IpRoute::new("10.1.0.0".parse().unwrap(), 16)
            .dev("ceth0")
            .table(1000),
    )
    .await?;

    let routes = conn.get_routes_for(1000).await?;
    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0));
    let route = routes.iter().find(|r| r.destination() == Some(&target));
    assert!(route.is_some(), "route should be in table 1000");
    assert_eq!(route.unwrap().table_id(), 1000);

    // And not in the main table
    let main = conn.get_routes_for(rt_table::MAIN as u32).await?;
    assert!(!main.iter().any(|r| r.destination() == Some(&target)));

    Ok(())
}

#[tokio::test]
async fn test_add_route_is_idempotent() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtidem").await?;

    let route = IpRoute::new("10.1.0.0".parse().unwrap(), 16).dev("ceth0");
    conn.add_route(route.clone()).await?;
    conn.add_route(route).await?;

    let routes = conn.get_routes().await?;
    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0));
    let matching: Vec<_> = routes
        .iter()
        .filter(|r| r.destination() == Some(&target) && r.dst_len() == 16)
        .collect();
    assert_eq!(matching.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_route() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtdel").await?;

    conn.add_route(IpRoute::new("10.1.0.0".parse().unwrap(), 16).dev("ceth0"))
        .await?;

    let target = IpAddr::V4(Ipv4Addr::new(10, 1, 0, 0));
    let routes = conn.get_routes().await?;
    assert!(routes.iter().any(|r| r.destination() == Some(&target)));

    conn.del_route(IpRoute::new("10.1.0.0".parse().unwrap(), 16))
        .await?;

    let routes = conn.get_routes().await?;
    assert!(
        !routes.iter().any(|r| r.destination() == Some(&target)),
        "route should be gone"
    );

    // Deleting a route that is no longer present succeeds
    conn.del_route(IpRoute::new("10.1.0.0".parse().unwrap(), 16))
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_ipv6_route() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtv6").await?;

    conn.add_route(IpRoute::new("fd00:99::".parse().unwrap(), 64).dev("ceth0"))
        .await?;

    let routes = conn.get_routes().await?;
    let target = IpAddr::V6("fd00:99::".parse::<Ipv6Addr>().unwrap());
    let route = routes
        .iter()
        .find(|r| r.destination() == Some(&target) && r.dst_len() == 64);
    assert!(route.is_some(), "IPv6 route should exist");
    assert!(route.unwrap().is_ipv6());

    Ok(())
}

#[tokio::test]
async fn test_connected_route_auto_created() -> Result<()> {
    require_root!();

    let (_ns, conn) = setup_routed_ns("rtconn").await?;

    // Adding 10.22.0.7/24 installs the connected subnet route
    let routes = conn.get_routes().await?;
    let subnet = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 0));
    let route = routes
        .iter()
        .find(|r| r.destination() == Some(&subnet) && r.dst_len() == 24);
    assert!(route.is_some(), "connected route should be auto-created");

    let route = route.unwrap();
    assert_eq!(route.protocol(), RouteProtocol::Kernel);
    assert_eq!(route.scope(), RouteScope::Link);

    let src = IpAddr::V4(Ipv4Addr::new(10, 22, 0, 7));
    assert_eq!(route.prefsrc(), Some(&src));

    Ok(())
}
