//! Instance identity derived from the outbound network address.

use crate::error::{ClusterError, ClusterErrorExt};
use std::net::IpAddr;
use tokio::net::UdpSocket;

/// Routable address used only to pick the outbound interface. Nothing is sent.
const PROBE_ADDR: &str = "8.8.8.8:80";

/// Keeps the last ten decimal digits of the address.
const NODE_ID_MODULUS: u128 = 10_000_000_000;

/// Folds an address into a node id: the IPv6 (IPv4-mapped for v4) value in decimal,
/// truncated to its last ten digits.
#[must_use]
pub fn node_id_from_ip(ip: IpAddr) -> i64 {
    let v6 = match ip {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    };
    let folded = u128::from(v6) % NODE_ID_MODULUS;
    // below 10^10, always fits
    i64::try_from(folded).unwrap_or(i64::MAX)
}

/// Local address of the interface that routes to the outside world.
///
/// # Errors
/// Returns [`ClusterError::Io`] if no socket can be bound or no route exists.
pub async fn outbound_ip() -> Result<IpAddr, ClusterError> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.context("Binding probe socket")?;
    socket.connect(PROBE_ADDR).await.context("Resolving outbound route")?;
    Ok(socket.local_addr().context("Reading local address")?.ip())
}

/// Node id of this process.
///
/// # Errors
/// See [`outbound_ip`].
pub async fn local_node_id() -> Result<i64, ClusterError> {
    outbound_ip().await.map(node_id_from_ip)
}
