//! `wg-quick` configuration files for the server and its single client.

use super::subnet::VpnSubnet;
use std::net::{IpAddr, SocketAddr};

pub const CLIENT_DNS: &str = "1.1.1.1";
pub const PERSISTENT_KEEPALIVE: u32 = 25;
pub const INTERFACE_NAME: &str = "wg0";

#[derive(Debug, Clone)]
pub struct TunnelSettings {
    pub subnet: VpnSubnet,
    pub listen_port: u16,
    /// Interface the tunnel is NAT'd out of
    pub public_interface: String,
    /// Host or IP clients connect to
    pub endpoint: String,
}

/// Server side, with forwarding and masquerade rules tied to the interface lifetime
pub fn render_server_conf(settings: &TunnelSettings, server_private_key: &str, client_public_key: &str) -> String {
    let iface = &settings.public_interface;
    let wg = INTERFACE_NAME;
    format!(
        "[Interface]
Address = {server_ip}/{prefix}
ListenPort = {port}
PrivateKey = {server_private_key}
PostUp = sysctl -w net.ipv4.ip_forward=1
PostUp = iptables -A FORWARD -i {wg} -j ACCEPT
PostUp = iptables -A FORWARD -o {wg} -j ACCEPT
PostUp = iptables -t nat -A POSTROUTING -o {iface} -j MASQUERADE
PostDown = iptables -D FORWARD -i {wg} -j ACCEPT
PostDown = iptables -D FORWARD -o {wg} -j ACCEPT
PostDown = iptables -t nat -D POSTROUTING -o {iface} -j MASQUERADE

[Peer]
PublicKey = {client_public_key}
AllowedIPs = {client_ip}/32
",
        server_ip = settings.subnet.server_ip(),
        prefix = settings.subnet.prefix_len(),
        port = settings.listen_port,
        client_ip = settings.subnet.client_ip(),
    )
}

/// `host:port`, bracketing IPv6 literals
fn endpoint_with_port(endpoint: &str, port: u16) -> String {
    let host = endpoint.trim_start_matches('[').trim_end_matches(']');
    match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port).to_string(),
        Err(_) => format!("{endpoint}:{port}"),
    }
}

/// Client side, routing all traffic through the tunnel
pub fn render_client_conf(settings: &TunnelSettings, client_private_key: &str, server_public_key: &str) -> String {
    format!(
        "[Interface]
PrivateKey = {client_private_key}
Address = {client_ip}/{prefix}
DNS = {CLIENT_DNS}

[Peer]
PublicKey = {server_public_key}
Endpoint = {endpoint}
AllowedIPs = 0.0.0.0/0, ::/0
PersistentKeepalive = {PERSISTENT_KEEPALIVE}
",
        client_ip = settings.subnet.client_ip(),
        prefix = settings.subnet.prefix_len(),
        endpoint = endpoint_with_port(&settings.endpoint, settings.listen_port),
    )
}
