//! Parsing of `ip -o -4 addr show`.

/// Name prefixes of loopback, WireGuard, docker bridge and docker interfaces
const SKIPPED_PREFIXES: &[&str] = &["lo", "wg", "br-", "docker"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub name: String,
    /// Address with prefix, e.g. `192.168.1.10/24`
    pub address: String,
}

/// Interfaces that can carry NAT'd VPN traffic out of the host
pub fn parse_ip_addr_output(output: &str) -> Vec<NetInterface> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            // veth names carry their peer as `eth0@if12`
            let name = parts[1].split('@').next().unwrap_or(parts[1]);
            if SKIPPED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
                return None;
            }
            Some(NetInterface {
                name: name.to_string(),
                address: parts[3].to_string(),
            })
        })
        .collect()
}
