//! IPv4 VPN subnet allocation: the server takes the first host address and
//! the single client the second.

use crate::error::AdminError;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VpnSubnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl VpnSubnet {
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Usable host addresses. /31 and /32 have no network or broadcast address.
    pub fn host_count(&self) -> u64 {
        match self.prefix_len {
            32 => 1,
            31 => 2,
            prefix => (1u64 << (32 - prefix)) - 2,
        }
    }

    fn host(&self, index: u32) -> Option<Ipv4Addr> {
        if u64::from(index) >= self.host_count() {
            return None;
        }
        let first = if self.prefix_len >= 31 { 0 } else { 1 };
        Some(Ipv4Addr::from(u32::from(self.network) + first + index))
    }

    pub fn server_ip(&self) -> Ipv4Addr {
        // Every parsed subnet has at least two hosts
        self.host(0).unwrap_or(self.network)
    }

    pub fn client_ip(&self) -> Ipv4Addr {
        self.host(1).unwrap_or(self.network)
    }
}

impl fmt::Display for VpnSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Host bits are cleared, so `10.0.10.7/24` parses as `10.0.10.0/24`
impl FromStr for VpnSubnet {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| AdminError::InvalidInput(format!("Invalid subnet {s:?}: {reason}"));

        let (address, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected CIDR notation such as 10.0.10.0/24"))?;
        let address: Ipv4Addr = address.parse().map_err(|_| invalid("not an IPv4 address"))?;
        let prefix_len: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| invalid("prefix length must be 0-32"))?;

        let mask = if prefix_len == 0 {
            0
        } else {
            u32::MAX << (32 - prefix_len)
        };
        let subnet = Self {
            network: Ipv4Addr::from(u32::from(address) & mask),
            prefix_len,
        };

        if subnet.host_count() < 2 {
            return Err(AdminError::InvalidInput(
                "Subnet too small, need at least 2 addresses.".into(),
            ));
        }
        Ok(subnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slash_24() {
        let subnet: VpnSubnet = "10.0.10.0/24".parse().unwrap();
        assert_eq!(subnet.prefix_len(), 24);
        assert_eq!(subnet.host_count(), 254);
        assert_eq!(subnet.server_ip(), Ipv4Addr::new(10, 0, 10, 1));
        assert_eq!(subnet.client_ip(), Ipv4Addr::new(10, 0, 10, 2));
    }

    #[test]
    fn test_host_bits_are_cleared() {
        let subnet: VpnSubnet = "192.168.50.77/28".parse().unwrap();
        assert_eq!(subnet.to_string(), "192.168.50.64/28");
        assert_eq!(subnet.server_ip(), Ipv4Addr::new(192, 168, 50, 65));
    }

    #[test]
    fn test_point_to_point_subnet() {
        let subnet: VpnSubnet = "10.9.0.0/31".parse().unwrap();
        assert_eq!(subnet.server_ip(), Ipv4Addr::new(10, 9, 0, 0));
        assert_eq!(subnet.client_ip(), Ipv4Addr::new(10, 9, 0, 1));
    }

    #[test]
    fn test_rejects_small_and_malformed() {
        assert!("10.0.0.1/32".parse::<VpnSubnet>().is_err());
        assert!("10.0.0.0".parse::<VpnSubnet>().is_err());
        assert!("10.0.0.0/33".parse::<VpnSubnet>().is_err());
        assert!("fd00::/64".parse::<VpnSubnet>().is_err());
        assert!("10.0.0.0/30".parse::<VpnSubnet>().is_ok());
    }
}
