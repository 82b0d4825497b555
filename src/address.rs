//! Transport-address predicates (spec.md §4.A).

/// An IP address family, distinguishing how many leading bytes of
/// [`TransportAddress::address`] are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    fn address_len(self) -> usize {
        match self {
            Family::V4 => 4,
            Family::V6 => 16,
        }
    }
}

/// A transport-layer address: family, port, and a 16-byte buffer holding
/// either a 4-byte IPv4 address or a full 16-byte IPv6 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportAddress {
    pub family: Family,
    pub port: u16,
    pub address: [u8; 16],
}

impl TransportAddress {
    pub fn new_v4(octets: [u8; 4], port: u16) -> Self {
        let mut address = [0u8; 16];
        address[..4].copy_from_slice(&octets);
        Self {
            family: Family::V4,
            port,
            address,
        }
    }

    pub fn new_v6(octets: [u8; 16], port: u16) -> Self {
        Self {
            family: Family::V6,
            port,
            address: octets,
        }
    }

    fn significant_address(&self) -> &[u8] {
        &self.address[..self.family.address_len()]
    }
}

/// `SameTransportAddress(a, b)`: family, port, and address bytes all match.
pub fn same_transport_address(a: &TransportAddress, b: &TransportAddress) -> bool {
    a.family == b.family && a.port == b.port && a.significant_address() == b.significant_address()
}

/// `SameIpAddress(a, b)`: family and address bytes match; port is ignored.
pub fn same_ip_address(a: &TransportAddress, b: &TransportAddress) -> bool {
    a.family == b.family && a.significant_address() == b.significant_address()
}

/// One network vantage point: an address plus whether it is known to be
/// directly reachable on the same link as its peer (point-to-point),
/// which zeroes the local-preference term of the priority formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub transport_address: TransportAddress,
    pub is_point_to_point: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_transport_address_checks_family_port_and_bytes() {
        let a = TransportAddress::new_v4([192, 0, 2, 1], 1234);
        let b = TransportAddress::new_v4([192, 0, 2, 1], 1234);
        let c = TransportAddress::new_v4([192, 0, 2, 1], 1235);
        assert!(same_transport_address(&a, &b));
        assert!(!same_transport_address(&a, &c));
    }

    #[test]
    fn same_ip_address_ignores_port() {
        let a = TransportAddress::new_v4([192, 0, 2, 1], 1234);
        let b = TransportAddress::new_v4([192, 0, 2, 1], 4321);
        assert!(same_ip_address(&a, &b));
    }

    #[test]
    fn v4_and_v6_never_match_even_with_same_leading_bytes() {
        let a = TransportAddress::new_v4([192, 0, 2, 1], 1234);
        let mut v6 = [0u8; 16];
        v6[..4].copy_from_slice(&[192, 0, 2, 1]);
        let b = TransportAddress::new_v6(v6, 1234);
        assert!(!same_transport_address(&a, &b));
        assert!(!same_ip_address(&a, &b));
    }
}
