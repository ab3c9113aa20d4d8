//! Static routing table with longest-prefix-match lookup.

use crate::core::repr::Ipv4Address;

/// A destination prefix mapped to an egress interface and optional gateway.
///
/// A `gateway` of `None` marks an on-link route: the next hop is the
/// destination address itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub prefix: Ipv4Address,
    pub mask: Ipv4Address,
    pub gateway: Option<Ipv4Address>,
    pub iface_name: String,
}

impl RouteEntry {
    fn matches(&self, addr: Ipv4Address) -> bool {
        addr.as_u32() & self.mask.as_u32() == self.prefix.as_u32() & self.mask.as_u32()
    }

    fn mask_len(&self) -> u32 {
        self.mask.as_u32().count_ones()
    }

    /// Returns the next hop for a destination covered by this entry.
    pub fn next_hop(&self, dst_addr: Ipv4Address) -> Ipv4Address {
        self.gateway.unwrap_or(dst_addr)
    }
}

/// An ordered set of routes, loaded once at startup and never mutated,
/// so concurrent lookups need no synchronization.
#[derive(Clone, Debug, Default)]
pub struct RoutingTable {
    entries: Vec<RouteEntry>,
}

impl RoutingTable {
    pub fn new() -> RoutingTable {
        RoutingTable {
            entries: Vec::new(),
        }
    }

    pub fn add_route(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }

    /// Finds the most specific entry covering an address. Ties among equal
    /// mask lengths go to the earliest inserted entry.
    pub fn lookup(&self, addr: Ipv4Address) -> Option<&RouteEntry> {
        let mut best: Option<&RouteEntry> = None;

        for entry in self.entries.iter().filter(|entry| entry.matches(addr)) {
            match best {
                Some(prev) if entry.mask_len() <= prev.mask_len() => {}
                _ => best = Some(entry),
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: [u8; 4], mask: [u8; 4], iface_name: &str) -> RouteEntry {
        RouteEntry {
            prefix: Ipv4Address::new(prefix),
            mask: Ipv4Address::new(mask),
            gateway: None,
            iface_name: iface_name.to_string(),
        }
    }

    #[test]
    fn test_lookup_no_match() {
        let mut table = RoutingTable::new();
        table.add_route(route([10, 0, 0, 0], [255, 0, 0, 0], "eth0"));
        assert!(table.lookup(Ipv4Address::new([192, 168, 1, 1])).is_none());
    }

    #[test]
    fn test_lookup_prefers_longest_prefix() {
        let mut table = RoutingTable::new();
        table.add_route(route([10, 0, 0, 0], [255, 0, 0, 0], "eth0"));
        table.add_route(route([10, 1, 0, 0], [255, 255, 0, 0], "eth1"));

        let entry = table.lookup(Ipv4Address::new([10, 1, 2, 3])).unwrap();
        assert_eq!(entry.iface_name, "eth1");

        let entry = table.lookup(Ipv4Address::new([10, 2, 2, 3])).unwrap();
        assert_eq!(entry.iface_name, "eth0");
    }

    #[test]
    fn test_lookup_tie_takes_first_inserted() {
        let mut table = RoutingTable::new();
        table.add_route(route([10, 1, 0, 0], [255, 255, 0, 0], "eth0"));
        table.add_route(route([10, 1, 0, 0], [255, 255, 0, 0], "eth1"));

        let entry = table.lookup(Ipv4Address::new([10, 1, 2, 3])).unwrap();
        assert_eq!(entry.iface_name, "eth0");
    }

    #[test]
    fn test_default_route() {
        let mut table = RoutingTable::new();
        table.add_route(RouteEntry {
            prefix: Ipv4Address::new([0, 0, 0, 0]),
            mask: Ipv4Address::new([0, 0, 0, 0]),
            gateway: Some(Ipv4Address::new([10, 0, 0, 254])),
            iface_name: "eth0".to_string(),
        });

        let dst = Ipv4Address::new([8, 8, 8, 8]);
        let entry = table.lookup(dst).unwrap();
        assert_eq!(entry.next_hop(dst), Ipv4Address::new([10, 0, 0, 254]));
    }

    #[test]
    fn test_on_link_next_hop_is_destination() {
        let entry = route([10, 0, 0, 0], [255, 0, 0, 0], "eth0");
        let dst = Ipv4Address::new([10, 0, 0, 9]);
        assert_eq!(entry.next_hop(dst), dst);
    }
}
