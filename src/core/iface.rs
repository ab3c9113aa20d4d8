//! The interface registry collaborator.

use std::collections::HashMap;

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};

/// A router-owned link: its name, IPv4 address, subnet mask, and MAC.
///
/// Immutable for the process lifetime.
#[derive(Clone, Debug)]
pub struct Interface {
    pub name: String,
    pub addr: Ipv4Address,
    pub mask: Ipv4Address,
    pub mac: EthernetAddress,
}

/// A read-only name -> interface registry, populated once at startup.
#[derive(Clone, Debug)]
pub struct Interfaces {
    by_name: HashMap<String, Interface>,
}

impl Interfaces {
    pub fn new<I>(ifaces: I) -> Interfaces
    where
        I: IntoIterator<Item = Interface>,
    {
        Interfaces {
            by_name: ifaces
                .into_iter()
                .map(|iface| (iface.name.clone(), iface))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.by_name.get(name)
    }

    /// Checks if an address belongs to one of the router's own interfaces.
    pub fn is_local_addr(&self, addr: Ipv4Address) -> bool {
        self.by_name.values().any(|iface| iface.addr == addr)
    }
}
