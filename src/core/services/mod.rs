//! Packet processing services for different network layers.
//!
//! The `services` module deals with packet reception, forwarding, and
//! transmission logic at different layers of the router, all hanging off a
//! single [`Router`] context.

pub mod arp;
pub mod ethernet;
pub mod icmpv4;
pub mod ipv4;

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};
use std::thread::{
    self,
    JoinHandle,
};
use std::time::Duration;

use log::debug;

use crate::Result;
use crate::core::arp_cache::{
    ArpCache,
    PendingPacket,
};
use crate::core::dev::Device;
use crate::core::iface::Interfaces;
use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
    Ipv4Packet,
};
use crate::core::route::RoutingTable;
use crate::core::time::{
    Clock,
    SystemClock,
};

/// Tunable constants for generated traffic and ARP resolution.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// TTL of datagrams the router originates (echo replies, ICMP errors).
    pub icmp_ttl: u8,
    /// Total ARP requests to broadcast for one next hop before failing its
    /// queued packets.
    pub arp_max_requests: usize,
    /// Minimum spacing between ARP requests for one next hop.
    pub arp_retry_interval: Duration,
    /// Lifetime of a resolved ARP mapping.
    pub arp_expiration: Duration,
    /// Period of the background cache sweep.
    pub sweep_period: Duration,
}

impl Default for RouterConfig {
    fn default() -> RouterConfig {
        RouterConfig {
            icmp_ttl: 64,
            arp_max_requests: 5,
            arp_retry_interval: Duration::from_secs(1),
            arp_expiration: Duration::from_secs(60),
            sweep_period: Duration::from_secs(1),
        }
    }
}

/// All router state, constructed once at startup and shared between the
/// receive path and the sweep task.
///
/// The interface registry and routing table are read-only after
/// construction. The ARP cache is the only shared mutable state; every
/// mutation happens under its mutex, and the cache lock is never held
/// across a device transmit.
pub struct Router<C = SystemClock>
where
    C: Clock,
{
    ifaces: Interfaces,
    routes: RoutingTable,
    arp_cache: Mutex<ArpCache<C>>,
    dev: Mutex<Box<dyn Device + Send>>,
    config: RouterConfig,
}

impl Router<SystemClock> {
    pub fn new(
        ifaces: Interfaces,
        routes: RoutingTable,
        dev: Box<dyn Device + Send>,
        config: RouterConfig,
    ) -> Router<SystemClock> {
        Router::with_clock(ifaces, routes, dev, config, SystemClock::new())
    }
}

impl<C: Clock> Router<C> {
    pub fn with_clock(
        ifaces: Interfaces,
        routes: RoutingTable,
        dev: Box<dyn Device + Send>,
        config: RouterConfig,
        clock: C,
    ) -> Router<C> {
        let arp_cache = ArpCache::new(
            config.arp_expiration,
            config.arp_retry_interval,
            config.arp_max_requests,
            clock,
        );

        Router {
            ifaces,
            routes,
            arp_cache: Mutex::new(arp_cache),
            dev: Mutex::new(dev),
            config,
        }
    }

    pub fn ifaces(&self) -> &Interfaces {
        &self.ifaces
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Entry point for one received frame; dispatches by ethertype.
    pub fn handle_frame(&self, frame: &[u8], iface_name: &str) -> Result<()> {
        ethernet::recv_frame(self, frame, iface_name)
    }

    /// Sends a raw frame out via the device collaborator.
    pub(crate) fn transmit(&self, iface_name: &str, frame: &[u8]) -> Result<()> {
        recover(self.dev.lock()).transmit(iface_name, frame)
    }

    pub(crate) fn lookup_mapping(&self, next_hop: Ipv4Address) -> Option<EthernetAddress> {
        recover(self.arp_cache.lock()).lookup(next_hop)
    }

    pub(crate) fn learn_mapping(
        &self,
        addr: Ipv4Address,
        mac: EthernetAddress,
    ) -> Vec<PendingPacket> {
        recover(self.arp_cache.lock()).learn(addr, mac)
    }

    pub(crate) fn queue_pending(
        &self,
        next_hop: Ipv4Address,
        egress_iface: &str,
        packet: PendingPacket,
    ) -> bool {
        recover(self.arp_cache.lock()).queue(next_hop, egress_iface, packet)
    }

    /// Runs one ARP cache maintenance pass: re-broadcasts requests for
    /// pending entries past the retry interval and converts each packet of
    /// an exhausted entry into an ICMP Host Unreachable to its original
    /// source. All emissions are best-effort.
    pub fn sweep(&self) {
        let report = recover(self.arp_cache.lock()).sweep();

        for (next_hop, egress_name) in report.retries {
            if let Some(egress) = self.ifaces.get(&egress_name) {
                debug!("Retrying ARP request for {} on {}.", next_hop, egress_name);
                let _ = arp::send_request(self, egress, next_hop);
            }
        }

        for (next_hop, packets) in report.failures {
            debug!(
                "ARP resolution for {} failed; dropping {} queued packets.",
                next_hop,
                packets.len()
            );
            for pending in packets {
                self.fail_pending(pending);
            }
        }
    }

    /// Answers one unresolvable queued packet with Host Unreachable.
    fn fail_pending(&self, pending: PendingPacket) {
        let packet = match Ipv4Packet::try_new(&pending.datagram[..]) {
            Ok(packet) => packet,
            Err(_) => return,
        };

        // Never generate errors about the router's own datagrams.
        if self.ifaces.is_local_addr(packet.src_addr()) {
            return;
        }

        if let Some(arrival) = self.ifaces.get(&pending.arrival_iface) {
            let _ = icmpv4::send_host_unreachable(self, arrival, &packet);
        }
    }
}

/// Spawns the long-lived background task sweeping the ARP cache on a fixed
/// period. Runs for the rest of the process lifetime.
pub fn spawn_sweep<C>(router: Arc<Router<C>>) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    let period = router.config().sweep_period;

    thread::spawn(move || loop {
        thread::sleep(period);
        router.sweep();
    })
}

/// Takes a guard even from a mutex a panicking thread poisoned; the caches
/// and device stay usable because no invariant spans a poisoned critical
/// section.
fn recover<T>(result: std::sync::LockResult<MutexGuard<T>>) -> MutexGuard<T> {
    match result {
        Ok(guard) => guard,
        Err(err) => err.into_inner(),
    }
}
