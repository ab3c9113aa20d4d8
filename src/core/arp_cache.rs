//! IPv4 to Ethernet address resolution state.
//!
//! Each destination IP is in exactly one of three states: absent, pending
//! resolution with a FIFO queue of packets waiting on it, or resolved with
//! an expiring mapping. The cache does no I/O of its own; `queue` and
//! `sweep` tell the caller which ARP requests to broadcast and which queued
//! packets to fail, so all transmission stays in the service layer and all
//! mutation happens under the caller's single lock.

use std::collections::{
    HashMap,
    VecDeque,
};
use std::time::{
    Duration,
    Instant,
};

use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};
use crate::core::time::{
    Clock,
    SystemClock,
};

/// An IPv4 datagram already rewritten for transmission, waiting only on
/// link address resolution. Owned by exactly one pending entry until it is
/// drained or dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPacket {
    /// The full IPv4 datagram to transmit once the next hop resolves.
    pub datagram: Vec<u8>,
    /// Interface the triggering packet arrived on, for addressing an ICMP
    /// error back to its source if resolution fails.
    pub arrival_iface: String,
}

#[derive(Debug)]
enum State {
    Resolved {
        mac: EthernetAddress,
        since: Instant,
    },
    Pending {
        /// ARP requests broadcast for this entry so far.
        sent: usize,
        last_sent: Instant,
        egress_iface: String,
        queue: VecDeque<PendingPacket>,
    },
}

/// The outcome of one sweep pass.
#[derive(Debug, Default)]
pub struct Sweep {
    /// (next hop, egress interface) pairs whose ARP request must be
    /// re-broadcast.
    pub retries: Vec<(Ipv4Address, String)>,
    /// Entries that exhausted their requests, with their surrendered queues.
    pub failures: Vec<(Ipv4Address, Vec<PendingPacket>)>,
}

/// Maintains an expiring set of IPv4 -> Ethernet address mappings together
/// with the queues of packets awaiting resolution.
#[derive(Debug)]
pub struct ArpCache<T = SystemClock>
where
    T: Clock,
{
    entries: HashMap<Ipv4Address, State>,
    expiration: Duration,
    retry_interval: Duration,
    max_requests: usize,
    clock: T,
}

impl<T: Clock> ArpCache<T> {
    /// Creates an ARP cache. Resolved mappings expire after `expiration`;
    /// a pending entry is re-requested every `retry_interval` until
    /// `max_requests` requests have gone unanswered.
    pub fn new(
        expiration: Duration,
        retry_interval: Duration,
        max_requests: usize,
        clock: T,
    ) -> ArpCache<T> {
        ArpCache {
            entries: HashMap::new(),
            expiration,
            retry_interval,
            max_requests,
            clock,
        }
    }

    /// Looks up the Ethernet address for an IPv4 address. Hits only on an
    /// unexpired resolved mapping.
    pub fn lookup(&self, ipv4_addr: Ipv4Address) -> Option<EthernetAddress> {
        match self.entries.get(&ipv4_addr) {
            Some(State::Resolved { mac, since })
                if self.clock.now().duration_since(*since) <= self.expiration =>
            {
                Some(*mac)
            }
            _ => None,
        }
    }

    /// Installs a resolved mapping, completing any pending resolution for
    /// the address. Returns the packets that were waiting on it, in the
    /// order they were queued; the caller transmits them.
    pub fn learn(
        &mut self,
        ipv4_addr: Ipv4Address,
        mac: EthernetAddress,
    ) -> Vec<PendingPacket> {
        let drained = match self.entries.remove(&ipv4_addr) {
            Some(State::Pending { queue, .. }) => queue.into_iter().collect(),
            _ => Vec::new(),
        };

        self.entries.insert(
            ipv4_addr,
            State::Resolved {
                mac,
                since: self.clock.now(),
            },
        );

        drained
    }

    /// Appends a packet to the pending queue for an unresolved address,
    /// creating the entry if needed. Returns `true` exactly when the caller
    /// must broadcast an ARP request now: on entry creation, or when the
    /// retry interval has elapsed since the last request.
    pub fn queue(
        &mut self,
        ipv4_addr: Ipv4Address,
        egress_iface: &str,
        packet: PendingPacket,
    ) -> bool {
        let now = self.clock.now();

        match self.entries.get_mut(&ipv4_addr) {
            Some(State::Pending {
                sent,
                last_sent,
                queue,
                ..
            }) => {
                queue.push_back(packet);
                if now.duration_since(*last_sent) >= self.retry_interval {
                    *sent += 1;
                    *last_sent = now;
                    true
                } else {
                    false
                }
            }
            _ => {
                // No entry, or a mapping that has since expired.
                let mut queue = VecDeque::new();
                queue.push_back(packet);
                self.entries.insert(
                    ipv4_addr,
                    State::Pending {
                        sent: 1,
                        last_sent: now,
                        egress_iface: egress_iface.to_string(),
                        queue,
                    },
                );
                true
            }
        }
    }

    /// Runs one maintenance pass: expired resolved mappings are purged, and
    /// every pending entry past the retry interval is either scheduled for
    /// another request or, once `max_requests` have gone unanswered,
    /// removed with its queue handed back for failure delivery.
    pub fn sweep(&mut self) -> Sweep {
        let now = self.clock.now();
        let mut report = Sweep::default();
        let mut dead = Vec::new();

        for (ipv4_addr, state) in self.entries.iter_mut() {
            match state {
                State::Resolved { since, .. } => {
                    if now.duration_since(*since) > self.expiration {
                        dead.push(*ipv4_addr);
                    }
                }
                State::Pending {
                    sent,
                    last_sent,
                    egress_iface,
                    queue,
                } => {
                    if now.duration_since(*last_sent) < self.retry_interval {
                        continue;
                    }
                    if *sent < self.max_requests {
                        *sent += 1;
                        *last_sent = now;
                        report.retries.push((*ipv4_addr, egress_iface.clone()));
                    } else {
                        report
                            .failures
                            .push((*ipv4_addr, queue.drain(..).collect()));
                        dead.push(*ipv4_addr);
                    }
                }
            }
        }

        for ipv4_addr in dead {
            self.entries.remove(&ipv4_addr);
        }

        report
    }
}
