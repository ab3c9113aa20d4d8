use log::debug;

use crate::{
    Error,
    Result,
};
use crate::core::arp_cache::PendingPacket;
use crate::core::iface::Interface;
use crate::core::repr::{
    eth_types,
    ipv4_protocols,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
};
use crate::core::services::{
    arp,
    ethernet,
    icmpv4,
    Router,
};
use crate::core::time::Clock;

/// Receives an IPv4 packet from an interface.
///
/// Malformed packets and checksum failures are dropped without a response.
/// Packets addressed to one of the router's own interfaces are delivered
/// locally; everything else enters the forwarding path.
pub fn recv_packet<C: Clock>(
    router: &Router<C>,
    iface: &Interface,
    ipv4_buffer: &[u8],
) -> Result<()> {
    let ipv4_packet = Ipv4Packet::try_new(ipv4_buffer)?;
    ipv4_packet.check_encoding()?;

    if router.ifaces().is_local_addr(ipv4_packet.dst_addr()) {
        recv_local(router, iface, &ipv4_packet)
    } else {
        forward(router, iface, &ipv4_packet)
    }
}

/// Local delivery for traffic addressed to the router itself.
fn recv_local<C: Clock>(
    router: &Router<C>,
    iface: &Interface,
    ipv4_packet: &Ipv4Packet<&[u8]>,
) -> Result<()> {
    match ipv4_packet.protocol() {
        ipv4_protocols::ICMP => icmpv4::recv_packet(router, ipv4_packet),
        ipv4_protocols::TCP | ipv4_protocols::UDP => {
            debug!(
                "{} datagram from {} for the router itself; sending port unreachable.",
                if ipv4_packet.protocol() == ipv4_protocols::TCP {
                    "TCP"
                } else {
                    "UDP"
                },
                ipv4_packet.src_addr()
            );
            icmpv4::send_port_unreachable(router, iface, ipv4_packet)
        }
        i => {
            debug!("Ignoring IPv4 packet with protocol {} to the router.", i);
            Err(Error::Ignored)
        }
    }
}

/// The transit path: TTL and checksum rewrite, route lookup, next hop
/// resolution, transmission. The received buffer is never edited; the
/// forwarded packet is a fresh, rewritten copy.
fn forward<C: Clock>(
    router: &Router<C>,
    arrival: &Interface,
    ipv4_packet: &Ipv4Packet<&[u8]>,
) -> Result<()> {
    if ipv4_packet.ttl() <= 1 {
        debug!(
            "TTL expired forwarding {} -> {}; sending time exceeded.",
            ipv4_packet.src_addr(),
            ipv4_packet.dst_addr()
        );
        return icmpv4::send_time_exceeded(router, arrival, ipv4_packet);
    }

    let route = match router.routes().lookup(ipv4_packet.dst_addr()) {
        Some(route) => route,
        None => {
            debug!(
                "No route to {}; sending net unreachable.",
                ipv4_packet.dst_addr()
            );
            return icmpv4::send_net_unreachable(router, arrival, ipv4_packet);
        }
    };

    let egress = match router.ifaces().get(&route.iface_name) {
        Some(egress) => egress,
        None => {
            debug!("Route for {} names unknown interface {}.", ipv4_packet.dst_addr(), route.iface_name);
            return Err(Error::Ignored);
        }
    };

    let mut datagram = ipv4_packet.as_ref()[.. ipv4_packet.total_len()].to_vec();
    {
        let mut rewritten = Ipv4Packet::try_new(&mut datagram[..])?;
        rewritten.set_ttl(ipv4_packet.ttl() - 1);
        rewritten.fill_checksum();
    }

    let next_hop = route.next_hop(ipv4_packet.dst_addr());
    transmit_datagram(router, &arrival.name, egress, next_hop, datagram)
}

/// Hands a ready IPv4 datagram to the link layer: transmitted immediately
/// when the next hop's MAC is cached, queued behind an ARP resolution
/// otherwise.
pub(crate) fn transmit_datagram<C: Clock>(
    router: &Router<C>,
    arrival_iface: &str,
    egress: &Interface,
    next_hop: Ipv4Address,
    datagram: Vec<u8>,
) -> Result<()> {
    if let Some(dst_mac) = router.lookup_mapping(next_hop) {
        return transmit_resolved(router, egress, dst_mac, &datagram);
    }

    let pending = PendingPacket {
        datagram,
        arrival_iface: arrival_iface.to_string(),
    };

    if router.queue_pending(next_hop, &egress.name, pending) {
        arp::send_request(router, egress, next_hop)?;
    }

    Err(Error::Unresolved)
}

/// Wraps a resolved datagram in an Ethernet frame and transmits it.
pub(crate) fn transmit_resolved<C: Clock>(
    router: &Router<C>,
    egress: &Interface,
    dst_mac: EthernetAddress,
    datagram: &[u8],
) -> Result<()> {
    let eth_frame_len = EthernetFrame::<&[u8]>::buffer_len(datagram.len());

    ethernet::send_frame(router, egress, eth_frame_len, |eth_frame| {
        eth_frame.set_dst_addr(dst_mac);
        eth_frame.set_payload_type(eth_types::IPV4);
        eth_frame.payload_mut().copy_from_slice(datagram);
    })
}

/// Builds and sends a router-originated IPv4 datagram.
///
/// The caller fills in only the payload; the header is serialized from the
/// repr, and the finished datagram is routed and resolved like any other.
pub fn send_datagram<C, F>(router: &Router<C>, ipv4_repr: &Ipv4Repr, f: F) -> Result<()>
where
    C: Clock,
    F: FnOnce(&mut [u8]),
{
    let route = match router.routes().lookup(ipv4_repr.dst_addr) {
        Some(route) => route,
        None => {
            debug!("No route for generated datagram to {}.", ipv4_repr.dst_addr);
            return Err(Error::NoRoute);
        }
    };

    let egress = router
        .ifaces()
        .get(&route.iface_name)
        .ok_or(Error::Ignored)?;

    let mut datagram = vec![0; ipv4_repr.buffer_len()];
    {
        let mut ipv4_packet = Ipv4Packet::try_new(&mut datagram[..])?;
        // Serialize the header before touching the payload so the header
        // length governs where the payload region sits.
        ipv4_repr.serialize(&mut ipv4_packet);
        f(ipv4_packet.payload_mut());
    }

    let next_hop = route.next_hop(ipv4_repr.dst_addr);
    transmit_datagram(router, &egress.name, egress, next_hop, datagram)
}
