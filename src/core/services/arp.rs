use log::debug;

use crate::{
    Error,
    Result,
};
use crate::core::iface::Interface;
use crate::core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Ipv4Address,
};
use crate::core::services::{
    ethernet,
    ipv4,
    Router,
};
use crate::core::time::Clock;

/// Sends an ARP packet out an interface.
pub fn send_packet<C: Clock>(
    router: &Router<C>,
    iface: &Interface,
    arp_repr: &Arp,
    dst_addr: EthernetAddress,
) -> Result<()> {
    let eth_frame_len = EthernetFrame::<&[u8]>::buffer_len(arp_repr.buffer_len());

    ethernet::send_frame(router, iface, eth_frame_len, |eth_frame| {
        eth_frame.set_dst_addr(dst_addr);
        eth_frame.set_payload_type(eth_types::ARP);
        arp_repr.serialize(eth_frame.payload_mut()).unwrap();
    })
}

/// Broadcasts a who-has request for a next hop on an interface.
pub fn send_request<C: Clock>(
    router: &Router<C>,
    iface: &Interface,
    target_addr: Ipv4Address,
) -> Result<()> {
    let arp_repr = Arp {
        op: ArpOp::Request,
        source_hw_addr: iface.mac,
        source_proto_addr: iface.addr,
        target_hw_addr: EthernetAddress::BROADCAST,
        target_proto_addr: target_addr,
    };

    debug!("Sending ARP request for {} on {}.", target_addr, iface.name);
    send_packet(router, iface, &arp_repr, EthernetAddress::BROADCAST)
}

/// Receives an ARP packet from an interface.
///
/// Packets targeting one of the router's addresses teach it the sender's
/// mapping; a completed resolution flushes every queued packet out this
/// interface in arrival order, and a request additionally gets a reply.
pub fn recv_packet<C: Clock>(
    router: &Router<C>,
    iface: &Interface,
    arp_buffer: &[u8],
) -> Result<()> {
    let arp_repr = Arp::deserialize(arp_buffer)?;

    if arp_repr.target_proto_addr != iface.addr {
        debug!(
            "Ignoring ARP with target IPv4 address {}.",
            arp_repr.target_proto_addr
        );
        return Err(Error::Ignored);
    }

    debug!(
        "Learning ARP mapping from {} to {}.",
        arp_repr.source_proto_addr, arp_repr.source_hw_addr
    );
    let drained = router.learn_mapping(arp_repr.source_proto_addr, arp_repr.source_hw_addr);

    // The pending queue drains out the interface the resolution arrived
    // on, which is the one its requests were broadcast from.
    for pending in drained {
        let _ = ipv4::transmit_resolved(router, iface, arp_repr.source_hw_addr, &pending.datagram);
    }

    match arp_repr.op {
        ArpOp::Request => {
            let arp_reply = Arp {
                op: ArpOp::Reply,
                source_hw_addr: iface.mac,
                source_proto_addr: iface.addr,
                target_hw_addr: arp_repr.source_hw_addr,
                target_proto_addr: arp_repr.source_proto_addr,
            };

            debug!(
                "Sending ARP reply to {}/{}.",
                arp_reply.target_proto_addr, arp_reply.target_hw_addr
            );

            send_packet(router, iface, &arp_reply, arp_reply.target_hw_addr)
        }
        ArpOp::Reply => Ok(()),
    }
}
