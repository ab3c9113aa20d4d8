use log::debug;

use crate::{
    Error,
    Result,
};
use crate::core::iface::Interface;
use crate::core::repr::{
    ipv4_protocols,
    Icmpv4DestinationUnreachable,
    Icmpv4Packet,
    Icmpv4Repr,
    Icmpv4TimeExceeded,
    Ipv4Packet,
    Ipv4Repr,
};
use crate::core::services::{
    ipv4,
    Router,
};
use crate::core::time::Clock;

/// Sends an ICMP message inside a fresh IPv4 datagram.
pub fn send_packet<C, F>(
    router: &Router<C>,
    ipv4_repr: &Ipv4Repr,
    icmp_repr: &Icmpv4Repr,
    f: F,
) -> Result<()>
where
    C: Clock,
    F: FnOnce(&mut [u8]),
{
    ipv4::send_datagram(router, ipv4_repr, |ipv4_payload| {
        let mut icmp_packet = Icmpv4Packet::try_new(ipv4_payload).unwrap();
        f(icmp_packet.payload_mut());
        // The ICMP serialization happens after the payload is written so
        // the checksum covers it.
        icmp_repr.serialize(&mut icmp_packet).unwrap();
    })
}

/// Receives an ICMP packet addressed to the router itself.
///
/// A valid echo request produces a freshly built echo reply; anything else
/// is dropped without a response, as is anything failing validation.
pub fn recv_packet<C: Clock>(router: &Router<C>, ipv4_packet: &Ipv4Packet<&[u8]>) -> Result<()> {
    let icmp_packet = Icmpv4Packet::try_new(ipv4_packet.payload())?;
    icmp_packet.check_encoding()?;

    match Icmpv4Repr::deserialize(&icmp_packet)? {
        Icmpv4Repr::EchoRequest { id, seq } => {
            debug!(
                "Got a ping from {}; sending echo reply.",
                ipv4_packet.src_addr()
            );

            let ipv4_repr = Ipv4Repr {
                src_addr: ipv4_packet.dst_addr(),
                dst_addr: ipv4_packet.src_addr(),
                protocol: ipv4_protocols::ICMP,
                ttl: router.config().icmp_ttl,
                ident: rand::random::<u16>(),
                payload_len: Icmpv4Packet::<&[u8]>::buffer_len(icmp_packet.payload().len()),
            };
            let icmp_repr = Icmpv4Repr::EchoReply { id, seq };
            let echo_payload = icmp_packet.payload();

            send_packet(router, &ipv4_repr, &icmp_repr, |icmp_payload| {
                icmp_payload.copy_from_slice(echo_payload);
            })
        }
        _ => {
            debug!("Ignoring non echo request ICMP packet to the router.");
            Err(Error::Ignored)
        }
    }
}

pub fn send_port_unreachable<C: Clock>(
    router: &Router<C>,
    arrival: &Interface,
    original: &Ipv4Packet<&[u8]>,
) -> Result<()> {
    send_error(
        router,
        arrival,
        original,
        |ipv4_header_len| Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::PortUnreachable,
            ipv4_header_len,
        },
    )
}

pub fn send_host_unreachable<C: Clock>(
    router: &Router<C>,
    arrival: &Interface,
    original: &Ipv4Packet<&[u8]>,
) -> Result<()> {
    send_error(
        router,
        arrival,
        original,
        |ipv4_header_len| Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::HostUnreachable,
            ipv4_header_len,
        },
    )
}

pub fn send_net_unreachable<C: Clock>(
    router: &Router<C>,
    arrival: &Interface,
    original: &Ipv4Packet<&[u8]>,
) -> Result<()> {
    send_error(
        router,
        arrival,
        original,
        |ipv4_header_len| Icmpv4Repr::DestinationUnreachable {
            reason: Icmpv4DestinationUnreachable::NetUnreachable,
            ipv4_header_len,
        },
    )
}

pub fn send_time_exceeded<C: Clock>(
    router: &Router<C>,
    arrival: &Interface,
    original: &Ipv4Packet<&[u8]>,
) -> Result<()> {
    send_error(router, arrival, original, |ipv4_header_len| {
        Icmpv4Repr::TimeExceeded {
            reason: Icmpv4TimeExceeded::TtlExpired,
            ipv4_header_len,
        }
    })
}

/// Builds an ICMP error as a new datagram around a snapshot of the
/// triggering packet: its IP header plus the first 8 payload bytes per
/// RFC792, sourced from the arrival interface's address and sent back to
/// the original sender. The triggering buffer is never edited.
fn send_error<C, R>(
    router: &Router<C>,
    arrival: &Interface,
    original: &Ipv4Packet<&[u8]>,
    repr_for: R,
) -> Result<()>
where
    C: Clock,
    R: FnOnce(usize) -> Icmpv4Repr,
{
    let original_header = original.header();
    let snippet_len = original.payload().len().min(8);
    let icmp_repr = repr_for(original_header.len());

    let ipv4_repr = Ipv4Repr {
        src_addr: arrival.addr,
        dst_addr: original.src_addr(),
        protocol: ipv4_protocols::ICMP,
        ttl: router.config().icmp_ttl,
        ident: rand::random::<u16>(),
        payload_len: icmp_repr.buffer_len(),
    };

    send_packet(router, &ipv4_repr, &icmp_repr, |icmp_payload| {
        icmp_payload[.. original_header.len()].copy_from_slice(original_header);
        icmp_payload[original_header.len() .. original_header.len() + snippet_len]
            .copy_from_slice(&original.payload()[.. snippet_len]);
    })
}
