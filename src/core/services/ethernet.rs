use log::debug;

use crate::{
    Error,
    Result,
};
use crate::core::iface::Interface;
use crate::core::repr::{
    eth_types,
    EthernetFrame,
};
use crate::core::services::{
    arp,
    ipv4,
    Router,
};
use crate::core::time::Clock;

/// Sends an Ethernet frame out an interface.
///
/// Allocates the frame, lets the caller fill in everything but the source
/// address, stamps the interface's MAC, and hands the frame to the device
/// collaborator.
pub fn send_frame<C, F>(
    router: &Router<C>,
    iface: &Interface,
    eth_frame_len: usize,
    f: F,
) -> Result<()>
where
    C: Clock,
    F: FnOnce(&mut EthernetFrame<&mut [u8]>),
{
    let mut eth_buffer = vec![0; eth_frame_len];
    let mut eth_frame = EthernetFrame::try_new(&mut eth_buffer[..])?;
    f(&mut eth_frame);
    eth_frame.set_src_addr(iface.mac);
    router.transmit(&iface.name, eth_frame.as_ref())
}

/// Receives an Ethernet frame from an interface: the top-level dispatcher.
///
/// Validates the minimum frame length, then demultiplexes by ethertype
/// only; ARP and IPv4 payloads are parsed by their own services and any
/// other ethertype is dropped.
pub fn recv_frame<C: Clock>(router: &Router<C>, frame: &[u8], iface_name: &str) -> Result<()> {
    let iface = match router.ifaces().get(iface_name) {
        Some(iface) => iface,
        None => {
            debug!("Ignoring frame on unknown interface {}.", iface_name);
            return Err(Error::Ignored);
        }
    };

    let eth_frame = EthernetFrame::try_new(frame)?;

    if eth_frame.dst_addr() != iface.mac && !eth_frame.dst_addr().is_broadcast() {
        debug!(
            "Ignoring ethernet frame with destination {}.",
            eth_frame.dst_addr()
        );
        return Err(Error::Ignored);
    }

    match eth_frame.payload_type() {
        eth_types::ARP => arp::recv_packet(router, iface, eth_frame.payload()),
        eth_types::IPV4 => ipv4::recv_packet(router, iface, eth_frame.payload()),
        i => {
            debug!("Ignoring ethernet frame with type 0x{:04X}.", i);
            Err(Error::Ignored)
        }
    }
}
