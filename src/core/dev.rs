//! The frame I/O collaborator seam.

use crate::Result;

/// Transmits raw Ethernet frames on named links.
///
/// The router core never owns sockets; the host process supplies an
/// implementation of this trait (a TAP device, a packet socket, a test
/// recorder) and drives the receive side by feeding frames into the
/// dispatcher itself.
pub trait Device {
    /// Sends a fully formed Ethernet frame out of the named interface.
    fn transmit(&mut self, iface_name: &str, frame: &[u8]) -> Result<()>;
}
