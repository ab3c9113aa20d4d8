#[cfg(test)]
#[macro_use]
extern crate assert_matches;

pub mod core;

#[derive(Debug)]
pub enum Error {
    /// Indicates an error where a buffer is too small or too large for a
    /// frame or packet.
    Exhausted,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a checksum is invalid.
    Checksum,
    /// Indicates an error where no routing table entry matches a destination.
    NoRoute,
    /// Indicates a frame or packet that was dropped without further action.
    Ignored,
    /// Indicates an error where a link address is not yet resolved and the
    /// packet was queued pending an ARP reply.
    Unresolved,
    /// Indicates a generic IO error.
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IO(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
