use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::{
    Error,
    Result,
};
use crate::core::check::internet_checksum;

/// Safe representation of an ICMP header.
///
/// Error variants carry the length of the embedded IPv4 header; per RFC792
/// their payload is that header plus the first 8 bytes of the offending
/// datagram's payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repr {
    EchoReply {
        id: u16,
        seq: u16,
    },
    EchoRequest {
        id: u16,
        seq: u16,
    },
    DestinationUnreachable {
        reason: DestinationUnreachable,
        ipv4_header_len: usize,
    },
    TimeExceeded {
        reason: TimeExceeded,
        ipv4_header_len: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DestinationUnreachable {
    NetUnreachable,
    HostUnreachable,
    PortUnreachable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeExceeded {
    TtlExpired,
}

impl Repr {
    /// Returns the ICMP packet size needed to serialize this representation.
    pub fn buffer_len(&self) -> usize {
        match *self {
            Repr::DestinationUnreachable {
                ipv4_header_len, ..
            }
            | Repr::TimeExceeded {
                ipv4_header_len, ..
            } => ipv4_header_len + 16,
            _ => 8,
        }
    }

    /// Tries to deserialize a packet into an ICMP representation.
    pub fn deserialize<T>(packet: &Packet<T>) -> Result<Repr>
    where
        T: AsRef<[u8]>,
    {
        fn echo_id_seq<T: AsRef<[u8]>>(packet: &Packet<T>) -> (u16, u16) {
            (
                NetworkEndian::read_u16(&packet.header()[0 .. 2]),
                NetworkEndian::read_u16(&packet.header()[2 .. 4]),
            )
        }

        fn ipv4_header_len<T: AsRef<[u8]>>(packet: &Packet<T>) -> Result<usize> {
            // Embedded IP header (>= 20 bytes) + payload snippet (8 bytes).
            if packet.payload().len() < 28 {
                Err(Error::Malformed)
            } else {
                Ok(packet.payload().len() - 8)
            }
        }

        match (packet.type_of(), packet.code()) {
            (0, 0) => {
                let (id, seq) = echo_id_seq(packet);
                Ok(Repr::EchoReply { id, seq })
            }
            (8, 0) => {
                let (id, seq) = echo_id_seq(packet);
                Ok(Repr::EchoRequest { id, seq })
            }
            (3, code @ 0 ..= 3) => {
                let reason = match code {
                    0 => DestinationUnreachable::NetUnreachable,
                    1 => DestinationUnreachable::HostUnreachable,
                    3 => DestinationUnreachable::PortUnreachable,
                    _ => return Err(Error::Malformed),
                };
                Ok(Repr::DestinationUnreachable {
                    reason,
                    ipv4_header_len: ipv4_header_len(packet)?,
                })
            }
            (11, 0) => Ok(Repr::TimeExceeded {
                reason: TimeExceeded::TtlExpired,
                ipv4_header_len: ipv4_header_len(packet)?,
            }),
            _ => Err(Error::Malformed),
        }
    }

    /// Serializes the ICMP representation into a packet and stamps the
    /// checksum; the payload must already be in place.
    pub fn serialize<T>(&self, packet: &mut Packet<T>) -> Result<()>
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        fn echo<T>(packet: &mut Packet<T>, type_of: u8, id: u16, seq: u16)
        where
            T: AsRef<[u8]> + AsMut<[u8]>,
        {
            packet.set_type_of(type_of);
            packet.set_code(0);
            NetworkEndian::write_u16(&mut packet.header_mut()[0 .. 2], id);
            NetworkEndian::write_u16(&mut packet.header_mut()[2 .. 4], seq);
        }

        fn error<T>(
            packet: &mut Packet<T>,
            ipv4_header_len: usize,
            type_of: u8,
            code: u8,
        ) -> Result<()>
        where
            T: AsRef<[u8]> + AsMut<[u8]>,
        {
            if packet.payload().len() != ipv4_header_len + 8 {
                return Err(Error::Malformed);
            }
            packet.set_type_of(type_of);
            packet.set_code(code);
            packet.header_mut().copy_from_slice(&[0; 4]);
            Ok(())
        }

        match *self {
            Repr::EchoReply { id, seq } => echo(packet, 0, id, seq),
            Repr::EchoRequest { id, seq } => echo(packet, 8, id, seq),
            Repr::DestinationUnreachable {
                reason,
                ipv4_header_len,
            } => {
                let code = match reason {
                    DestinationUnreachable::NetUnreachable => 0,
                    DestinationUnreachable::HostUnreachable => 1,
                    DestinationUnreachable::PortUnreachable => 3,
                };
                error(packet, ipv4_header_len, 3, code)?;
            }
            Repr::TimeExceeded {
                reason: TimeExceeded::TtlExpired,
                ipv4_header_len,
            } => {
                error(packet, ipv4_header_len, 11, 0)?;
            }
        };

        packet.fill_checksum();
        Ok(())
    }
}

/// [https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol](https://en.wikipedia.org/wiki/Internet_Control_Message_Protocol)
mod fields {
    use std::ops::{
        Range,
        RangeFrom,
    };

    pub const TYPE: usize = 0;

    pub const CODE: usize = 1;

    pub const CHECKSUM: Range<usize> = 2 .. 4;

    pub const HEADER: Range<usize> = 4 .. 8;

    pub const PAYLOAD: RangeFrom<usize> = 8 ..;
}

/// View of a byte buffer as an ICMP packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const HEADER_LEN: usize = 8;

    pub const MAX_PACKET_LEN: usize = 65535;

    /// Tries to create an ICMP packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        if buffer.as_ref().len() < Self::HEADER_LEN || buffer.as_ref().len() > Self::MAX_PACKET_LEN
        {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of an ICMP packet with the specified payload size.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::HEADER_LEN + payload_len
    }

    /// Checks if the packet checksum verifies over the entire message.
    pub fn check_encoding(&self) -> Result<()> {
        if self.gen_packet_checksum() != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the checksum over the entire packet.
    pub fn gen_packet_checksum(&self) -> u16 {
        internet_checksum(self.buffer.as_ref())
    }

    pub fn type_of(&self) -> u8 {
        self.buffer.as_ref()[fields::TYPE]
    }

    pub fn code(&self) -> u8 {
        self.buffer.as_ref()[fields::CODE]
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    /// Returns the 4 byte rest-of-header field.
    pub fn header(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::HEADER]
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[fields::PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_type_of(&mut self, type_of: u8) {
        self.buffer.as_mut()[fields::TYPE] = type_of;
    }

    pub fn set_code(&mut self, code: u8) {
        self.buffer.as_mut()[fields::CODE] = code;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    pub fn header_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::HEADER]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[fields::PAYLOAD]
    }

    /// Recomputes and stores the packet checksum. Call after the payload
    /// and every header field are in place.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = self.gen_packet_checksum();
        self.set_checksum(checksum);
    }
}
