use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::{
    Error,
    Result,
};
use crate::core::repr::{
    EthernetAddress,
    Ipv4Address,
};

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
// https://www.iana.org/assignments/arp-parameters/arp-parameters.xhtml#arp-parameters-1
pub enum Op {
    Request = 0x0001,
    Reply = 0x0002,
}

/// An RFC826 packet for the Ethernet + IPv4 combination, the only one the
/// router speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arp {
    pub op: Op,
    pub source_hw_addr: EthernetAddress,
    pub source_proto_addr: Ipv4Address,
    pub target_hw_addr: EthernetAddress,
    pub target_proto_addr: Ipv4Address,
}

mod fields {
    use std::ops::Range;

    pub const HW_TYPE: Range<usize> = 0 .. 2;

    pub const PROTO_TYPE: Range<usize> = 2 .. 4;

    pub const HW_ADDR_LEN: usize = 4;

    pub const PROTO_ADDR_LEN: usize = 5;

    pub const OP: Range<usize> = 6 .. 8;

    pub const SOURCE_HW_ADDR: Range<usize> = 8 .. 14;

    pub const SOURCE_PROTO_ADDR: Range<usize> = 14 .. 18;

    pub const TARGET_HW_ADDR: Range<usize> = 18 .. 24;

    pub const TARGET_PROTO_ADDR: Range<usize> = 24 .. 28;
}

const HW_TYPE_ETHERNET: u16 = 0x0001;

const PROTO_TYPE_IPV4: u16 = 0x0800;

impl Arp {
    /// Returns the size of the ARP packet when serialized to a buffer.
    pub fn buffer_len(&self) -> usize {
        28
    }

    /// Tries to deserialize a buffer into an Ethernet + IPv4 ARP packet.
    pub fn deserialize(buffer: &[u8]) -> Result<Arp> {
        if buffer.len() < 28 {
            return Err(Error::Exhausted);
        }

        if NetworkEndian::read_u16(&buffer[fields::HW_TYPE]) != HW_TYPE_ETHERNET
            || NetworkEndian::read_u16(&buffer[fields::PROTO_TYPE]) != PROTO_TYPE_IPV4
            || buffer[fields::HW_ADDR_LEN] != 6
            || buffer[fields::PROTO_ADDR_LEN] != 4
        {
            return Err(Error::Malformed);
        }

        let op = match NetworkEndian::read_u16(&buffer[fields::OP]) {
            0x0001 => Op::Request,
            0x0002 => Op::Reply,
            _ => return Err(Error::Malformed),
        };

        Ok(Arp {
            op,
            source_hw_addr: EthernetAddress::try_new(&buffer[fields::SOURCE_HW_ADDR])?,
            source_proto_addr: Ipv4Address::try_new(&buffer[fields::SOURCE_PROTO_ADDR])?,
            target_hw_addr: EthernetAddress::try_new(&buffer[fields::TARGET_HW_ADDR])?,
            target_proto_addr: Ipv4Address::try_new(&buffer[fields::TARGET_PROTO_ADDR])?,
        })
    }

    /// Serializes the ARP packet into a buffer of at least buffer_len() bytes.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < self.buffer_len() {
            return Err(Error::Exhausted);
        }

        NetworkEndian::write_u16(&mut buffer[fields::HW_TYPE], HW_TYPE_ETHERNET);
        NetworkEndian::write_u16(&mut buffer[fields::PROTO_TYPE], PROTO_TYPE_IPV4);
        buffer[fields::HW_ADDR_LEN] = 6;
        buffer[fields::PROTO_ADDR_LEN] = 4;
        NetworkEndian::write_u16(&mut buffer[fields::OP], self.op as u16);
        buffer[fields::SOURCE_HW_ADDR].copy_from_slice(self.source_hw_addr.as_bytes());
        buffer[fields::SOURCE_PROTO_ADDR].copy_from_slice(self.source_proto_addr.as_bytes());
        buffer[fields::TARGET_HW_ADDR].copy_from_slice(self.target_hw_addr.as_bytes());
        buffer[fields::TARGET_PROTO_ADDR].copy_from_slice(self.target_proto_addr.as_bytes());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Arp {
        Arp {
            op: Op::Request,
            source_hw_addr: EthernetAddress::new([0x02, 0, 0, 0, 0, 0x01]),
            source_proto_addr: Ipv4Address::new([10, 0, 0, 1]),
            target_hw_addr: EthernetAddress::BROADCAST,
            target_proto_addr: Ipv4Address::new([10, 0, 0, 2]),
        }
    }

    #[test]
    fn test_serialize_then_deserialize() {
        let arp = request();
        let mut buffer = vec![0; arp.buffer_len()];
        arp.serialize(&mut buffer).unwrap();
        assert_eq!(Arp::deserialize(&buffer).unwrap(), arp);
    }

    #[test]
    fn test_deserialize_too_short() {
        let buffer = [0; 27];
        assert_matches!(Arp::deserialize(&buffer), Err(Error::Exhausted));
    }

    #[test]
    fn test_deserialize_wrong_hw_type() {
        let arp = request();
        let mut buffer = vec![0; arp.buffer_len()];
        arp.serialize(&mut buffer).unwrap();
        buffer[1] = 0x02;
        assert_matches!(Arp::deserialize(&buffer), Err(Error::Malformed));
    }

    #[test]
    fn test_serialize_buffer_too_small() {
        let mut buffer = [0; 27];
        assert_matches!(request().serialize(&mut buffer), Err(Error::Exhausted));
    }
}
