use std::fmt::{
    Display,
    Formatter,
    Result as FmtResult,
};
use std::str::FromStr;

use byteorder::{
    ByteOrder,
    NetworkEndian,
};

use crate::{
    Error,
    Result,
};
use crate::core::check::internet_checksum;

/// [IPv4 address](https://en.wikipedia.org/wiki/IPv4) in network byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    /// Creates an IPv4 address from a network byte order buffer.
    pub fn new(addr: [u8; 4]) -> Address {
        Address(addr)
    }

    /// Tries to create an IPv4 address from a network byte order slice.
    pub fn try_new(addr: &[u8]) -> Result<Address> {
        if addr.len() != 4 {
            return Err(Error::Exhausted);
        }

        let mut bytes = [0; 4];
        bytes.copy_from_slice(addr);
        Ok(Address(bytes))
    }

    /// Returns a reference to the network byte order representation of the
    /// address.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the address as a host order integer.
    pub fn as_u32(&self) -> u32 {
        NetworkEndian::read_u32(&self.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

impl FromStr for Address {
    type Err = ();

    /// Parses an IPv4 address from an A.B.C.D style string.
    fn from_str(addr: &str) -> std::result::Result<Address, Self::Err> {
        let mut ipv4 = [0; 4];
        let mut tokens = 0;

        for (i, token) in addr.split('.').enumerate() {
            if i >= 4 {
                return Err(());
            }
            ipv4[i] = token.parse::<u8>().map_err(|_| ())?;
            tokens += 1;
        }

        if tokens != 4 {
            return Err(());
        }

        Ok(Address(ipv4))
    }
}

/// [Assigned IP protocol numbers](https://en.wikipedia.org/wiki/List_of_IP_protocol_numbers).
pub mod protocols {
    pub const ICMP: u8 = 1;

    pub const TCP: u8 = 6;

    pub const UDP: u8 = 17;
}

/// [https://en.wikipedia.org/wiki/IPv4#Header](https://en.wikipedia.org/wiki/IPv4#Header)
mod fields {
    use std::ops::Range;

    pub const VER_IHL: usize = 0;

    pub const DSCP_ECN: usize = 1;

    pub const TOTAL_LEN: Range<usize> = 2 .. 4;

    pub const IDENT: Range<usize> = 4 .. 6;

    pub const FLAGS_OFFSET: Range<usize> = 6 .. 8;

    pub const TTL: usize = 8;

    pub const PROTOCOL: usize = 9;

    pub const CHECKSUM: Range<usize> = 10 .. 12;

    pub const SRC_ADDR: Range<usize> = 12 .. 16;

    pub const DST_ADDR: Range<usize> = 16 .. 20;
}

/// View of a byte buffer as an IPv4 packet.
#[derive(Debug)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Packet<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> AsMut<[u8]> for Packet<T> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }
}

impl<T: AsRef<[u8]>> Packet<T> {
    pub const MIN_HEADER_LEN: usize = 20;

    pub const MAX_PACKET_LEN: usize = 65535;

    /// Tries to create an IPv4 packet view over a byte buffer.
    pub fn try_new(buffer: T) -> Result<Packet<T>> {
        let buffer_len = buffer.as_ref().len();

        if buffer_len < Self::MIN_HEADER_LEN || buffer_len > Self::MAX_PACKET_LEN {
            Err(Error::Exhausted)
        } else {
            Ok(Packet { buffer })
        }
    }

    /// Returns the length of an IPv4 packet with the specified payload size
    /// and no options.
    pub fn buffer_len(payload_len: usize) -> usize {
        Self::MIN_HEADER_LEN + payload_len
    }

    /// Checks if the packet has a valid encoding: version, declared lengths
    /// within the buffer, and a verifying header checksum.
    pub fn check_encoding(&self) -> Result<()> {
        let buffer_len = self.buffer.as_ref().len();

        if self.version() != 4
            || self.header_len() < Self::MIN_HEADER_LEN
            || self.total_len() < self.header_len()
        {
            Err(Error::Malformed)
        } else if self.header_len() > buffer_len || self.total_len() > buffer_len {
            Err(Error::Exhausted)
        } else if internet_checksum(self.header()) != 0 {
            Err(Error::Checksum)
        } else {
            Ok(())
        }
    }

    /// Calculates the header checksum with the checksum field zeroed.
    pub fn gen_header_checksum(&self) -> u16 {
        let mut header = [0; 60];
        let header_len = self.header().len();
        header[.. header_len].copy_from_slice(self.header());
        header[fields::CHECKSUM].copy_from_slice(&[0, 0]);
        internet_checksum(&header[.. header_len])
    }

    pub fn version(&self) -> u8 {
        self.buffer.as_ref()[fields::VER_IHL] >> 4
    }

    /// Returns the header length in bytes, options included.
    pub fn header_len(&self) -> usize {
        ((self.buffer.as_ref()[fields::VER_IHL] & 0x0F) as usize) * 4
    }

    pub fn total_len(&self) -> usize {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::TOTAL_LEN]) as usize
    }

    pub fn ident(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::IDENT])
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[fields::TTL]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer.as_ref()[fields::PROTOCOL]
    }

    pub fn checksum(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[fields::CHECKSUM])
    }

    pub fn src_addr(&self) -> Address {
        Address::try_new(&self.buffer.as_ref()[fields::SRC_ADDR]).unwrap()
    }

    pub fn dst_addr(&self) -> Address {
        Address::try_new(&self.buffer.as_ref()[fields::DST_ADDR]).unwrap()
    }

    /// Returns the range of the payload within the buffer, clamped so that
    /// lying length fields can never slice past the buffer.
    fn payload_range(&self) -> (usize, usize) {
        let buffer_len = self.buffer.as_ref().len();
        let total_len = self.total_len().min(buffer_len);
        let header_len = self.header_len().min(total_len);
        (header_len, total_len)
    }

    /// Returns the header, options included.
    pub fn header(&self) -> &[u8] {
        let header_len = self.header_len().min(self.buffer.as_ref().len());
        &self.buffer.as_ref()[.. header_len]
    }

    pub fn payload(&self) -> &[u8] {
        let (header_len, total_len) = self.payload_range();
        &self.buffer.as_ref()[header_len .. total_len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    pub fn set_version_and_header_len(&mut self, version: u8, header_len: usize) {
        self.buffer.as_mut()[fields::VER_IHL] = (version << 4) | ((header_len / 4) as u8 & 0x0F);
    }

    pub fn set_dscp_ecn(&mut self, dscp_ecn: u8) {
        self.buffer.as_mut()[fields::DSCP_ECN] = dscp_ecn;
    }

    pub fn set_total_len(&mut self, total_len: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::TOTAL_LEN], total_len);
    }

    pub fn set_ident(&mut self, ident: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::IDENT], ident);
    }

    pub fn set_flags_and_offset(&mut self, flags_offset: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::FLAGS_OFFSET], flags_offset);
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[fields::TTL] = ttl;
    }

    pub fn set_protocol(&mut self, protocol: u8) {
        self.buffer.as_mut()[fields::PROTOCOL] = protocol;
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[fields::CHECKSUM], checksum);
    }

    pub fn set_src_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[fields::SRC_ADDR].copy_from_slice(addr.as_bytes());
    }

    pub fn set_dst_addr(&mut self, addr: Address) {
        self.buffer.as_mut()[fields::DST_ADDR].copy_from_slice(addr.as_bytes());
    }

    /// Recomputes and stores the header checksum. Call after any header
    /// field changes.
    pub fn fill_checksum(&mut self) {
        self.set_checksum(0);
        let checksum = self.gen_header_checksum();
        self.set_checksum(checksum);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let (header_len, total_len) = self.payload_range();
        &mut self.buffer.as_mut()[header_len .. total_len]
    }
}

/// Safe representation of an IPv4 header without options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Repr {
    pub src_addr: Address,
    pub dst_addr: Address,
    pub protocol: u8,
    pub ttl: u8,
    pub ident: u16,
    pub payload_len: usize,
}

impl Repr {
    /// Returns the buffer size needed to serialize this header and its
    /// payload.
    pub fn buffer_len(&self) -> usize {
        Packet::<&[u8]>::MIN_HEADER_LEN + self.payload_len
    }

    /// Serializes a 20 byte header into a packet, including the checksum.
    pub fn serialize<T>(&self, packet: &mut Packet<T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]>,
    {
        packet.set_version_and_header_len(4, Packet::<&[u8]>::MIN_HEADER_LEN);
        packet.set_dscp_ecn(0);
        packet.set_total_len(self.buffer_len() as u16);
        packet.set_ident(self.ident);
        packet.set_flags_and_offset(0);
        packet.set_ttl(self.ttl);
        packet.set_protocol(self.protocol);
        packet.set_src_addr(self.src_addr);
        packet.set_dst_addr(self.dst_addr);
        packet.fill_checksum();
    }
}
