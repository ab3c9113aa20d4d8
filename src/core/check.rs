use byteorder::{
    ByteOrder,
    NetworkEndian,
};

/// Calculates the Internet Checksum from [RFC1071](https://tools.ietf.org/html/rfc1071).
///
/// An odd trailing byte is summed as if the buffer were padded with a zero;
/// the buffer itself is never touched.
pub fn internet_checksum(buffer: &[u8]) -> u16 {
    let mut acc: u32 = 0;

    let mut chunks = buffer.chunks_exact(2);
    for chunk in &mut chunks {
        acc += NetworkEndian::read_u16(chunk) as u32;
    }

    if let [last] = chunks.remainder() {
        acc += (*last as u32) << 8;
    }

    while acc > 0xFFFF {
        acc = (acc & 0xFFFF) + (acc >> 16);
    }

    !acc as u16
}

/// Checks a buffer that already carries its checksum field; a valid one
/// folds to zero.
pub fn verify_checksum(buffer: &[u8]) -> bool {
    internet_checksum(buffer) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use byteorder::{
        ByteOrder,
        NetworkEndian,
    };

    #[test]
    fn test_internet_checksum() {
        let buffer: [u8; 20] = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(0xB861, internet_checksum(&buffer));
    }

    #[test]
    fn test_internet_checksum_odd_length() {
        let even: [u8; 4] = [0x12, 0x34, 0xAB, 0x00];
        let odd = &even[.. 3];
        assert_eq!(internet_checksum(&even), internet_checksum(odd));
    }

    #[test]
    fn test_embed_then_verify() {
        let mut buffer: [u8; 11] = [0x01, 0x02, 0x00, 0x00, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B];
        let checksum = internet_checksum(&buffer);
        NetworkEndian::write_u16(&mut buffer[2 .. 4], checksum);
        assert!(verify_checksum(&buffer));
    }

    #[test]
    fn test_verify_rejects_bit_flip() {
        let mut buffer: [u8; 11] = [0x01, 0x02, 0x00, 0x00, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B];
        let checksum = internet_checksum(&buffer);
        NetworkEndian::write_u16(&mut buffer[2 .. 4], checksum);

        buffer[6] ^= 0x10;
        assert!(!verify_checksum(&buffer));
    }
}
