//! Bit-serial CRC-CCITT as computed by EPOS controllers.
//!
//! The checksum covers the whole frame with the checksum field counted as
//! zero. The first word is built as `(opcode << 8) | length` while every
//! payload word is little-endian; that asymmetry is part of the wire format.

/// CRC-CCITT generator polynomial.
pub const POLYNOMIAL: u16 = 0x1021;

/// Returned by [`frame_crc`] for buffers that cannot be a frame.
pub const MALFORMED_CRC: u16 = 0xFFFF;

/// Fold one 16-bit word into `crc`, most significant bit first.
pub fn crc_step(mut crc: u16, data: u16) -> u16 {
    let mut mask: u16 = 0x8000;
    while mask != 0 {
        let carry = crc & 0x8000 != 0;
        crc <<= 1;
        if data & mask != 0 {
            crc = crc.wrapping_add(1);
        }
        if carry {
            crc ^= POLYNOMIAL;
        }
        mask >>= 1;
    }
    crc
}

/// Expected checksum of a complete frame, including its checksum field.
///
/// The trailing checksum bytes are not read. Buffers shorter than two bytes
/// or of odd length yield [`MALFORMED_CRC`].
pub fn frame_crc(frame: &[u8]) -> u16 {
    if frame.len() < 2 || frame.len() % 2 != 0 {
        return MALFORMED_CRC;
    }

    let mut crc = crc_step(0, (u16::from(frame[0]) << 8) | u16::from(frame[1]));

    let mut rest = &frame[2..];
    while rest.len() > 2 {
        crc = crc_step(crc, u16::from(rest[0]) | (u16::from(rest[1]) << 8));
        rest = &rest[2..];
    }

    crc_step(crc, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_from_zero_shifts_data_in() {
        assert_eq!(crc_step(0, 0), 0);
        assert_eq!(crc_step(0, 0x1234), 0x1234);
    }

    #[test]
    fn step_reduces_by_polynomial() {
        assert_eq!(crc_step(0xFFFF, 0), 0x1D0F);
    }

    #[test]
    fn read_object_request_checksum() {
        let frame = [0x10, 0x01, 0x18, 0x10, 0x04, 0x01, 0x00, 0x00];
        assert_eq!(frame_crc(&frame), 0x3205);
    }

    #[test]
    fn checksum_field_contents_are_ignored() {
        let zeroed = [0x10, 0x01, 0x41, 0x60, 0x00, 0x01, 0x00, 0x00];
        let filled = [0x10, 0x01, 0x41, 0x60, 0x00, 0x01, 0xAB, 0xF0];
        assert_eq!(frame_crc(&zeroed), 0xF0AB);
        assert_eq!(frame_crc(&zeroed), frame_crc(&filled));
    }

    #[test]
    fn header_word_is_big_endian() {
        // Swapping opcode and length must change the checksum even though
        // payload words are little-endian.
        let a = [0x10, 0x01, 0x00, 0x00, 0x00, 0x00];
        let b = [0x01, 0x10, 0x00, 0x00, 0x00, 0x00];
        assert_ne!(frame_crc(&a), frame_crc(&b));
        assert_eq!(frame_crc(&a), crc_step(crc_step(crc_step(0, 0x1001), 0), 0));
    }

    #[test]
    fn malformed_lengths_return_sentinel() {
        assert_eq!(frame_crc(&[]), MALFORMED_CRC);
        assert_eq!(frame_crc(&[0x10]), MALFORMED_CRC);
        assert_eq!(frame_crc(&[0x10, 0x01, 0x00]), MALFORMED_CRC);
    }

    #[test]
    fn two_byte_buffer_is_header_only() {
        assert_eq!(frame_crc(&[0x10, 0x01]), 0x1352);
    }

    #[test]
    fn deterministic_for_same_frame() {
        let frame = [0x11, 0x03, 0x40, 0x60, 0x00, 0x03, 0xEF, 0xBE, 0xAD, 0xDE, 0, 0];
        let copy = frame;
        assert_eq!(frame_crc(&frame), frame_crc(&copy));
        assert_eq!(frame_crc(&frame), 0xC5C7);
    }
}
