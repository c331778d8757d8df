//! Packed binary-coded-decimal digits, one decimal digit per nibble.

/// A byte whose nibbles are not both decimal digits, or a value that does not
/// fit in two digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidBcd(pub u8);

/// Decodes `0x45` into `45`.
pub fn decode(byte: u8) -> Result<u8, InvalidBcd> {
    let tens = byte >> 4;
    let units = byte & 0x0F;
    if tens > 9 || units > 9 {
        return Err(InvalidBcd(byte));
    }
    Ok(tens * 10 + units)
}

/// Encodes `45` into `0x45`. Only 0..=99 is representable.
pub fn encode(value: u8) -> Result<u8, InvalidBcd> {
    if value > 99 {
        return Err(InvalidBcd(value));
    }
    Ok(((value / 10) << 4) | (value % 10))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_nibbles() {
        assert_eq!(decode(0x00), Ok(0));
        assert_eq!(decode(0x09), Ok(9));
        assert_eq!(decode(0x10), Ok(10));
        assert_eq!(decode(0x59), Ok(59));
        assert_eq!(decode(0x99), Ok(99));
    }

    #[test]
    fn rejects_nibbles_above_nine() {
        assert_eq!(decode(0x0A), Err(InvalidBcd(0x0A)));
        assert_eq!(decode(0xA0), Err(InvalidBcd(0xA0)));
        assert_eq!(decode(0xFF), Err(InvalidBcd(0xFF)));
    }

    #[test]
    fn encode_rejects_three_digit_values() {
        assert_eq!(encode(99), Ok(0x99));
        assert_eq!(encode(100), Err(InvalidBcd(100)));
    }

    #[test]
    fn every_valid_byte_survives_decode_then_encode() {
        for byte in 0..=u8::MAX {
            if byte >> 4 <= 9 && byte & 0x0F <= 9 {
                assert_eq!(encode(decode(byte).unwrap()), Ok(byte));
            }
        }
    }

    #[test]
    fn every_value_survives_encode_then_decode() {
        for value in 0..=99 {
            assert_eq!(decode(encode(value).unwrap()), Ok(value));
        }
    }
}
