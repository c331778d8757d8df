use embedded_hal::blocking::i2c::Read;
use heapless::Vec;

/// Every non-reserved 7-bit address.
pub const SCAN_RANGE: core::ops::RangeInclusive<u8> = 0x08..=0x77;

pub type Found = Vec<u8, 112>;

/// Tries each address with a one-byte read and collects those that ACK.
pub fn scan<I2C: Read>(i2c: &mut I2C) -> Found {
    let mut found = Found::new();
    let mut byte = [0u8; 1];
    for address in SCAN_RANGE {
        if i2c.read(address, &mut byte).is_ok() {
            // capacity covers the whole range
            let _ = found.push(address);
        }
    }
    found
}
