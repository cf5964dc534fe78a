/// H17 field checksum
///
/// The running sum is XORed with each byte and rotated left one bit.

/// Fold one byte into a running checksum
#[inline]
pub fn update(checksum: u8, byte: u8) -> u8 {
    (checksum ^ byte).rotate_left(1)
}

/// Checksum of a whole field, starting from zero
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |sum, &b| update(sum, b))
}
