/// CRC-32 (Castagnoli polynomial) of `data`.
///
/// Used for checksum-verified blob writes.
pub fn crc32c(data: &[u8]) -> u32 {
    ::crc32c::crc32c(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_castagnoli_check_value() {
        // Standard CRC-32C check value for the ASCII digits 1-9.
        assert_eq!(crc32c(b"123456789"), 0xe306_9283);
    }

    #[test]
    fn empty_input() {
        assert_eq!(crc32c(&[]), 0);
    }

    #[test]
    fn detects_single_bit_flip() {
        let mut data = b"leaf payload".to_vec();
        let before = crc32c(&data);
        data[0] ^= 1;
        assert_ne!(before, crc32c(&data));
    }
}
