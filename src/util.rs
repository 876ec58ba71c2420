//! Small byte-key utilities shared by the index and its readers.

/// Return the smallest byte string strictly greater than every string with
/// `prefix` as a prefix.
///
/// Treats the input as a big-endian counter: the last byte is incremented
/// and `0xff` bytes carry over. An input consisting entirely of `0xff`
/// bytes wraps to all zeroes, which callers treat as an unbounded end key.
pub fn increment_bytes(prefix: &[u8]) -> Vec<u8> {
    let mut rv = prefix.to_vec();
    for b in rv.iter_mut().rev() {
        *b = b.wrapping_add(1);
        if *b != 0 {
            break;
        }
    }
    rv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_bytes() {
        assert_eq!(increment_bytes(b"abc"), b"abd".to_vec());
        assert_eq!(increment_bytes(&[0x00]), vec![0x01]);
        assert_eq!(increment_bytes(&[0x01, 0xff]), vec![0x02, 0x00]);
        assert_eq!(increment_bytes(&[0xff, 0xff]), vec![0x00, 0x00]);
        assert_eq!(increment_bytes(&[]), Vec::<u8>::new());
    }
}
