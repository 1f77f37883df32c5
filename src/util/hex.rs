//! Simple hex encoding.

const CHARS: &[u8] = b"0123456789abcdef";

/// Encodes `src` as hex digits into `dest` and returns it as a str.
///
/// # Panics
///
/// The function panics if `dest` is shorter than twice the length of
/// `src`.
pub fn encode<'a>(src: &[u8], dest: &'a mut [u8]) -> &'a str {
    assert!(dest.len() >= src.len() * 2);
    for (i, &ch) in src.iter().enumerate() {
        dest[i * 2] = CHARS[(ch >> 4) as usize];
        dest[i * 2 + 1] = CHARS[(ch & 0x0F) as usize];
    }
    unsafe {
        std::str::from_utf8_unchecked(&dest[..src.len() * 2])
    }
}

/// Returns the two hex digit octets for a single octet.
pub fn encode_u8(ch: u8) -> [u8; 2] {
    [CHARS[(ch >> 4) as usize], CHARS[(ch & 0x0F) as usize]]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_octets() {
        let mut buf = [0u8; 8];
        assert_eq!(encode(b"\x01\xa9\xf0", &mut buf), "01a9f0");
        assert_eq!(encode_u8(0x5e), *b"5e");
    }
}
