/// Utility function to convert big endian 16-bit `Vec<u8>` to `Vec<u16>`
pub fn convert_buf_u8_u16(buf: Vec<u8>) -> Vec<u16> {
    buf.chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect()
}

/// Utility function to convert `&[u16]` to big endian 16-bit `Vec<u8>`
pub fn convert_buf_u16_u8(buf: &[u16]) -> Vec<u8> {
    let mut buf_u8: Vec<u8> = Vec::with_capacity(buf.len() * 2);

    for byte in buf {
        buf_u8.extend_from_slice(&byte.to_be_bytes());
    }

    buf_u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_round_trip() {
        let values = vec![0u16, 1, 255, 256, 40000, u16::MAX];
        let bytes = convert_buf_u16_u8(&values);
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(convert_buf_u8_u16(bytes), values);
    }
}
