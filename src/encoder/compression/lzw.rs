use weezl::encode::Encoder as LZWEncoder;

use super::{CompressionContext, Compressor};
use crate::tags::CompressionMethod;
use crate::TiffResult;

/// The LZW algorithm used to compress image data in TIFF files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lzw;

impl Compressor for Lzw {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::LZW
    }

    fn compress(&self, _: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = LZWEncoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        let mut compressed = Vec::with_capacity(input.len() / 2);
        let result = encoder.into_stream(&mut compressed).encode_all(input);
        result.status?;
        Ok(compressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::compression::tests::{context, TEST_DATA};

    #[test]
    fn test_lzw() {
        const EXPECTED_COMPRESSED_DATA: [u8; 63] = [
            0x80, 0x15, 0x0D, 0x06, 0x93, 0x98, 0x82, 0x08, 0x20, 0x30, 0x88, 0x0E, 0x67, 0x43,
            0x91, 0xA4, 0xDC, 0x67, 0x10, 0x19, 0x8D, 0xE7, 0x21, 0x01, 0x8C, 0xD0, 0x65, 0x31,
            0x9A, 0xE1, 0xD1, 0x03, 0xB1, 0x86, 0x1A, 0x6F, 0x3A, 0xC1, 0x4C, 0x66, 0xF3, 0x69,
            0xC0, 0xE4, 0x65, 0x39, 0x9C, 0xCD, 0x26, 0xF3, 0x74, 0x20, 0xD8, 0x67, 0x89, 0x9A,
            0x4E, 0x86, 0x83, 0x69, 0xCC, 0x5D, 0x01,
        ];

        let compressed_data = Lzw.compress(&context(), TEST_DATA).unwrap();
        assert_eq!(EXPECTED_COMPRESSED_DATA, compressed_data.as_slice());
    }
}
