use std::io::Write;

use flate2::{write::ZlibEncoder, Compression as FlateCompression};

use super::{CompressionContext, Compressor};
use crate::tags::CompressionMethod;
use crate::TiffResult;

/// The Deflate algorithm used to compress image data in TIFF files.
#[derive(Debug, Clone, Copy)]
pub struct Deflate {
    level: FlateCompression,
}

/// The level of compression used by the Deflate algorithm.
/// It allows trading compression ratio for compression speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[non_exhaustive]
pub enum DeflateLevel {
    /// The fastest possible compression mode.
    Fast = 1,
    /// The conserative choice between speed and ratio.
    #[default]
    Balanced = 6,
    /// The best compression available with Deflate.
    Best = 9,
}

impl Deflate {
    /// Create a new deflate compressor with a specific level of compression.
    pub fn with_level(level: DeflateLevel) -> Self {
        Self {
            level: FlateCompression::new(level as u32),
        }
    }
}

impl Default for Deflate {
    fn default() -> Self {
        Self::with_level(DeflateLevel::default())
    }
}

impl Compressor for Deflate {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Deflate
    }

    fn compress(&self, _: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        // Lets be greedy and allocate more bytes in advance. We will likely encode longer image strips.
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(256), self.level);
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::compression::tests::{context, TEST_DATA};

    #[test]
    fn test_deflate() {
        const EXPECTED_COMPRESSED_DATA: [u8; 64] = [
            0x78, 0x9C, 0x15, 0xC7, 0xD1, 0x0D, 0x80, 0x20, 0x0C, 0x04, 0xD0, 0x55, 0x6E, 0x02,
            0xA7, 0x71, 0x81, 0xA6, 0x41, 0xDA, 0x28, 0xD4, 0xF4, 0xD0, 0xF9, 0x81, 0xE4, 0xFD,
            0xBC, 0xD3, 0x9C, 0x58, 0x04, 0x1C, 0xE9, 0xBD, 0xE2, 0x8A, 0x84, 0x5A, 0xD1, 0x7B,
            0xE7, 0x97, 0xF4, 0xF8, 0x08, 0x8D, 0xF6, 0x66, 0x21, 0x3D, 0x3A, 0xE4, 0xA9, 0x91,
            0x3E, 0xAC, 0xF1, 0x98, 0xB9, 0x70, 0x17, 0x13,
        ];

        let compressed_data = Deflate::default().compress(&context(), TEST_DATA).unwrap();
        assert_eq!(compressed_data, EXPECTED_COMPRESSED_DATA);
    }

    #[test]
    fn levels_trade_size() {
        let data = vec![7u8; 4096];
        let fast = Deflate::with_level(DeflateLevel::Fast)
            .compress(&context(), &data)
            .unwrap();
        let best = Deflate::with_level(DeflateLevel::Best)
            .compress(&context(), &data)
            .unwrap();
        assert!(best.len() <= fast.len());
        assert!(fast.len() < data.len());
    }
}
