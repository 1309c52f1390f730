use super::{CompressionContext, Compressor};
use crate::tags::CompressionMethod;
use crate::TiffResult;

/// The default algorithm which does not compress at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Uncompressed;

impl Compressor for Uncompressed {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }

    fn compress(&self, _: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        Ok(input.to_vec())
    }
}
