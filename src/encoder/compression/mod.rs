//! The seam between the encode pipeline and compression codecs.

use std::fmt;

use crate::pixel::{Region, Size};
use crate::pool::ScratchPool;
use crate::tags::{ByteOrder, CompressionMethod, PhotometricInterpretation};
use crate::TiffResult;

#[cfg(feature = "deflate")]
mod deflate;
#[cfg(feature = "lzw")]
mod lzw;
mod packbits;
mod uncompressed;

#[cfg(feature = "deflate")]
pub use self::deflate::{Deflate, DeflateLevel};
#[cfg(feature = "lzw")]
pub use self::lzw::Lzw;
pub use self::packbits::Packbits;
pub use self::uncompressed::Uncompressed;

/// What a compressor knows about the chunk it is packing.
#[derive(Clone, Debug)]
pub struct CompressionContext<'a> {
    /// Dimensions of the stored chunk, including tile padding.
    pub image_size: Size,
    /// Placement of the chunk's pixels in the image.
    pub region: Region,
    pub bits_per_sample: &'a [u16],
    pub photometric: PhotometricInterpretation,
    pub byte_order: ByteOrder,
    /// Scratch space shared by every chunk of the image.
    pub pool: &'a ScratchPool<u8>,
}

/// An algorithm used for compression.
///
/// Compressors are shared between worker threads and must not keep per-chunk state.
pub trait Compressor: Send + Sync + fmt::Debug {
    /// The corresponding tag to the algorithm.
    fn method(&self) -> CompressionMethod;

    /// Compress one chunk of packed samples.
    fn compress(&self, ctx: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>>;
}
