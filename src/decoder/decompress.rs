//! The seam between the decode pipeline and compression codecs.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use crate::pixel::Size;
use crate::pool::ScratchPool;
use crate::tags::{ByteOrder, CompressionMethod, PhotometricInterpretation};
use crate::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// What a decompressor knows about the chunk it is expanding.
#[derive(Clone, Debug)]
pub struct DecompressionContext<'a> {
    /// Dimensions of the chunk, including tile padding.
    pub image_size: Size,
    pub bits_per_sample: &'a [u16],
    pub bytes_per_scanline: usize,
    pub photometric: PhotometricInterpretation,
    pub byte_order: ByteOrder,
    /// Rows the caller does not need, rounded down to a multiple of 8. Codecs working on 8-row
    /// blocks may leave these rows of the output untouched.
    pub skipped_scanlines: u32,
    /// Rows after the skipped ones that must be produced.
    pub requested_scanlines: u32,
    /// Shared codec tables such as `JPEGTables`.
    pub tables: Option<&'a [u8]>,
    /// Scratch space for intermediate buffers.
    pub pool: &'a ScratchPool<u8>,
}

/// Expands one compressed chunk.
///
/// `output` has exactly the size of the uncompressed chunk and must be filled completely.
pub trait Decompressor: Send + Sync + fmt::Debug {
    fn decompress(
        &self,
        ctx: &DecompressionContext<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> TiffResult<()>;
}

fn fill_from(mut reader: impl Read, output: &mut [u8]) -> TiffResult<()> {
    let mut filled = 0;
    while filled < output.len() {
        match reader.read(&mut output[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }

    if filled < output.len() {
        return Err(TiffError::FormatError(
            TiffFormatError::CompressedDataTooShort {
                expected: output.len(),
                actual: filled,
            },
        ));
    }
    Ok(())
}

/// Uncompressed data, copied as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneDecompressor;

impl Decompressor for NoneDecompressor {
    fn decompress(
        &self,
        _: &DecompressionContext<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> TiffResult<()> {
        fill_from(input, output)
    }
}

/// Expand PackBits runs into `output`, stopping once it is full.
fn unpack_bits(mut input: &[u8], output: &mut [u8]) -> TiffResult<()> {
    let mut filled = 0;
    while filled < output.len() {
        let Some((&header, rest)) = input.split_first() else {
            break;
        };
        input = rest;
        let remaining = output.len() - filled;
        match header as i8 {
            // A no-op header.
            -128 => {}
            n @ 0.. => {
                let len = (n as usize + 1).min(remaining).min(input.len());
                output[filled..filled + len].copy_from_slice(&input[..len]);
                input = &input[len..];
                filled += len;
            }
            n => {
                let Some((&value, rest)) = input.split_first() else {
                    break;
                };
                input = rest;
                let len = ((1 - n as isize) as usize).min(remaining);
                output[filled..filled + len].fill(value);
                filled += len;
            }
        }
    }

    if filled < output.len() {
        return Err(TiffError::FormatError(
            TiffFormatError::CompressedDataTooShort {
                expected: output.len(),
                actual: filled,
            },
        ));
    }
    Ok(())
}

/// Apple PackBits run length decoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackBitsDecompressor;

impl Decompressor for PackBitsDecompressor {
    fn decompress(
        &self,
        _: &DecompressionContext<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> TiffResult<()> {
        unpack_bits(input, output)
    }
}

/// LZW with the TIFF early code size switch.
#[cfg(feature = "lzw")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwDecompressor;

#[cfg(feature = "lzw")]
impl Decompressor for LzwDecompressor {
    fn decompress(
        &self,
        _: &DecompressionContext<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> TiffResult<()> {
        let mut decoder = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        let mut consumed = 0;
        let mut filled = 0;

        while filled < output.len() {
            let result = decoder.decode_bytes(&input[consumed..], &mut output[filled..]);
            consumed += result.consumed_in;
            filled += result.consumed_out;
            match result.status {
                Ok(weezl::LzwStatus::Ok) => {}
                Ok(weezl::LzwStatus::Done) | Ok(weezl::LzwStatus::NoProgress) => break,
                Err(err) => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, err).into())
                }
            }
        }

        if filled < output.len() {
            return Err(TiffError::FormatError(
                TiffFormatError::CompressedDataTooShort {
                    expected: output.len(),
                    actual: filled,
                },
            ));
        }
        Ok(())
    }
}

/// Zlib wrapped deflate, for both the registered and the legacy method id.
#[cfg(feature = "deflate")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateDecompressor;

#[cfg(feature = "deflate")]
impl Decompressor for DeflateDecompressor {
    fn decompress(
        &self,
        _: &DecompressionContext<'_>,
        input: &[u8],
        output: &mut [u8],
    ) -> TiffResult<()> {
        fill_from(flate2::read::ZlibDecoder::new(input), output)
    }
}

/// Decompressors by compression method.
#[derive(Clone)]
pub struct DecompressorRegistry {
    codecs: HashMap<u16, Arc<dyn Decompressor>>,
}

impl DecompressorRegistry {
    /// A registry with every built-in codec.
    pub fn with_builtins() -> Self {
        let mut registry = DecompressorRegistry {
            codecs: HashMap::new(),
        };
        registry.register(CompressionMethod::None, Arc::new(NoneDecompressor));
        registry.register(CompressionMethod::PackBits, Arc::new(PackBitsDecompressor));
        #[cfg(feature = "lzw")]
        registry.register(CompressionMethod::LZW, Arc::new(LzwDecompressor));
        #[cfg(feature = "deflate")]
        {
            registry.register(CompressionMethod::Deflate, Arc::new(DeflateDecompressor));
            registry.register(CompressionMethod::OldDeflate, Arc::new(DeflateDecompressor));
        }
        registry
    }

    pub fn register(&mut self, method: CompressionMethod, codec: Arc<dyn Decompressor>) {
        self.codecs.insert(method.to_u16(), codec);
    }

    pub fn get(&self, method: CompressionMethod) -> TiffResult<Arc<dyn Decompressor>> {
        self.codecs.get(&method.to_u16()).cloned().ok_or(
            TiffError::UnsupportedError(TiffUnsupportedError::UnsupportedCompressionMethod(
                method,
            )),
        )
    }
}

impl Default for DecompressorRegistry {
    fn default() -> Self {
        DecompressorRegistry::with_builtins()
    }
}

impl fmt::Debug for DecompressorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys()).finish()
    }
}
