//! Decoding and Encoding of TIFF Images
//!
//! TIFF (Tagged Image File Format) is a versatile image format that supports
//! lossless and lossy compression.
//!
//! Images are decoded and encoded one strip or tile at a time through short middleware chains:
//! decompression, predictor and photometric interpretation on the way in, pixel packing,
//! predictor and compression on the way out. Both classic TIFF and BigTIFF are supported in
//! either byte order.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification

pub mod bits;
mod cancel;
pub mod decoder;
mod directory;
pub mod encoder;
mod error;
pub mod field;
pub mod pixel;
pub mod pool;
pub mod predictor;
pub mod tags;

pub use self::cancel::CancellationToken;
pub use self::directory::{Directory, Entry};
pub use self::error::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError, UsageError};
