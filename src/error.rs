use std::fmt;
use std::io;
use std::num::TryFromIntError;

use enough::StopReason;
use quick_error::quick_error;

use crate::tags::{
    CompressionMethod, PhotometricInterpretation, PlanarConfiguration, Predictor, SampleFormat,
    Tag, Type,
};

quick_error! {
    /// Tiff error kinds.
    #[derive(Debug)]
    pub enum TiffError {
        /// The image is not formatted properly.
        FormatError(err: TiffFormatError) {
            display("format error: {}", err)
            from()
        }
        /// The image uses a feature this library cannot process.
        UnsupportedError(err: TiffUnsupportedError) {
            display("unsupported: {}", err)
            from()
        }
        /// An I/O error occurred while reading or writing the stream.
        IoError(err: io::Error) {
            display("{}", err)
            source(err)
            from()
        }
        /// One of the configured limits was exceeded.
        LimitsExceeded {
            display("the configured limits are exceeded")
        }
        /// An integer conversion to or from a platform size failed.
        IntSizeError {
            display("platform or format size limits exceeded")
            from(TryFromIntError)
        }
        /// The library was used incorrectly.
        UsageError(err: UsageError) {
            display("usage error: {}", err)
            from()
        }
        /// Cancellation was observed before the operation finished.
        Cancelled(reason: StopReason) {
            display("operation cancelled: {:?}", reason)
            from()
        }
    }
}

/// The image is not formatted properly.
///
/// This indicates that the encoder producing the image might behave incorrectly or that the
/// input file has been corrupted.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TiffFormatError {
    TiffSignatureNotFound,
    TiffSignatureInvalid,
    BigTiffHeaderInvalid,
    ImageFileDirectoryNotFound,
    InvalidTagValueType(Tag),
    InvalidTypeForTag(Tag, Type),
    RequiredTagNotFound(Tag),
    UnknownPredictor(u16),
    UnknownPlanarConfiguration(u16),
    ByteExpected(Type),
    UnsignedIntegerExpected(Type),
    InconsistentSizesEncountered,
    InconsistentStripSamples { actual_samples: usize, required_samples: usize },
    InvalidDimensions(u32, u32),
    InvalidTagCount(Tag, u64),
    ColorMapLengthMismatch { expected: usize, actual: usize },
    YCbCrCoefficientsInvalid(usize),
    ReferenceBlackWhiteInvalid(usize),
    InvalidSubsampling(u16, u16),
    CompressedDataTooShort { expected: usize, actual: usize },
    CycleInOffsets,
}

impl fmt::Display for TiffFormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffFormatError::*;
        match *self {
            TiffSignatureNotFound => write!(fmt, "TIFF signature not found."),
            TiffSignatureInvalid => write!(fmt, "TIFF signature invalid."),
            BigTiffHeaderInvalid => write!(fmt, "BigTIFF header fields are invalid."),
            ImageFileDirectoryNotFound => write!(fmt, "Image file directory not found."),
            InvalidTagValueType(ref tag) => {
                write!(fmt, "Invalid tag value type for tag {:?}.", tag)
            }
            InvalidTypeForTag(tag, ty) => {
                write!(fmt, "Tag {:?} does not accept values of type {:?}.", tag, ty)
            }
            RequiredTagNotFound(ref tag) => write!(fmt, "Required tag `{:?}` not found.", tag),
            UnknownPredictor(ref predictor) => {
                write!(fmt, "Unknown predictor \u{201c}{}\u{201d} encountered", predictor)
            }
            UnknownPlanarConfiguration(ref config) => {
                write!(fmt, "Unknown planar configuration \u{201c}{}\u{201d} encountered", config)
            }
            ByteExpected(ref ty) => write!(fmt, "Expected byte, {:?} found.", ty),
            UnsignedIntegerExpected(ref ty) => {
                write!(fmt, "Expected unsigned integer, {:?} found.", ty)
            }
            InconsistentSizesEncountered => write!(fmt, "Inconsistent sizes encountered."),
            InconsistentStripSamples {
                actual_samples,
                required_samples,
            } => write!(
                fmt,
                "Strip or tile table has {} entries, {} required.",
                actual_samples, required_samples
            ),
            InvalidDimensions(width, height) => {
                write!(fmt, "Invalid dimensions: {}x{}.", width, height)
            }
            InvalidTagCount(tag, count) => {
                write!(fmt, "Tag {:?} has an invalid value count {}.", tag, count)
            }
            ColorMapLengthMismatch { expected, actual } => write!(
                fmt,
                "ColorMap has {} entries, expected {}.",
                actual, expected
            ),
            YCbCrCoefficientsInvalid(count) => {
                write!(fmt, "YCbCrCoefficients needs 3 values, found {}.", count)
            }
            ReferenceBlackWhiteInvalid(count) => {
                write!(fmt, "ReferenceBlackWhite needs 6 values, found {}.", count)
            }
            InvalidSubsampling(h, v) => {
                write!(fmt, "Invalid YCbCr sub-sampling factors {}x{}.", h, v)
            }
            CompressedDataTooShort { expected, actual } => write!(
                fmt,
                "Decompressed chunk has {} bytes, expected {}.",
                actual, expected
            ),
            CycleInOffsets => write!(fmt, "File contained a cycle in the list of IFDs"),
        }
    }
}

/// The image or requested operation uses a feature this library does not handle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TiffUnsupportedError {
    UnsupportedBitsPerSample(u16),
    UnsupportedSampleCount(u16),
    UnsupportedSampleFormat(SampleFormat),
    UnsupportedCompressionMethod(CompressionMethod),
    UnsupportedPredictor(Predictor),
    UnsupportedPredictorLayout { samples: usize, bits: u16 },
    UnsupportedInterpretation(PhotometricInterpretation),
    UnsupportedPlanarConfig(PlanarConfiguration),
    UnsupportedPixelLayout {
        photometric: PhotometricInterpretation,
        bits_per_sample: Vec<u16>,
    },
    UnsupportedConversion {
        from: &'static str,
        to: &'static str,
    },
    UnknownInterpretation,
}

impl fmt::Display for TiffUnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::TiffUnsupportedError::*;
        match self {
            UnsupportedBitsPerSample(bits) => write!(fmt, "{} bits per sample.", bits),
            UnsupportedSampleCount(count) => write!(fmt, "{} samples per pixel.", count),
            UnsupportedSampleFormat(format) => write!(fmt, "sample format {:?}.", format),
            UnsupportedCompressionMethod(method) => {
                write!(fmt, "compression method {:?} has no registered codec.", method)
            }
            UnsupportedPredictor(predictor) => write!(fmt, "predictor {:?}.", predictor),
            UnsupportedPredictorLayout { samples, bits } => write!(
                fmt,
                "horizontal predictor over {} samples of {} bits.",
                samples, bits
            ),
            UnsupportedInterpretation(interpretation) => {
                write!(fmt, "photometric interpretation {:?}.", interpretation)
            }
            UnsupportedPlanarConfig(config) => write!(fmt, "planar configuration {:?}.", config),
            UnsupportedPixelLayout {
                photometric,
                bits_per_sample,
            } => write!(
                fmt,
                "{:?} with bits per sample {:?}.",
                photometric, bits_per_sample
            ),
            UnsupportedConversion { from, to } => {
                write!(fmt, "pixel conversion from {} to {}.", from, to)
            }
            UnknownInterpretation => write!(fmt, "missing photometric interpretation."),
        }
    }
}

/// User errors that can be fixed by calling the library differently.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
    InvalidTileSize { width: u32, height: u32 },
    InvalidRowsPerStrip(u32),
    RegionOutOfBounds,
    SpanOutOfRange { index: usize, start: usize, len: usize },
    BufferSizeMismatch { expected: usize, actual: usize },
    DuplicateTag(u16),
    DirectoryAlreadyWritten,
    ThreadPool(String),
}

impl fmt::Display for UsageError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::UsageError::*;
        match self {
            InvalidTileSize { width, height } => write!(
                fmt,
                "tile size {}x{} must be at least 16 and a multiple of 16",
                width, height
            ),
            InvalidRowsPerStrip(rows) => write!(fmt, "rows per strip must not be {}", rows),
            RegionOutOfBounds => write!(fmt, "requested region exceeds the image bounds"),
            SpanOutOfRange { index, start, len } => write!(
                fmt,
                "span {}..{} at index {} is outside the pixel buffer",
                start,
                start + len,
                index
            ),
            BufferSizeMismatch { expected, actual } => write!(
                fmt,
                "buffer holds {} elements, {} required",
                actual, expected
            ),
            DuplicateTag(tag) => write!(fmt, "tag {} written twice into one directory", tag),
            DirectoryAlreadyWritten => write!(fmt, "directory has already been flushed"),
            ThreadPool(message) => write!(fmt, "could not build thread pool: {}", message),
        }
    }
}

/// Result of an image decoding/encoding process
pub type TiffResult<T> = Result<T, TiffError>;
