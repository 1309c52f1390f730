//! Conversion of decompressed sample data into canonical pixels.
//!
//! One interpreter exists per combination of photometric model, bit depth and planar layout. The
//! matching one is picked once per image by [`select_interpreter`]; unsupported combinations are
//! rejected there rather than while rows are produced.

mod cmyk;
mod gray;
mod palette;
mod rgb;
mod ycbcr;

pub use self::ycbcr::YCbCrConverter;

use std::fmt;

use enough::Stop;

use crate::bits::BitOrder;
use crate::decoder::image::ImageInfo;
use crate::decoder::DecodeOptions;
use crate::pixel::{CanonicalPixel, PixelRow, Region};
use crate::tags::{
    ByteOrder, ExtraSamples, FillOrder, InkSet, PhotometricInterpretation, PlanarConfiguration,
    SampleFormat,
};
use crate::{TiffError, TiffResult, TiffUnsupportedError};

use self::cmyk::ChunkyCmyk8888;
use self::gray::{BlackIsZero16, BlackIsZero8, BlackIsZeroAny};
use self::palette::PaletteAny;
use self::rgb::{ChunkyRgb888, ChunkyRgba16161616, ChunkyRgba8888, ChunkyRgbAny, PlanarRgb};
use self::ycbcr::{ChunkyYCbCr888, PlanarYCbCr888};

/// Receives the rows an interpreter produces, numbered from the top of the requested region.
pub trait RowSink {
    fn write_row(&mut self, row: u32, pixels: PixelRow<'_>) -> TiffResult<()>;
}

/// Decompressed sample data of one chunk and the part of it to interpret.
#[derive(Debug)]
pub struct InterpretInput<'a> {
    /// One buffer per stored plane, each holding the whole chunk.
    pub planes: Vec<&'a [u8]>,
    /// Bytes per scanline for each plane.
    pub scanlines: Vec<usize>,
    /// Width of the chunk as stored.
    pub chunk_width: u32,
    /// The rectangle of the chunk to interpret.
    pub region: Region,
    pub byte_order: ByteOrder,
}

impl<'a> InterpretInput<'a> {
    /// One scanline of a plane, addressed by its row in the chunk.
    pub fn scanline(&self, plane: usize, row: u32) -> &'a [u8] {
        let stride = self.scanlines[plane];
        let start = row as usize * stride;
        &self.planes[plane][start..start + stride]
    }
}

/// Converts decompressed samples into canonical pixels.
pub trait PhotometricInterpreter: Send + Sync + fmt::Debug {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()>;
}

/// How an alpha channel is presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    /// Alpha is independent of color and copied as is.
    Unassociated,
    /// Color is premultiplied and gets divided by alpha.
    UndoPremultiplied,
    /// Color is premultiplied and kept, alpha is forced opaque.
    Preserve,
}

/// Produce every row of the requested region with `fill`, checking for cancellation per row.
pub(crate) fn emit_rows<T: CanonicalPixel>(
    input: &InterpretInput<'_>,
    sink: &mut dyn RowSink,
    stop: &dyn Stop,
    mut fill: impl FnMut(u32, &mut [T]) -> TiffResult<()>,
) -> TiffResult<()> {
    let mut row = vec![T::default(); input.region.size.width as usize];
    for y in 0..input.region.size.height {
        stop.check()?;
        fill(input.region.offset.y + y, &mut row)?;
        sink.write_row(y, T::row(&row))?;
    }
    Ok(())
}

/// Read a 16-bit sample at `index` of a byte aligned scanline.
#[inline(always)]
pub(crate) fn sample16(scanline: &[u8], index: usize, order: ByteOrder) -> u16 {
    let raw = [scanline[index * 2], scanline[index * 2 + 1]];
    match order {
        ByteOrder::LittleEndian => u16::from_le_bytes(raw),
        ByteOrder::BigEndian => u16::from_be_bytes(raw),
    }
}

fn unsupported(info: &ImageInfo) -> TiffError {
    TiffError::UnsupportedError(TiffUnsupportedError::UnsupportedPixelLayout {
        photometric: info.photometric,
        bits_per_sample: info.bits_per_sample.clone(),
    })
}

fn alpha_mode(info: &ImageInfo, options: &DecodeOptions) -> AlphaMode {
    match info.extra_samples.first() {
        Some(ExtraSamples::AssociatedAlpha) if options.undo_color_premultiplying => {
            AlphaMode::UndoPremultiplied
        }
        Some(ExtraSamples::AssociatedAlpha) => AlphaMode::Preserve,
        _ => AlphaMode::Unassociated,
    }
}

/// Pick the interpreter for an image.
pub fn select_interpreter(
    info: &ImageInfo,
    options: &DecodeOptions,
    ink_set: InkSet,
) -> TiffResult<Box<dyn PhotometricInterpreter>> {
    if info.sample_format != SampleFormat::Uint {
        return Err(TiffUnsupportedError::UnsupportedSampleFormat(info.sample_format).into());
    }

    let bits = &info.bits_per_sample[..];
    let order = BitOrder::from(info.fill_order);
    let msb = info.fill_order == FillOrder::MsbFirst;
    let chunky = info.planar == PlanarConfiguration::Chunky;
    let alpha = alpha_mode(info, options);

    let interpreter: Box<dyn PhotometricInterpreter> = match info.photometric {
        PhotometricInterpretation::BlackIsZero | PhotometricInterpretation::WhiteIsZero => {
            let invert = info.photometric == PhotometricInterpretation::WhiteIsZero;
            match bits {
                [8] if msb => Box::new(BlackIsZero8 { invert }),
                [16] if msb => Box::new(BlackIsZero16 { invert }),
                [n] => Box::new(BlackIsZeroAny::new(*n, invert, order)?),
                _ => return Err(unsupported(info)),
            }
        }
        PhotometricInterpretation::RGB if chunky => match bits {
            [8, 8, 8] if msb => Box::new(ChunkyRgb888),
            [8, 8, 8, 8] if msb => Box::new(ChunkyRgba8888 { alpha }),
            [16, 16, 16, 16] if msb => Box::new(ChunkyRgba16161616 { alpha }),
            [_, _, _] | [_, _, _, _] => Box::new(ChunkyRgbAny::new(bits, alpha, order)?),
            _ => return Err(unsupported(info)),
        },
        PhotometricInterpretation::RGB => match bits {
            [8, 8, 8] | [8, 8, 8, 8] | [16, 16, 16] | [16, 16, 16, 16] if msb => {
                Box::new(PlanarRgb::new(bits[0], bits.len() == 4, alpha))
            }
            _ => return Err(unsupported(info)),
        },
        PhotometricInterpretation::RGBPalette => match bits {
            [n] => {
                let map = info.color_map.as_deref().ok_or(TiffError::FormatError(
                    crate::TiffFormatError::RequiredTagNotFound(crate::tags::Tag::ColorMap),
                ))?;
                Box::new(PaletteAny::new(*n, map, order)?)
            }
            _ => return Err(unsupported(info)),
        },
        PhotometricInterpretation::CMYK => match (bits, ink_set) {
            ([8, 8, 8, 8], InkSet::Cmyk) if chunky && msb => Box::new(ChunkyCmyk8888),
            _ => return Err(unsupported(info)),
        },
        PhotometricInterpretation::YCbCr => {
            let converter = YCbCrConverter::new(
                info.ycbcr_coefficients.as_deref(),
                info.reference_black_white.as_deref(),
            )?;
            match bits {
                [8, 8, 8] if !chunky => Box::new(PlanarYCbCr888 { converter }),
                [8, 8, 8] if info.is_subsampled() => {
                    let (h, v) = info.ycbcr_subsampling;
                    Box::new(ChunkyYCbCr888::new(converter, h, v)?)
                }
                [8, 8, 8] => Box::new(ChunkyYCbCr888::new(converter, 1, 1)?),
                _ => return Err(unsupported(info)),
            }
        }
        other => {
            return Err(TiffUnsupportedError::UnsupportedInterpretation(other).into());
        }
    };

    log::debug!(
        "{:?} {:?} {:?} interpreted by {:?}",
        info.photometric,
        info.planar,
        info.bits_per_sample,
        interpreter
    );
    Ok(interpreter)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pixel::{Gray16, Gray8, Rgba32, Rgba64};

    /// Collects rows as 16-bit RGBA for comparisons.
    #[derive(Default)]
    pub(crate) struct Collect {
        pub rows: Vec<Vec<Rgba64>>,
        pub raw: Vec<String>,
    }

    impl RowSink for Collect {
        fn write_row(&mut self, row: u32, pixels: PixelRow<'_>) -> TiffResult<()> {
            assert_eq!(row as usize, self.rows.len());
            let mut out = vec![Rgba64::default(); pixels.len()];
            pixels.to_rgba64(&mut out);
            self.rows.push(out);
            self.raw.push(format!("{:?}", pixels));
            Ok(())
        }
    }

    pub(crate) fn input<'a>(
        planes: Vec<&'a [u8]>,
        scanlines: Vec<usize>,
        width: u32,
        region: Region,
    ) -> InterpretInput<'a> {
        InterpretInput {
            planes,
            scanlines,
            chunk_width: width,
            region,
            byte_order: ByteOrder::BigEndian,
        }
    }

    #[test]
    fn emit_rows_honours_cancellation() {
        let token = crate::CancellationToken::new();
        token.cancel();
        let data = [0u8; 4];
        let input = input(vec![&data], vec![2], 2, Region::new(0, 0, 2, 2));
        let mut sink = Collect::default();
        let result = emit_rows::<Gray8>(&input, &mut sink, &token, |_, _| Ok(()));
        assert!(matches!(result, Err(TiffError::Cancelled(_))));
        assert!(sink.rows.is_empty());
    }

    #[test]
    fn canonical_rows_keep_their_type() {
        let g = [Gray16::new(1)];
        assert!(matches!(Gray16::row(&g), PixelRow::Gray16(_)));
        let c = [Rgba32::new(1, 2, 3, 4)];
        assert!(matches!(Rgba32::row(&c), PixelRow::Rgba32(_)));
    }
}
