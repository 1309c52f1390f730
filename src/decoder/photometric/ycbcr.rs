use enough::Stop;

use super::{emit_rows, InterpretInput, PhotometricInterpreter, RowSink};
use crate::pixel::Rgb24;
use crate::{TiffError, TiffFormatError, TiffResult};

const BT601: [f64; 3] = [0.299, 0.587, 0.114];
const DEFAULT_REFERENCE: [f64; 6] = [0.0, 255.0, 128.0, 255.0, 128.0, 255.0];

/// Converts 8-bit YCbCr samples to RGB through per-sample tables.
///
/// The tables fold the reference black and white points and the luma coefficients, so a pixel
/// costs three lookups per channel and no multiplication.
#[derive(Clone)]
pub struct YCbCrConverter {
    y: Box<[f32; 256]>,
    cr_r: Box<[f32; 256]>,
    cb_b: Box<[f32; 256]>,
    cr_g: Box<[f32; 256]>,
    cb_g: Box<[f32; 256]>,
}

impl std::fmt::Debug for YCbCrConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YCbCrConverter").finish_non_exhaustive()
    }
}

fn code_to_value(code: f64, black: f64, white: f64, range: f64) -> f64 {
    let span = white - black;
    (code - black) * range / if span == 0.0 { 1.0 } else { span }
}

fn table(f: impl Fn(f64) -> f64) -> Box<[f32; 256]> {
    let mut table = Box::new([0f32; 256]);
    for (code, entry) in table.iter_mut().enumerate() {
        *entry = f(code as f64) as f32;
    }
    table
}

impl YCbCrConverter {
    /// Build the tables, falling back to ITU-R BT.601 and the default reference range.
    pub fn new(coefficients: Option<&[f64]>, reference: Option<&[f64]>) -> TiffResult<Self> {
        let [luma_red, luma_green, luma_blue] = match coefficients {
            None => BT601,
            Some(&[r, g, b]) if g != 0.0 => [r, g, b],
            Some(values) => {
                return Err(TiffError::FormatError(
                    TiffFormatError::YCbCrCoefficientsInvalid(values.len()),
                ))
            }
        };
        let reference: [f64; 6] = match reference {
            None => DEFAULT_REFERENCE,
            Some(values) => values.try_into().map_err(|_| {
                TiffError::FormatError(TiffFormatError::ReferenceBlackWhiteInvalid(values.len()))
            })?,
        };
        let [y_black, y_white, cb_black, cb_white, cr_black, cr_white] = reference;

        let red_scale = 2.0 - 2.0 * luma_red;
        let blue_scale = 2.0 - 2.0 * luma_blue;
        let cb = |code| code_to_value(code, cb_black, cb_white, 127.0);
        let cr = |code| code_to_value(code, cr_black, cr_white, 127.0);

        Ok(YCbCrConverter {
            y: table(|code| code_to_value(code, y_black, y_white, 255.0)),
            cr_r: table(|code| cr(code) * red_scale),
            cb_b: table(|code| cb(code) * blue_scale),
            cr_g: table(|code| -luma_red * red_scale / luma_green * cr(code)),
            cb_g: table(|code| -luma_blue * blue_scale / luma_green * cb(code)),
        })
    }

    #[inline]
    pub fn convert(&self, y: u8, cb: u8, cr: u8) -> Rgb24 {
        let clamp = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        let y = self.y[usize::from(y)];
        let (cb, cr) = (usize::from(cb), usize::from(cr));
        Rgb24::new(
            clamp(y + self.cr_r[cr]),
            clamp(y + self.cr_g[cr] + self.cb_g[cb]),
            clamp(y + self.cb_b[cb]),
        )
    }
}

/// Y, Cb and Cr in separate planes without sub-sampling.
#[derive(Debug)]
pub(super) struct PlanarYCbCr888 {
    pub converter: YCbCrConverter,
}

impl PhotometricInterpreter for PlanarYCbCr888 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize;
        emit_rows::<Rgb24>(input, sink, stop, |row, out| {
            let y = &input.scanline(0, row)[x0..];
            let cb = &input.scanline(1, row)[x0..];
            let cr = &input.scanline(2, row)[x0..];
            for (i, pixel) in out.iter_mut().enumerate() {
                *pixel = self.converter.convert(y[i], cb[i], cr[i]);
            }
            Ok(())
        })
    }
}

/// Chunky YCbCr stored in data units of `h * v` luma samples followed by one Cb and one Cr.
///
/// Without sub-sampling a data unit is a plain Y, Cb, Cr triple.
#[derive(Debug)]
pub(super) struct ChunkyYCbCr888 {
    converter: YCbCrConverter,
    horizontal: u32,
    vertical: u32,
}

impl ChunkyYCbCr888 {
    pub fn new(converter: YCbCrConverter, horizontal: u16, vertical: u16) -> TiffResult<Self> {
        let valid = |v: u16| matches!(v, 1 | 2 | 4);
        if !valid(horizontal) || !valid(vertical) {
            return Err(TiffError::FormatError(TiffFormatError::InvalidSubsampling(
                horizontal, vertical,
            )));
        }
        Ok(ChunkyYCbCr888 {
            converter,
            horizontal: u32::from(horizontal),
            vertical: u32::from(vertical),
        })
    }
}

impl PhotometricInterpreter for ChunkyYCbCr888 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let (h, v) = (self.horizontal, self.vertical);
        let units_across = input.chunk_width.div_ceil(h) as usize;
        let unit_len = (h * v) as usize + 2;
        let data = input.planes[0];

        emit_rows::<Rgb24>(input, sink, stop, |row, out| {
            let unit_row = (row / v) as usize;
            let luma_row = (row % v) as usize;
            for (i, pixel) in out.iter_mut().enumerate() {
                let x = input.region.offset.x + i as u32;
                let unit = (unit_row * units_across + (x / h) as usize) * unit_len;
                let y = data[unit + luma_row * h as usize + (x % h) as usize];
                let chroma = unit + unit_len - 2;
                *pixel = self.converter.convert(y, data[chroma], data[chroma + 1]);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{input, Collect};
    use super::*;
    use crate::pixel::Region;
    use enough::Unstoppable;

    #[test]
    fn neutral_chroma_is_gray() {
        let converter = YCbCrConverter::new(None, None).unwrap();
        assert_eq!(converter.convert(0, 128, 128), Rgb24::new(0, 0, 0));
        assert_eq!(converter.convert(255, 128, 128), Rgb24::new(255, 255, 255));
        assert_eq!(converter.convert(100, 128, 128), Rgb24::new(100, 100, 100));
    }

    #[test]
    fn saturated_red() {
        let converter = YCbCrConverter::new(None, None).unwrap();
        // BT.601 encoding of pure red.
        let rgb = converter.convert(76, 85, 255);
        assert!(rgb.r >= 253, "{:?}", rgb);
        assert!(rgb.g <= 2, "{:?}", rgb);
        assert!(rgb.b <= 2, "{:?}", rgb);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        assert!(YCbCrConverter::new(Some(&[0.3, 0.6]), None).is_err());
        assert!(YCbCrConverter::new(None, Some(&[0.0; 5])).is_err());
        let converter = YCbCrConverter::new(None, None).unwrap();
        assert!(ChunkyYCbCr888::new(converter, 3, 1).is_err());
    }

    #[test]
    fn subsampled_units_are_upsampled() {
        // Two 2x2 units across a 4x2 chunk.
        let data = [
            10, 20, 30, 40, 128, 128, // unit 0
            50, 60, 70, 80, 128, 128, // unit 1
        ];
        let converter = YCbCrConverter::new(None, None).unwrap();
        let interpreter = ChunkyYCbCr888::new(converter, 2, 2).unwrap();
        let input = input(vec![&data], vec![0], 4, Region::new(1, 0, 3, 2));
        let mut sink = Collect::default();
        interpreter
            .interpret(&input, &mut sink, &Unstoppable)
            .unwrap();
        let luma: Vec<Vec<u16>> = sink
            .rows
            .iter()
            .map(|row| row.iter().map(|p| p.g >> 8).collect())
            .collect();
        assert_eq!(luma, vec![vec![20, 50, 60], vec![40, 70, 80]]);
    }
}
