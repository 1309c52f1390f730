use enough::Stop;

use super::{emit_rows, sample16, AlphaMode, InterpretInput, PhotometricInterpreter, RowSink};
use crate::bits::{expand_bits, BitOrder, BitReader};
use crate::pixel::{undo_premultiplied, wipe_alpha, Bgra64, Rgb24, Rgba32, Rgba64};
use crate::tags::ByteOrder;
use crate::{TiffResult, TiffUnsupportedError};

#[inline(always)]
fn widen(v: u8) -> u16 {
    u16::from(v) * 0x101
}

fn present_alpha(row: &mut [Bgra64], alpha: AlphaMode) {
    match alpha {
        AlphaMode::Unassociated => {}
        AlphaMode::UndoPremultiplied => undo_premultiplied(row),
        AlphaMode::Preserve => wipe_alpha(row),
    }
}

#[derive(Debug)]
pub(super) struct ChunkyRgb888;

impl PhotometricInterpreter for ChunkyRgb888 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize * 3;
        emit_rows::<Rgb24>(input, sink, stop, |row, out| {
            let line = &input.scanline(0, row)[x0..];
            for (pixel, s) in out.iter_mut().zip(line.chunks_exact(3)) {
                *pixel = Rgb24::new(s[0], s[1], s[2]);
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub(super) struct ChunkyRgba8888 {
    pub alpha: AlphaMode,
}

impl PhotometricInterpreter for ChunkyRgba8888 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize * 4;
        if self.alpha == AlphaMode::Unassociated {
            return emit_rows::<Rgba32>(input, sink, stop, |row, out| {
                let line = &input.scanline(0, row)[x0..];
                for (pixel, s) in out.iter_mut().zip(line.chunks_exact(4)) {
                    *pixel = Rgba32::new(s[0], s[1], s[2], s[3]);
                }
                Ok(())
            });
        }

        emit_rows::<Bgra64>(input, sink, stop, |row, out| {
            let line = &input.scanline(0, row)[x0..];
            for (pixel, s) in out.iter_mut().zip(line.chunks_exact(4)) {
                *pixel = Bgra64::new(widen(s[2]), widen(s[1]), widen(s[0]), widen(s[3]));
            }
            present_alpha(out, self.alpha);
            Ok(())
        })
    }
}

#[derive(Debug)]
pub(super) struct ChunkyRgba16161616 {
    pub alpha: AlphaMode,
}

impl PhotometricInterpreter for ChunkyRgba16161616 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize * 4;
        let order = input.byte_order;
        emit_rows::<Bgra64>(input, sink, stop, |row, out| {
            let line = input.scanline(0, row);
            for (i, pixel) in out.iter_mut().enumerate() {
                let s = x0 + i * 4;
                *pixel = Bgra64::new(
                    sample16(line, s + 2, order),
                    sample16(line, s + 1, order),
                    sample16(line, s, order),
                    sample16(line, s + 3, order),
                );
            }
            present_alpha(out, self.alpha);
            Ok(())
        })
    }
}

/// Chunky RGB or RGBA with up to 16 bits per channel, channel widths may differ.
#[derive(Debug)]
pub(super) struct ChunkyRgbAny {
    bits: Vec<u32>,
    pixel_bits: u64,
    alpha: AlphaMode,
    order: BitOrder,
}

impl ChunkyRgbAny {
    pub fn new(bits: &[u16], alpha: AlphaMode, order: BitOrder) -> TiffResult<Self> {
        if let Some(&bad) = bits.iter().find(|b| !(1..=16).contains(*b)) {
            return Err(TiffUnsupportedError::UnsupportedBitsPerSample(bad).into());
        }
        if !(3..=4).contains(&bits.len()) {
            return Err(TiffUnsupportedError::UnsupportedSampleCount(bits.len() as u16).into());
        }
        Ok(ChunkyRgbAny {
            bits: bits.iter().map(|&b| u32::from(b)).collect(),
            pixel_bits: bits.iter().map(|&b| u64::from(b)).sum(),
            alpha,
            order,
        })
    }

    fn read_pixel(&self, reader: &mut BitReader<'_>, swap: bool) -> [u16; 4] {
        let mut channels = [0xffff; 4];
        for (channel, &bits) in channels.iter_mut().zip(&self.bits) {
            let raw = u64::from(reader.read(bits));
            *channel = expand_bits(raw, bits, 16, swap && bits == 16) as u16;
        }
        channels
    }
}

impl PhotometricInterpreter for ChunkyRgbAny {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let swap = input.byte_order == ByteOrder::LittleEndian;
        let start = u64::from(input.region.offset.x) * self.pixel_bits;
        let reader = |row| {
            let mut reader = BitReader::new(input.scanline(0, row), self.order);
            reader.skip(start);
            reader
        };

        if self.bits.len() == 3 || self.alpha == AlphaMode::Unassociated {
            return emit_rows::<Rgba64>(input, sink, stop, |row, out| {
                let mut reader = reader(row);
                for pixel in out.iter_mut() {
                    let [r, g, b, a] = self.read_pixel(&mut reader, swap);
                    *pixel = Rgba64::new(r, g, b, a);
                }
                Ok(())
            });
        }

        emit_rows::<Bgra64>(input, sink, stop, |row, out| {
            let mut reader = reader(row);
            for pixel in out.iter_mut() {
                let [r, g, b, a] = self.read_pixel(&mut reader, swap);
                *pixel = Bgra64::new(b, g, r, a);
            }
            present_alpha(out, self.alpha);
            Ok(())
        })
    }
}

/// RGB or RGBA stored as one plane per channel, 8 or 16 bits each.
#[derive(Debug)]
pub(super) struct PlanarRgb {
    bits: u16,
    has_alpha: bool,
    alpha: AlphaMode,
}

impl PlanarRgb {
    pub fn new(bits: u16, has_alpha: bool, alpha: AlphaMode) -> Self {
        PlanarRgb {
            bits,
            has_alpha,
            alpha,
        }
    }

    fn sample(&self, line: &[u8], x: usize, order: ByteOrder) -> u16 {
        if self.bits == 8 {
            widen(line[x])
        } else {
            sample16(line, x, order)
        }
    }
}

impl PhotometricInterpreter for PlanarRgb {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize;
        let order = input.byte_order;
        let planes = if self.has_alpha { 4 } else { 3 };

        if self.bits == 8 && self.alpha == AlphaMode::Unassociated {
            return emit_rows::<Rgba32>(input, sink, stop, |row, out| {
                let lines: Vec<&[u8]> = (0..planes).map(|p| input.scanline(p, row)).collect();
                for (i, pixel) in out.iter_mut().enumerate() {
                    let a = lines.get(3).map_or(0xff, |line| line[x0 + i]);
                    *pixel = Rgba32::new(lines[0][x0 + i], lines[1][x0 + i], lines[2][x0 + i], a);
                }
                Ok(())
            });
        }

        emit_rows::<Bgra64>(input, sink, stop, |row, out| {
            let lines: Vec<&[u8]> = (0..planes).map(|p| input.scanline(p, row)).collect();
            for (i, pixel) in out.iter_mut().enumerate() {
                let x = x0 + i;
                let a = lines
                    .get(3)
                    .map_or(0xffff, |line| self.sample(line, x, order));
                *pixel = Bgra64::new(
                    self.sample(lines[2], x, order),
                    self.sample(lines[1], x, order),
                    self.sample(lines[0], x, order),
                    a,
                );
            }
            if self.has_alpha {
                present_alpha(out, self.alpha);
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
    fn rgb888_region() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8, 9];
        let input = input(vec![&data], vec![9], 3, Region::new(1, 0, 2, 1));
        let mut sink = Collect::default();
        ChunkyRgb888.interpret(&input, &mut sink, &Unstoppable).unwrap();
        assert_eq!(
            sink.rows[0],
            vec![
                Rgba64::new(0x0404, 0x0505, 0x0606, 0xffff),
                Rgba64::new(0x0707, 0x0808, 0x0909, 0xffff)
            ]
        );
    }

    #[test]
    fn associated_alpha_modes() {
        let data = [0x80, 0x80, 0x80, 0x80];
        let input = input(vec![&data], vec![4], 1, Region::new(0, 0, 1, 1));

        let mut sink = Collect::default();
        ChunkyRgba8888 {
            alpha: AlphaMode::UndoPremultiplied,
        }
        .interpret(&input, &mut sink, &Unstoppable)
        .unwrap();
        assert_eq!(sink.rows[0][0], Rgba64::new(0xffff, 0xffff, 0xffff, 0x8080));

        let mut sink = Collect::default();
        ChunkyRgba8888 {
            alpha: AlphaMode::Preserve,
        }
        .interpret(&input, &mut sink, &Unstoppable)
        .unwrap();
        assert_eq!(sink.rows[0][0], Rgba64::new(0x8080, 0x8080, 0x8080, 0xffff));

        let mut sink = Collect::default();
        ChunkyRgba8888 {
            alpha: AlphaMode::Unassociated,
        }
        .interpret(&input, &mut sink, &Unstoppable)
        .unwrap();
        assert_eq!(sink.rows[0][0], Rgba64::new(0x8080, 0x8080, 0x8080, 0x8080));
    }

    #[test]
    fn rgba16_undo_premultiplied() {
        let data = [0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00];
        let input = input(vec![&data], vec![8], 1, Region::new(0, 0, 1, 1));
        let mut sink = Collect::default();
        ChunkyRgba16161616 {
            alpha: AlphaMode::UndoPremultiplied,
        }
        .interpret(&input, &mut sink, &Unstoppable)
        .unwrap();
        assert_eq!(sink.rows[0][0], Rgba64::new(0xffff, 0xffff, 0xffff, 0x8000));
        assert!(sink.raw[0].starts_with("Bgra64"));
    }

    #[test]
    fn mixed_widths_565() {
        // r = 0b11111, g = 0b000000, b = 0b10000
        let data = [0b1111_1000, 0b0001_0000];
        let input = input(vec![&data], vec![2], 1, Region::new(0, 0, 1, 1));
        let mut sink = Collect::default();
        ChunkyRgbAny::new(&[5, 6, 5], AlphaMode::Unassociated, BitOrder::MsbFirst)
            .unwrap()
            .interpret(&input, &mut sink, &Unstoppable)
            .unwrap();
        assert_eq!(sink.rows[0][0], Rgba64::new(0xffff, 0, 0x8421, 0xffff));
    }

    #[test]
    fn planar_with_alpha() {
        let (r, g, b, a) = ([10u8, 11], [20u8, 21], [30u8, 31], [255u8, 0]);
        let input = input(
            vec![&r, &g, &b, &a],
            vec![2; 4],
            2,
            Region::new(0, 0, 2, 1),
        );
        let mut sink = Collect::default();
        PlanarRgb::new(8, true, AlphaMode::Unassociated)
            .interpret(&input, &mut sink, &Unstoppable)
            .unwrap();
        assert_eq!(sink.rows[0][0], Rgba64::new(0x0a0a, 0x1414, 0x1e1e, 0xffff));
        assert_eq!(sink.rows[0][1], Rgba64::new(0x0b0b, 0x1515, 0x1f1f, 0));
    }
}
