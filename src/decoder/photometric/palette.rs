use enough::Stop;

use super::{emit_rows, InterpretInput, PhotometricInterpreter, RowSink};
use crate::bits::{BitOrder, BitReader};
use crate::pixel::Rgba64;
use crate::tags::ByteOrder;
use crate::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// Indexed color with 1 to 16 bit indices into the `ColorMap` tag.
#[derive(Debug)]
pub(super) struct PaletteAny {
    bits: u32,
    order: BitOrder,
    colors: Vec<Rgba64>,
}

impl PaletteAny {
    /// The color map holds all red values, then all green, then all blue, `1 << bits` of each.
    /// Entries past the three tables are ignored.
    pub fn new(bits: u16, color_map: &[u16], order: BitOrder) -> TiffResult<Self> {
        if !(1..=16).contains(&bits) {
            return Err(TiffUnsupportedError::UnsupportedBitsPerSample(bits).into());
        }
        let entries = 1usize << bits;
        if color_map.len() < entries * 3 {
            return Err(TiffError::FormatError(
                TiffFormatError::ColorMapLengthMismatch {
                    expected: entries * 3,
                    actual: color_map.len(),
                },
            ));
        }

        let (red, rest) = color_map.split_at(entries);
        let (green, blue) = rest.split_at(entries);
        let colors = red
            .iter()
            .zip(green)
            .zip(blue)
            .map(|((&r, &g), &b)| Rgba64::new(r, g, b, 0xffff))
            .collect();

        Ok(PaletteAny {
            bits: u32::from(bits),
            order,
            colors,
        })
    }

    /// `index` must be below `1 << bits`, which every read of `bits` bits is.
    fn lookup(&self, index: u32) -> Rgba64 {
        self.colors[index as usize]
    }
}

impl PhotometricInterpreter for PaletteAny {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let swap = self.bits == 16 && input.byte_order == ByteOrder::LittleEndian;
        emit_rows::<Rgba64>(input, sink, stop, |row, out| {
            let mut reader = BitReader::new(input.scanline(0, row), self.order);
            reader.skip(u64::from(input.region.offset.x) * u64::from(self.bits));
            for pixel in out.iter_mut() {
                let mut index = reader.read(self.bits);
                if swap {
                    index = u32::from((index as u16).swap_bytes());
                }
                *pixel = self.lookup(index);
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
    fn two_bit_index_selects_fourth_entry() {
        let map = [
            0, 0, 0, 65535, // red
            0, 100, 200, 300, // green
            1, 2, 3, 4, // blue
        ];
        let palette = PaletteAny::new(2, &map, BitOrder::MsbFirst).unwrap();
        let data = [0b1100_0110];
        let input = input(vec![&data], vec![1], 4, Region::new(0, 0, 4, 1));
        let mut sink = Collect::default();
        palette.interpret(&input, &mut sink, &Unstoppable).unwrap();
        assert_eq!(
            sink.rows[0],
            vec![
                Rgba64::new(65535, 300, 4, 0xffff),
                Rgba64::new(0, 0, 1, 0xffff),
                Rgba64::new(0, 100, 2, 0xffff),
                Rgba64::new(0, 200, 3, 0xffff),
            ]
        );
    }

    #[test]
    fn colormap_length_is_checked_eagerly() {
        let err = PaletteAny::new(2, &[0; 11], BitOrder::MsbFirst).unwrap_err();
        assert!(matches!(
            err,
            TiffError::FormatError(TiffFormatError::ColorMapLengthMismatch {
                expected: 12,
                actual: 11
            })
        ));
    }

    #[test]
    fn longer_colormap_keeps_table_offsets() {
        let map = [
            10, 11, // red
            20, 21, // green
            30, 31, // blue
            99, 99, 99, // trailing
        ];
        let palette = PaletteAny::new(1, &map, BitOrder::MsbFirst).unwrap();
        assert_eq!(palette.colors.len(), 2);
        assert_eq!(palette.lookup(0), Rgba64::new(10, 20, 30, 0xffff));
        assert_eq!(palette.lookup(1), Rgba64::new(11, 21, 31, 0xffff));
    }

    #[test]
    fn sixteen_bit_indices_cover_the_whole_table() {
        let mut map = vec![0u16; 3 << 16];
        map[0xffff] = 7;
        let palette = PaletteAny::new(16, &map, BitOrder::MsbFirst).unwrap();
        let data = [0xff, 0xff, 0x00, 0x00];
        let input = input(vec![&data], vec![4], 2, Region::new(0, 0, 2, 1));
        let mut sink = Collect::default();
        palette.interpret(&input, &mut sink, &Unstoppable).unwrap();
        assert_eq!(sink.rows[0][0].r, 7);
        assert_eq!(sink.rows[0][1].r, 0);
    }

    #[test]
    fn lsb_fill_order() {
        let map = [0, 1, 0, 1, 0, 1];
        let palette = PaletteAny::new(1, &map, BitOrder::LsbFirst).unwrap();
        let data = [0b0000_0001];
        let input = input(vec![&data], vec![1], 2, Region::new(0, 0, 2, 1));
        let mut sink = Collect::default();
        palette.interpret(&input, &mut sink, &Unstoppable).unwrap();
        assert_eq!(sink.rows[0][0].r, 1);
        assert_eq!(sink.rows[0][1].r, 0);
    }
}
