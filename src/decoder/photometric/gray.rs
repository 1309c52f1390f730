use enough::Stop;

use super::{emit_rows, sample16, InterpretInput, PhotometricInterpreter, RowSink};
use crate::bits::{expand_bits, BitOrder, BitReader};
use crate::pixel::{Gray16, Gray8};
use crate::tags::ByteOrder;
use crate::{TiffResult, TiffUnsupportedError};

#[derive(Debug)]
pub(super) struct BlackIsZero8 {
    pub invert: bool,
}

impl PhotometricInterpreter for BlackIsZero8 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize;
        let mask = if self.invert { 0xff } else { 0 };
        emit_rows::<Gray8>(input, sink, stop, |row, out| {
            let line = &input.scanline(0, row)[x0..];
            for (pixel, &v) in out.iter_mut().zip(line) {
                pixel.intensity = v ^ mask;
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub(super) struct BlackIsZero16 {
    pub invert: bool,
}

impl PhotometricInterpreter for BlackIsZero16 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize;
        let mask = if self.invert { 0xffff } else { 0 };
        emit_rows::<Gray16>(input, sink, stop, |row, out| {
            let line = input.scanline(0, row);
            for (i, pixel) in out.iter_mut().enumerate() {
                pixel.intensity = sample16(line, x0 + i, input.byte_order) ^ mask;
            }
            Ok(())
        })
    }
}

/// Gray samples of any width from 1 to 32 bits, read through the bit reader.
///
/// Samples up to 8 bits produce [`Gray8`], wider ones [`Gray16`]. Samples wider than 16 bits are
/// expanded to 32 bits and keep their upper half.
#[derive(Debug)]
pub(super) struct BlackIsZeroAny {
    bits: u32,
    invert: bool,
    order: BitOrder,
}

impl BlackIsZeroAny {
    pub fn new(bits: u16, invert: bool, order: BitOrder) -> TiffResult<Self> {
        if !(1..=32).contains(&bits) {
            return Err(TiffUnsupportedError::UnsupportedBitsPerSample(bits).into());
        }
        Ok(BlackIsZeroAny {
            bits: u32::from(bits),
            invert,
            order,
        })
    }

    fn reader<'a>(&self, input: &InterpretInput<'a>, row: u32) -> BitReader<'a> {
        let mut reader = BitReader::new(input.scanline(0, row), self.order);
        reader.skip(u64::from(input.region.offset.x) * u64::from(self.bits));
        reader
    }
}

impl PhotometricInterpreter for BlackIsZeroAny {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let swap = input.byte_order == ByteOrder::LittleEndian && self.bits % 8 == 0;
        if self.bits <= 8 {
            let mask = if self.invert { 0xff } else { 0 };
            emit_rows::<Gray8>(input, sink, stop, |row, out| {
                let mut reader = self.reader(input, row);
                for pixel in out.iter_mut() {
                    let v = expand_bits(u64::from(reader.read(self.bits)), self.bits, 8, false);
                    pixel.intensity = v as u8 ^ mask;
                }
                Ok(())
            })
        } else {
            let target = if self.bits <= 16 { 16 } else { 32 };
            let shift = target - 16;
            let mask = if self.invert { 0xffff } else { 0 };
            emit_rows::<Gray16>(input, sink, stop, |row, out| {
                let mut reader = self.reader(input, row);
                for pixel in out.iter_mut() {
                    let v = expand_bits(u64::from(reader.read(self.bits)), self.bits, target, swap);
                    pixel.intensity = (v >> shift) as u16 ^ mask;
                }
                Ok(())
            })
        }
    }
}
