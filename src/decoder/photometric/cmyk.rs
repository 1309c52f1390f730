use enough::Stop;

use super::{emit_rows, InterpretInput, PhotometricInterpreter, RowSink};
use crate::pixel::Cmyk32;
use crate::TiffResult;

/// Separated 8-bit CMYK with the default ink set.
#[derive(Debug)]
pub(super) struct ChunkyCmyk8888;

impl PhotometricInterpreter for ChunkyCmyk8888 {
    fn interpret(
        &self,
        input: &InterpretInput<'_>,
        sink: &mut dyn RowSink,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        let x0 = input.region.offset.x as usize * 4;
        emit_rows::<Cmyk32>(input, sink, stop, |row, out| {
            let line = &input.scanline(0, row)[x0..];
            for (pixel, s) in out.iter_mut().zip(line.chunks_exact(4)) {
                *pixel = Cmyk32::new(s[0], s[1], s[2], s[3]);
            }
            Ok(())
        })
    }
}
