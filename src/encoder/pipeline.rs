//! The encode middleware chain.
//!
//! The mirror of the decode chain: pixels are packed into stored samples, differenced, compressed
//! and finally appended to the output. Each invocation handles one strip or tile.

use std::fmt;
use std::io::{Seek, Write};
use std::sync::{Mutex, PoisonError};

use enough::Stop;

use super::colortype::ColorType;
use super::compression::{CompressionContext, Compressor};
use super::{DirectoryWriter, TiffWriter};
use crate::pixel::{PixelBufferReader, Region, Size};
use crate::pool::ScratchPool;
use crate::predictor::{self, RowLayout};
use crate::tags::{ByteOrder, PhotometricInterpretation, Predictor};
use crate::{TiffResult, TiffUnsupportedError};

/// Pixels of the image being encoded, packed on demand.
pub trait ChunkSource: Sync {
    /// Size of one stored pixel.
    fn pixel_bytes(&self) -> usize;

    /// Pack `region` into `out`, which holds rows of `stored_width` pixels.
    ///
    /// Pixels of `out` outside the region are left untouched.
    fn pack(
        &self,
        region: Region,
        stored_width: u32,
        out: &mut [u8],
        stop: &(dyn Stop + Sync),
    ) -> TiffResult<()>;
}

/// A [`ChunkSource`] reading a pixel buffer view.
#[derive(Debug)]
pub struct PixelSource<'a, P: ColorType> {
    reader: PixelBufferReader<'a, P>,
    byte_order: ByteOrder,
}

impl<'a, P: ColorType> PixelSource<'a, P> {
    pub fn new(reader: PixelBufferReader<'a, P>, byte_order: ByteOrder) -> Self {
        PixelSource { reader, byte_order }
    }
}

impl<P: ColorType> ChunkSource for PixelSource<'_, P> {
    fn pixel_bytes(&self) -> usize {
        P::BYTES
    }

    fn pack(
        &self,
        region: Region,
        stored_width: u32,
        out: &mut [u8],
        stop: &(dyn Stop + Sync),
    ) -> TiffResult<()> {
        let stride = stored_width as usize * P::BYTES;
        for (row, line) in out
            .chunks_exact_mut(stride)
            .take(region.size.height as usize)
            .enumerate()
        {
            stop.check()?;
            let pixels = self.reader.row_span(
                region.offset.y + row as u32,
                region.offset.x,
                region.size.width,
            )?;
            for (pixel, slot) in pixels.iter().zip(line.chunks_exact_mut(P::BYTES)) {
                pixel.store(slot, self.byte_order);
            }
        }
        Ok(())
    }
}

/// Where finished chunks go. Appending is the only synchronized step of the chain.
pub trait ChunkOutput: Sync {
    /// Append `bytes` at the next word boundary and return the offset they were written at.
    fn append(&self, bytes: &[u8]) -> TiffResult<u64>;
}

/// The output stream and the directory of the image being written.
///
/// Shared behind one [`Mutex`] per file while chunks are encoded.
#[derive(Debug)]
pub struct SharedFile<'w, W> {
    pub writer: &'w mut TiffWriter<W>,
    pub directory: DirectoryWriter,
}

impl<W: Write + Seek + Send> ChunkOutput for Mutex<SharedFile<'_, W>> {
    fn append(&self, bytes: &[u8]) -> TiffResult<u64> {
        let mut file = self.lock().unwrap_or_else(PoisonError::into_inner);
        file.writer.pad_word_boundary()?;
        let offset = file.writer.offset();
        file.writer.write_bytes(bytes)?;
        Ok(offset)
    }
}

/// Stream position and length of an encoded chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkResult {
    pub offset: u64,
    pub byte_count: u64,
}

/// Per-chunk state passed through the stages.
pub struct EncodeContext<'a> {
    /// Raster index of the chunk.
    pub index: usize,
    /// Pixels of the image covered by the chunk.
    pub region: Region,
    /// Size of the chunk as stored, tiles include their padding.
    pub stored: Size,
    pub bits_per_sample: &'a [u16],
    pub photometric: PhotometricInterpretation,
    pub byte_order: ByteOrder,
    pub source: &'a dyn ChunkSource,
    pub output: &'a dyn ChunkOutput,
    /// Scratch shared by every chunk of the image.
    pub pool: &'a ScratchPool<u8>,
    /// Stored bytes, replaced by each stage.
    pub data: Vec<u8>,
    /// Set once the chunk is in the stream.
    pub written: Option<ChunkResult>,
    pub stop: &'a (dyn Stop + Sync),
}

impl EncodeContext<'_> {
    fn row_bytes(&self) -> usize {
        self.stored.width as usize * self.source.pixel_bytes()
    }
}

/// One step of the encode chain.
pub enum EncodeStage<'o> {
    /// Pack canonical pixels into stored samples.
    Convert,
    /// Apply horizontal differencing.
    Predict,
    Passthrough,
    Compress(&'o dyn Compressor),
    /// Append the chunk to the stream and record where it went.
    Write,
}

impl fmt::Debug for EncodeStage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeStage::Convert => f.write_str("Convert"),
            EncodeStage::Predict => f.write_str("Predict"),
            EncodeStage::Passthrough => f.write_str("Passthrough"),
            EncodeStage::Compress(codec) => f.debug_tuple("Compress").field(codec).finish(),
            EncodeStage::Write => f.write_str("Write"),
        }
    }
}

/// The rest of the chain after the running stage.
#[derive(Clone, Copy)]
pub struct Next<'p, 'o> {
    stages: &'p [EncodeStage<'o>],
}

impl Next<'_, '_> {
    pub fn run(self, ctx: &mut EncodeContext<'_>) -> TiffResult<()> {
        match self.stages.split_first() {
            None => Ok(()),
            Some((stage, rest)) => stage.invoke(ctx, Next { stages: rest }),
        }
    }
}

impl EncodeStage<'_> {
    fn invoke(&self, ctx: &mut EncodeContext<'_>, next: Next<'_, '_>) -> TiffResult<()> {
        match self {
            EncodeStage::Passthrough => next.run(ctx),
            EncodeStage::Convert => {
                let row_bytes = ctx.row_bytes();
                let mut data = vec![0u8; row_bytes * ctx.stored.height as usize];
                ctx.source
                    .pack(ctx.region, ctx.stored.width, &mut data, ctx.stop)?;
                ctx.data = data;
                next.run(ctx)
            }
            EncodeStage::Predict => {
                apply_prediction(ctx)?;
                next.run(ctx)
            }
            EncodeStage::Compress(codec) => {
                let cctx = CompressionContext {
                    image_size: ctx.stored,
                    region: ctx.region,
                    bits_per_sample: ctx.bits_per_sample,
                    photometric: ctx.photometric,
                    byte_order: ctx.byte_order,
                    pool: ctx.pool,
                };
                ctx.data = codec.compress(&cctx, &ctx.data)?;
                next.run(ctx)
            }
            EncodeStage::Write => {
                ctx.stop.check()?;
                let offset = ctx.output.append(&ctx.data)?;
                ctx.written = Some(ChunkResult {
                    offset,
                    byte_count: ctx.data.len() as u64,
                });
                log::trace!("chunk {} written at {}", ctx.index, offset);
                next.run(ctx)
            }
        }
    }
}

fn apply_prediction(ctx: &mut EncodeContext<'_>) -> TiffResult<()> {
    let layout = RowLayout {
        width: ctx.stored.width as usize,
        samples: ctx.bits_per_sample.len(),
        bits: ctx.bits_per_sample[0],
        byte_order: ctx.byte_order,
    };
    let row_bytes = ctx.row_bytes();
    for row in ctx.data.chunks_exact_mut(row_bytes) {
        ctx.stop.check()?;
        predictor::apply_horizontal(row, layout);
    }
    Ok(())
}

/// The fixed chain for one image: conversion, predictor, compression, output.
#[derive(Debug)]
pub struct EncodePipeline<'o> {
    stages: Vec<EncodeStage<'o>>,
}

impl<'o> EncodePipeline<'o> {
    pub fn new(stages: Vec<EncodeStage<'o>>) -> Self {
        EncodePipeline { stages }
    }

    /// Assemble the chain for pixels of `bits_per_sample`.
    pub fn build(
        bits_per_sample: &[u16],
        predictor: Predictor,
        compressor: &'o dyn Compressor,
    ) -> TiffResult<Self> {
        let predict = match predictor {
            Predictor::None => EncodeStage::Passthrough,
            Predictor::Horizontal => {
                let bits = bits_per_sample[0];
                let uniform = bits_per_sample.iter().all(|&b| b == bits);
                if !uniform || !predictor::supports(bits) {
                    return Err(TiffUnsupportedError::UnsupportedPredictorLayout {
                        samples: bits_per_sample.len(),
                        bits,
                    }
                    .into());
                }
                EncodeStage::Predict
            }
            other => return Err(TiffUnsupportedError::UnsupportedPredictor(other).into()),
        };

        let pipeline = EncodePipeline::new(vec![
            EncodeStage::Convert,
            predict,
            EncodeStage::Compress(compressor),
            EncodeStage::Write,
        ]);
        log::debug!("encode pipeline: {:?}", pipeline.stages);
        Ok(pipeline)
    }

    pub fn stages(&self) -> &[EncodeStage<'o>] {
        &self.stages
    }

    pub fn run(&self, ctx: &mut EncodeContext<'_>) -> TiffResult<()> {
        Next {
            stages: &self.stages,
        }
        .run(ctx)
    }
}
