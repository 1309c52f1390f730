//! The decode middleware chain.
//!
//! A pipeline is an ordered list of stages. Each stage receives the chunk context and a [`Next`]
//! handle for the rest of the chain; it does its part and decides when to continue. Stages with
//! nothing to do for an image are represented by [`DecodeStage::Passthrough`] so the others never
//! need to test whether they apply.

use std::fmt;
use std::sync::Arc;

use enough::Stop;

use super::decompress::{DecompressionContext, Decompressor, DecompressorRegistry};
use super::image::{bytes_per_scanline, ImageInfo};
use super::photometric::{select_interpreter, InterpretInput, PhotometricInterpreter, RowSink};
use super::DecodeOptions;
use crate::pixel::{PixelBufferWriter, PixelRow, Point, Region, Size, TiffPixelConvert};
use crate::pool::{Scratch, ScratchPool};
use crate::predictor::{self, RowLayout};
use crate::tags::{ByteOrder, InkSet, PlanarConfiguration, Predictor};
use crate::{TiffResult, TiffUnsupportedError};

/// Everything the stages need to turn one compressed chunk into rows.
pub struct DecodeContext<'a> {
    pub info: &'a ImageInfo,
    pub byte_order: ByteOrder,
    /// Size of the chunk as stored.
    pub chunk_size: Size,
    /// The rectangle of the chunk that is requested.
    pub region: Region,
    /// Compressed bytes, one buffer per plane.
    pub compressed: Vec<Vec<u8>>,
    /// Decompressed planes, produced by the decompression stage.
    pub planes: Vec<Scratch<'a, u8>>,
    /// Scratch shared by the stages and the decompressor.
    pub pool: &'a ScratchPool<u8>,
    pub sink: &'a mut dyn RowSink,
    pub stop: &'a dyn Stop,
}

impl DecodeContext<'_> {
    /// Rows before the request that a block based codec may skip, aligned down to 8 rows.
    pub fn skipped_scanlines(&self) -> u32 {
        self.region.offset.y & !7
    }

    fn plane_bits(&self, plane: usize) -> u16 {
        match self.info.planar {
            PlanarConfiguration::Chunky => self.info.bits_per_sample.iter().sum(),
            PlanarConfiguration::Planar => self.info.bits_per_sample[plane],
        }
    }
}

/// One step of the decode chain.
pub enum DecodeStage {
    Decompress(Arc<dyn Decompressor>),
    /// Reverse horizontal differencing.
    Predict,
    Passthrough,
    Interpret(Box<dyn PhotometricInterpreter>),
}

impl fmt::Debug for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::Decompress(codec) => f.debug_tuple("Decompress").field(codec).finish(),
            DecodeStage::Predict => f.write_str("Predict"),
            DecodeStage::Passthrough => f.write_str("Passthrough"),
            DecodeStage::Interpret(interpreter) => {
                f.debug_tuple("Interpret").field(interpreter).finish()
            }
        }
    }
}

/// The rest of the chain after the running stage.
#[derive(Clone, Copy)]
pub struct Next<'p> {
    stages: &'p [DecodeStage],
}

impl<'p> Next<'p> {
    pub fn run(self, ctx: &mut DecodeContext<'_>) -> TiffResult<()> {
        match self.stages.split_first() {
            None => Ok(()),
            Some((stage, rest)) => stage.invoke(ctx, Next { stages: rest }),
        }
    }
}

impl DecodeStage {
    fn invoke(&self, ctx: &mut DecodeContext<'_>, next: Next<'_>) -> TiffResult<()> {
        match self {
            DecodeStage::Passthrough => next.run(ctx),
            DecodeStage::Decompress(codec) => {
                decompress(codec.as_ref(), ctx)?;
                next.run(ctx)
            }
            DecodeStage::Predict => {
                undo_prediction(ctx)?;
                next.run(ctx)
            }
            DecodeStage::Interpret(interpreter) => {
                interpret(interpreter.as_ref(), ctx)?;
                next.run(ctx)
            }
        }
    }
}

fn decompress<'a>(codec: &dyn Decompressor, ctx: &mut DecodeContext<'a>) -> TiffResult<()> {
    let skipped = ctx.skipped_scanlines();
    let requested = ctx.region.offset.y + ctx.region.size.height - skipped;
    let pool: &'a ScratchPool<u8> = ctx.pool;

    let mut planes = Vec::with_capacity(ctx.compressed.len());
    for (plane, input) in ctx.compressed.iter().enumerate() {
        ctx.stop.check()?;
        let bits = ctx.plane_bits(plane);
        let mut output = pool.acquire(ctx.info.plane_bytes(ctx.chunk_size, bits)?);
        let bits_per_sample = match ctx.info.planar {
            PlanarConfiguration::Chunky => &ctx.info.bits_per_sample[..],
            PlanarConfiguration::Planar => &ctx.info.bits_per_sample[plane..plane + 1],
        };
        let dctx = DecompressionContext {
            image_size: ctx.chunk_size,
            bits_per_sample,
            bytes_per_scanline: bytes_per_scanline(ctx.chunk_size.width, bits)?,
            photometric: ctx.info.photometric,
            byte_order: ctx.byte_order,
            skipped_scanlines: skipped,
            requested_scanlines: requested,
            tables: ctx.info.jpeg_tables.as_deref(),
            pool,
        };
        codec.decompress(&dctx, input, &mut output)?;
        planes.push(output);
    }

    ctx.planes = planes;
    Ok(())
}

fn undo_prediction(ctx: &mut DecodeContext<'_>) -> TiffResult<()> {
    let width = ctx.chunk_size.width as usize;
    let first = ctx.region.offset.y as usize;
    let last = first + ctx.region.size.height as usize;

    for plane in 0..ctx.planes.len() {
        let bits = ctx.plane_bits(plane);
        let layout = match ctx.info.planar {
            PlanarConfiguration::Chunky => RowLayout {
                width,
                samples: ctx.info.bits_per_sample.len(),
                bits: ctx.info.bits_per_sample[0],
                byte_order: ctx.byte_order,
            },
            PlanarConfiguration::Planar => RowLayout {
                width,
                samples: 1,
                bits,
                byte_order: ctx.byte_order,
            },
        };
        let stride = bytes_per_scanline(ctx.chunk_size.width, bits)?;
        for row in ctx.planes[plane].chunks_exact_mut(stride).take(last).skip(first) {
            ctx.stop.check()?;
            predictor::undo_horizontal(row, layout);
        }
    }
    Ok(())
}

fn interpret(interpreter: &dyn PhotometricInterpreter, ctx: &mut DecodeContext<'_>) -> TiffResult<()> {
    let scanlines = (0..ctx.planes.len())
        .map(|plane| bytes_per_scanline(ctx.chunk_size.width, ctx.plane_bits(plane)))
        .collect::<TiffResult<_>>()?;
    let input = InterpretInput {
        planes: ctx.planes.iter().map(|plane| &plane[..]).collect(),
        scanlines,
        chunk_width: ctx.chunk_size.width,
        region: ctx.region,
        byte_order: ctx.byte_order,
    };
    interpreter.interpret(&input, ctx.sink, ctx.stop)
}

/// The fixed chain for one image: decompression, predictor, photometric interpretation.
#[derive(Debug)]
pub struct DecodePipeline {
    stages: Vec<DecodeStage>,
}

impl DecodePipeline {
    pub fn new(stages: Vec<DecodeStage>) -> Self {
        DecodePipeline { stages }
    }

    /// Assemble the chain for an image, rejecting anything unsupported up front.
    pub fn build(
        info: &ImageInfo,
        registry: &DecompressorRegistry,
        options: &DecodeOptions,
        ink_set: InkSet,
    ) -> TiffResult<Self> {
        let decompressor = registry.get(info.compression)?;

        let predict = match info.predictor {
            Predictor::None => DecodeStage::Passthrough,
            Predictor::Horizontal => {
                let bits = info.bits_per_sample[0];
                let uniform = info.bits_per_sample.iter().all(|&b| b == bits);
                if !uniform || info.is_subsampled() || !predictor::supports(bits) {
                    return Err(TiffUnsupportedError::UnsupportedPredictorLayout {
                        samples: info.bits_per_sample.len(),
                        bits,
                    }
                    .into());
                }
                DecodeStage::Predict
            }
            other => return Err(TiffUnsupportedError::UnsupportedPredictor(other).into()),
        };

        let interpreter = select_interpreter(info, options, ink_set)?;
        let pipeline = DecodePipeline::new(vec![
            DecodeStage::Decompress(decompressor),
            predict,
            DecodeStage::Interpret(interpreter),
        ]);
        log::debug!("decode pipeline: {:?}", pipeline.stages);
        Ok(pipeline)
    }

    pub fn stages(&self) -> &[DecodeStage] {
        &self.stages
    }

    pub fn run(&self, ctx: &mut DecodeContext<'_>) -> TiffResult<()> {
        Next {
            stages: &self.stages,
        }
        .run(ctx)
    }
}

/// The last step of the chain: converts interpreted rows into the caller's pixel type.
///
/// Rows already in the target type are copied as they are.
pub struct ConvertingSink<'w, 'a, P: TiffPixelConvert> {
    writer: &'w mut PixelBufferWriter<'a, P>,
    origin: Point,
}

impl<'w, 'a, P: TiffPixelConvert> ConvertingSink<'w, 'a, P> {
    /// Rows are written starting at `origin` of `writer`.
    pub fn new(writer: &'w mut PixelBufferWriter<'a, P>, origin: Point) -> Self {
        ConvertingSink { writer, origin }
    }
}

impl<P: TiffPixelConvert> RowSink for ConvertingSink<'_, '_, P> {
    fn write_row(&mut self, row: u32, pixels: PixelRow<'_>) -> TiffResult<()> {
        let mut span =
            self.writer
                .row_span(self.origin.y + row, self.origin.x, pixels.len() as u32)?;
        P::convert_row(pixels, &mut span);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::image::ChunkLayout;
    use crate::pixel::{Gray8, ImageBuffer};
    use crate::tags::{CompressionMethod, FillOrder, PhotometricInterpretation, SampleFormat};
    use crate::{CancellationToken, TiffError};
    use enough::Unstoppable;

    pub(crate) fn gray_info(width: u32, height: u32, predictor: Predictor) -> ImageInfo {
        ImageInfo {
            width,
            height,
            bits_per_sample: vec![8],
            samples_per_pixel: 1,
            sample_format: SampleFormat::Uint,
            photometric: PhotometricInterpretation::BlackIsZero,
            compression: CompressionMethod::None,
            planar: PlanarConfiguration::Chunky,
            predictor,
            fill_order: FillOrder::MsbFirst,
            extra_samples: vec![],
            layout: ChunkLayout::Strips {
                rows_per_strip: height,
            },
            chunk_offsets: vec![0],
            chunk_byte_counts: vec![u64::from(width * height)],
            color_map: None,
            ycbcr_coefficients: None,
            ycbcr_subsampling: (2, 2),
            reference_black_white: None,
            jpeg_tables: None,
        }
    }

    fn run(info: &ImageInfo, data: Vec<u8>, region: Region, stop: &dyn Stop) -> TiffResult<ImageBuffer<Gray8>> {
        run_in(&ScratchPool::new(), info, data, region, stop)
    }

    fn run_in(
        pool: &ScratchPool<u8>,
        info: &ImageInfo,
        data: Vec<u8>,
        region: Region,
        stop: &dyn Stop,
    ) -> TiffResult<ImageBuffer<Gray8>> {
        let pipeline = DecodePipeline::build(
            info,
            &DecompressorRegistry::with_builtins(),
            &DecodeOptions::default(),
            InkSet::Cmyk,
        )?;
        let mut image = ImageBuffer::<Gray8>::new(region.size.width, region.size.height);
        let mut writer = image.writer();
        let mut sink = ConvertingSink::new(&mut writer, Point::new(0, 0));
        let mut ctx = DecodeContext {
            info,
            byte_order: ByteOrder::BigEndian,
            chunk_size: info.size(),
            region,
            compressed: vec![data],
            planes: vec![],
            pool,
            sink: &mut sink,
            stop,
        };
        pipeline.run(&mut ctx)?;
        drop(ctx);
        drop(writer);
        Ok(image)
    }

    #[test]
    fn predictor_none_is_a_passthrough_stage() {
        let info = gray_info(2, 2, Predictor::None);
        let pipeline = DecodePipeline::build(
            &info,
            &DecompressorRegistry::with_builtins(),
            &DecodeOptions::default(),
            InkSet::Cmyk,
        )
        .unwrap();
        assert!(matches!(
            pipeline.stages(),
            [
                DecodeStage::Decompress(_),
                DecodeStage::Passthrough,
                DecodeStage::Interpret(_)
            ]
        ));
    }

    #[test]
    fn chain_decodes_a_sub_region_with_prediction() {
        let info = gray_info(3, 2, Predictor::Horizontal);
        let data = vec![1, 1, 1, 10, 5, 5];
        let image = run(&info, data, Region::new(1, 1, 2, 1), &Unstoppable).unwrap();
        assert_eq!(image.pixels(), &[Gray8::new(15), Gray8::new(20)]);
    }

    #[test]
    fn decoded_planes_return_to_the_pool() {
        let info = gray_info(4, 2, Predictor::None);
        let pool = ScratchPool::new();
        for _ in 0..2 {
            let image = run_in(&pool, &info, vec![9; 8], Region::new(0, 0, 4, 2), &Unstoppable)
                .unwrap();
            assert!(image.pixels().iter().all(|&p| p == Gray8::new(9)));
            assert_eq!(pool.retained(), 1);
        }
    }

    #[test]
    fn cancellation_stops_before_any_row() {
        let info = gray_info(2, 2, Predictor::None);
        let token = CancellationToken::new();
        token.cancel();
        let result = run(&info, vec![0; 4], Region::new(0, 0, 2, 2), &token);
        assert!(matches!(result, Err(TiffError::Cancelled(_))));
    }

    #[test]
    fn floating_point_predictor_is_rejected_at_build() {
        let info = gray_info(2, 2, Predictor::FloatingPoint);
        let result = DecodePipeline::build(
            &info,
            &DecompressorRegistry::with_builtins(),
            &DecodeOptions::default(),
            InkSet::Cmyk,
        );
        assert!(matches!(
            result,
            Err(TiffError::UnsupportedError(
                TiffUnsupportedError::UnsupportedPredictor(Predictor::FloatingPoint)
            ))
        ));
    }

    #[test]
    fn short_data_is_a_format_error() {
        let info = gray_info(2, 2, Predictor::None);
        let result = run(&info, vec![0; 3], Region::new(0, 0, 2, 2), &Unstoppable);
        assert!(matches!(result, Err(TiffError::FormatError(_))));
    }
}
