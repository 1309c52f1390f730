use std::io::{Seek, Write};
use std::sync::{Mutex, PoisonError};

use enough::Stop;

use crate::field::OperationContext;
use crate::pixel::{PixelBufferReader, Size};
use crate::pool::ScratchPool;
use crate::tags::{ByteOrder, PlanarConfiguration, Predictor, ResolutionUnit, Tag};
use crate::{TiffError, TiffFormatError, TiffResult};

use self::chunks::{encode_chunks, ChunkShared};
use self::pipeline::{ChunkResult, EncodePipeline, PixelSource, SharedFile};

mod chunks;
pub mod colortype;
pub mod compression;
mod directory_encoder;
pub mod pipeline;
mod tiff_value;
mod writer;

pub use self::chunks::{ChunkGrid, ParallelEncodingState};
pub use self::colortype::ColorType;
pub use self::compression::{CompressionContext, Compressor};
#[cfg(feature = "deflate")]
pub use self::compression::{Deflate, DeflateLevel};
#[cfg(feature = "lzw")]
pub use self::compression::Lzw;
pub use self::compression::{Packbits, Uncompressed};
pub use self::directory_encoder::{DirectoryWriter, WrittenDirectory};
pub use self::tiff_value::{Rational, SRational, TiffValue};
pub use self::writer::TiffWriter;
pub use crate::decoder::ChunkLayout as Layout;

/// Resolution tags written with every image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub unit: ResolutionUnit,
    pub x: Rational,
    pub y: Rational,
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution {
            unit: ResolutionUnit::None,
            x: Rational { n: 1, d: 1 },
            y: Rational { n: 1, d: 1 },
        }
    }
}

/// How one image is laid out and compressed.
#[derive(Debug)]
pub struct ImageOptions {
    pub compression: Box<dyn Compressor>,
    pub predictor: Predictor,
    /// Strips of about 8 KB when unset.
    pub layout: Option<Layout>,
    /// Encode chunks on this pool instead of the calling thread.
    pub parallel: Option<ParallelEncodingState>,
    pub resolution: Resolution,
}

impl Default for ImageOptions {
    fn default() -> Self {
        ImageOptions {
            compression: Box::new(Uncompressed),
            predictor: Predictor::None,
            layout: None,
            parallel: None,
            resolution: Resolution::default(),
        }
    }
}

impl ImageOptions {
    pub fn new() -> Self {
        ImageOptions::default()
    }

    pub fn with_compression(mut self, compression: impl Compressor + 'static) -> Self {
        self.compression = Box::new(compression);
        self
    }

    pub fn with_predictor(mut self, predictor: Predictor) -> Self {
        self.predictor = predictor;
        self
    }

    pub fn with_strips(mut self, rows_per_strip: u32) -> Self {
        self.layout = Some(Layout::Strips { rows_per_strip });
        self
    }

    pub fn with_tiles(mut self, width: u32, height: u32) -> Self {
        self.layout = Some(Layout::Tiles { width, height });
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelEncodingState) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}

/// Encoder for Tiff and BigTiff files.
///
/// Every written directory is appended to the chain of the file: the first one is referenced
/// from the header, each later one from the next pointer of its predecessor.
///
/// # Examples
/// ```
/// use std::io::Cursor;
/// use enough::Unstoppable;
/// use tiff_pipeline::encoder::{ImageOptions, TiffEncoder};
/// use tiff_pipeline::pixel::{ImageBuffer, Rgb24};
///
/// let image = ImageBuffer::<Rgb24>::new(100, 100);
/// let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
/// tiff.write_image(image.reader(), &ImageOptions::new(), &Unstoppable).unwrap();
/// let bytes = tiff.finish().unwrap().into_inner();
/// ```
#[derive(Debug)]
pub struct TiffEncoder<W: Write + Seek> {
    writer: TiffWriter<W>,
    /// Pointer of the header to the first directory.
    header_pointer: u64,
    last: Option<WrittenDirectory>,
}

impl<W: Write + Seek> TiffEncoder<W> {
    /// A classic tiff file in the byte order of the host.
    pub fn new(writer: W) -> TiffResult<TiffEncoder<W>> {
        Self::with_byte_order(writer, ByteOrder::native(), false)
    }

    /// A BigTiff file in the byte order of the host.
    pub fn new_big(writer: W) -> TiffResult<TiffEncoder<W>> {
        Self::with_byte_order(writer, ByteOrder::native(), true)
    }

    pub fn with_byte_order(
        writer: W,
        byte_order: ByteOrder,
        bigtiff: bool,
    ) -> TiffResult<TiffEncoder<W>> {
        let mut writer = TiffWriter::new(writer, OperationContext::new(byte_order, bigtiff));
        let header_pointer = writer.write_header()?;
        Ok(TiffEncoder {
            writer,
            header_pointer,
            last: None,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.writer.byte_order()
    }

    pub fn is_bigtiff(&self) -> bool {
        self.writer.context().bigtiff
    }

    /// An empty directory for this file, to be filled with tags and passed to
    /// [`TiffEncoder::write_directory`].
    pub fn new_directory(&self) -> DirectoryWriter {
        DirectoryWriter::new(self.writer.context())
    }

    /// Flush `directory` and append it to the chain.
    pub fn write_directory(
        &mut self,
        directory: &mut DirectoryWriter,
    ) -> TiffResult<WrittenDirectory> {
        let written = directory.flush(&mut self.writer)?;
        self.chain(written)?;
        Ok(written)
    }

    fn chain(&mut self, written: WrittenDirectory) -> TiffResult<()> {
        match self.last {
            Some(previous) => DirectoryWriter::link(&mut self.writer, &previous, &written)?,
            None => self
                .writer
                .patch_offset(self.header_pointer, written.offset)?,
        }
        self.last = Some(written);
        Ok(())
    }

    /// Encode a whole image into a new directory.
    ///
    /// The pixels are cut into strips or tiles, pushed through the encode chain and the tag
    /// tables are written once every chunk is in the stream.
    pub fn write_image<P: ColorType>(
        &mut self,
        image: PixelBufferReader<'_, P>,
        options: &ImageOptions,
        stop: &(dyn Stop + Sync),
    ) -> TiffResult<WrittenDirectory>
    where
        W: Send,
    {
        let size = image.size();
        if size.is_empty() {
            return Err(TiffError::FormatError(TiffFormatError::InvalidDimensions(
                size.width,
                size.height,
            )));
        }

        let layout = options
            .layout
            .unwrap_or_else(|| default_strips(size, P::BYTES));
        let grid = ChunkGrid::new(layout, size)?;
        let pipeline = EncodePipeline::build(
            P::BITS_PER_SAMPLE,
            options.predictor,
            options.compression.as_ref(),
        )?;

        let op = self.writer.context();
        let source = PixelSource::new(image, op.byte_order);
        let output = Mutex::new(SharedFile {
            writer: &mut self.writer,
            directory: DirectoryWriter::new(op),
        });
        let scratch = ScratchPool::new();
        let shared = ChunkShared {
            bits_per_sample: P::BITS_PER_SAMPLE,
            photometric: P::TIFF_VALUE,
            byte_order: op.byte_order,
            source: &source,
            output: &output,
            pool: &scratch,
            stop,
        };
        let table = encode_chunks(&grid, &pipeline, shared, options.parallel.as_ref())?;

        let SharedFile { writer, mut directory } =
            output.into_inner().unwrap_or_else(PoisonError::into_inner);
        write_image_tags::<P>(&mut directory, op, size, &grid, options, &table)?;
        let written = directory.flush(writer)?;
        self.chain(written)?;
        Ok(written)
    }

    /// Flush the stream and hand it back.
    pub fn finish(mut self) -> TiffResult<W> {
        self.writer.flush()?;
        Ok(self.writer.into_inner())
    }
}

/// Rows per strip so that a strip holds about 8 KB.
fn default_strips(size: Size, pixel_bytes: usize) -> Layout {
    let row_bytes = (size.width as usize * pixel_bytes).max(1);
    let rows = 8000usize.div_ceil(row_bytes).clamp(1, size.height as usize);
    Layout::Strips {
        rows_per_strip: rows as u32,
    }
}

fn write_image_tags<P: ColorType>(
    directory: &mut DirectoryWriter,
    op: OperationContext,
    size: Size,
    grid: &ChunkGrid,
    options: &ImageOptions,
    table: &[ChunkResult],
) -> TiffResult<()> {
    directory.write_tag(Tag::ImageWidth, &size.width)?;
    directory.write_tag(Tag::ImageLength, &size.height)?;
    directory.write_tag(Tag::BitsPerSample, P::BITS_PER_SAMPLE)?;
    directory.write_tag(Tag::Compression, &options.compression.method().to_u16())?;
    directory.write_tag(Tag::PhotometricInterpretation, &P::TIFF_VALUE.to_u16())?;
    directory.write_tag(Tag::SamplesPerPixel, &(P::BITS_PER_SAMPLE.len() as u16))?;
    directory.write_tag(
        Tag::PlanarConfiguration,
        &PlanarConfiguration::Chunky.to_u16(),
    )?;
    directory.write_tag(Tag::XResolution, &options.resolution.x)?;
    directory.write_tag(Tag::YResolution, &options.resolution.y)?;
    directory.write_tag(Tag::ResolutionUnit, &options.resolution.unit.to_u16())?;

    let formats: Vec<u16> = P::SAMPLE_FORMAT.iter().map(|f| f.to_u16()).collect();
    directory.write_tag(Tag::SampleFormat, &formats[..])?;
    if !P::EXTRA_SAMPLES.is_empty() {
        let extra: Vec<u16> = P::EXTRA_SAMPLES.iter().map(|e| e.to_u16()).collect();
        directory.write_tag(Tag::ExtraSamples, &extra[..])?;
    }
    if let Some(ink_set) = P::INK_SET {
        directory.write_tag(Tag::InkSet, &ink_set.to_u16())?;
    }
    if options.predictor != Predictor::None {
        directory.write_tag(Tag::Predictor, &options.predictor.to_u16())?;
    }

    let (offsets_tag, counts_tag) = match grid.layout() {
        Layout::Strips { rows_per_strip } => {
            directory.write_tag(Tag::RowsPerStrip, &rows_per_strip)?;
            (Tag::StripOffsets, Tag::StripByteCounts)
        }
        Layout::Tiles { width, height } => {
            directory.write_tag(Tag::TileWidth, &width)?;
            directory.write_tag(Tag::TileLength, &height)?;
            (Tag::TileOffsets, Tag::TileByteCounts)
        }
    };

    let offsets: Vec<u64> = table.iter().map(|chunk| chunk.offset).collect();
    let counts: Vec<u64> = table.iter().map(|chunk| chunk.byte_count).collect();
    if op.bigtiff {
        directory.write_tag(offsets_tag, &offsets[..])?;
        directory.write_tag(counts_tag, &counts[..])?;
    } else {
        let narrow = |values: Vec<u64>| {
            values
                .into_iter()
                .map(u32::try_from)
                .collect::<Result<Vec<u32>, _>>()
        };
        directory.write_tag(offsets_tag, &narrow(offsets)?[..])?;
        directory.write_tag(counts_tag, &narrow(counts)?[..])?;
    }
    log::debug!(
        "{} table with {} entries, bigtiff: {}",
        if matches!(grid.layout(), Layout::Tiles { .. }) {
            "tile"
        } else {
            "strip"
        },
        table.len(),
        op.bigtiff
    );
    Ok(())
}
