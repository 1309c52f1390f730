use std::collections::HashSet;
use std::io::{Read, Seek};
use std::sync::Arc;

use enough::{Stop, Unstoppable};

use crate::directory::Directory;
use crate::field::OperationContext;
use crate::pixel::{ImageBuffer, PixelBufferWriter, Point, Region, TiffPixelConvert};
use crate::pool::ScratchPool;
use crate::tags::{ByteOrder, CompressionMethod, InkSet, Tag};
use crate::{TiffError, TiffFormatError, TiffResult, UsageError};

use self::decompress::{Decompressor, DecompressorRegistry};
use self::image::ImageInfo;
use self::pipeline::{ConvertingSink, DecodeContext, DecodePipeline};
use self::stream::{RangeReader, SmartReader};

pub mod decompress;
pub mod image;
mod ifd;
pub mod photometric;
pub mod pipeline;
mod stream;
pub mod tag_reader;

pub use self::image::ChunkLayout;
pub use self::photometric::AlphaMode;
pub use self::tag_reader::TagReader;

/// Decoding limits
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Limits {
    /// The maximum size of a decoded image in bytes when it is read as a whole, the default is
    /// 256MiB.
    pub decoding_buffer_size: usize,
    /// The maximum size of any ifd value in bytes, the default is
    /// 1MiB.
    pub ifd_value_size: usize,
    /// Maximum size of the compressed or decompressed data of a single chunk, the default is
    /// 128MiB.
    pub intermediate_buffer_size: usize,
}

impl Limits {
    /// A configuration that does not impose any limits.
    ///
    /// This is a good start if the caller only wants to impose selective limits, contrary to the
    /// default limits which allows selectively disabling limits.
    ///
    /// Note that this configuration is likely to crash on excessively large images since,
    /// naturally, the machine running the program does not have infinite memory.
    pub fn unlimited() -> Limits {
        Limits {
            decoding_buffer_size: usize::MAX,
            ifd_value_size: usize::MAX,
            intermediate_buffer_size: usize::MAX,
        }
    }
}

impl Default for Limits {
    fn default() -> Limits {
        Limits {
            decoding_buffer_size: 256 * 1024 * 1024,
            intermediate_buffer_size: 128 * 1024 * 1024,
            ifd_value_size: 1024 * 1024,
        }
    }
}

/// Presentation choices that do not depend on the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Divide premultiplied color by alpha. When unset, premultiplied color is kept and alpha is
    /// reported as opaque.
    pub undo_color_premultiplying: bool,
}

/// The representation of a TIFF decoder
///
/// The decoder is positioned on one image of the file at a time. Pixel data is only read when a
/// region is requested.
#[derive(Debug)]
pub struct Decoder<R>
where
    R: Read + Seek,
{
    reader: SmartReader<R>,
    op: OperationContext,
    limits: Limits,
    options: DecodeOptions,
    decompressors: DecompressorRegistry,
    /// Offsets of the directories visited so far, in chain order.
    ifd_offsets: Vec<u64>,
    seen_ifds: HashSet<u64>,
    current: usize,
    directory: Directory,
    image: ImageInfo,
    ink_set: InkSet,
    /// Decompressed planes are borrowed from here chunk by chunk.
    scratch: ScratchPool<u8>,
}

impl<R: Read + Seek> Decoder<R> {
    /// Create a new decoder that decodes from the stream ```r```
    pub fn new(r: R) -> TiffResult<Decoder<R>> {
        Self::with_limits_inner(r, Limits::default())
    }

    fn with_limits_inner(r: R, limits: Limits) -> TiffResult<Decoder<R>> {
        let mut reader = SmartReader::wrap(r, ByteOrder::LittleEndian);
        let (op, first) = ifd::read_header(&mut reader)?;
        let directory = ifd::read_directory(&mut reader, &op, &limits, first)?;
        let (image, ink_set) = Self::read_image_info(&mut reader, &op, &limits, &directory)?;

        Ok(Decoder {
            reader,
            op,
            limits,
            options: DecodeOptions::default(),
            decompressors: DecompressorRegistry::with_builtins(),
            ifd_offsets: vec![first],
            seen_ifds: HashSet::from([first]),
            current: 0,
            directory,
            image,
            ink_set,
            scratch: ScratchPool::new(),
        })
    }

    /// Replace the limits. The current directory is parsed again under the new limits.
    pub fn with_limits(self, limits: Limits) -> TiffResult<Decoder<R>> {
        let mut decoder = self;
        decoder.limits = limits;
        let offset = decoder.ifd_offsets[decoder.current];
        decoder.load(offset)?;
        Ok(decoder)
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Decoder<R> {
        self.options = options;
        self
    }

    /// Use `codec` for chunks compressed with `method`, replacing any earlier registration.
    pub fn register_decompressor(&mut self, method: CompressionMethod, codec: Box<dyn Decompressor>) {
        self.decompressors.register(method, Arc::from(codec));
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.op.byte_order
    }

    pub fn is_bigtiff(&self) -> bool {
        self.op.bigtiff
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }

    pub fn image_info(&self) -> &ImageInfo {
        &self.image
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Typed access to the tags of the current directory.
    pub fn tags(&mut self) -> TagReader<'_> {
        TagReader {
            reader: &mut self.reader,
            directory: &self.directory,
            op: self.op,
            limits: &self.limits,
        }
    }

    /// Index of the current image in the directory chain.
    pub fn current_image(&self) -> usize {
        self.current
    }

    /// Returns `true` if there is at least one more image available.
    pub fn more_images(&self) -> bool {
        self.directory.next().is_some()
    }

    /// Reads in the next image.
    /// If there is no further image in the TIFF file a format error is returned.
    /// To determine whether there are more images call `Decoder::more_images` instead.
    pub fn next_image(&mut self) -> TiffResult<()> {
        if self.current + 1 < self.ifd_offsets.len() {
            self.current += 1;
            return self.load(self.ifd_offsets[self.current]);
        }

        let next = self.directory.next().ok_or(TiffError::FormatError(
            TiffFormatError::ImageFileDirectoryNotFound,
        ))?;
        if !self.seen_ifds.insert(next) {
            return Err(TiffError::FormatError(TiffFormatError::CycleInOffsets));
        }
        self.load(next)?;
        self.ifd_offsets.push(next);
        self.current += 1;
        Ok(())
    }

    /// Position the decoder on image `index` of the directory chain.
    pub fn seek_to_image(&mut self, index: usize) -> TiffResult<()> {
        if index < self.ifd_offsets.len() {
            self.current = index;
            return self.load(self.ifd_offsets[index]);
        }
        while self.current < index {
            self.next_image()?;
        }
        Ok(())
    }

    fn load(&mut self, offset: u64) -> TiffResult<()> {
        let directory = ifd::read_directory(&mut self.reader, &self.op, &self.limits, offset)?;
        let (image, ink_set) =
            Self::read_image_info(&mut self.reader, &self.op, &self.limits, &directory)?;
        self.directory = directory;
        self.image = image;
        self.ink_set = ink_set;
        Ok(())
    }

    fn read_image_info(
        reader: &mut SmartReader<R>,
        op: &OperationContext,
        limits: &Limits,
        directory: &Directory,
    ) -> TiffResult<(ImageInfo, InkSet)> {
        let mut tags = TagReader {
            reader,
            directory,
            op: *op,
            limits,
        };
        let image = ImageInfo::read(&mut tags)?;
        let ink_set = tags
            .find_u16(Tag::InkSet)?
            .and_then(InkSet::from_u16)
            .unwrap_or(InkSet::Cmyk);
        log::debug!(
            "image {}x{} {:?} {:?} {:?}, {} chunks",
            image.width,
            image.height,
            image.photometric,
            image.compression,
            image.layout,
            image.chunk_count()
        );
        Ok((image, ink_set))
    }

    /// Decode `region` of the current image into `writer`, which must be at least as large as
    /// the region. Only the chunks intersecting the region are read.
    pub fn read_region<P: TiffPixelConvert>(
        &mut self,
        region: Region,
        writer: &mut PixelBufferWriter<'_, P>,
        stop: &dyn Stop,
    ) -> TiffResult<()> {
        if region.size.is_empty() || !region.fits(self.image.size()) {
            return Err(UsageError::RegionOutOfBounds.into());
        }
        if !Region::of_size(region.size).fits(writer.size()) {
            return Err(UsageError::RegionOutOfBounds.into());
        }

        let pipeline =
            DecodePipeline::build(&self.image, &self.decompressors, &self.options, self.ink_set)?;
        let image = &self.image;
        let pool = &self.scratch;

        for chunk in 0..image.chunks_per_plane() {
            let chunk_region = image.chunk_region(chunk);
            let Some(wanted) = chunk_region.intersect(&region) else {
                continue;
            };
            stop.check()?;

            let mut compressed = Vec::with_capacity(image.planes());
            for plane in 0..image.planes() {
                let index = plane * image.chunks_per_plane() + chunk;
                let len = image.chunk_byte_counts[index];
                if len > self.limits.intermediate_buffer_size as u64 {
                    return Err(TiffError::LimitsExceeded);
                }
                let mut data = vec![0u8; usize::try_from(len)?];
                self.reader
                    .read_range(image.chunk_offsets[index], &mut data)?;
                compressed.push(data);
            }

            let chunk_size = image.stored_chunk_size(chunk);
            let decoded = image.plane_bits().iter().try_fold(0usize, |total, &bits| {
                total
                    .checked_add(image.plane_bytes(chunk_size, bits)?)
                    .ok_or(TiffError::LimitsExceeded)
            })?;
            if decoded > self.limits.intermediate_buffer_size {
                return Err(TiffError::LimitsExceeded);
            }

            log::trace!("decoding chunk {} for {:?}", chunk, wanted);
            let local = Region::new(
                wanted.offset.x - chunk_region.offset.x,
                wanted.offset.y - chunk_region.offset.y,
                wanted.size.width,
                wanted.size.height,
            );
            let origin = Point::new(
                wanted.offset.x - region.offset.x,
                wanted.offset.y - region.offset.y,
            );
            let mut sink = ConvertingSink::new(writer, origin);
            let mut ctx = DecodeContext {
                info: image,
                byte_order: self.op.byte_order,
                chunk_size,
                region: local,
                compressed,
                planes: Vec::new(),
                pool,
                sink: &mut sink,
                stop,
            };
            pipeline.run(&mut ctx)?;
        }
        Ok(())
    }

    /// Decode the whole current image.
    pub fn read_image<P: TiffPixelConvert>(&mut self) -> TiffResult<ImageBuffer<P>> {
        let (width, height) = self.dimensions();
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(P::BYTES))
            .ok_or(TiffError::LimitsExceeded)?;
        if bytes > self.limits.decoding_buffer_size {
            return Err(TiffError::LimitsExceeded);
        }

        let mut buffer = ImageBuffer::new(width, height);
        let region = Region::of_size(buffer.size());
        self.read_region(region, &mut buffer.writer(), &Unstoppable)?;
        Ok(buffer)
    }
}
