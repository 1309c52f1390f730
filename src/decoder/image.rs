use super::tag_reader::TagReader;
use crate::pixel::{Region, Size};
use crate::tags::{
    CompressionMethod, ExtraSamples, FillOrder, PhotometricInterpretation, PlanarConfiguration,
    Predictor, SampleFormat, Tag,
};
use crate::{TiffError, TiffFormatError, TiffResult, TiffUnsupportedError};

/// How the image data is partitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkLayout {
    Strips { rows_per_strip: u32 },
    Tiles { width: u32, height: u32 },
}

/// Everything the decode pipeline needs to know about one image.
#[derive(Clone, Debug)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: Vec<u16>,
    pub samples_per_pixel: u16,
    pub sample_format: SampleFormat,
    pub photometric: PhotometricInterpretation,
    pub compression: CompressionMethod,
    pub planar: PlanarConfiguration,
    pub predictor: Predictor,
    pub fill_order: FillOrder,
    pub extra_samples: Vec<ExtraSamples>,
    pub layout: ChunkLayout,
    pub chunk_offsets: Vec<u64>,
    pub chunk_byte_counts: Vec<u64>,
    pub color_map: Option<Vec<u16>>,
    pub ycbcr_coefficients: Option<Vec<f64>>,
    pub ycbcr_subsampling: (u16, u16),
    pub reference_black_white: Option<Vec<f64>>,
    pub jpeg_tables: Option<Vec<u8>>,
}

impl ImageInfo {
    pub(crate) fn read(tags: &mut TagReader<'_>) -> TiffResult<Self> {
        let width = tags.require_u32(Tag::ImageWidth)?;
        let height = tags.require_u32(Tag::ImageLength)?;
        if width == 0 || height == 0 {
            return Err(TiffError::FormatError(TiffFormatError::InvalidDimensions(
                width, height,
            )));
        }

        let photometric = tags
            .find_u16(Tag::PhotometricInterpretation)?
            .map(|v| {
                PhotometricInterpretation::from_u16(v)
                    .ok_or(TiffUnsupportedError::UnknownInterpretation)
            })
            .transpose()?
            .ok_or(TiffUnsupportedError::UnknownInterpretation)?;

        let compression = tags
            .find_u16(Tag::Compression)?
            .map_or(CompressionMethod::None, CompressionMethod::from_u16_exhaustive);

        let samples_per_pixel = tags.find_u16(Tag::SamplesPerPixel)?.unwrap_or(1);
        if samples_per_pixel == 0 {
            return Err(TiffUnsupportedError::UnsupportedSampleCount(0).into());
        }

        let bits_per_sample = match tags.find_u16s(Tag::BitsPerSample)? {
            None => vec![1; usize::from(samples_per_pixel)],
            Some(bits) if bits.len() == usize::from(samples_per_pixel) => bits,
            // A single value applies to every sample.
            Some(bits) if bits.len() == 1 => vec![bits[0]; usize::from(samples_per_pixel)],
            Some(bits) => {
                return Err(TiffError::FormatError(TiffFormatError::InvalidTagCount(
                    Tag::BitsPerSample,
                    bits.len() as u64,
                )))
            }
        };

        let sample_format = match tags.find_u16s(Tag::SampleFormat)? {
            None => SampleFormat::Uint,
            Some(formats) => {
                let first = formats.first().copied().unwrap_or(1);
                if formats.iter().any(|&f| f != first) {
                    return Err(TiffUnsupportedError::UnsupportedSampleFormat(
                        SampleFormat::from_u16_exhaustive(first),
                    )
                    .into());
                }
                SampleFormat::from_u16_exhaustive(first)
            }
        };

        let planar = match tags.find_u16(Tag::PlanarConfiguration)? {
            None => PlanarConfiguration::Chunky,
            Some(v) => PlanarConfiguration::from_u16(v).ok_or(TiffError::FormatError(
                TiffFormatError::UnknownPlanarConfiguration(v),
            ))?,
        };

        let predictor = match tags.find_u16(Tag::Predictor)? {
            None => Predictor::None,
            Some(v) => Predictor::from_u16(v)
                .ok_or(TiffError::FormatError(TiffFormatError::UnknownPredictor(v)))?,
        };

        let fill_order = match tags.find_u16(Tag::FillOrder)? {
            None => FillOrder::MsbFirst,
            Some(v) => FillOrder::from_u16(v).unwrap_or_else(|| {
                log::debug!("ignoring invalid fill order {}", v);
                FillOrder::MsbFirst
            }),
        };

        let extra_samples = tags
            .find_u16s(Tag::ExtraSamples)?
            .unwrap_or_default()
            .into_iter()
            .map(|v| ExtraSamples::from_u16(v).unwrap_or(ExtraSamples::Unspecified))
            .collect();

        let (layout, offsets_tag, counts_tag) = if tags.directory().contains(Tag::TileWidth) {
            let tile_width = tags.require_u32(Tag::TileWidth)?;
            let tile_height = tags.require_u32(Tag::TileLength)?;
            if tile_width == 0
                || tile_height == 0
                || tile_width > padded_extent(width)
                || tile_height > padded_extent(height)
            {
                return Err(TiffError::FormatError(TiffFormatError::InvalidDimensions(
                    tile_width,
                    tile_height,
                )));
            }
            (
                ChunkLayout::Tiles {
                    width: tile_width,
                    height: tile_height,
                },
                Tag::TileOffsets,
                Tag::TileByteCounts,
            )
        } else {
            let rows_per_strip = tags
                .find_u32(Tag::RowsPerStrip)?
                .unwrap_or(height)
                .clamp(1, height);
            (
                ChunkLayout::Strips { rows_per_strip },
                Tag::StripOffsets,
                Tag::StripByteCounts,
            )
        };

        let chunk_offsets = tags.require_u64s(offsets_tag)?;
        let chunk_byte_counts = tags.require_u64s(counts_tag)?;

        let color_map = tags.find_u16s(Tag::ColorMap)?;
        let ycbcr_coefficients = tags.find_f64s(Tag::YCbCrCoefficients)?;
        let reference_black_white = tags.find_f64s(Tag::ReferenceBlackWhite)?;
        let ycbcr_subsampling = match tags.find_u16s(Tag::YCbCrSubSampling)? {
            None => (2, 2),
            Some(values) => match values[..] {
                [h, v] => (h, v),
                _ => {
                    return Err(TiffError::FormatError(TiffFormatError::InvalidTagCount(
                        Tag::YCbCrSubSampling,
                        values.len() as u64,
                    )))
                }
            },
        };
        let jpeg_tables = tags.find_bytes(Tag::JPEGTables)?;

        let info = ImageInfo {
            width,
            height,
            bits_per_sample,
            samples_per_pixel,
            sample_format,
            photometric,
            compression,
            planar,
            predictor,
            fill_order,
            extra_samples,
            layout,
            chunk_offsets,
            chunk_byte_counts,
            color_map,
            ycbcr_coefficients,
            ycbcr_subsampling,
            reference_black_white,
            jpeg_tables,
        };

        let required = info.chunk_count();
        for actual in [info.chunk_offsets.len(), info.chunk_byte_counts.len()] {
            if actual < required {
                return Err(TiffError::FormatError(
                    TiffFormatError::InconsistentStripSamples {
                        actual_samples: actual,
                        required_samples: required,
                    },
                ));
            }
        }

        Ok(info)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Number of separately stored sample planes.
    pub fn planes(&self) -> usize {
        match self.planar {
            PlanarConfiguration::Chunky => 1,
            PlanarConfiguration::Planar => usize::from(self.samples_per_pixel),
        }
    }

    /// Chunks per plane across and down.
    pub fn chunk_grid(&self) -> (u32, u32) {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => (1, self.height.div_ceil(rows_per_strip)),
            ChunkLayout::Tiles { width, height } => {
                (self.width.div_ceil(width), self.height.div_ceil(height))
            }
        }
    }

    pub fn chunks_per_plane(&self) -> usize {
        let (across, down) = self.chunk_grid();
        across as usize * down as usize
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks_per_plane() * self.planes()
    }

    /// The area of the image covered by chunk `index`, clipped to the image.
    pub fn chunk_region(&self, index: usize) -> Region {
        let (across, _) = self.chunk_grid();
        let column = (index % across as usize) as u32;
        let row = (index / across as usize) as u32;
        let (w, h) = self.chunk_dimensions();
        let x = column * w;
        let y = row * h;
        Region::new(x, y, w.min(self.width - x), h.min(self.height - y))
    }

    /// Size of a chunk as stored, including tile padding.
    pub fn chunk_dimensions(&self) -> (u32, u32) {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => (self.width, rows_per_strip),
            ChunkLayout::Tiles { width, height } => (width, height),
        }
    }

    /// The decoded size of chunk `index`. Strips are cut at the image bottom, tiles are not.
    pub fn stored_chunk_size(&self, index: usize) -> Size {
        match self.layout {
            ChunkLayout::Strips { .. } => self.chunk_region(index).size,
            ChunkLayout::Tiles { width, height } => Size::new(width, height),
        }
    }

    /// Bits per sample for each stored plane.
    pub fn plane_bits(&self) -> Vec<u16> {
        match self.planar {
            PlanarConfiguration::Chunky => vec![self.bits_per_sample.iter().sum()],
            PlanarConfiguration::Planar => self.bits_per_sample.clone(),
        }
    }

    /// Whether chunky YCbCr data is stored in sub-sampled data units.
    pub fn is_subsampled(&self) -> bool {
        self.photometric == PhotometricInterpretation::YCbCr
            && self.planar == PlanarConfiguration::Chunky
            && !matches!(
                self.compression,
                CompressionMethod::JPEG | CompressionMethod::ModernJPEG
            )
            && self.ycbcr_subsampling != (1, 1)
    }

    /// Byte length of one stored plane of a chunk of the given size.
    pub fn plane_bytes(&self, size: Size, plane_bits: u16) -> TiffResult<usize> {
        if self.is_subsampled() {
            let (h, v) = self.ycbcr_subsampling;
            if h == 0 || v == 0 {
                return Err(TiffError::FormatError(TiffFormatError::InvalidSubsampling(
                    h, v,
                )));
            }
            let units_across = size.width.div_ceil(u32::from(h)) as usize;
            let units_down = size.height.div_ceil(u32::from(v)) as usize;
            let unit = usize::from(h) * usize::from(v) + 2;
            return units_across
                .checked_mul(units_down)
                .and_then(|units| units.checked_mul(unit))
                .ok_or(TiffError::LimitsExceeded);
        }
        bytes_per_scanline(size.width, plane_bits)?
            .checked_mul(size.height as usize)
            .ok_or(TiffError::LimitsExceeded)
    }
}

/// Largest tile edge accepted for an image edge of `extent` pixels.
///
/// Tiles may pad the image up to the next multiple of 16. Small images commonly come in
/// 256 pixel tiles, so that much is always allowed.
fn padded_extent(extent: u32) -> u32 {
    extent.checked_next_multiple_of(16).unwrap_or(u32::MAX).max(256)
}

pub(crate) fn bytes_per_scanline(width: u32, bits: u16) -> TiffResult<usize> {
    (width as usize)
        .checked_mul(usize::from(bits))
        .map(|total| total.div_ceil(8))
        .ok_or(TiffError::LimitsExceeded)
}
