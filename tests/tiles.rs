extern crate tiff_pipeline;

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use enough::Unstoppable;
use tiff_pipeline::decoder::{ChunkLayout, Decoder};
use tiff_pipeline::encoder::{
    CompressionContext, Compressor, ImageOptions, ParallelEncodingState, TiffEncoder,
    Uncompressed,
};
use tiff_pipeline::pixel::{Gray8, ImageBuffer, Region, Rgb24};
use tiff_pipeline::tags::{CompressionMethod, Tag};
use tiff_pipeline::{CancellationToken, TiffError, TiffFormatError, TiffResult, UsageError};

fn rgb_image(width: u32, height: u32) -> ImageBuffer<Rgb24> {
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| Rgb24::new(x as u8, y as u8, (x + y) as u8)))
        .collect();
    ImageBuffer::from_pixels(width, height, pixels).unwrap()
}

fn encode_tiled(image: &ImageBuffer<Rgb24>, options: ImageOptions) -> Vec<u8> {
    let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
    tiff.write_image(image.reader(), &options, &Unstoppable)
        .unwrap();
    tiff.finish().unwrap().into_inner()
}

#[test]
fn tiled_image_round_trip() {
    let image = rgb_image(40, 36);
    let bytes = encode_tiled(&image, ImageOptions::new().with_tiles(16, 32));

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(
        decoder.image_info().layout,
        ChunkLayout::Tiles {
            width: 16,
            height: 32
        }
    );
    let mut tags = decoder.tags();
    assert_eq!(tags.find_u32(Tag::TileWidth).unwrap(), Some(16));
    assert_eq!(tags.find_u32(Tag::TileLength).unwrap(), Some(32));
    assert_eq!(tags.find_u32(Tag::RowsPerStrip).unwrap(), None);
    let counts = tags.find_u32s(Tag::TileByteCounts).unwrap().unwrap();
    // Edge tiles are padded to full size.
    assert_eq!(counts, vec![16 * 32 * 3; 6]);

    let decoded = decoder.read_image::<Rgb24>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
fn region_reads_cross_tiles() {
    let image = rgb_image(40, 36);
    let bytes = encode_tiled(&image, ImageOptions::new().with_tiles(16, 16));

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let region = Region::new(10, 12, 20, 15);
    let mut out = ImageBuffer::<Rgb24>::new(20, 15);
    decoder
        .read_region(region, &mut out.writer(), &Unstoppable)
        .unwrap();
    for y in 0..15 {
        for x in 0..20 {
            assert_eq!(out.get(x, y), image.get(x + 10, y + 12), "at {},{}", x, y);
        }
    }

    let outside = Region::new(30, 30, 20, 1);
    assert!(matches!(
        decoder.read_region(outside, &mut out.writer(), &Unstoppable),
        Err(TiffError::UsageError(UsageError::RegionOutOfBounds))
    ));
}

#[test]
fn tile_sizes_are_validated() {
    let image = rgb_image(20, 20);
    let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
    let result = tiff.write_image(
        image.reader(),
        &ImageOptions::new().with_tiles(20, 16),
        &Unstoppable,
    );
    assert!(matches!(
        result,
        Err(TiffError::UsageError(UsageError::InvalidTileSize {
            width: 20,
            height: 16
        }))
    ));
}

/// A 16x16 RGB file whose only tile claims the given dimensions.
fn file_with_tile_size(tile_width: u32, tile_height: u32) -> Vec<u8> {
    let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
    let mut directory = tiff.new_directory();
    directory.write_tag(Tag::ImageWidth, &16u32).unwrap();
    directory.write_tag(Tag::ImageLength, &16u32).unwrap();
    directory.write_tag(Tag::BitsPerSample, &[8u16, 8, 8][..]).unwrap();
    directory.write_tag(Tag::SamplesPerPixel, &3u16).unwrap();
    directory.write_tag(Tag::PhotometricInterpretation, &2u16).unwrap();
    directory.write_tag(Tag::TileWidth, &tile_width).unwrap();
    directory.write_tag(Tag::TileLength, &tile_height).unwrap();
    directory.write_tag(Tag::TileOffsets, &8u32).unwrap();
    directory.write_tag(Tag::TileByteCounts, &768u32).unwrap();
    tiff.write_directory(&mut directory).unwrap();
    tiff.finish().unwrap().into_inner()
}

#[test]
fn huge_tile_dimensions_are_rejected() {
    let bytes = file_with_tile_size(0xffff_fff0, 0xffff_fff0);
    let result = Decoder::new(Cursor::new(bytes)).and_then(|mut decoder| {
        decoder.read_image::<Rgb24>()?;
        Ok(())
    });
    assert!(matches!(
        result,
        Err(TiffError::FormatError(TiffFormatError::InvalidDimensions(
            0xffff_fff0,
            0xffff_fff0
        )))
    ));

    // Tiles larger than the image but within the padded extent still open.
    let bytes = file_with_tile_size(256, 256);
    let decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.image_info().chunk_count(), 1);
}

/// Holds back the first tile until the second one has been compressed.
#[derive(Debug, Default)]
struct SecondTileFirst {
    second_done: Arc<AtomicBool>,
}

impl Compressor for SecondTileFirst {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }

    fn compress(&self, ctx: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        match (ctx.region.offset.x, ctx.region.offset.y) {
            (0, 0) => {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !self.second_done.load(Ordering::Acquire) && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(1));
                }
                thread::sleep(Duration::from_millis(100));
            }
            (16, 0) => self.second_done.store(true, Ordering::Release),
            _ => {}
        }
        Uncompressed.compress(ctx, input)
    }
}

#[test]
fn parallel_tables_follow_raster_order() {
    let image = rgb_image(32, 32);
    let options = ImageOptions::new()
        .with_tiles(16, 16)
        .with_compression(SecondTileFirst::default())
        .with_parallel(ParallelEncodingState::new(4).unwrap());
    let bytes = encode_tiled(&image, options);

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let offsets = decoder
        .tags()
        .find_u64s(Tag::TileOffsets)
        .unwrap()
        .unwrap();
    assert_eq!(offsets.len(), 4);
    // The first tile reached the file after the second.
    assert!(offsets[0] > offsets[1]);
    let decoded = decoder.read_image::<Rgb24>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
fn parallel_and_sequential_files_decode_alike() {
    let pixels = (0..96u32 * 70).map(|i| Gray8::new((i % 251) as u8)).collect();
    let image = ImageBuffer::from_pixels(96, 70, pixels).unwrap();
    for parallel in [false, true] {
        let mut options = ImageOptions::new().with_tiles(32, 16);
        if parallel {
            options = options.with_parallel(ParallelEncodingState::new(3).unwrap());
        }
        let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
        tiff.write_image(image.reader(), &options, &Unstoppable)
            .unwrap();
        let bytes = tiff.finish().unwrap().into_inner();

        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        assert_eq!(decoder.image_info().chunk_count(), 15);
        let decoded = decoder.read_image::<Gray8>().unwrap();
        assert_eq!(decoded.pixels(), image.pixels(), "parallel: {}", parallel);
    }
}

/// Stages every tile in pooled scratch before storing it as is.
#[derive(Debug, Default)]
struct StagedInScratch {
    staged: Arc<AtomicUsize>,
}

impl Compressor for StagedInScratch {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }

    fn compress(&self, ctx: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        let mut scratch = ctx.pool.acquire(input.len());
        assert!(scratch.iter().all(|&b| b == 0));
        scratch.copy_from_slice(input);
        self.staged.fetch_add(1, Ordering::Relaxed);
        Ok(scratch.to_vec())
    }
}

#[test]
fn compressors_borrow_scratch_from_the_context() {
    let image = rgb_image(48, 32);
    let staged = Arc::new(AtomicUsize::new(0));
    let options = ImageOptions::new()
        .with_tiles(16, 16)
        .with_compression(StagedInScratch {
            staged: staged.clone(),
        })
        .with_parallel(ParallelEncodingState::new(2).unwrap());
    let bytes = encode_tiled(&image, options);
    assert_eq!(staged.load(Ordering::Relaxed), 6);

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let decoded = decoder.read_image::<Rgb24>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

/// Cancels the whole encode while compressing the second tile.
#[derive(Debug)]
struct CancelOnSecondTile {
    token: CancellationToken,
}

impl Compressor for CancelOnSecondTile {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::None
    }

    fn compress(&self, ctx: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        if ctx.region.offset.x == 16 && ctx.region.offset.y == 0 {
            self.token.cancel();
        }
        Uncompressed.compress(ctx, input)
    }
}

#[test]
fn cancellation_stops_parallel_encoding() {
    let image = rgb_image(64, 64);
    let token = CancellationToken::new();
    let options = ImageOptions::new()
        .with_tiles(16, 16)
        .with_compression(CancelOnSecondTile {
            token: token.clone(),
        })
        .with_parallel(ParallelEncodingState::new(2).unwrap());

    let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
    let result = tiff.write_image(image.reader(), &options, &token);
    assert!(matches!(result, Err(TiffError::Cancelled(_))));
    assert!(token.is_cancelled());
}
