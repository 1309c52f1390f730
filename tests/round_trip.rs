extern crate tiff_pipeline;

use std::io::Cursor;

use enough::Unstoppable;
use tiff_pipeline::decoder::{ChunkLayout, Decoder};
use tiff_pipeline::encoder::{
    ColorType, Deflate, DeflateLevel, ImageOptions, Lzw, Packbits, TiffEncoder,
};
use tiff_pipeline::pixel::{
    Bgra32, Cmyk32, Gray16, Gray8, ImageBuffer, Rgb24, Rgba32, Rgba64,
};
use tiff_pipeline::tags::{ByteOrder, CompressionMethod, PhotometricInterpretation, Predictor, Tag};

fn encode<P: ColorType>(
    image: &ImageBuffer<P>,
    byte_order: ByteOrder,
    bigtiff: bool,
    options: ImageOptions,
) -> Vec<u8> {
    let mut tiff = TiffEncoder::with_byte_order(Cursor::new(Vec::new()), byte_order, bigtiff)
        .unwrap();
    tiff.write_image(image.reader(), &options, &Unstoppable)
        .unwrap();
    tiff.finish().unwrap().into_inner()
}

fn pattern<P>(width: u32, height: u32, f: impl Fn(u32, u32) -> P) -> ImageBuffer<P>
where
    P: ColorType,
{
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| f(x, y))
        .collect();
    ImageBuffer::from_pixels(width, height, pixels).unwrap()
}

#[test]
fn gray8_strips() {
    let image = pattern(37, 23, |x, y| Gray8::new((x * 7 + y) as u8));
    let bytes = encode(
        &image,
        ByteOrder::LittleEndian,
        false,
        ImageOptions::new().with_strips(5),
    );
    assert_eq!(&bytes[..4], b"II*\0");

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.dimensions(), (37, 23));
    assert_eq!(
        decoder.image_info().layout,
        ChunkLayout::Strips { rows_per_strip: 5 }
    );
    assert_eq!(decoder.image_info().chunk_count(), 5);
    let decoded = decoder.read_image::<Gray8>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
#[cfg(feature = "lzw")]
fn rgb24_lzw_with_prediction_big_endian() {
    let image = pattern(64, 40, |x, y| {
        Rgb24::new(x as u8, y as u8, (x ^ y) as u8)
    });
    let bytes = encode(
        &image,
        ByteOrder::BigEndian,
        false,
        ImageOptions::new()
            .with_compression(Lzw)
            .with_predictor(Predictor::Horizontal),
    );
    assert_eq!(&bytes[..4], b"MM\0*");

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.byte_order(), ByteOrder::BigEndian);
    let mut tags = decoder.tags();
    assert_eq!(
        tags.find_u16(Tag::Compression).unwrap(),
        Some(CompressionMethod::LZW.to_u16())
    );
    assert_eq!(
        tags.find_u16(Tag::Predictor).unwrap(),
        Some(Predictor::Horizontal.to_u16())
    );
    let decoded = decoder.read_image::<Rgb24>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
#[cfg(feature = "deflate")]
fn rgba64_deflate_bigtiff() {
    let image = pattern(20, 20, |x, y| {
        Rgba64::new(
            (x * 3000) as u16,
            (y * 3000) as u16,
            0x1234,
            if x == y { 0 } else { 0xffff },
        )
    });
    let bytes = encode(
        &image,
        ByteOrder::LittleEndian,
        true,
        ImageOptions::new().with_compression(Deflate::with_level(DeflateLevel::Best)),
    );
    assert_eq!(&bytes[..8], &[b'I', b'I', 43, 0, 8, 0, 0, 0]);

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert!(decoder.is_bigtiff());
    let decoded = decoder.read_image::<Rgba64>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
fn cmyk32_packbits() {
    let image = pattern(50, 9, |x, _| {
        if x < 25 {
            Cmyk32::new(0, 0, 0, 255)
        } else {
            Cmyk32::new(x as u8, 10, 20, 30)
        }
    });
    let bytes = encode(
        &image,
        ByteOrder::LittleEndian,
        false,
        ImageOptions::new().with_compression(Packbits),
    );

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(
        decoder.image_info().photometric,
        PhotometricInterpretation::CMYK
    );
    assert_eq!(decoder.tags().find_u16(Tag::InkSet).unwrap(), Some(1));
    let decoded = decoder.read_image::<Cmyk32>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
fn bgra32_is_read_back_as_rgba32() {
    let image = pattern(6, 4, |x, y| Bgra32::new(x as u8, y as u8, 200, 100));
    let bytes = encode(&image, ByteOrder::LittleEndian, false, ImageOptions::new());

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(
        decoder.tags().find_u16s(Tag::ExtraSamples).unwrap(),
        Some(vec![2])
    );
    let decoded = decoder.read_image::<Rgba32>().unwrap();
    for (src, dst) in image.pixels().iter().zip(decoded.pixels()) {
        assert_eq!(*dst, Rgba32::new(src.r, src.g, src.b, src.a));
    }
}

#[test]
fn gray16_prediction_big_endian() {
    let image = pattern(33, 7, |x, y| Gray16::new((x * 1500 + y * 11) as u16));
    let bytes = encode(
        &image,
        ByteOrder::BigEndian,
        false,
        ImageOptions::new()
            .with_compression(Packbits)
            .with_predictor(Predictor::Horizontal),
    );

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let decoded = decoder.read_image::<Gray16>().unwrap();
    assert_eq!(decoded.pixels(), image.pixels());
}

#[test]
fn gray8_expands_to_rgba64() {
    let image = pattern(3, 2, |x, y| Gray8::new((x * 100 + y) as u8));
    let bytes = encode(&image, ByteOrder::LittleEndian, false, ImageOptions::new());

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let decoded = decoder.read_image::<Rgba64>().unwrap();
    for (src, dst) in image.pixels().iter().zip(decoded.pixels()) {
        let v = u16::from(src.intensity) * 257;
        assert_eq!(*dst, Rgba64::new(v, v, v, 0xffff));
    }
}

#[test]
fn image_tags_are_written() {
    let image = ImageBuffer::<Rgb24>::new(300, 100);
    let bytes = encode(&image, ByteOrder::LittleEndian, false, ImageOptions::new());

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    let mut tags = decoder.tags();
    assert_eq!(tags.require_u32(Tag::ImageWidth).unwrap(), 300);
    assert_eq!(tags.require_u32(Tag::ImageLength).unwrap(), 100);
    assert_eq!(tags.find_u16s(Tag::BitsPerSample).unwrap(), Some(vec![8, 8, 8]));
    assert_eq!(tags.find_u16(Tag::SamplesPerPixel).unwrap(), Some(3));
    assert_eq!(tags.find_u16(Tag::PlanarConfiguration).unwrap(), Some(1));
    assert_eq!(tags.find_u16(Tag::Predictor).unwrap(), None);
    // 900 bytes a row, 9 rows make a strip of about 8 KB.
    assert_eq!(tags.find_u32(Tag::RowsPerStrip).unwrap(), Some(9));
    assert_eq!(tags.find_u32s(Tag::StripOffsets).unwrap().map(|v| v.len()), Some(12));
    let counts = tags.find_u32s(Tag::StripByteCounts).unwrap().unwrap();
    assert_eq!(counts[0], 8100);
    assert_eq!(counts[11], 900);
}

#[test]
fn images_chain_in_order() {
    let first = pattern(4, 4, |x, _| Gray8::new(x as u8));
    let second = pattern(8, 2, |_, y| Rgb24::new(1, 2, y as u8));
    let third = pattern(1, 1, |_, _| Gray16::new(0xbeef));

    let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
    let options = ImageOptions::new();
    tiff.write_image(first.reader(), &options, &Unstoppable).unwrap();
    tiff.write_image(second.reader(), &options, &Unstoppable).unwrap();
    tiff.write_image(third.reader(), &options, &Unstoppable).unwrap();
    let bytes = tiff.finish().unwrap().into_inner();

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.current_image(), 0);
    assert_eq!(decoder.read_image::<Gray8>().unwrap().pixels(), first.pixels());
    assert!(decoder.more_images());

    decoder.next_image().unwrap();
    assert_eq!(decoder.dimensions(), (8, 2));
    assert_eq!(decoder.read_image::<Rgb24>().unwrap().pixels(), second.pixels());

    decoder.next_image().unwrap();
    assert_eq!(decoder.current_image(), 2);
    assert!(!decoder.more_images());
    assert_eq!(decoder.read_image::<Gray16>().unwrap().pixels(), third.pixels());
    assert!(decoder.next_image().is_err());

    decoder.seek_to_image(1).unwrap();
    assert_eq!(decoder.dimensions(), (8, 2));
    decoder.seek_to_image(0).unwrap();
    assert_eq!(decoder.dimensions(), (4, 4));
}

#[test]
fn custom_directories_join_the_chain() {
    let image = pattern(2, 2, |_, _| Gray8::new(9));
    let mut tiff = TiffEncoder::new_big(Cursor::new(Vec::new())).unwrap();
    tiff.write_image(image.reader(), &ImageOptions::new(), &Unstoppable)
        .unwrap();

    let mut directory = tiff.new_directory();
    directory.write_tag(Tag::ImageWidth, &1u32).unwrap();
    directory.write_tag(Tag::ImageLength, &1u32).unwrap();
    directory.write_tag(Tag::BitsPerSample, &8u16).unwrap();
    directory.write_tag(Tag::PhotometricInterpretation, &1u16).unwrap();
    directory.write_tag(Tag::StripOffsets, &16u64).unwrap();
    directory.write_tag(Tag::StripByteCounts, &1u64).unwrap();
    directory.write_tag(Tag::Artist, "nobody").unwrap();
    tiff.write_directory(&mut directory).unwrap();
    let bytes = tiff.finish().unwrap().into_inner();

    let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
    decoder.next_image().unwrap();
    assert_eq!(
        decoder.tags().find_ascii(Tag::Artist).unwrap().as_deref(),
        Some("nobody")
    );
    assert_eq!(decoder.dimensions(), (1, 1));
}
