extern crate criterion;
extern crate tiff_pipeline;

use std::io::Cursor;

use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use enough::Unstoppable;
use tiff_pipeline::bits::{expand_bits, BitOrder, BitReader};
use tiff_pipeline::decoder::Decoder;
use tiff_pipeline::encoder::{ImageOptions, ParallelEncodingState, TiffEncoder};
use tiff_pipeline::pixel::{ImageBuffer, Rgb24, Rgba64};

fn sample_image(width: u32, height: u32) -> ImageBuffer<Rgb24> {
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| Rgb24::new(x as u8, y as u8, (x * y) as u8)))
        .collect();
    ImageBuffer::from_pixels(width, height, pixels).unwrap()
}

fn encode(image: &ImageBuffer<Rgb24>, options: &ImageOptions) -> Vec<u8> {
    let mut tiff = TiffEncoder::new(Cursor::new(Vec::new())).unwrap();
    tiff.write_image(image.reader(), options, &Unstoppable)
        .unwrap();
    tiff.finish().unwrap().into_inner()
}

fn bench_bits(c: &mut Criterion) {
    let data: Vec<u8> = (0..64 * 1024).map(|i| (i * 31) as u8).collect();
    let mut group = c.benchmark_group("bits");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for bits in [1u32, 4, 12] {
        group.bench_with_input(BenchmarkId::new("read-expand", bits), &bits, |b, &bits| {
            b.iter(|| {
                let mut reader = BitReader::new(black_box(&data), BitOrder::MsbFirst);
                let mut sum = 0u64;
                while reader.remaining_bits() >= u64::from(bits) {
                    sum += expand_bits(u64::from(reader.read(bits)), bits, 16, false);
                }
                sum
            })
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let image = sample_image(1024, 768);
    let strips = encode(&image, &ImageOptions::new());
    let tiles = encode(&image, &ImageOptions::new().with_tiles(256, 256));

    let mut group = c.benchmark_group("decode");
    group
        .sample_size(20)
        .throughput(Throughput::Bytes(image.pixels().len() as u64 * 3));
    for (id, data) in [("strips", &strips), ("tiles", &tiles)] {
        group.bench_with_input(BenchmarkId::new(id, data.len()), data, |b, input| {
            b.iter(|| {
                let mut decoder = Decoder::new(Cursor::new(black_box(input.as_slice()))).unwrap();
                decoder.read_image::<Rgba64>().unwrap()
            })
        });
    }
    group.finish();

    let mut group = c.benchmark_group("encode");
    group.sample_size(20);
    let sequential = ImageOptions::new().with_tiles(256, 256);
    let parallel = ImageOptions::new()
        .with_tiles(256, 256)
        .with_parallel(ParallelEncodingState::new(0).unwrap());
    for (id, options) in [("sequential", &sequential), ("parallel", &parallel)] {
        group.bench_function(id, |b| b.iter(|| encode(black_box(&image), options)));
    }
    group.finish();
}

fn main() {
    let mut c = Criterion::default().configure_from_args();
    bench_bits(&mut c);
    bench_pipeline(&mut c);
    c.final_summary();
}
