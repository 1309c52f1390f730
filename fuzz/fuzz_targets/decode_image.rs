#![no_main]
use libfuzzer_sys::fuzz_target;
use tiff_pipeline::decoder::{Decoder, Limits};
use tiff_pipeline::pixel::{ImageBuffer, Region, Rgba64};

fuzz_target!(|data: &[u8]| {
    let Ok(decoder) = Decoder::new(std::io::Cursor::new(data)) else {
        return;
    };

    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1_000_000;
    limits.ifd_value_size = 1_000_000;
    limits.intermediate_buffer_size = 1_000_000;

    let Ok(mut decoder) = decoder.with_limits(limits) else {
        return;
    };

    loop {
        let _ = decoder.read_image::<Rgba64>();

        // A small window exercises the partial chunk paths.
        let (width, height) = decoder.dimensions();
        let region = Region::new(
            width / 2,
            height / 2,
            (width / 2).clamp(1, 64),
            (height / 2).clamp(1, 64),
        );
        let mut out = ImageBuffer::<Rgba64>::new(region.size.width, region.size.height);
        let _ = decoder.read_region(region, &mut out.writer(), &enough::Unstoppable);

        if !decoder.more_images() || decoder.next_image().is_err() {
            break;
        }
    }
});
