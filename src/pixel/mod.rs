//! Canonical in-memory pixel types.
//!
//! Each type has an explicit byte layout: channels in declaration order, 16-bit channels stored
//! little endian. [`Pixel::write_bytes`] and [`Pixel::read_bytes`] are the only way pixels cross
//! into byte buffers.

mod buffer;
mod convert;

pub use self::buffer::{
    ColumnSpan, ImageBuffer, PixelBufferReader, PixelBufferWriter, Point, Region, RowSpan, Size,
};
pub use self::convert::{
    bgra32_to_rgba32, bgra64_to_gray8, gray8_to_rgba64, rgba32_to_cmyk32, rgba64_to_gray16,
    undo_premultiplied, wipe_alpha, CanonicalPixel, PixelRow, TiffPixelConvert,
};

use std::fmt::Debug;

/// A fixed-layout pixel value.
pub trait Pixel: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;
    /// Size of the serialized pixel.
    const BYTES: usize;

    /// Serialize into exactly `Self::BYTES` bytes.
    fn write_bytes(&self, out: &mut [u8]);

    /// Deserialize from exactly `Self::BYTES` bytes.
    fn read_bytes(bytes: &[u8]) -> Self;
}

macro_rules! pixel {
    ($(#[$attr:meta])* $name:ident($ch:ty) { $($field:ident),+ }) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            $(pub $field: $ch,)+
        }

        impl $name {
            pub const fn new($($field: $ch),+) -> Self {
                $name { $($field),+ }
            }
        }

        impl Pixel for $name {
            const NAME: &'static str = stringify!($name);
            const BYTES: usize = pixel!(@count $($field)+) * std::mem::size_of::<$ch>();

            fn write_bytes(&self, out: &mut [u8]) {
                const W: usize = std::mem::size_of::<$ch>();
                let mut chunks = out[..Self::BYTES].chunks_exact_mut(W);
                $(
                    if let Some(chunk) = chunks.next() {
                        chunk.copy_from_slice(&self.$field.to_le_bytes());
                    }
                )+
            }

            fn read_bytes(bytes: &[u8]) -> Self {
                const W: usize = std::mem::size_of::<$ch>();
                let mut chunks = bytes[..Self::BYTES].chunks_exact(W);
                $(
                    let $field = chunks.next().map_or(0, |chunk| {
                        let mut raw = [0u8; W];
                        raw.copy_from_slice(chunk);
                        <$ch>::from_le_bytes(raw)
                    });
                )+
                $name { $($field),+ }
            }
        }
    };
    (@count $($field:ident)+) => { 0 $(+ pixel!(@one $field))+ };
    (@one $field:ident) => { 1 };
}

pixel! {
    /// 8-bit luminance.
    Gray8(u8) { intensity }
}

pixel! {
    /// 16-bit luminance.
    Gray16(u16) { intensity }
}

pixel! {
    /// 8-bit RGB without alpha.
    Rgb24(u8) { r, g, b }
}

pixel! {
    /// 8-bit RGB with unassociated alpha.
    Rgba32(u8) { r, g, b, a }
}

pixel! {
    /// 8-bit BGR with unassociated alpha.
    Bgra32(u8) { b, g, r, a }
}

pixel! {
    /// 16-bit RGB with unassociated alpha.
    Rgba64(u16) { r, g, b, a }
}

pixel! {
    /// 16-bit BGR with alpha. The alpha association depends on where the value came from.
    Bgra64(u16) { b, g, r, a }
}

pixel! {
    /// 8-bit ink coverage.
    Cmyk32(u8) { c, m, y, k }
}
