use crate::pixel::{Bgra32, Bgra64, Cmyk32, Gray16, Gray8, Pixel, Rgb24, Rgba32, Rgba64};
use crate::tags::{ByteOrder, ExtraSamples, InkSet, PhotometricInterpretation, SampleFormat};

/// Trait for the pixel types that can be encoded.
///
/// Every type is stored chunky with unsigned samples in the channel order of its photometric
/// interpretation, so a stored pixel is always `Self::BYTES` long.
pub trait ColorType: Pixel {
    /// The value of the tiff tag `PhotometricInterpretation`
    const TIFF_VALUE: PhotometricInterpretation;
    /// The value of the tiff tag `BitsPerSample`
    const BITS_PER_SAMPLE: &'static [u16];
    /// The value of the tiff tag `SampleFormat`
    const SAMPLE_FORMAT: &'static [SampleFormat];
    /// The value of the tiff tag `ExtraSamples`, empty when the tag is omitted.
    const EXTRA_SAMPLES: &'static [ExtraSamples] = &[];
    /// The value of the tiff tag `InkSet` for separated images.
    const INK_SET: Option<InkSet> = None;

    /// Write the samples of this pixel in file order.
    fn store(&self, out: &mut [u8], byte_order: ByteOrder);
}

macro_rules! color_type {
    ($name:ident, u8, $photometric:ident, [$($field:ident),+] $(, extra = $extra:expr)? $(, ink = $ink:expr)?) => {
        impl ColorType for $name {
            const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::$photometric;
            const BITS_PER_SAMPLE: &'static [u16] = &[$(color_type!(@bits $field 8)),+];
            const SAMPLE_FORMAT: &'static [SampleFormat] =
                &[$(color_type!(@format $field)),+];
            $(const EXTRA_SAMPLES: &'static [ExtraSamples] = $extra;)?
            $(const INK_SET: Option<InkSet> = $ink;)?

            fn store(&self, out: &mut [u8], _: ByteOrder) {
                let mut samples = out.iter_mut();
                $(
                    if let Some(slot) = samples.next() {
                        *slot = self.$field;
                    }
                )+
            }
        }
    };
    ($name:ident, u16, $photometric:ident, [$($field:ident),+] $(, extra = $extra:expr)?) => {
        impl ColorType for $name {
            const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::$photometric;
            const BITS_PER_SAMPLE: &'static [u16] = &[$(color_type!(@bits $field 16)),+];
            const SAMPLE_FORMAT: &'static [SampleFormat] =
                &[$(color_type!(@format $field)),+];
            $(const EXTRA_SAMPLES: &'static [ExtraSamples] = $extra;)?

            fn store(&self, out: &mut [u8], byte_order: ByteOrder) {
                let mut samples = out.chunks_exact_mut(2);
                $(
                    if let Some(slot) = samples.next() {
                        let raw = match byte_order {
                            ByteOrder::LittleEndian => self.$field.to_le_bytes(),
                            ByteOrder::BigEndian => self.$field.to_be_bytes(),
                        };
                        slot.copy_from_slice(&raw);
                    }
                )+
            }
        }
    };
    (@bits $field:ident $bits:expr) => { $bits };
    (@format $field:ident) => { SampleFormat::Uint };
}

color_type!(Gray8, u8, BlackIsZero, [intensity]);
color_type!(Gray16, u16, BlackIsZero, [intensity]);
color_type!(Rgb24, u8, RGB, [r, g, b]);
color_type!(Rgba32, u8, RGB, [r, g, b, a], extra = &[ExtraSamples::UnassociatedAlpha]);
color_type!(Bgra32, u8, RGB, [r, g, b, a], extra = &[ExtraSamples::UnassociatedAlpha]);
color_type!(Rgba64, u16, RGB, [r, g, b, a], extra = &[ExtraSamples::UnassociatedAlpha]);
color_type!(Bgra64, u16, RGB, [r, g, b, a], extra = &[ExtraSamples::UnassociatedAlpha]);
color_type!(Cmyk32, u8, CMYK, [c, m, y, k], ink = Some(InkSet::Cmyk));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_is_stored_as_rgba() {
        let mut out = [0u8; 4];
        Bgra32::new(1, 2, 3, 4).store(&mut out, ByteOrder::LittleEndian);
        assert_eq!(out, [3, 2, 1, 4]);
        assert_eq!(Bgra32::EXTRA_SAMPLES, &[ExtraSamples::UnassociatedAlpha]);
    }

    #[test]
    fn sixteen_bit_samples_follow_the_file_order() {
        let mut out = [0u8; 8];
        Rgba64::new(0x0102, 0, 0, 0xfffe).store(&mut out, ByteOrder::BigEndian);
        assert_eq!(out, [1, 2, 0, 0, 0, 0, 0xff, 0xfe]);
        Gray16::new(0x0102).store(&mut out, ByteOrder::LittleEndian);
        assert_eq!(&out[..2], &[2, 1]);
        assert_eq!(Rgba64::BITS_PER_SAMPLE, &[16, 16, 16, 16]);
    }

    #[test]
    fn separated_ink() {
        assert_eq!(Cmyk32::INK_SET, Some(InkSet::Cmyk));
        assert_eq!(Cmyk32::TIFF_VALUE, PhotometricInterpretation::CMYK);
        assert!(Gray8::EXTRA_SAMPLES.is_empty());
    }
}
