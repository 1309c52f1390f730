use super::{Bgra32, Bgra64, Cmyk32, Gray16, Gray8, Pixel, Rgb24, Rgba32, Rgba64};

/// A row of canonical pixels as produced by a photometric interpreter.
#[derive(Clone, Copy, Debug)]
pub enum PixelRow<'a> {
    Gray8(&'a [Gray8]),
    Gray16(&'a [Gray16]),
    Rgb24(&'a [Rgb24]),
    Rgba32(&'a [Rgba32]),
    Bgra32(&'a [Bgra32]),
    Rgba64(&'a [Rgba64]),
    Bgra64(&'a [Bgra64]),
    Cmyk32(&'a [Cmyk32]),
}

impl PixelRow<'_> {
    pub fn len(&self) -> usize {
        match self {
            PixelRow::Gray8(row) => row.len(),
            PixelRow::Gray16(row) => row.len(),
            PixelRow::Rgb24(row) => row.len(),
            PixelRow::Rgba32(row) => row.len(),
            PixelRow::Bgra32(row) => row.len(),
            PixelRow::Rgba64(row) => row.len(),
            PixelRow::Bgra64(row) => row.len(),
            PixelRow::Cmyk32(row) => row.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand any row into 16-bit RGBA, the common intermediate of all conversions.
    pub fn to_rgba64(&self, out: &mut [Rgba64]) {
        match *self {
            PixelRow::Gray8(row) => gray8_to_rgba64(row, out),
            PixelRow::Gray16(row) => zip_map(row, out, |p| {
                Rgba64::new(p.intensity, p.intensity, p.intensity, 0xffff)
            }),
            PixelRow::Rgb24(row) => zip_map(row, out, |p| {
                Rgba64::new(widen(p.r), widen(p.g), widen(p.b), 0xffff)
            }),
            PixelRow::Rgba32(row) => zip_map(row, out, |p| {
                Rgba64::new(widen(p.r), widen(p.g), widen(p.b), widen(p.a))
            }),
            PixelRow::Bgra32(row) => zip_map(row, out, |p| {
                Rgba64::new(widen(p.r), widen(p.g), widen(p.b), widen(p.a))
            }),
            PixelRow::Rgba64(row) => out[..row.len()].copy_from_slice(row),
            PixelRow::Bgra64(row) => zip_map(row, out, |p| Rgba64::new(p.r, p.g, p.b, p.a)),
            PixelRow::Cmyk32(row) => zip_map(row, out, |p| {
                let k = 255 - u32::from(p.k);
                let ink = |c: u8| ((255 - u32::from(c)) * k / 255) as u8;
                Rgba64::new(widen(ink(p.c)), widen(ink(p.m)), widen(ink(p.y)), 0xffff)
            }),
        }
    }
}

/// Pixel types an interpreter can emit directly.
pub trait CanonicalPixel: Pixel {
    fn row(pixels: &[Self]) -> PixelRow<'_>;
}

macro_rules! canonical {
    ($($name:ident),*) => {
        $(impl CanonicalPixel for $name {
            fn row(pixels: &[Self]) -> PixelRow<'_> {
                PixelRow::$name(pixels)
            }
        })*
    };
}

canonical!(Gray8, Gray16, Rgb24, Rgba32, Bgra32, Rgba64, Bgra64, Cmyk32);

/// Pixel types that can be filled from any canonical row.
pub trait TiffPixelConvert: Pixel {
    /// Convert `src` into the first `src.len()` pixels of `dst`.
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]);
}

#[inline(always)]
fn widen(v: u8) -> u16 {
    u16::from(v) * 0x101
}

#[inline(always)]
fn narrow(v: u16) -> u8 {
    (v >> 8) as u8
}

#[inline(always)]
fn zip_map<S: Copy, D>(src: &[S], dst: &mut [D], f: impl Fn(S) -> D) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = f(*s);
    }
}

#[inline(always)]
fn premultiply16(c: u16, a: u16) -> u32 {
    u32::from(c) * u32::from(a) / 0xffff
}

/// Weighted luminance of premultiplied 16-bit channels, still 16 bits wide.
#[inline(always)]
fn luma16(r: u16, g: u16, b: u16, a: u16) -> u32 {
    let (r, g, b) = (premultiply16(r, a), premultiply16(g, a), premultiply16(b, a));
    (r * 38 + g * 75 + b * 15) >> 7
}

fn via_rgba64<D: Copy>(src: PixelRow<'_>, dst: &mut [D], f: impl Fn(Rgba64) -> D) {
    let mut hub = vec![Rgba64::default(); src.len()];
    src.to_rgba64(&mut hub);
    zip_map(&hub, dst, f);
}

pub fn bgra64_to_gray8(src: &[Bgra64], dst: &mut [Gray8]) {
    zip_map(src, dst, |p| Gray8::new((luma16(p.r, p.g, p.b, p.a) >> 8) as u8));
}

pub fn rgba64_to_gray16(src: &[Rgba64], dst: &mut [Gray16]) {
    zip_map(src, dst, |p| Gray16::new(luma16(p.r, p.g, p.b, p.a) as u16));
}

pub fn gray8_to_rgba64(src: &[Gray8], dst: &mut [Rgba64]) {
    zip_map(src, dst, |p| {
        let v = widen(p.intensity);
        Rgba64::new(v, v, v, 0xffff)
    });
}

pub fn bgra32_to_rgba32(src: &[Bgra32], dst: &mut [Rgba32]) {
    zip_map(src, dst, |p| Rgba32::new(p.r, p.g, p.b, p.a));
}

pub fn rgba32_to_cmyk32(src: &[Rgba32], dst: &mut [Cmyk32]) {
    zip_map(src, dst, |p| {
        let a = u32::from(p.a);
        let c = 255 - u32::from(p.r) * a / 255;
        let m = 255 - u32::from(p.g) * a / 255;
        let y = 255 - u32::from(p.b) * a / 255;
        let k = c.min(m).min(y);
        if k == 255 {
            Cmyk32::new(0, 0, 0, 255)
        } else {
            let ink = |v: u32| ((v - k) * 255 / (255 - k)) as u8;
            Cmyk32::new(ink(c), ink(m), ink(y), k as u8)
        }
    });
}

/// Divide premultiplied color by alpha in place.
///
/// Fully transparent pixels become transparent black. The integer division is the established
/// behavior and is not exactly invertible. Color brighter than its alpha is invalid input; the
/// quotient keeps only its low 16 bits.
pub fn undo_premultiplied(pixels: &mut [Bgra64]) {
    for p in pixels {
        let a = u32::from(p.a);
        if a == 0 {
            *p = Bgra64::default();
            continue;
        }
        let undo = |c: u16| (u32::from(c) * 0xffff / a) as u16;
        p.b = undo(p.b);
        p.g = undo(p.g);
        p.r = undo(p.r);
    }
}

/// Force alpha opaque, leaving premultiplied color as is.
pub fn wipe_alpha(pixels: &mut [Bgra64]) {
    for p in pixels {
        p.a = 0xffff;
    }
}

impl TiffPixelConvert for Gray8 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Gray8(row) => dst[..row.len()].copy_from_slice(row),
            PixelRow::Gray16(row) => zip_map(row, dst, |p| Gray8::new(narrow(p.intensity))),
            PixelRow::Bgra64(row) => bgra64_to_gray8(row, dst),
            other => via_rgba64(other, dst, |p| {
                Gray8::new((luma16(p.r, p.g, p.b, p.a) >> 8) as u8)
            }),
        }
    }
}

impl TiffPixelConvert for Gray16 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Gray16(row) => dst[..row.len()].copy_from_slice(row),
            PixelRow::Gray8(row) => zip_map(row, dst, |p| Gray16::new(widen(p.intensity))),
            PixelRow::Rgba64(row) => rgba64_to_gray16(row, dst),
            other => via_rgba64(other, dst, |p| {
                Gray16::new(luma16(p.r, p.g, p.b, p.a) as u16)
            }),
        }
    }
}

impl TiffPixelConvert for Rgb24 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Rgb24(row) => dst[..row.len()].copy_from_slice(row),
            PixelRow::Rgba32(row) => zip_map(row, dst, |p| Rgb24::new(p.r, p.g, p.b)),
            other => via_rgba64(other, dst, |p| {
                Rgb24::new(narrow(p.r), narrow(p.g), narrow(p.b))
            }),
        }
    }
}

impl TiffPixelConvert for Rgba32 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Rgba32(row) => dst[..row.len()].copy_from_slice(row),
            PixelRow::Bgra32(row) => bgra32_to_rgba32(row, dst),
            PixelRow::Rgb24(row) => zip_map(row, dst, |p| Rgba32::new(p.r, p.g, p.b, 0xff)),
            other => via_rgba64(other, dst, |p| {
                Rgba32::new(narrow(p.r), narrow(p.g), narrow(p.b), narrow(p.a))
            }),
        }
    }
}

impl TiffPixelConvert for Bgra32 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Bgra32(row) => dst[..row.len()].copy_from_slice(row),
            PixelRow::Rgba32(row) => zip_map(row, dst, |p| Bgra32::new(p.b, p.g, p.r, p.a)),
            other => via_rgba64(other, dst, |p| {
                Bgra32::new(narrow(p.b), narrow(p.g), narrow(p.r), narrow(p.a))
            }),
        }
    }
}

impl TiffPixelConvert for Rgba64 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        src.to_rgba64(dst);
    }
}

impl TiffPixelConvert for Bgra64 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Bgra64(row) => dst[..row.len()].copy_from_slice(row),
            other => via_rgba64(other, dst, |p| Bgra64::new(p.b, p.g, p.r, p.a)),
        }
    }
}

impl TiffPixelConvert for Cmyk32 {
    fn convert_row(src: PixelRow<'_>, dst: &mut [Self]) {
        match src {
            PixelRow::Cmyk32(row) => dst[..row.len()].copy_from_slice(row),
            PixelRow::Rgba32(row) => rgba32_to_cmyk32(row, dst),
            other => {
                let mut rgba = vec![Rgba32::default(); other.len()];
                Rgba32::convert_row(other, &mut rgba);
                rgba32_to_cmyk32(&rgba, dst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_premultiplied_half_alpha() {
        let mut px = [Bgra64::new(0x8000, 0x8000, 0x8000, 0x8000)];
        undo_premultiplied(&mut px);
        assert_eq!(px[0], Bgra64::new(0xffff, 0xffff, 0xffff, 0x8000));
    }

    #[test]
    fn undo_premultiplied_color_above_alpha_wraps() {
        let mut px = [Bgra64::new(0x9000, 0x4000, 0x8000, 0x8000)];
        undo_premultiplied(&mut px);
        assert_eq!(px[0], Bgra64::new(0x1ffe, 0x7fff, 0xffff, 0x8000));
    }

    #[test]
    fn undo_premultiplied_zero_alpha() {
        let mut px = [Bgra64::new(0x1234, 0x5678, 0x9abc, 0)];
        undo_premultiplied(&mut px);
        assert_eq!(px[0], Bgra64::default());
    }

    #[test]
    fn wipe_alpha_keeps_color() {
        let mut px = [Bgra64::new(1, 2, 3, 4)];
        wipe_alpha(&mut px);
        assert_eq!(px[0], Bgra64::new(1, 2, 3, 0xffff));
    }

    #[test]
    fn gray8_replicates_into_rgba64() {
        let mut out = [Rgba64::default(); 2];
        gray8_to_rgba64(&[Gray8::new(0xab), Gray8::new(0)], &mut out);
        assert_eq!(out[0], Rgba64::new(0xabab, 0xabab, 0xabab, 0xffff));
        assert_eq!(out[1], Rgba64::new(0, 0, 0, 0xffff));
    }

    #[test]
    fn white_is_white_in_gray() {
        let mut g8 = [Gray8::default()];
        bgra64_to_gray8(&[Bgra64::new(0xffff, 0xffff, 0xffff, 0xffff)], &mut g8);
        assert_eq!(g8[0].intensity, 0xff);

        let mut g16 = [Gray16::default()];
        rgba64_to_gray16(&[Rgba64::new(0xffff, 0xffff, 0xffff, 0xffff)], &mut g16);
        assert_eq!(g16[0].intensity, 0xffff);

        rgba64_to_gray16(&[Rgba64::new(0xffff, 0xffff, 0xffff, 0)], &mut g16);
        assert_eq!(g16[0].intensity, 0);
    }

    #[test]
    fn swizzle_and_cmyk() {
        let mut rgba = [Rgba32::default()];
        bgra32_to_rgba32(&[Bgra32::new(1, 2, 3, 4)], &mut rgba);
        assert_eq!(rgba[0], Rgba32::new(3, 2, 1, 4));

        let mut cmyk = [Cmyk32::default(); 3];
        rgba32_to_cmyk32(
            &[
                Rgba32::new(255, 0, 0, 255),
                Rgba32::new(0, 0, 0, 255),
                Rgba32::new(255, 255, 255, 255),
            ],
            &mut cmyk,
        );
        assert_eq!(cmyk[0], Cmyk32::new(0, 255, 255, 0));
        assert_eq!(cmyk[1], Cmyk32::new(0, 0, 0, 255));
        assert_eq!(cmyk[2], Cmyk32::new(0, 0, 0, 0));
    }

    #[test]
    fn hub_conversion_reaches_every_target() {
        let src = [Cmyk32::new(0, 0, 0, 0)];
        let mut out = [Bgra32::default()];
        Bgra32::convert_row(PixelRow::Cmyk32(&src), &mut out);
        assert_eq!(out[0], Bgra32::new(255, 255, 255, 255));

        let src = [Gray16::new(0x1234)];
        let mut out = [Rgb24::default()];
        Rgb24::convert_row(PixelRow::Gray16(&src), &mut out);
        assert_eq!(out[0], Rgb24::new(0x12, 0x12, 0x12));
    }
}
