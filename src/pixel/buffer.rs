use std::ops::{Deref, DerefMut};

use super::Pixel;
use crate::pool::{Scratch, ScratchPool};
use crate::{TiffError, TiffResult, UsageError};

/// A position in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Point { x, y }
    }
}

/// A size in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Size { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub offset: Point,
    pub size: Size,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Region {
            offset: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub const fn of_size(size: Size) -> Self {
        Region {
            offset: Point::new(0, 0),
            size,
        }
    }

    pub fn right(&self) -> u64 {
        u64::from(self.offset.x) + u64::from(self.size.width)
    }

    pub fn bottom(&self) -> u64 {
        u64::from(self.offset.y) + u64::from(self.size.height)
    }

    /// Whether this region lies completely within `size`.
    pub fn fits(&self, size: Size) -> bool {
        self.right() <= u64::from(size.width) && self.bottom() <= u64::from(size.height)
    }

    /// The overlap of two regions, if it is not empty.
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        let x = self.offset.x.max(other.offset.x);
        let y = self.offset.y.max(other.offset.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= u64::from(x) || bottom <= u64::from(y) {
            return None;
        }
        Some(Region::new(
            x,
            y,
            (right - u64::from(x)) as u32,
            (bottom - u64::from(y)) as u32,
        ))
    }
}

/// An owned, row-major pixel store.
#[derive(Debug)]
pub struct ImageBuffer<P: Pixel> {
    size: Size,
    pixels: Vec<P>,
    columns: ScratchPool<P>,
}

impl<P: Pixel> ImageBuffer<P> {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        ImageBuffer {
            size: Size::new(width, height),
            pixels: vec![P::default(); len],
            columns: ScratchPool::new(),
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<P>) -> TiffResult<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TiffError::UsageError(UsageError::BufferSizeMismatch {
                expected,
                actual: pixels.len(),
            }));
        }
        Ok(ImageBuffer {
            size: Size::new(width, height),
            pixels,
            columns: ScratchPool::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [P] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<P> {
        self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&P> {
        if x >= self.size.width {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.width as usize + x as usize)
    }

    pub fn writer(&mut self) -> PixelBufferWriter<'_, P> {
        PixelBufferWriter {
            pixels: &mut self.pixels,
            stride: self.size.width as usize,
            region: Region::of_size(self.size),
            columns: &self.columns,
        }
    }

    pub fn reader(&self) -> PixelBufferReader<'_, P> {
        PixelBufferReader {
            pixels: &self.pixels,
            stride: self.size.width as usize,
            region: Region::of_size(self.size),
        }
    }
}

fn span_error(index: u32, start: u32, len: u32) -> TiffError {
    TiffError::UsageError(UsageError::SpanOutOfRange {
        index: index as usize,
        start: start as usize,
        len: len as usize,
    })
}

/// Mutable view of a rectangle of a pixel store.
///
/// Cropping produces another view over the same pixels, nothing is copied.
#[derive(Debug)]
pub struct PixelBufferWriter<'a, P: Pixel> {
    pixels: &'a mut [P],
    stride: usize,
    region: Region,
    columns: &'a ScratchPool<P>,
}

impl<'a, P: Pixel> PixelBufferWriter<'a, P> {
    pub fn width(&self) -> u32 {
        self.region.size.width
    }

    pub fn height(&self) -> u32 {
        self.region.size.height
    }

    pub fn size(&self) -> Size {
        self.region.size
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (self.region.offset.y + y) as usize * self.stride + (self.region.offset.x + x) as usize
    }

    fn check(&self, index: u32, extent: u32, start: u32, len: u32, along: u32) -> TiffResult<()> {
        if index >= extent || u64::from(start) + u64::from(len) > u64::from(along) {
            return Err(span_error(index, start, len));
        }
        Ok(())
    }

    /// Mutable access to `len` pixels of row `row` starting at column `start`.
    pub fn row_span(&mut self, row: u32, start: u32, len: u32) -> TiffResult<RowSpan<'_, P>> {
        self.check(row, self.height(), start, len, self.width())?;
        let begin = self.index(start, row);
        Ok(RowSpan(&mut self.pixels[begin..begin + len as usize]))
    }

    /// Mutable access to `len` pixels of column `column` starting at row `start`.
    ///
    /// The pixels are gathered into a pooled buffer and scattered back into the column when the
    /// span is dropped.
    pub fn column_span(
        &mut self,
        column: u32,
        start: u32,
        len: u32,
    ) -> TiffResult<ColumnSpan<'_, P>> {
        self.check(column, self.width(), start, len, self.height())?;
        let first = self.index(column, start);
        let stride = self.stride;

        let mut scratch = self.columns.acquire(len as usize);
        for (i, slot) in scratch.iter_mut().enumerate() {
            *slot = self.pixels[first + i * stride];
        }

        Ok(ColumnSpan {
            pixels: &mut *self.pixels,
            first,
            stride,
            scratch,
        })
    }

    /// A view of a sub-rectangle, relative to this view.
    pub fn crop(&mut self, region: Region) -> TiffResult<PixelBufferWriter<'_, P>> {
        if !region.fits(self.region.size) {
            return Err(TiffError::UsageError(UsageError::RegionOutOfBounds));
        }
        Ok(PixelBufferWriter {
            pixels: &mut *self.pixels,
            stride: self.stride,
            region: Region {
                offset: Point::new(
                    self.region.offset.x + region.offset.x,
                    self.region.offset.y + region.offset.y,
                ),
                size: region.size,
            },
            columns: self.columns,
        })
    }
}

/// Read-only view of a rectangle of a pixel store.
#[derive(Debug)]
pub struct PixelBufferReader<'a, P: Pixel> {
    pixels: &'a [P],
    stride: usize,
    region: Region,
}

impl<P: Pixel> Clone for PixelBufferReader<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Pixel> Copy for PixelBufferReader<'_, P> {}

impl<'a, P: Pixel> PixelBufferReader<'a, P> {
    pub fn width(&self) -> u32 {
        self.region.size.width
    }

    pub fn height(&self) -> u32 {
        self.region.size.height
    }

    pub fn size(&self) -> Size {
        self.region.size
    }

    /// `len` pixels of row `row` starting at column `start`.
    pub fn row_span(&self, row: u32, start: u32, len: u32) -> TiffResult<&'a [P]> {
        if row >= self.height() || u64::from(start) + u64::from(len) > u64::from(self.width()) {
            return Err(span_error(row, start, len));
        }
        let begin = (self.region.offset.y + row) as usize * self.stride
            + (self.region.offset.x + start) as usize;
        Ok(&self.pixels[begin..begin + len as usize])
    }

    /// The full visible width of row `row`.
    pub fn row(&self, row: u32) -> TiffResult<&'a [P]> {
        self.row_span(row, 0, self.width())
    }

    /// A view of a sub-rectangle, relative to this view.
    pub fn crop(&self, region: Region) -> TiffResult<PixelBufferReader<'a, P>> {
        if !region.fits(self.region.size) {
            return Err(TiffError::UsageError(UsageError::RegionOutOfBounds));
        }
        Ok(PixelBufferReader {
            pixels: self.pixels,
            stride: self.stride,
            region: Region {
                offset: Point::new(
                    self.region.offset.x + region.offset.x,
                    self.region.offset.y + region.offset.y,
                ),
                size: region.size,
            },
        })
    }
}

/// A row segment borrowed from a [`PixelBufferWriter`].
#[derive(Debug)]
pub struct RowSpan<'a, P>(&'a mut [P]);

impl<P> Deref for RowSpan<'_, P> {
    type Target = [P];

    fn deref(&self) -> &[P] {
        self.0
    }
}

impl<P> DerefMut for RowSpan<'_, P> {
    fn deref_mut(&mut self) -> &mut [P] {
        self.0
    }
}

/// A column segment borrowed from a [`PixelBufferWriter`], written back on drop.
#[derive(Debug)]
pub struct ColumnSpan<'a, P: Pixel> {
    pixels: &'a mut [P],
    first: usize,
    stride: usize,
    scratch: Scratch<'a, P>,
}

impl<P: Pixel> Deref for ColumnSpan<'_, P> {
    type Target = [P];

    fn deref(&self) -> &[P] {
        &self.scratch
    }
}

impl<P: Pixel> DerefMut for ColumnSpan<'_, P> {
    fn deref_mut(&mut self) -> &mut [P] {
        &mut self.scratch
    }
}

impl<P: Pixel> Drop for ColumnSpan<'_, P> {
    fn drop(&mut self) {
        for (i, value) in self.scratch.iter().enumerate() {
            self.pixels[self.first + i * self.stride] = *value;
        }
    }
}
