//! Horizontal differencing over packed scanlines.
//!
//! Rows are processed in file byte order. Whole-byte sample widths are handled natively, any
//! other width up to 32 bits goes through the bit reader and writer.

use crate::bits::{BitOrder, BitReader, BitWriter};
use crate::tags::ByteOrder;

trait Wrapping: Copy {
    const BYTES: usize;
    fn wrapping_add(self, other: Self) -> Self;
    fn wrapping_sub(self, other: Self) -> Self;
    fn load(bytes: &[u8], order: ByteOrder) -> Self;
    fn store(self, bytes: &mut [u8], order: ByteOrder);
}

macro_rules! wrapping {
    ($($ty:ty),*) => {$(
        impl Wrapping for $ty {
            const BYTES: usize = std::mem::size_of::<$ty>();

            #[inline(always)]
            fn wrapping_add(self, other: Self) -> Self {
                <$ty>::wrapping_add(self, other)
            }

            #[inline(always)]
            fn wrapping_sub(self, other: Self) -> Self {
                <$ty>::wrapping_sub(self, other)
            }

            #[inline(always)]
            fn load(bytes: &[u8], order: ByteOrder) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..Self::BYTES]);
                match order {
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(raw),
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(raw),
                }
            }

            #[inline(always)]
            fn store(self, bytes: &mut [u8], order: ByteOrder) {
                let raw = match order {
                    ByteOrder::LittleEndian => self.to_le_bytes(),
                    ByteOrder::BigEndian => self.to_be_bytes(),
                };
                bytes[..Self::BYTES].copy_from_slice(&raw);
            }
        }
    )*};
}

wrapping!(u8, u16, u32, u64);

/// Shape of one row handed to the predictor.
#[derive(Clone, Copy, Debug)]
pub struct RowLayout {
    pub width: usize,
    pub samples: usize,
    pub bits: u16,
    pub byte_order: ByteOrder,
}

impl RowLayout {
    fn sample_count(&self) -> usize {
        self.width * self.samples
    }
}

fn rev_hpredict<T: Wrapping>(row: &mut [u8], layout: RowLayout) {
    let stride = layout.samples * T::BYTES;
    let end = layout.sample_count() * T::BYTES;
    for i in (stride..end).step_by(T::BYTES) {
        let prev = T::load(&row[i - stride..], layout.byte_order);
        let current = T::load(&row[i..], layout.byte_order);
        current.wrapping_add(prev).store(&mut row[i..], layout.byte_order);
    }
}

fn hpredict<T: Wrapping>(row: &mut [u8], layout: RowLayout) {
    let stride = layout.samples * T::BYTES;
    let end = layout.sample_count() * T::BYTES;
    // Back to front so every difference is taken against the original neighbour.
    for i in (stride..end).step_by(T::BYTES).rev() {
        let prev = T::load(&row[i - stride..], layout.byte_order);
        let current = T::load(&row[i..], layout.byte_order);
        current.wrapping_sub(prev).store(&mut row[i..], layout.byte_order);
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Apply,
}

fn packed(row: &mut [u8], layout: RowLayout, direction: Direction) {
    let bits = u32::from(layout.bits);
    let stride = layout.samples;
    // Whole-byte widths other than the native ones still carry the file byte order.
    let swap = layout.byte_order == ByteOrder::LittleEndian && bits % 8 == 0;
    let order = |v: u32| if swap { v.swap_bytes() >> (32 - bits) } else { v };

    let mut reader = BitReader::new(row, BitOrder::MsbFirst);
    let mut samples: Vec<u32> = (0..layout.sample_count())
        .map(|_| order(reader.read(bits)))
        .collect();

    let mask = if bits == 32 { u32::MAX } else { (1 << bits) - 1 };
    match direction {
        Direction::Undo => {
            for i in stride..samples.len() {
                samples[i] = samples[i].wrapping_add(samples[i - stride]) & mask;
            }
        }
        Direction::Apply => {
            for i in (stride..samples.len()).rev() {
                samples[i] = samples[i].wrapping_sub(samples[i - stride]) & mask;
            }
        }
    }

    let mut writer = BitWriter::new(row, BitOrder::MsbFirst);
    for sample in samples {
        writer.write(order(sample), bits);
    }
    writer.flush();
}

/// Reverse horizontal differencing of one row in place.
pub fn undo_horizontal(row: &mut [u8], layout: RowLayout) {
    match layout.bits {
        8 => rev_hpredict::<u8>(row, layout),
        16 => rev_hpredict::<u16>(row, layout),
        32 => rev_hpredict::<u32>(row, layout),
        64 => rev_hpredict::<u64>(row, layout),
        _ => packed(row, layout, Direction::Undo),
    }
}

/// Apply horizontal differencing to one row in place.
pub fn apply_horizontal(row: &mut [u8], layout: RowLayout) {
    match layout.bits {
        8 => hpredict::<u8>(row, layout),
        16 => hpredict::<u16>(row, layout),
        32 => hpredict::<u32>(row, layout),
        64 => hpredict::<u64>(row, layout),
        _ => packed(row, layout, Direction::Apply),
    }
}

/// Whether a row of this shape can be predicted.
pub fn supports(bits: u16) -> bool {
    matches!(bits, 1..=32 | 64)
}
