//! Bit granular access to packed sample data.
//!
//! Samples are stored most significant bit first inside each value. The bit order only selects in
//! which direction the bits of a single byte are traversed, consecutive bytes are always consumed
//! in increasing address order.

use crate::tags::FillOrder;

/// Order in which the bits of a byte are visited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

impl From<FillOrder> for BitOrder {
    fn from(order: FillOrder) -> Self {
        match order {
            FillOrder::MsbFirst => BitOrder::MsbFirst,
            FillOrder::LsbFirst => BitOrder::LsbFirst,
        }
    }
}

impl BitOrder {
    #[inline(always)]
    fn normalize(self, byte: u8) -> u8 {
        match self {
            BitOrder::MsbFirst => byte,
            BitOrder::LsbFirst => byte.reverse_bits(),
        }
    }
}

/// A read cursor over a byte buffer with bit granularity.
///
/// # Panics
///
/// Reading past the end of the buffer is a caller error and panics. Size the buffer to exactly
/// the bits that will be consumed.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    buffer: &'a [u8],
    position: u64,
    order: BitOrder,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a [u8], order: BitOrder) -> Self {
        BitReader {
            buffer,
            position: 0,
            order,
        }
    }

    /// The cursor position in bits.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn remaining_bits(&self) -> u64 {
        self.buffer.len() as u64 * 8 - self.position
    }

    /// Advance the cursor without decoding.
    pub fn skip(&mut self, bits: u64) {
        assert!(bits <= self.remaining_bits(), "bit reader skipped past its buffer");
        self.position += bits;
    }

    /// Move the cursor to the next byte boundary.
    pub fn align(&mut self) {
        self.position = (self.position + 7) & !7;
        assert!(self.position <= self.buffer.len() as u64 * 8);
    }

    /// Read a value of `bit_count` bits, `1..=32`.
    pub fn read(&mut self, bit_count: u32) -> u32 {
        assert!((1..=32).contains(&bit_count), "invalid bit count {}", bit_count);
        assert!(
            u64::from(bit_count) <= self.remaining_bits(),
            "bit reader read past its buffer"
        );

        let mut value = 0u64;
        let mut remaining = bit_count;
        while remaining > 0 {
            let byte_index = (self.position >> 3) as usize;
            let bit_offset = (self.position & 7) as u32;
            let available = 8 - bit_offset;
            let take = available.min(remaining);

            let byte = self.order.normalize(self.buffer[byte_index]);
            let bits = (byte >> (available - take)) & ((1u16 << take) - 1) as u8;

            value = (value << take) | u64::from(bits);
            remaining -= take;
            self.position += u64::from(take);
        }

        value as u32
    }
}

/// A write cursor over a byte buffer with bit granularity.
///
/// Bits are accumulated into a partial byte; [`BitWriter::flush`] pads the last partial byte with
/// zero bits and stores it. Dropping the writer without flushing loses the partial byte.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buffer: &'a mut [u8],
    byte_position: usize,
    partial: u8,
    partial_bits: u32,
    order: BitOrder,
}

impl<'a> BitWriter<'a> {
    pub fn new(buffer: &'a mut [u8], order: BitOrder) -> Self {
        BitWriter {
            buffer,
            byte_position: 0,
            partial: 0,
            partial_bits: 0,
            order,
        }
    }

    /// The cursor position in bits, including bits not yet flushed.
    pub fn position(&self) -> u64 {
        self.byte_position as u64 * 8 + u64::from(self.partial_bits)
    }

    /// Append the low `bit_count` bits of `value`, `1..=32`.
    pub fn write(&mut self, value: u32, bit_count: u32) {
        assert!((1..=32).contains(&bit_count), "invalid bit count {}", bit_count);

        let mut remaining = bit_count;
        while remaining > 0 {
            let free = 8 - self.partial_bits;
            let take = free.min(remaining);
            let shift = remaining - take;
            let bits = ((u64::from(value) >> shift) & ((1u64 << take) - 1)) as u8;

            self.partial |= bits << (free - take);
            self.partial_bits += take;
            remaining -= take;

            if self.partial_bits == 8 {
                self.store();
            }
        }
    }

    /// Store the pending partial byte, padded with zero bits.
    pub fn flush(&mut self) {
        if self.partial_bits > 0 {
            self.store();
        }
    }

    fn store(&mut self) {
        assert!(
            self.byte_position < self.buffer.len(),
            "bit writer wrote past its buffer"
        );
        self.buffer[self.byte_position] = self.order.normalize(self.partial);
        self.byte_position += 1;
        self.partial = 0;
        self.partial_bits = 0;
    }
}

/// Expand an n-bit sample to `target` bits when `bit_count * 2 >= target`.
///
/// The sample is moved to the high bits and its own high bits fill the gap below.
#[inline]
pub fn fast_expand_bits(bits: u64, bit_count: u32, target: u32) -> u64 {
    debug_assert!(bit_count <= target && bit_count * 2 >= target);
    let remaining = target - bit_count;
    (bits << remaining) | (bits >> (bit_count - remaining))
}

/// Expand an n-bit sample to `target` bits by bit replication.
///
/// With `reverse_endianness` the sample, which must be a whole number of bytes wide, is byte
/// swapped first. Bit readers assemble values most significant byte first, so samples taken out
/// of a little endian file need this before their numeric value is meaningful.
pub fn expand_bits(bits: u64, bit_count: u32, target: u32, reverse_endianness: bool) -> u64 {
    debug_assert!((1..=64).contains(&bit_count) && target <= 64);

    let mut bits = bits;
    if reverse_endianness {
        debug_assert!(bit_count % 8 == 0);
        bits = (bits << (64 - bit_count)).swap_bytes();
    }

    if bit_count >= target {
        return bits >> (bit_count - target);
    }
    if bit_count * 2 >= target {
        return fast_expand_bits(bits, bit_count, target);
    }

    let mut current = bit_count;
    while current < target {
        bits = (bits << bit_count) | bits;
        current += bit_count;
    }

    if current > target {
        bits >>= bit_count;
        current -= bit_count;
        return fast_expand_bits(bits, current, target);
    }

    bits
}
