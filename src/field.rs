//! Typed decoding of raw field values.

use crate::tags::{ByteOrder, Type};
use crate::{TiffError, TiffFormatError, TiffResult};

/// Per-file layout facts that drive every width and byte order decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationContext {
    pub byte_order: ByteOrder,
    pub bigtiff: bool,
}

impl OperationContext {
    pub const fn new(byte_order: ByteOrder, bigtiff: bool) -> Self {
        OperationContext {
            byte_order,
            bigtiff,
        }
    }

    /// Width of offsets and of the inline value field of an entry.
    pub const fn offset_width(&self) -> usize {
        if self.bigtiff {
            8
        } else {
            4
        }
    }

    /// Size of a serialized directory entry.
    pub const fn entry_size(&self) -> usize {
        4 + self.offset_width() * 2
    }

    pub fn codec(&self) -> FieldCodec {
        FieldCodec::new(self.byte_order)
    }
}

/// Decodes field bytes stored in a file byte order into host values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldCodec {
    file: ByteOrder,
    host: ByteOrder,
}

macro_rules! read_fn {
    ($name:ident, $copy:ident, $ty:ty, $n:expr) => {
        /// Decode every element, reversing bytes when file and host order differ.
        pub fn $name(&self, bytes: &[u8]) -> Vec<$ty> {
            let mut values = vec![<$ty>::default(); bytes.len() / $n];
            self.$copy(bytes, &mut values, None::<fn($ty) -> $ty>);
            values
        }

        /// Decode into `dest`, optionally passing each element through `convert`.
        ///
        /// Without a conversion this is a straight reinterpretation of each chunk; with one each
        /// element is decoded, converted and stored individually.
        pub fn $copy<T, F>(&self, bytes: &[u8], dest: &mut [T], convert: Option<F>)
        where
            F: Fn($ty) -> T,
            T: From<$ty>,
        {
            let chunks = bytes.chunks_exact($n);
            let swap = self.needs_swap();
            match convert {
                None => {
                    for (slot, chunk) in dest.iter_mut().zip(chunks) {
                        let mut raw = [0u8; $n];
                        raw.copy_from_slice(chunk);
                        let value = <$ty>::from_ne_bytes(raw);
                        *slot = T::from(if swap { Self::swapped(value) } else { value });
                    }
                }
                Some(convert) => {
                    for (slot, chunk) in dest.iter_mut().zip(chunks) {
                        let mut raw = [0u8; $n];
                        raw.copy_from_slice(chunk);
                        if swap {
                            raw.reverse();
                        }
                        *slot = convert(<$ty>::from_ne_bytes(raw));
                    }
                }
            }
        }
    };
}

impl FieldCodec {
    /// A codec for values stored in `file` order, decoded on the running host.
    pub const fn new(file: ByteOrder) -> Self {
        FieldCodec::with_host(file, ByteOrder::native())
    }

    /// A codec with an explicit host byte order.
    ///
    /// The host order must describe the machine the values are used on.
    pub const fn with_host(file: ByteOrder, host: ByteOrder) -> Self {
        FieldCodec { file, host }
    }

    pub const fn byte_order(&self) -> ByteOrder {
        self.file
    }

    pub fn needs_swap(&self) -> bool {
        self.file != self.host
    }

    #[inline(always)]
    fn swapped<V: SwapBytes>(value: V) -> V {
        value.swap()
    }

    read_fn!(read_u16s, copy_u16s, u16, 2);
    read_fn!(read_i16s, copy_i16s, i16, 2);
    read_fn!(read_u32s, copy_u32s, u32, 4);
    read_fn!(read_i32s, copy_i32s, i32, 4);
    read_fn!(read_u64s, copy_u64s, u64, 8);
    read_fn!(read_i64s, copy_i64s, i64, 8);

    pub fn read_f32s(&self, bytes: &[u8]) -> Vec<f32> {
        self.read_u32s(bytes).into_iter().map(f32::from_bits).collect()
    }

    pub fn read_f64s(&self, bytes: &[u8]) -> Vec<f64> {
        self.read_u64s(bytes).into_iter().map(f64::from_bits).collect()
    }

    /// Pairs of numerator and denominator.
    pub fn read_rationals(&self, bytes: &[u8]) -> Vec<(u32, u32)> {
        self.read_u32s(bytes)
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    pub fn read_srationals(&self, bytes: &[u8]) -> Vec<(i32, i32)> {
        self.read_i32s(bytes)
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    /// Decode an unsigned field of any integer width into `u64` values.
    pub fn read_unsigned(&self, ty: Type, bytes: &[u8]) -> TiffResult<Vec<u64>> {
        let mut out = vec![0u64; bytes.len() / usize::from(ty.byte_len())];
        match ty {
            Type::BYTE | Type::UNDEFINED => {
                out.iter_mut()
                    .zip(bytes)
                    .for_each(|(slot, b)| *slot = u64::from(*b));
            }
            Type::SHORT => self.copy_u16s(bytes, &mut out, Some(u64::from)),
            Type::LONG | Type::IFD => self.copy_u32s(bytes, &mut out, Some(u64::from)),
            Type::LONG8 | Type::IFD8 => self.copy_u64s(bytes, &mut out, None::<fn(u64) -> u64>),
            other => {
                return Err(TiffError::FormatError(
                    TiffFormatError::UnsignedIntegerExpected(other),
                ))
            }
        }
        Ok(out)
    }

    /// Encode host values of a fixed width into file byte order.
    pub fn encode(&self, ty: Type, mut native: Vec<u8>) -> Vec<u8> {
        self.host.convert(ty, &mut native, self.file);
        native
    }
}

trait SwapBytes {
    fn swap(self) -> Self;
}

macro_rules! swap_bytes {
    ($($ty:ty),*) => {
        $(impl SwapBytes for $ty {
            #[inline(always)]
            fn swap(self) -> Self {
                self.swap_bytes()
            }
        })*
    };
}

swap_bytes!(u16, i16, u32, i32, u64, i64);

/// Split an ASCII field into its NUL terminated strings.
///
/// Each NUL byte ends one string, so adjacent NULs yield empty strings. Bytes after the last NUL
/// form one more string.
pub fn parse_ascii_array(bytes: &[u8]) -> Vec<String> {
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .strip_suffix(&[0])
        .unwrap_or(bytes)
        .split(|&b| b == 0)
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// The first string of an ASCII field.
pub fn parse_ascii(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
