use std::borrow::Cow;
use std::mem::size_of;
use std::slice::from_ref;

use crate::tags::Type;

/// Trait for types that can be encoded in a tiff file
///
/// Values are produced in host byte order; the directory writer converts them to the byte order
/// of the file.
pub trait TiffValue {
    const BYTE_LEN: u8;
    const FIELD_TYPE: Type;
    fn count(&self) -> usize;
    fn bytes(&self) -> usize {
        self.count() * usize::from(Self::BYTE_LEN)
    }

    /// The value as host order bytes.
    fn data(&self) -> Cow<'_, [u8]>;
}

/// A numerator and denominator pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    pub n: u32,
    pub d: u32,
}

/// A signed numerator and denominator pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SRational {
    pub n: i32,
    pub d: i32,
}

// Each element type is listed with its field type and how one element turns into bytes.
macro_rules! tiff_values {
    ($($ty:ty => $field:expr, |$v:ident| $bytes:expr;)*) => {$(
        impl TiffValue for [$ty] {
            const BYTE_LEN: u8 = size_of::<$ty>() as u8;
            const FIELD_TYPE: Type = $field;

            fn count(&self) -> usize {
                self.len()
            }

            fn data(&self) -> Cow<'_, [u8]> {
                let mut out = Vec::with_capacity(self.bytes());
                for $v in self {
                    out.extend_from_slice(&$bytes);
                }
                Cow::Owned(out)
            }
        }

        impl TiffValue for $ty {
            const BYTE_LEN: u8 = size_of::<$ty>() as u8;
            const FIELD_TYPE: Type = $field;

            fn count(&self) -> usize {
                1
            }

            fn data(&self) -> Cow<'_, [u8]> {
                from_ref(self).data().into_owned().into()
            }
        }
    )*};
}

tiff_values! {
    u8 => Type::BYTE, |v| [*v];
    i8 => Type::SBYTE, |v| v.to_ne_bytes();
    u16 => Type::SHORT, |v| v.to_ne_bytes();
    i16 => Type::SSHORT, |v| v.to_ne_bytes();
    u32 => Type::LONG, |v| v.to_ne_bytes();
    i32 => Type::SLONG, |v| v.to_ne_bytes();
    u64 => Type::LONG8, |v| v.to_ne_bytes();
    i64 => Type::SLONG8, |v| v.to_ne_bytes();
    f32 => Type::FLOAT, |v| v.to_ne_bytes();
    f64 => Type::DOUBLE, |v| v.to_ne_bytes();
    Rational => Type::RATIONAL, |v| [v.n.to_ne_bytes(), v.d.to_ne_bytes()].concat();
    SRational => Type::SRATIONAL, |v| [v.n.to_ne_bytes(), v.d.to_ne_bytes()].concat();
}

impl TiffValue for str {
    const BYTE_LEN: u8 = 1;
    const FIELD_TYPE: Type = Type::ASCII;

    fn count(&self) -> usize {
        self.len() + 1
    }

    fn data(&self) -> Cow<'_, [u8]> {
        let mut bytes = Vec::with_capacity(self.count());
        bytes.extend_from_slice(self.as_bytes());
        bytes.push(0);
        Cow::Owned(bytes)
    }
}

impl<T: TiffValue + ?Sized> TiffValue for &'_ T {
    const BYTE_LEN: u8 = T::BYTE_LEN;
    const FIELD_TYPE: Type = T::FIELD_TYPE;

    fn count(&self) -> usize {
        (*self).count()
    }

    fn data(&self) -> Cow<'_, [u8]> {
        T::data(self)
    }
}
