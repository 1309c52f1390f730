use super::stream::RangeReader;
use super::Limits;
use crate::directory::{Directory, Entry};
use crate::field::{parse_ascii, parse_ascii_array, OperationContext};
use crate::tags::{Tag, Type};
use crate::{TiffError, TiffFormatError, TiffResult};

/// Typed access to the values of one directory.
///
/// Values are loaded through the field codec on every query, nothing is cached.
pub struct TagReader<'a> {
    pub(crate) reader: &'a mut dyn RangeReader,
    pub(crate) directory: &'a Directory,
    pub(crate) op: OperationContext,
    pub(crate) limits: &'a Limits,
}

impl<'a> TagReader<'a> {
    pub fn directory(&self) -> &Directory {
        self.directory
    }

    /// The raw bytes of a value in file byte order.
    pub fn raw(&mut self, tag: Tag) -> TiffResult<Option<(Entry, Vec<u8>)>> {
        let Some(entry) = self.directory.get(tag).copied() else {
            return Ok(None);
        };

        let len = entry.field_type().value_bytes(entry.count())?;
        if len > self.limits.ifd_value_size as u64 {
            return Err(TiffError::LimitsExceeded);
        }
        let len = usize::try_from(len)?;

        let bytes = if entry.is_inline(&self.op) {
            entry.inline_bytes(&self.op)[..len].to_vec()
        } else {
            let mut bytes = vec![0u8; len];
            self.reader
                .read_range(entry.value_offset(&self.op), &mut bytes)?;
            bytes
        };
        Ok(Some((entry, bytes)))
    }

    /// Unsigned integer values of any width.
    pub fn find_u64s(&mut self, tag: Tag) -> TiffResult<Option<Vec<u64>>> {
        let Some((entry, bytes)) = self.raw(tag)? else {
            return Ok(None);
        };
        let codec = self.op.codec();
        match codec.read_unsigned(entry.field_type(), &bytes) {
            Ok(values) => Ok(Some(values)),
            Err(_) => Err(TiffError::FormatError(TiffFormatError::InvalidTypeForTag(
                tag,
                entry.field_type(),
            ))),
        }
    }

    pub fn find_u32s(&mut self, tag: Tag) -> TiffResult<Option<Vec<u32>>> {
        self.find_u64s(tag)?
            .map(|values| {
                values
                    .into_iter()
                    .map(|v| u32::try_from(v).map_err(TiffError::from))
                    .collect()
            })
            .transpose()
    }

    pub fn find_u16s(&mut self, tag: Tag) -> TiffResult<Option<Vec<u16>>> {
        self.find_u64s(tag)?
            .map(|values| {
                values
                    .into_iter()
                    .map(|v| u16::try_from(v).map_err(TiffError::from))
                    .collect()
            })
            .transpose()
    }

    /// A single unsigned value. Lists of more than one value are rejected.
    pub fn find_u32(&mut self, tag: Tag) -> TiffResult<Option<u32>> {
        match self.find_u32s(tag)? {
            None => Ok(None),
            Some(values) => match values[..] {
                [value] => Ok(Some(value)),
                _ => Err(TiffError::FormatError(TiffFormatError::InvalidTagCount(
                    tag,
                    values.len() as u64,
                ))),
            },
        }
    }

    pub fn find_u16(&mut self, tag: Tag) -> TiffResult<Option<u16>> {
        self.find_u32(tag)?
            .map(|v| u16::try_from(v).map_err(TiffError::from))
            .transpose()
    }

    pub fn require_u32(&mut self, tag: Tag) -> TiffResult<u32> {
        self.find_u32(tag)?
            .ok_or(TiffError::FormatError(TiffFormatError::RequiredTagNotFound(tag)))
    }

    pub fn require_u64s(&mut self, tag: Tag) -> TiffResult<Vec<u64>> {
        self.find_u64s(tag)?
            .ok_or(TiffError::FormatError(TiffFormatError::RequiredTagNotFound(tag)))
    }

    /// Rational values as quotients. Integer typed values are accepted as well.
    pub fn find_f64s(&mut self, tag: Tag) -> TiffResult<Option<Vec<f64>>> {
        let Some((entry, bytes)) = self.raw(tag)? else {
            return Ok(None);
        };
        let codec = self.op.codec();
        let values = match entry.field_type() {
            Type::RATIONAL => codec
                .read_rationals(&bytes)
                .into_iter()
                .map(|(n, d)| f64::from(n) / f64::from(d.max(1)))
                .collect(),
            Type::SRATIONAL => codec
                .read_srationals(&bytes)
                .into_iter()
                .map(|(n, d)| f64::from(n) / f64::from(if d == 0 { 1 } else { d }))
                .collect(),
            Type::FLOAT => codec.read_f32s(&bytes).into_iter().map(f64::from).collect(),
            Type::DOUBLE => codec.read_f64s(&bytes),
            other => codec
                .read_unsigned(other, &bytes)
                .map_err(|_| {
                    TiffError::FormatError(TiffFormatError::InvalidTypeForTag(tag, other))
                })?
                .into_iter()
                .map(|v| v as f64)
                .collect(),
        };
        Ok(Some(values))
    }

    /// The first string of an ASCII value.
    pub fn find_ascii(&mut self, tag: Tag) -> TiffResult<Option<String>> {
        Ok(self.find_ascii_bytes(tag)?.map(|bytes| parse_ascii(&bytes)))
    }

    /// All strings of an ASCII value.
    pub fn find_ascii_array(&mut self, tag: Tag) -> TiffResult<Option<Vec<String>>> {
        Ok(self
            .find_ascii_bytes(tag)?
            .map(|bytes| parse_ascii_array(&bytes)))
    }

    fn find_ascii_bytes(&mut self, tag: Tag) -> TiffResult<Option<Vec<u8>>> {
        match self.raw(tag)? {
            None => Ok(None),
            Some((entry, bytes)) => match entry.field_type() {
                Type::ASCII | Type::BYTE | Type::UNDEFINED => Ok(Some(bytes)),
                other => Err(TiffError::FormatError(TiffFormatError::InvalidTypeForTag(
                    tag, other,
                ))),
            },
        }
    }

    /// Undecoded bytes of a `BYTE` or `UNDEFINED` value.
    pub fn find_bytes(&mut self, tag: Tag) -> TiffResult<Option<Vec<u8>>> {
        match self.raw(tag)? {
            None => Ok(None),
            Some((entry, bytes)) => match entry.field_type() {
                Type::BYTE | Type::UNDEFINED | Type::SBYTE => Ok(Some(bytes)),
                other => Err(TiffError::FormatError(TiffFormatError::ByteExpected(other))),
            },
        }
    }
}
