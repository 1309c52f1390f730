//! Parsing of image file directories.

use std::io::{Read, Seek};
use std::num::NonZeroU64;

use super::stream::{EndianReader, SmartReader};
use super::Limits;
use crate::directory::{Directory, Entry};
use crate::field::OperationContext;
use crate::tags::{ByteOrder, Tag, Type};
use crate::{TiffError, TiffFormatError, TiffResult};

/// Parse the file header, returning the file layout and the offset of the first directory.
pub(crate) fn read_header<R: Read + Seek>(
    reader: &mut SmartReader<R>,
) -> TiffResult<(OperationContext, u64)> {
    let mut signature = [0u8; 2];
    reader.read_exact(&mut signature)?;
    let byte_order = match &signature {
        b"II" => ByteOrder::LittleEndian,
        b"MM" => ByteOrder::BigEndian,
        _ => {
            return Err(TiffError::FormatError(
                TiffFormatError::TiffSignatureNotFound,
            ))
        }
    };
    reader.byte_order = byte_order;

    let op = match reader.read_u16()? {
        42 => OperationContext::new(byte_order, false),
        43 => {
            // Byte size of offsets, always 8, followed by a reserved zero.
            if reader.read_u16()? != 8 || reader.read_u16()? != 0 {
                return Err(TiffError::FormatError(TiffFormatError::BigTiffHeaderInvalid));
            }
            OperationContext::new(byte_order, true)
        }
        _ => {
            return Err(TiffError::FormatError(
                TiffFormatError::TiffSignatureInvalid,
            ))
        }
    };

    let first = read_offset(reader, &op)?;
    log::debug!(
        "tiff header: {:?}, bigtiff: {}, first directory at {}",
        byte_order,
        op.bigtiff,
        first
    );
    Ok((op, first))
}

fn read_offset<R: Read>(reader: &mut SmartReader<R>, op: &OperationContext) -> TiffResult<u64> {
    Ok(if op.bigtiff {
        reader.read_u64()?
    } else {
        u64::from(reader.read_u32()?)
    })
}

/// Read the directory at `offset`. Entry values stay in the file until queried.
pub(crate) fn read_directory<R: Read + Seek>(
    reader: &mut SmartReader<R>,
    op: &OperationContext,
    limits: &Limits,
    offset: u64,
) -> TiffResult<Directory> {
    if offset == 0 {
        return Err(TiffError::FormatError(
            TiffFormatError::ImageFileDirectoryNotFound,
        ));
    }
    reader.goto_offset(offset)?;

    let count = if op.bigtiff {
        reader.read_u64()?
    } else {
        u64::from(reader.read_u16()?)
    };

    let table_len = count
        .checked_mul(op.entry_size() as u64)
        .filter(|&len| len <= limits.ifd_value_size as u64)
        .ok_or(TiffError::LimitsExceeded)?;
    let mut table = vec![0u8; usize::try_from(table_len)?];
    reader.read_exact(&mut table)?;

    let codec = op.codec();
    let mut directory = Directory::empty(offset);
    for raw in table.chunks_exact(op.entry_size()) {
        let tag = codec.read_u16s(&raw[0..2])[0];
        let type_ = codec.read_u16s(&raw[2..4])[0];
        let (count, field) = if op.bigtiff {
            (codec.read_u64s(&raw[4..12])[0], &raw[12..20])
        } else {
            (u64::from(codec.read_u32s(&raw[4..8])[0]), &raw[8..12])
        };

        let Some(type_) = Type::from_u16(type_) else {
            log::debug!("skipping tag {} with unknown type {}", tag, type_);
            continue;
        };

        let mut value = [0u8; 8];
        value[..field.len()].copy_from_slice(field);
        directory.insert(Tag::from_u16_exhaustive(tag), Entry::new(type_, count, value));
    }

    directory.next_ifd = NonZeroU64::new(read_offset(reader, op)?);
    log::debug!(
        "read directory at {} with {} entries, next {:?}",
        offset,
        directory.len(),
        directory.next_ifd
    );
    Ok(directory)
}
