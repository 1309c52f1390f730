use std::collections::BTreeMap;
use std::io::{Seek, Write};

use crate::encoder::{TiffValue, TiffWriter};
use crate::error::{TiffResult, UsageError};
use crate::field::OperationContext;
use crate::tags::{Tag, Type};

#[derive(Clone, Debug)]
struct BufferedEntry {
    type_: Type,
    count: u64,
    /// Value bytes in file byte order.
    data: Vec<u8>,
}

/// Where a flushed directory landed in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrittenDirectory {
    /// Offset of the entry count field.
    pub offset: u64,
    /// Position of the next-directory pointer that follows the entries.
    pub next_pointer: u64,
}

/// Low level interface to encode ifd directories.
///
/// Tags are collected in memory and emitted sorted by [`DirectoryWriter::flush`]. A directory
/// can be flushed once; its next pointer is written as zero and patched by
/// [`DirectoryWriter::link`] when another directory follows.
#[derive(Debug)]
pub struct DirectoryWriter {
    op: OperationContext,
    ifd: BTreeMap<u16, BufferedEntry>,
    written: Option<WrittenDirectory>,
}

impl DirectoryWriter {
    pub fn new(op: OperationContext) -> Self {
        DirectoryWriter {
            op,
            ifd: BTreeMap::new(),
            written: None,
        }
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.ifd.contains_key(&tag.to_u16())
    }

    pub fn len(&self) -> usize {
        self.ifd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ifd.is_empty()
    }

    /// Write a single ifd tag.
    ///
    /// A tag can appear only once in a directory.
    pub fn write_tag<V: TiffValue + ?Sized>(&mut self, tag: Tag, value: &V) -> TiffResult<()> {
        if self.written.is_some() {
            return Err(UsageError::DirectoryAlreadyWritten.into());
        }
        if self.contains(tag) {
            return Err(UsageError::DuplicateTag(tag.to_u16()).into());
        }

        let data = self
            .op
            .codec()
            .encode(V::FIELD_TYPE, value.data().into_owned());
        self.ifd.insert(
            tag.to_u16(),
            BufferedEntry {
                type_: V::FIELD_TYPE,
                count: value.count() as u64,
                data,
            },
        );
        Ok(())
    }

    /// Emit out-of-line values, then the sorted entry table and a zero next pointer.
    pub fn flush<W: Write + Seek>(
        &mut self,
        writer: &mut TiffWriter<W>,
    ) -> TiffResult<WrittenDirectory> {
        if self.written.is_some() {
            return Err(UsageError::DirectoryAlreadyWritten.into());
        }
        let width = self.op.offset_width();

        // Values that do not fit in an entry are written first and replaced by their offset.
        let mut fields = Vec::with_capacity(self.ifd.len());
        for entry in self.ifd.values() {
            let mut field = vec![0u8; width];
            if entry.data.len() > width {
                writer.pad_word_boundary()?;
                let offset = writer.offset();
                writer.write_bytes(&entry.data)?;
                let codec = self.op.codec();
                let raw = if self.op.bigtiff {
                    codec.encode(Type::LONG8, offset.to_ne_bytes().to_vec())
                } else {
                    codec.encode(Type::LONG, u32::try_from(offset)?.to_ne_bytes().to_vec())
                };
                field.copy_from_slice(&raw);
            } else {
                field[..entry.data.len()].copy_from_slice(&entry.data);
            }
            fields.push(field);
        }

        writer.pad_word_boundary()?;
        let offset = writer.offset();
        if self.op.bigtiff {
            writer.write_u64(self.ifd.len() as u64)?;
        } else {
            writer.write_u16(u16::try_from(self.ifd.len())?)?;
        }
        for ((tag, entry), field) in self.ifd.iter().zip(&fields) {
            writer.write_u16(*tag)?;
            writer.write_u16(entry.type_.to_u16())?;
            if self.op.bigtiff {
                writer.write_u64(entry.count)?;
            } else {
                writer.write_u32(u32::try_from(entry.count)?)?;
            }
            writer.write_bytes(field)?;
        }
        let next_pointer = writer.offset();
        writer.write_offset(0)?;

        log::debug!(
            "wrote directory at {} with {} entries",
            offset,
            self.ifd.len()
        );
        let written = WrittenDirectory {
            offset,
            next_pointer,
        };
        self.written = Some(written);
        Ok(written)
    }

    /// Point the next pointer of `previous` at `next`.
    pub fn link<W: Write + Seek>(
        writer: &mut TiffWriter<W>,
        previous: &WrittenDirectory,
        next: &WrittenDirectory,
    ) -> TiffResult<()> {
        writer.patch_offset(previous.next_pointer, next.offset)
    }
}
