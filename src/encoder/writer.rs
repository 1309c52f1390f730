use std::io::{Seek, SeekFrom, Write};

use crate::field::OperationContext;
use crate::tags::ByteOrder;
use crate::TiffResult;

/// Byte-order aware output stream that keeps track of its own position.
#[derive(Debug)]
pub struct TiffWriter<W> {
    writer: W,
    op: OperationContext,
    offset: u64,
}

impl<W: Write + Seek> TiffWriter<W> {
    /// Wrap a stream positioned at its start.
    pub fn new(writer: W, op: OperationContext) -> Self {
        Self {
            writer,
            op,
            offset: 0,
        }
    }

    pub fn context(&self) -> OperationContext {
        self.op
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.op.byte_order
    }

    /// Current position in the stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> TiffResult<()> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u16(&mut self, n: u16) -> TiffResult<()> {
        match self.op.byte_order {
            ByteOrder::LittleEndian => self.write_bytes(&n.to_le_bytes()),
            ByteOrder::BigEndian => self.write_bytes(&n.to_be_bytes()),
        }
    }

    pub fn write_u32(&mut self, n: u32) -> TiffResult<()> {
        match self.op.byte_order {
            ByteOrder::LittleEndian => self.write_bytes(&n.to_le_bytes()),
            ByteOrder::BigEndian => self.write_bytes(&n.to_be_bytes()),
        }
    }

    pub fn write_u64(&mut self, n: u64) -> TiffResult<()> {
        match self.op.byte_order {
            ByteOrder::LittleEndian => self.write_bytes(&n.to_le_bytes()),
            ByteOrder::BigEndian => self.write_bytes(&n.to_be_bytes()),
        }
    }

    /// Write an offset with the width of the file kind.
    pub fn write_offset(&mut self, offset: u64) -> TiffResult<()> {
        if self.op.bigtiff {
            self.write_u64(offset)
        } else {
            self.write_u32(u32::try_from(offset)?)
        }
    }

    /// Write the file header with a zero first-directory pointer.
    ///
    /// Returns the position of that pointer.
    pub fn write_header(&mut self) -> TiffResult<u64> {
        self.write_bytes(&self.op.byte_order.signature())?;
        if self.op.bigtiff {
            self.write_u16(43)?;
            self.write_u16(8)?;
            self.write_u16(0)?;
        } else {
            self.write_u16(42)?;
        }
        let pointer = self.offset;
        self.write_offset(0)?;
        log::debug!(
            "tiff header: {:?}, bigtiff: {}",
            self.op.byte_order,
            self.op.bigtiff
        );
        Ok(pointer)
    }

    pub fn pad_word_boundary(&mut self) -> TiffResult<()> {
        if self.offset % 4 != 0 {
            let padding = [0, 0, 0];
            let padd_len = 4 - (self.offset % 4);
            self.write_bytes(&padding[..padd_len as usize])?;
        }
        Ok(())
    }

    pub fn goto_offset(&mut self, offset: u64) -> TiffResult<()> {
        self.writer.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Overwrite an offset field at `position` and return to the current end.
    pub fn patch_offset(&mut self, position: u64, value: u64) -> TiffResult<()> {
        let end = self.offset;
        self.goto_offset(position)?;
        self.write_offset(value)?;
        self.goto_offset(end)
    }

    pub fn flush(&mut self) -> TiffResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
