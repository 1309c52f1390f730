//! Byte order aware access to the input stream.

use std::io::{self, Read, Seek, SeekFrom};

use crate::tags::ByteOrder;

/// Reader of integers in the byte order of the file.
pub trait EndianReader: Read {
    fn byte_order(&self) -> ByteOrder;

    #[inline]
    fn read_u16(&mut self) -> io::Result<u16> {
        let raw = read_array(self)?;
        Ok(match self.byte_order() {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        })
    }

    #[inline]
    fn read_u32(&mut self) -> io::Result<u32> {
        let raw = read_array(self)?;
        Ok(match self.byte_order() {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        })
    }

    #[inline]
    fn read_u64(&mut self) -> io::Result<u64> {
        let raw = read_array(self)?;
        Ok(match self.byte_order() {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        })
    }
}

#[inline(always)]
fn read_array<const N: usize, R: Read + ?Sized>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut raw = [0u8; N];
    reader.read_exact(&mut raw)?;
    Ok(raw)
}

/// Random access to byte ranges of the underlying stream.
pub trait RangeReader {
    /// Fill `buf` with the bytes starting at `offset`.
    fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// The stream a decoder reads from, together with the byte order of its file.
#[derive(Debug)]
pub struct SmartReader<R> {
    reader: R,
    pub byte_order: ByteOrder,
}

impl<R> SmartReader<R> {
    pub fn wrap(reader: R, byte_order: ByteOrder) -> SmartReader<R> {
        SmartReader { reader, byte_order }
    }
}

impl<R: Read + Seek> SmartReader<R> {
    pub fn goto_offset(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }
}

impl<R: Read> EndianReader for SmartReader<R> {
    #[inline(always)]
    fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

impl<R: Read + Seek> RangeReader for SmartReader<R> {
    fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.goto_offset(offset)?;
        self.reader.read_exact(buf)
    }
}

impl<R: Read> Read for SmartReader<R> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl<R: Read + Seek> Seek for SmartReader<R> {
    #[inline]
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}
