use core::fmt;
use std::{collections::BTreeMap, num::NonZeroU64};

use crate::field::OperationContext;
use crate::tags::{Tag, Type};

/// An Image File Directory (IFD) as parsed from a file.
///
/// Entries only describe where their values live. Values are decoded on demand through a
/// [`TagReader`](crate::decoder::TagReader).
#[doc(alias = "IFD")]
pub struct Directory {
    pub(crate) offset: u64,
    pub(crate) entries: BTreeMap<u16, Entry>,
    pub(crate) next_ifd: Option<NonZeroU64>,
}

/// One directory entry: type, element count and the raw value or offset field.
///
/// The value field holds bytes exactly as stored in the file, in file byte order. Classic files
/// only use the first four bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    type_: Type,
    count: u64,
    field: [u8; 8],
}

impl Entry {
    pub fn new(type_: Type, count: u64, field: [u8; 8]) -> Self {
        Entry {
            type_,
            count,
            field,
        }
    }

    pub fn field_type(&self) -> Type {
        self.type_
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Size of the value in bytes, if it is addressable on this platform.
    pub fn value_len(&self) -> Option<u64> {
        self.type_.value_bytes(self.count).ok()
    }

    /// Whether the value is stored inside the entry itself.
    pub fn is_inline(&self, ctx: &OperationContext) -> bool {
        self.value_len()
            .is_some_and(|len| len <= ctx.offset_width() as u64)
    }

    /// The raw value bytes of an inline entry.
    pub fn inline_bytes(&self, ctx: &OperationContext) -> &[u8] {
        &self.field[..ctx.offset_width()]
    }

    /// The stream offset of an out-of-line value.
    pub fn value_offset(&self, ctx: &OperationContext) -> u64 {
        let codec = ctx.codec();
        if ctx.bigtiff {
            codec.read_u64s(&self.field)[0]
        } else {
            u64::from(codec.read_u32s(&self.field[..4])[0])
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("type", &self.type_)
            .field("count", &self.count)
            .field("field", &self.field)
            .finish()
    }
}

impl Directory {
    /// Create a directory located at `offset` without entries.
    pub fn empty(offset: u64) -> Self {
        Directory {
            offset,
            entries: BTreeMap::new(),
            next_ifd: None,
        }
    }

    /// The stream offset this directory was read from.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Retrieve the entry associated with a tag.
    pub fn get(&self, tag: Tag) -> Option<&Entry> {
        self.entries.get(&tag.to_u16())
    }

    /// Check if the directory contains a specified tag.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag.to_u16())
    }

    /// Iterate over all known and unknown tags in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &Entry)> + '_ {
        self.entries
            .iter()
            .map(|(k, v)| (Tag::from_u16_exhaustive(*k), v))
    }

    /// Insert an entry, replacing an existing one with the same tag.
    pub fn insert(&mut self, tag: Tag, entry: Entry) {
        self.entries.insert(tag.to_u16(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset of the next directory in the chain, if any.
    pub fn next(&self) -> Option<u64> {
        self.next_ifd.map(NonZeroU64::get)
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory")
            .field("offset", &self.offset)
            .field(
                "entries",
                &self.entries.iter().map(|(k, v)| (Tag::from_u16(*k), v)),
            )
            .field("next_ifd", &self.next_ifd)
            .finish()
    }
}
