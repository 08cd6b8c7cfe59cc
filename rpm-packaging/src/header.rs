// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Tag-indexed header sections.

Both the signature header and the metadata header of an RPM share one layout:

| Bytes        | Content                                                  |
|--------------|----------------------------------------------------------|
| 4            | `(0x008eade8 << 8) \| version`, big endian               |
| 4            | reserved, zero                                           |
| 4            | number of index entries                                  |
| 4            | length of the data store                                 |
| 16 per entry | index entry: tag, type, offset into store, count         |
| variable     | data store                                               |

All integers are big endian. The signature header is additionally zero padded
to a multiple of 8 bytes so the metadata header following it is aligned.
*/

use {
    crate::error::{Result, RpmError},
    log::debug,
    scroll::{ctx::TryFromCtx, IOwrite, Pread, Pwrite, SizeWith},
    std::io::{ErrorKind, Read, Write},
};

/// Magic value, stored in the upper 24 bits of the first word.
pub const HEADER_MAGIC: u32 = 0x008e_ade8;

/// Format version stored in the low byte of the first word.
pub const HEADER_VERSION: u8 = 1;

/// Size of the fixed fields preceding the index.
pub const PROLOGUE_SIZE: usize = 16;

/// Size of one index entry.
pub const INDEX_ENTRY_SIZE: usize = 16;

/// Alignment of the signature header.
pub const SIGNATURE_ALIGNMENT: usize = 8;

/// Number of zero bytes needed to pad `len` to [SIGNATURE_ALIGNMENT].
pub fn padding_len(len: usize) -> usize {
    (SIGNATURE_ALIGNMENT - len % SIGNATURE_ALIGNMENT) % SIGNATURE_ALIGNMENT
}

/// The type of data an index entry refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u32)]
pub enum EntryType {
    Null = 0,
    Char = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    String = 6,
    Binary = 7,
    StringArray = 8,
    I18nString = 9,
}

impl TryFrom<u32> for EntryType {
    type Error = RpmError;

    fn try_from(v: u32) -> Result<Self> {
        Ok(match v {
            0 => Self::Null,
            1 => Self::Char,
            2 => Self::Int8,
            3 => Self::Int16,
            4 => Self::Int32,
            5 => Self::Int64,
            6 => Self::String,
            7 => Self::Binary,
            8 => Self::StringArray,
            9 => Self::I18nString,
            _ => return Err(RpmError::UnknownEntryType(v)),
        })
    }
}

/// A fixed width integer value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Int {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
}

impl Int {
    fn entry_type(&self) -> EntryType {
        match self {
            Self::I8(_) => EntryType::Int8,
            Self::I16(_) => EntryType::Int16,
            Self::I32(_) => EntryType::Int32,
            Self::I64(_) => EntryType::Int64,
        }
    }

    fn write(&self, dest: &mut impl Write) -> std::io::Result<()> {
        match self {
            Self::I8(v) => dest.iowrite_with(*v, scroll::BE),
            Self::I16(v) => dest.iowrite_with(*v, scroll::BE),
            Self::I32(v) => dest.iowrite_with(*v, scroll::BE),
            Self::I64(v) => dest.iowrite_with(*v, scroll::BE),
        }
    }

    /// The value widened to 64 bits.
    pub fn value(&self) -> i64 {
        match self {
            Self::I8(v) => *v as i64,
            Self::I16(v) => *v as i64,
            Self::I32(v) => *v as i64,
            Self::I64(v) => *v,
        }
    }
}

/// A tagged value in a header section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Field {
    /// A single integer. Never skipped, even when zero.
    Int { tag: u32, value: Int },
    /// A NUL terminated string. Skipped when empty.
    String { tag: u32, value: String },
    /// Raw bytes. Skipped when empty.
    Binary { tag: u32, value: Vec<u8> },
}

impl Field {
    pub fn int32(tag: u32, value: i32) -> Self {
        Self::Int {
            tag,
            value: Int::I32(value),
        }
    }

    pub fn string(tag: u32, value: impl ToString) -> Self {
        Self::String {
            tag,
            value: value.to_string(),
        }
    }

    pub fn binary(tag: u32, value: Vec<u8>) -> Self {
        Self::Binary { tag, value }
    }

    pub fn tag(&self) -> u32 {
        match self {
            Self::Int { tag, .. } | Self::String { tag, .. } | Self::Binary { tag, .. } => *tag,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self {
            Self::Int { value, .. } => value.entry_type(),
            Self::String { .. } => EntryType::String,
            Self::Binary { .. } => EntryType::Binary,
        }
    }

    /// The index entry count: elements for scalars, bytes for binary.
    pub fn count(&self) -> usize {
        match self {
            Self::Int { .. } | Self::String { .. } => 1,
            Self::Binary { value, .. } => value.len(),
        }
    }

    /// Whether the field is left out of the encoded section entirely.
    pub fn skip(&self) -> bool {
        match self {
            Self::Int { .. } => false,
            Self::String { value, .. } => value.is_empty(),
            Self::Binary { value, .. } => value.is_empty(),
        }
    }

    /// Append the serialized value to a data store.
    pub fn write_data(&self, dest: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Int { value, .. } => value.write(dest)?,
            Self::String { value, .. } => {
                dest.extend_from_slice(value.as_bytes());
                dest.push(0);
            }
            Self::Binary { value, .. } => dest.extend_from_slice(value),
        }

        Ok(())
    }
}

/// The fixed fields preceding the index.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Pread, Pwrite, SizeWith)]
pub struct Prologue {
    /// [HEADER_MAGIC] in the upper 24 bits, version in the low byte.
    pub magic_version: u32,
    pub reserved: u32,
    pub entry_count: u32,
    pub store_len: u32,
}

impl Prologue {
    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < PROLOGUE_SIZE {
            return Err(RpmError::HeaderTruncated);
        }

        let prologue = data.pread_with::<Prologue>(0, scroll::BE)?;
        if prologue.magic_version >> 8 != HEADER_MAGIC {
            return Err(RpmError::BadHeaderMagic);
        }

        Ok(prologue)
    }
}

/// An index entry as stored.
#[derive(Clone, Copy, Debug, Pread, Pwrite, SizeWith)]
struct IndexRecord {
    tag: u32,
    entry_type: u32,
    offset: u32,
    count: u32,
}

/// An entry in the index of a header section.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexEntry {
    pub tag: u32,
    pub entry_type: EntryType,
    /// Offset of the value within the data store.
    pub offset: u32,
    pub count: u32,
}

impl From<&IndexEntry> for IndexRecord {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            tag: entry.tag,
            entry_type: entry.entry_type as u32,
            offset: entry.offset,
            count: entry.count,
        }
    }
}

impl IndexRecord {
    fn into_entry(self) -> Result<IndexEntry> {
        Ok(IndexEntry {
            tag: self.tag,
            entry_type: EntryType::try_from(self.entry_type)?,
            offset: self.offset,
            count: self.count,
        })
    }
}

/// Decode a single fixed width value.
fn scalar<'a, N>(entry: &IndexEntry, data: &'a [u8]) -> Result<N>
where
    N: TryFromCtx<'a, scroll::Endian, [u8], Error = scroll::Error>,
{
    if entry.count != 1 {
        return Err(RpmError::UnsupportedEntry {
            tag: entry.tag,
            entry_type: entry.entry_type as u32,
            count: entry.count,
        });
    }

    data.pread_with::<N>(0, scroll::BE)
        .map_err(|_| RpmError::HeaderEntryOutOfBounds(entry.tag))
}

fn to_u32(what: &'static str, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| RpmError::ValueOverflow(what, value as u64))
}

/// A decoded or to-be-encoded header section.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeaderSection {
    version: u8,
    entries: Vec<IndexEntry>,
    store: Vec<u8>,
}

impl HeaderSection {
    /// Build a section from fields, in order.
    ///
    /// Skipped fields leave no index entry and no data. Each retained entry's
    /// offset is the store length at the time its field was appended.
    pub fn from_fields(fields: &[Field]) -> Result<Self> {
        let mut entries = Vec::with_capacity(fields.len());
        let mut store = vec![];

        for field in fields {
            if field.skip() {
                debug!("skipping empty header field for tag {}", field.tag());
                continue;
            }

            entries.push(IndexEntry {
                tag: field.tag(),
                entry_type: field.entry_type(),
                offset: to_u32("data store offset", store.len())?,
                count: to_u32("entry count", field.count())?,
            });
            field.write_data(&mut store)?;
        }

        to_u32("data store length", store.len())?;
        to_u32("index length", entries.len())?;

        Ok(Self {
            version: HEADER_VERSION,
            entries,
            store,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The raw data store.
    pub fn store(&self) -> &[u8] {
        &self.store
    }

    /// Encoded length, without padding.
    pub fn len(&self) -> usize {
        PROLOGUE_SIZE + self.entries.len() * INDEX_ENTRY_SIZE + self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The prologue describing this section.
    pub fn prologue(&self) -> Result<Prologue> {
        Ok(Prologue {
            magic_version: (HEADER_MAGIC << 8) | self.version as u32,
            reserved: 0,
            entry_count: to_u32("index length", self.entries.len())?,
            store_len: to_u32("data store length", self.store.len())?,
        })
    }

    /// Serialize the section.
    ///
    /// When `pad` is set, zeros are appended until the length is a multiple of 8.
    pub fn to_bytes(&self, pad: bool) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.len()];
        let mut offset = 0;

        data.gwrite_with(self.prologue()?, &mut offset, scroll::BE)?;
        for entry in &self.entries {
            data.gwrite_with(IndexRecord::from(entry), &mut offset, scroll::BE)?;
        }
        data[offset..].copy_from_slice(&self.store);

        if pad {
            data.resize(data.len() + padding_len(data.len()), 0);
        }

        Ok(data)
    }

    /// Serialize the section to a writer, returning the bytes written.
    pub fn write(&self, writer: &mut impl Write, pad: bool) -> Result<usize> {
        let data = self.to_bytes(pad)?;
        writer.write_all(&data)?;

        Ok(data.len())
    }

    /// Parse a section from the start of `data`.
    ///
    /// Trailing bytes, such as alignment padding, are ignored.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let prologue = Prologue::parse(data)?;
        let version = (prologue.magic_version & 0xff) as u8;

        let entry_count = prologue.entry_count as usize;
        let store_len = prologue.store_len as usize;

        let index_end = entry_count
            .checked_mul(INDEX_ENTRY_SIZE)
            .and_then(|v| v.checked_add(PROLOGUE_SIZE))
            .ok_or(RpmError::HeaderTruncated)?;
        let store_end = index_end
            .checked_add(store_len)
            .ok_or(RpmError::HeaderTruncated)?;
        if data.len() < store_end {
            return Err(RpmError::HeaderTruncated);
        }

        let mut offset = PROLOGUE_SIZE;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let record = data.gread_with::<IndexRecord>(&mut offset, scroll::BE)?;
            let entry = record.into_entry()?;

            if entry.offset as usize > store_len {
                return Err(RpmError::HeaderEntryOutOfBounds(entry.tag));
            }

            entries.push(entry);
        }

        Ok(Self {
            version,
            entries,
            store: data[index_end..store_end].to_vec(),
        })
    }

    /// Read the raw bytes of one section from a reader.
    ///
    /// Exactly the section's bytes are consumed. Padding is not.
    pub fn read_bytes(reader: &mut impl Read) -> Result<Vec<u8>> {
        let mut data = vec![0u8; PROLOGUE_SIZE];
        match reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(RpmError::HeaderTruncated);
            }
            Err(e) => {
                return Err(e.into());
            }
        }

        let prologue = Prologue::parse(&data)?;

        let remaining = prologue.entry_count as u64 * INDEX_ENTRY_SIZE as u64
            + prologue.store_len as u64;
        let read = reader.by_ref().take(remaining).read_to_end(&mut data)? as u64;
        if read != remaining {
            return Err(RpmError::HeaderTruncated);
        }

        Ok(data)
    }

    /// Read a section from a reader.
    ///
    /// Exactly the section's bytes are consumed. Padding is not.
    pub fn from_reader(reader: &mut impl Read) -> Result<Self> {
        Self::parse(&Self::read_bytes(reader)?)
    }

    /// Read a section followed by its alignment padding.
    pub fn from_reader_padded(reader: &mut impl Read) -> Result<Self> {
        let section = Self::from_reader(reader)?;

        let mut pad = [0u8; SIGNATURE_ALIGNMENT];
        match reader.read_exact(&mut pad[0..padding_len(section.len())]) {
            Ok(()) => Ok(section),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(RpmError::HeaderTruncated),
            Err(e) => Err(e.into()),
        }
    }

    fn decode_entry(&self, entry: &IndexEntry) -> Result<Field> {
        let out_of_bounds = || RpmError::HeaderEntryOutOfBounds(entry.tag);
        let data = self
            .store
            .get(entry.offset as usize..)
            .ok_or_else(out_of_bounds)?;

        let value = match entry.entry_type {
            EntryType::Int8 => Int::I8(scalar(entry, data)?),
            EntryType::Int16 => Int::I16(scalar(entry, data)?),
            EntryType::Int32 => Int::I32(scalar(entry, data)?),
            EntryType::Int64 => Int::I64(scalar(entry, data)?),
            EntryType::String => {
                let end = data
                    .iter()
                    .position(|b| *b == 0)
                    .ok_or(RpmError::StringNotTerminated(entry.tag))?;
                let value = std::str::from_utf8(&data[0..end])
                    .map_err(|_| RpmError::Utf8(entry.tag))?;

                return Ok(Field::string(entry.tag, value));
            }
            EntryType::Binary => {
                let value = data
                    .get(0..entry.count as usize)
                    .ok_or_else(out_of_bounds)?;

                return Ok(Field::binary(entry.tag, value.to_vec()));
            }
            _ => {
                return Err(RpmError::UnsupportedEntry {
                    tag: entry.tag,
                    entry_type: entry.entry_type as u32,
                    count: entry.count,
                });
            }
        };

        Ok(Field::Int {
            tag: entry.tag,
            value,
        })
    }

    /// Decode every entry back into a [Field].
    pub fn fields(&self) -> Result<Vec<Field>> {
        self.entries
            .iter()
            .map(|entry| self.decode_entry(entry))
            .collect()
    }

    /// Decode the first entry having `tag`.
    pub fn field(&self, tag: u32) -> Result<Option<Field>> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| self.decode_entry(entry))
            .transpose()
    }

    /// Resolve a string value by tag.
    pub fn string(&self, tag: u32) -> Result<Option<String>> {
        Ok(match self.field(tag)? {
            Some(Field::String { value, .. }) => Some(value),
            _ => None,
        })
    }

    /// Resolve an integer value by tag.
    pub fn int(&self, tag: u32) -> Result<Option<i64>> {
        Ok(match self.field(tag)? {
            Some(Field::Int { value, .. }) => Some(value.value()),
            _ => None,
        })
    }

    /// Resolve a binary value by tag.
    pub fn binary(&self, tag: u32) -> Result<Option<Vec<u8>>> {
        Ok(match self.field(tag)? {
            Some(Field::Binary { value, .. }) => Some(value),
            _ => None,
        })
    }
}

/// Encode fields into a header section.
pub fn encode_fields(fields: &[Field], pad: bool) -> Result<Vec<u8>> {
    HeaderSection::from_fields(fields)?.to_bytes(pad)
}
