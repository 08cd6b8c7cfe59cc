// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! New ASCII format support.
//!
//! Each member is a 110 byte header of the magic plus 13 8-digit hex fields,
//! followed by the NUL terminated filename and then the file data. Both the
//! filename and the data are padded with NULs to a 4 byte boundary. The
//! archive ends with a member named `TRAILER!!!`.

use {
    crate::{CpioResult, Error},
    chrono::{DateTime, TimeZone, Utc},
    std::{
        ffi::CStr,
        io::{ErrorKind, Read, Write},
    },
};

pub const MAGIC: &[u8] = b"070701";

/// Filename of the member marking the end of an archive.
pub const TRAILER_NAME: &str = "TRAILER!!!";

const HEADER_LEN: u64 = 110;

fn pad_len(len: u64) -> usize {
    ((4 - len % 4) % 4) as usize
}

fn u32_from_hex(data: &[u8]) -> CpioResult<u32> {
    let s = std::str::from_utf8(data).map_err(|_| Error::BadHeaderString)?;
    u32::from_str_radix(s, 16).map_err(|_| Error::BadHeaderHex(s.to_string()))
}

fn read_hex(reader: &mut impl Read) -> CpioResult<u32> {
    let mut buffer = [0u8; 8];
    reader.read_exact(&mut buffer)?;

    u32_from_hex(&buffer)
}

/// Parsed or to-be-written *New ASCII* header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NewcHeader {
    pub inode: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub mtime: u32,
    pub file_size: u32,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub checksum: u32,
    pub name: String,
}

impl NewcHeader {
    /// Construct a header for a file member.
    ///
    /// The inode is left at 0 so [NewcBuilder] can assign one.
    pub fn new(name: impl ToString, mode: u32, mtime: u32, file_size: u32) -> Self {
        Self {
            mode,
            nlink: 1,
            mtime,
            file_size,
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Construct a header from 64-bit quantities, rejecting values the format can't hold.
    pub fn try_new(name: impl ToString, mode: u32, mtime: u64, file_size: u64) -> CpioResult<Self> {
        let mtime = u32::try_from(mtime).map_err(|_| Error::ValueOverflow("mtime", mtime))?;
        let file_size =
            u32::try_from(file_size).map_err(|_| Error::ValueOverflow("file_size", file_size))?;

        Ok(Self::new(name, mode, mtime, file_size))
    }

    /// Modified time as a [DateTime].
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.mtime as i64, 0).single()
    }

    /// Parse a header from a reader positioned just after the magic.
    ///
    /// Filename padding is consumed.
    pub fn from_reader(reader: &mut impl Read) -> CpioResult<Self> {
        let inode = read_hex(reader)?;
        let mode = read_hex(reader)?;
        let uid = read_hex(reader)?;
        let gid = read_hex(reader)?;
        let nlink = read_hex(reader)?;
        let mtime = read_hex(reader)?;
        let file_size = read_hex(reader)?;
        let dev_major = read_hex(reader)?;
        let dev_minor = read_hex(reader)?;
        let rdev_major = read_hex(reader)?;
        let rdev_minor = read_hex(reader)?;
        let name_length = read_hex(reader)?;
        let checksum = read_hex(reader)?;

        let mut name_data = vec![0u8; name_length as usize];
        reader.read_exact(&mut name_data)?;

        let name = CStr::from_bytes_with_nul(&name_data)
            .map_err(|_| Error::FilenameDecode)?
            .to_string_lossy()
            .to_string();

        let mut pad = vec![0u8; pad_len(HEADER_LEN + name_length as u64)];
        reader.read_exact(&mut pad)?;

        Ok(Self {
            inode,
            mode,
            uid,
            gid,
            nlink,
            mtime,
            file_size,
            dev_major,
            dev_minor,
            rdev_major,
            rdev_minor,
            checksum,
            name,
        })
    }

    /// Write the header, filename and filename padding.
    ///
    /// Returns the number of bytes written.
    pub fn write(&self, writer: &mut impl Write) -> CpioResult<usize> {
        let name = self.name.as_bytes();
        let name_length = name.len() as u64 + 1;
        let name_length = u32::try_from(name_length)
            .map_err(|_| Error::ValueOverflow("name_length", name_length))?;

        let mut buf = Vec::with_capacity(HEADER_LEN as usize + name.len() + 4);
        buf.extend_from_slice(MAGIC);
        for value in [
            self.inode,
            self.mode,
            self.uid,
            self.gid,
            self.nlink,
            self.mtime,
            self.file_size,
            self.dev_major,
            self.dev_minor,
            self.rdev_major,
            self.rdev_minor,
            name_length,
            self.checksum,
        ] {
            write!(buf, "{:08x}", value)?;
        }
        buf.extend_from_slice(name);
        buf.push(0);
        buf.resize(buf.len() + pad_len(buf.len() as u64), 0);

        writer.write_all(&buf)?;

        Ok(buf.len())
    }
}

#[derive(Clone, Copy, Debug)]
struct EntryProgress {
    size: u64,
    written: u64,
}

/// Writes a *New ASCII* cpio archive.
///
/// A member is started with [Self::write_header]. Its content is then written
/// through the [Write] implementation. Exactly as many bytes as the header
/// declares must be written before the next member is started or the archive
/// is finished with [Self::finish].
pub struct NewcBuilder<W: Write> {
    writer: W,
    next_inode: u32,
    entry: Option<EntryProgress>,
}

impl<W: Write> NewcBuilder<W> {
    /// Construct a new instance writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_inode: 1,
            entry: None,
        }
    }

    /// Begin a new member.
    ///
    /// Headers with inode 0 are assigned the next sequential inode.
    pub fn write_header(&mut self, header: &NewcHeader) -> CpioResult<()> {
        self.finish_entry()?;

        if header.inode == 0 {
            let mut header = header.clone();
            header.inode = self.next_inode;
            self.next_inode += 1;
            header.write(&mut self.writer)?;
        } else {
            header.write(&mut self.writer)?;
        }

        self.entry = Some(EntryProgress {
            size: header.file_size as u64,
            written: 0,
        });

        Ok(())
    }

    /// Write a complete member whose content comes from a reader.
    ///
    /// At most `header.file_size` bytes are consumed from `reader`. Returns the
    /// number of content bytes written.
    pub fn append_from_reader(
        &mut self,
        header: &NewcHeader,
        reader: &mut impl Read,
    ) -> CpioResult<u64> {
        self.write_header(header)?;

        let copied = std::io::copy(&mut reader.by_ref().take(header.file_size as u64), self)?;
        self.finish_entry()?;

        Ok(copied)
    }

    /// Write the trailer member and return the inner writer.
    pub fn finish(mut self) -> CpioResult<W> {
        self.finish_entry()?;

        NewcHeader::new(TRAILER_NAME, 0, 0, 0).write(&mut self.writer)?;
        self.writer.flush()?;

        Ok(self.writer)
    }

    fn finish_entry(&mut self) -> CpioResult<()> {
        if let Some(entry) = self.entry.take() {
            if entry.written != entry.size {
                return Err(Error::SizeMismatch {
                    expected: entry.size,
                    actual: entry.written,
                });
            }

            let pad = [0u8; 4];
            self.writer.write_all(&pad[0..pad_len(entry.size)])?;
        }

        Ok(())
    }
}

impl<W: Write> Write for NewcBuilder<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let entry = self.entry.as_mut().ok_or_else(|| {
            std::io::Error::new(ErrorKind::Other, "no current archive entry to write to")
        })?;

        if entry.written + buf.len() as u64 > entry.size {
            return Err(std::io::Error::new(
                ErrorKind::Other,
                "write exceeds size declared by entry header",
            ));
        }

        let count = self.writer.write(buf)?;
        entry.written += count as u64;

        Ok(count)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// A cpio archive reader for *New ASCII format* archives.
pub struct NewcReader<R: Read> {
    reader: R,
    entry_size: Option<u64>,
    seen_trailer: bool,
}

impl<R: Read> NewcReader<R> {
    /// Construct a new instance from a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            entry_size: None,
            seen_trailer: false,
        }
    }

    /// Read the next header from the archive.
    ///
    /// `None` at end of archive. The trailer member is not emitted. Data of
    /// the previous member that wasn't read is skipped.
    pub fn read_next(&mut self) -> CpioResult<Option<NewcHeader>> {
        if self.entry_size.is_some() {
            self.read_data_to(&mut std::io::sink())?;
        }

        if self.seen_trailer {
            return Ok(None);
        }

        let mut magic = [0u8; 6];

        match self.reader.read_exact(&mut magic) {
            Ok(_) => {}
            Err(ref e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(e) => {
                return Err(e.into());
            }
        }

        if magic != MAGIC {
            return Err(Error::BadMagic);
        }

        let header = NewcHeader::from_reader(&mut self.reader)?;

        if header.name == TRAILER_NAME {
            self.seen_trailer = true;
            Ok(None)
        } else {
            self.entry_size = Some(header.file_size as u64);
            Ok(Some(header))
        }
    }

    /// Copy the content of the current member to a writer.
    pub fn read_data_to(&mut self, writer: &mut impl Write) -> CpioResult<u64> {
        let size = self.entry_size.take().ok_or(Error::NoCurrentEntry)?;

        let copied = std::io::copy(&mut self.reader.by_ref().take(size), writer)?;
        if copied != size {
            return Err(Error::SizeMismatch {
                expected: size,
                actual: copied,
            });
        }

        let mut pad = [0u8; 4];
        self.reader.read_exact(&mut pad[0..pad_len(size)])?;

        Ok(copied)
    }

    /// Read the content of the current member.
    pub fn read_data(&mut self) -> CpioResult<Vec<u8>> {
        let mut data = vec![];
        self.read_data_to(&mut data)?;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Cursor};

    #[test]
    fn header_layout() -> CpioResult<()> {
        let mut header = NewcHeader::new("a", 0o100644, 0x5f5e1000, 3);
        header.inode = 1;

        let mut buf = vec![];
        let written = header.write(&mut buf)?;
        assert_eq!(written, 112);
        assert_eq!(buf.len(), 112);
        assert_eq!(&buf[0..6], b"070701");
        assert_eq!(&buf[6..14], b"00000001");
        assert_eq!(&buf[14..22], b"000081a4");
        assert_eq!(&buf[46..54], b"5f5e1000");
        assert_eq!(&buf[54..62], b"00000003");
        assert_eq!(&buf[94..102], b"00000002");
        assert_eq!(&buf[110..112], b"a\0");

        Ok(())
    }

    #[test]
    fn write_and_read() -> CpioResult<()> {
        let mut builder = NewcBuilder::new(vec![]);
        builder.append_from_reader(
            &NewcHeader::new("./usr/bin/tool", 0o100755, 1000, 5),
            &mut Cursor::new(b"hello"),
        )?;
        builder.write_header(&NewcHeader::new("./etc/tool.conf", 0o100644, 2000, 8))?;
        builder.write_all(b"key=")?;
        builder.write_all(b"val\n")?;
        let data = builder.finish()?;
        assert_eq!(data.len() % 4, 0);

        let mut reader = NewcReader::new(Cursor::new(data));

        let header = reader.read_next()?.expect("entry");
        assert_eq!(header.name, "./usr/bin/tool");
        assert_eq!(header.inode, 1);
        assert_eq!(header.mode, 0o100755);
        assert_eq!(header.mtime, 1000);
        assert_eq!(reader.read_data()?, b"hello");

        let header = reader.read_next()?.expect("entry");
        assert_eq!(header.name, "./etc/tool.conf");
        assert_eq!(header.inode, 2);
        assert_eq!(reader.read_data()?, b"key=val\n");

        assert!(reader.read_next()?.is_none());
        assert!(reader.read_next()?.is_none());

        Ok(())
    }

    #[test]
    fn append_consumes_declared_size_only() -> CpioResult<()> {
        let mut source = Cursor::new(b"abcdef".to_vec());

        let mut builder = NewcBuilder::new(vec![]);
        let copied = builder.append_from_reader(&NewcHeader::new("f", 0o644, 0, 4), &mut source)?;
        assert_eq!(copied, 4);
        assert_eq!(source.position(), 4);

        Ok(())
    }

    #[test]
    fn size_enforced() -> CpioResult<()> {
        let mut builder = NewcBuilder::new(vec![]);
        builder.write_header(&NewcHeader::new("f", 0o644, 0, 4))?;
        assert!(builder.write_all(b"abcde").is_err());
        builder.write_all(b"ab")?;
        assert!(matches!(
            builder.finish(),
            Err(Error::SizeMismatch {
                expected: 4,
                actual: 2
            })
        ));

        let mut builder = NewcBuilder::new(vec![]);
        assert!(builder.write_all(b"a").is_err());

        let mut builder = NewcBuilder::new(vec![]);
        assert!(matches!(
            builder.append_from_reader(&NewcHeader::new("f", 0o644, 0, 4), &mut Cursor::new(b"ab")),
            Err(Error::SizeMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn overflow_rejected() {
        assert!(matches!(
            NewcHeader::try_new("f", 0, 0, u32::MAX as u64 + 1),
            Err(Error::ValueOverflow("file_size", _))
        ));
    }

    #[test]
    fn empty_archive_is_trailer_only() -> CpioResult<()> {
        let data = NewcBuilder::new(vec![]).finish()?;
        assert_eq!(data.len(), 124);

        let mut reader = NewcReader::new(Cursor::new(data));
        assert!(reader.read_next()?.is_none());
        assert!(matches!(reader.read_data(), Err(Error::NoCurrentEntry)));

        Ok(())
    }
}
