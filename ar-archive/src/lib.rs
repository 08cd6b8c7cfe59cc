// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Unix `ar` archive reading and writing.

An `ar` archive is the 8 byte magic `!<arch>\n` followed by a sequence of
members. Each member is a 60 byte header of fixed-width, space padded ASCII
fields followed by the member data. Members holding an odd number of bytes
are followed by a single `\n` pad byte so the next header begins on an even
offset.

[ArBuilder] writes archives and [ArReader] reads them. Both behave like a
cursor over members: a header is written/read and then exactly one data
operation applies to it.
*/

pub mod builder;
pub use builder::ArBuilder;
pub mod header;
pub use header::ArHeader;
pub mod reader;
pub use reader::ArReader;

use std::{fs::File, io::BufReader, path::Path};

/// Magic bytes at the start of every archive.
pub const MAGIC: &[u8] = b"!<arch>\n";

/// Bytes terminating every member header.
pub const HEADER_TRAILER: &[u8] = b"`\n";

/// Byte written after odd-sized member data.
pub const PAD_BYTE: u8 = b'\n';

#[derive(Debug, thiserror::Error)]
pub enum ArError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic value encountered")]
    BadMagic,

    #[error("member header is truncated")]
    TruncatedHeader,

    #[error("member header does not end with the expected trailer")]
    BadTrailer,

    #[error("header field {field} is malformed: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("header field {field} value does not fit its width: {value}")]
    FieldOverflow { field: &'static str, value: String },

    #[error("member data is truncated: expected {expected} bytes; got {actual}")]
    ShortRead { expected: u64, actual: u64 },

    #[error("no current archive member")]
    NoCurrentEntry,

    #[error("archive reader stopped on an earlier error")]
    Failed,

    #[error("member header written without its data")]
    HeaderPending,

    #[error("write too short: header declares {expected} bytes; got {actual}")]
    WriteTooShort { expected: u64, actual: u64 },

    #[error("write too long: header declares {expected} bytes; got {actual}")]
    WriteTooLong { expected: u64, actual: u64 },
}

/// Result type for this crate.
pub type ArResult<T> = std::result::Result<T, ArError>;

/// Obtain the headers of every member in the archive at `path`.
///
/// Member data is read and discarded. The first decode or I/O error aborts
/// the walk.
pub fn list(path: impl AsRef<Path>) -> ArResult<Vec<ArHeader>> {
    let fh = File::open(path.as_ref())?;
    let mut reader = ArReader::new(BufReader::new(fh))?;

    let mut headers = vec![];
    while let Some(header) = reader.read_next()? {
        reader.skip_data()?;
        headers.push(header);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write};

    #[test]
    fn list_archive_file() -> ArResult<()> {
        let mut temp = tempfile::NamedTempFile::new()?;

        let mut builder = ArBuilder::new(Vec::new())?;
        builder.append(&ArHeader::new("usr/share/doc/a.txt", 3), b"abc")?;
        builder.append(&ArHeader::new("b.bin", 4), b"wxyz")?;
        temp.write_all(&builder.close()?)?;
        temp.flush()?;

        let headers = list(temp.path())?;
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].name, "a.txt");
        assert_eq!(headers[0].size, 3);
        assert_eq!(headers[1].name, "b.bin");
        assert_eq!(headers[1].size, 4);

        Ok(())
    }

    #[test]
    fn list_fails_on_bad_member() -> ArResult<()> {
        let mut temp = tempfile::NamedTempFile::new()?;

        let mut data = MAGIC.to_vec();
        data.extend_from_slice(&[b'x'; 60]);
        temp.write_all(&data)?;
        temp.flush()?;

        assert!(list(temp.path()).is_err());

        Ok(())
    }
}
