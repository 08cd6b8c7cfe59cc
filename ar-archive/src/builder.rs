// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Archive writing.

use {
    crate::{ArError, ArHeader, ArResult, MAGIC, PAD_BYTE},
    std::io::Write,
};

#[derive(Clone, Copy, Debug)]
enum WriterState {
    Ready,
    HeaderWritten { size: u64 },
}

/// Writes an `ar` archive to a writer.
///
/// Every member is written as a [Self::write_header] call followed by exactly
/// one [Self::write_data] call holding the number of bytes the header declares.
pub struct ArBuilder<W: Write> {
    writer: W,
    state: WriterState,
}

impl<W: Write> ArBuilder<W> {
    /// Construct a new instance, writing the archive magic to `writer`.
    pub fn new(mut writer: W) -> ArResult<Self> {
        writer.write_all(MAGIC)?;

        Ok(Self {
            writer,
            state: WriterState::Ready,
        })
    }

    /// Write the header for the next member.
    pub fn write_header(&mut self, header: &ArHeader) -> ArResult<()> {
        if let WriterState::HeaderWritten { .. } = self.state {
            return Err(ArError::HeaderPending);
        }

        let data = header.to_bytes()?;
        self.writer.write_all(&data)?;
        self.state = WriterState::HeaderWritten { size: header.size };

        Ok(())
    }

    /// Write the data for the member whose header was just written.
    ///
    /// `data` must be exactly as long as the header declares. A pad byte is
    /// added after data of odd length.
    ///
    /// Returns the number of member bytes written, excluding padding.
    pub fn write_data(&mut self, data: &[u8]) -> ArResult<usize> {
        let expected = match self.state {
            WriterState::Ready => return Err(ArError::NoCurrentEntry),
            WriterState::HeaderWritten { size } => size,
        };

        let actual = data.len() as u64;
        if actual > expected {
            return Err(ArError::WriteTooLong { expected, actual });
        } else if actual < expected {
            return Err(ArError::WriteTooShort { expected, actual });
        }

        self.writer.write_all(data)?;
        if data.len() % 2 == 1 {
            self.writer.write_all(&[PAD_BYTE])?;
        }
        self.state = WriterState::Ready;

        Ok(data.len())
    }

    /// Write a complete member.
    pub fn append(&mut self, header: &ArHeader, data: &[u8]) -> ArResult<usize> {
        self.write_header(header)?;
        self.write_data(data)
    }

    /// Finish the archive and return the inner writer.
    ///
    /// The format has no trailer. This fails if a header was written without
    /// its data.
    pub fn close(mut self) -> ArResult<W> {
        if let WriterState::HeaderWritten { size } = self.state {
            return Err(ArError::WriteTooShort {
                expected: size,
                actual: 0,
            });
        }

        self.writer.flush()?;

        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::header::HEADER_SIZE};

    #[test]
    fn magic_only() -> ArResult<()> {
        let builder = ArBuilder::new(Vec::new())?;
        assert_eq!(builder.close()?, b"!<arch>\n");

        Ok(())
    }

    #[test]
    fn padding() -> ArResult<()> {
        for len in [0usize, 1, 2, 7, 10] {
            let data = vec![b'a'; len];

            let mut builder = ArBuilder::new(Vec::new())?;
            builder.write_header(&ArHeader::new("f", len as _))?;
            assert_eq!(builder.write_data(&data)?, len);
            let archive = builder.close()?;

            assert_eq!(
                archive.len(),
                MAGIC.len() + HEADER_SIZE + len + len % 2,
                "length {}",
                len
            );
            if len % 2 == 1 {
                assert_eq!(archive.last(), Some(&PAD_BYTE));
            }
        }

        Ok(())
    }

    #[test]
    fn state_enforced() -> ArResult<()> {
        let mut builder = ArBuilder::new(Vec::new())?;
        assert!(matches!(builder.write_data(b"x"), Err(ArError::NoCurrentEntry)));

        builder.write_header(&ArHeader::new("f", 3))?;
        assert!(matches!(
            builder.write_header(&ArHeader::new("g", 3)),
            Err(ArError::HeaderPending)
        ));
        assert!(matches!(
            builder.write_data(b"abcd"),
            Err(ArError::WriteTooLong {
                expected: 3,
                actual: 4
            })
        ));
        assert!(matches!(
            builder.write_data(b"ab"),
            Err(ArError::WriteTooShort {
                expected: 3,
                actual: 2
            })
        ));
        builder.write_data(b"abc")?;
        assert!(matches!(builder.write_data(b"abc"), Err(ArError::NoCurrentEntry)));

        builder.write_header(&ArHeader::new("g", 1))?;
        assert!(matches!(builder.close(), Err(ArError::WriteTooShort { .. })));

        Ok(())
    }
}
