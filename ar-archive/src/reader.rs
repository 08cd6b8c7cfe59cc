// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Archive reading.

use {
    crate::{header::HEADER_SIZE, ArError, ArHeader, ArResult, MAGIC},
    std::io::{ErrorKind, Read, Write},
};

/// Bytes of lookahead deciding whether another member follows.
const LOOKAHEAD: usize = 16;

/// Leading magic bytes that are validated. The final newline is skipped.
const MAGIC_CHECKED: usize = 7;

#[derive(Clone, Copy, Debug)]
enum ReaderState {
    Ready,
    HeaderRead { size: u64 },
    /// A decode or I/O error was hit. The stream position is unknown.
    Failed,
}

/// A cursor over the members of an `ar` archive.
///
/// The cursor is advanced with [Self::read_next]. Afterwards the data of that
/// member, and only that member, can be obtained with [Self::read_data],
/// [Self::read_data_to] or discarded with [Self::skip_data].
///
/// Decode and I/O errors are fatal: every later operation fails with
/// [ArError::Failed] and iteration stops.
pub struct ArReader<R: Read> {
    reader: R,
    state: ReaderState,
}

impl<R: Read> ArReader<R> {
    /// Construct a new instance, consuming the archive magic.
    ///
    /// Only `!<arch>` is compared. The byte after it is skipped unchecked.
    pub fn new(mut reader: R) -> ArResult<Self> {
        let mut magic = [0u8; 8];

        match reader.read_exact(&mut magic) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(ArError::BadMagic);
            }
            Err(e) => {
                return Err(e.into());
            }
        }

        if magic[0..MAGIC_CHECKED] != MAGIC[0..MAGIC_CHECKED] {
            return Err(ArError::BadMagic);
        }

        Ok(Self {
            reader,
            state: ReaderState::Ready,
        })
    }

    /// Obtain the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next member header.
    ///
    /// `None` when fewer than 16 bytes remain in the source, which marks the
    /// end of the archive. Unread data of the previous member is skipped.
    pub fn read_next(&mut self) -> ArResult<Option<ArHeader>> {
        let res = self.read_next_header();
        self.latch(res)
    }

    fn read_next_header(&mut self) -> ArResult<Option<ArHeader>> {
        match self.state {
            ReaderState::Failed => return Err(ArError::Failed),
            ReaderState::HeaderRead { .. } => self.skip_data()?,
            ReaderState::Ready => {}
        }

        let mut data = [0u8; HEADER_SIZE];

        if read_up_to(&mut self.reader, &mut data[0..LOOKAHEAD])? < LOOKAHEAD {
            return Ok(None);
        }

        match self.reader.read_exact(&mut data[LOOKAHEAD..]) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(ArError::TruncatedHeader);
            }
            Err(e) => {
                return Err(e.into());
            }
        }

        let header = ArHeader::from_bytes(&data)?;
        self.state = ReaderState::HeaderRead { size: header.size };

        Ok(Some(header))
    }

    /// Copy the data of the current member to a writer.
    ///
    /// Returns the number of member bytes copied.
    pub fn read_data_to(&mut self, writer: &mut impl Write) -> ArResult<u64> {
        let res = self.copy_data(writer);
        self.latch(res)
    }

    fn copy_data(&mut self, writer: &mut impl Write) -> ArResult<u64> {
        let expected = match self.state {
            ReaderState::Ready => return Err(ArError::NoCurrentEntry),
            ReaderState::Failed => return Err(ArError::Failed),
            ReaderState::HeaderRead { size } => size,
        };
        self.state = ReaderState::Ready;

        let actual = std::io::copy(&mut (&mut self.reader).take(expected), writer)?;
        if actual != expected {
            return Err(ArError::ShortRead { expected, actual });
        }

        if expected % 2 == 1 {
            // The pad may be absent at the very end of the stream.
            let mut pad = [0u8; 1];
            read_up_to(&mut self.reader, &mut pad)?;
        }

        Ok(actual)
    }

    /// Record a fatal error so later operations don't decode from an unknown offset.
    fn latch<T>(&mut self, res: ArResult<T>) -> ArResult<T> {
        match &res {
            Ok(_) | Err(ArError::NoCurrentEntry) => {}
            Err(_) => {
                self.state = ReaderState::Failed;
            }
        }

        res
    }

    /// Read the data of the current member.
    pub fn read_data(&mut self) -> ArResult<Vec<u8>> {
        let mut data = vec![];
        self.read_data_to(&mut data)?;

        Ok(data)
    }

    /// Discard the data of the current member.
    pub fn skip_data(&mut self) -> ArResult<()> {
        self.read_data_to(&mut std::io::sink())?;

        Ok(())
    }
}

impl<R: Read> Iterator for ArReader<R> {
    type Item = ArResult<ArHeader>;

    fn next(&mut self) -> Option<Self::Item> {
        if let ReaderState::Failed = self.state {
            return None;
        }

        match self.read_next() {
            Ok(Some(h)) => Some(Ok(h)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
