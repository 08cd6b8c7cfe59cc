// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers for computing content digests as data streams by. */

use {
    digest::Digest,
    md5::Md5,
    sha1::Sha1,
    std::{
        fmt::Formatter,
        io::{Read, Write},
    },
};

/// Represents a content digest.
#[derive(Clone, Eq, PartialEq)]
pub enum ContentDigest {
    /// An MD5 digest.
    Md5(Vec<u8>),
    /// A SHA-1 digest.
    Sha1(Vec<u8>),
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5(data) => write!(f, "Md5({})", hex::encode(data)),
            Self::Sha1(data) => write!(f, "Sha1({})", hex::encode(data)),
        }
    }
}

impl ContentDigest {
    /// Compute the MD5 of some data.
    pub fn md5(data: &[u8]) -> Self {
        Self::Md5(Md5::digest(data).to_vec())
    }

    /// Compute the SHA-1 of some data.
    pub fn sha1(data: &[u8]) -> Self {
        Self::Sha1(Sha1::digest(data).to_vec())
    }

    /// Obtain the digest bytes for this content digest.
    pub fn digest_bytes(&self) -> &[u8] {
        match self {
            Self::Md5(x) => x,
            Self::Sha1(x) => x,
        }
    }

    /// Obtain the hex encoded content digest.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest_bytes())
    }
}

/// Computes the size, MD5 and SHA-1 of content in a single pass.
#[derive(Clone, Default)]
pub struct MultiDigester {
    size: u64,
    md5: Md5,
    sha1: Sha1,
}

/// The result of a [MultiDigester].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MultiContentDigest {
    pub size: u64,
    pub md5: ContentDigest,
    pub sha1: ContentDigest,
}

impl MultiDigester {
    /// Write content into the digesters.
    pub fn update(&mut self, data: &[u8]) {
        self.size += data.len() as u64;
        self.md5.update(data);
        self.sha1.update(data);
    }

    /// Finish digesting content.
    pub fn finish(self) -> MultiContentDigest {
        MultiContentDigest {
            size: self.size,
            md5: ContentDigest::Md5(self.md5.finalize().to_vec()),
            sha1: ContentDigest::Sha1(self.sha1.finalize().to_vec()),
        }
    }
}

impl Write for MultiDigester {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A reader adapter computing the MD5 of everything read through it.
///
/// Whoever consumes this reader and the digest observe the identical byte
/// sequence, with a single read of the source.
pub struct DigestingReader<R> {
    source: R,
    hasher: Md5,
    bytes_read: u64,
}

impl<R: Read> DigestingReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            hasher: Md5::new(),
            bytes_read: 0,
        }
    }

    /// Number of bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Obtain the digest of the content read so far.
    pub fn finish(self) -> (ContentDigest, u64) {
        (
            ContentDigest::Md5(self.hasher.finalize().to_vec()),
            self.bytes_read,
        )
    }
}

impl<R: Read> Read for DigestingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let size = self.source.read(buf)?;
        self.hasher.update(&buf[0..size]);
        self.bytes_read += size as u64;

        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Cursor};

    #[test]
    fn digests() {
        assert_eq!(
            ContentDigest::md5(b"0123456789").digest_hex(),
            "781e5e245d69b566979b86e28d23f2c7"
        );
        assert_eq!(
            ContentDigest::sha1(b"0123456789").digest_hex(),
            "87acec17cd9dcd20a716cc2cf67417b71c8a7016"
        );
    }

    #[test]
    fn multi_digester() -> std::io::Result<()> {
        let mut digester = MultiDigester::default();
        digester.update(b"01234");
        digester.write_all(b"56789")?;

        let digest = digester.finish();
        assert_eq!(digest.size, 10);
        assert_eq!(digest.md5, ContentDigest::md5(b"0123456789"));
        assert_eq!(digest.sha1, ContentDigest::sha1(b"0123456789"));

        Ok(())
    }

    #[test]
    fn digesting_reader_tees() -> std::io::Result<()> {
        let mut reader = DigestingReader::new(Cursor::new(b"hello world".to_vec()));

        let mut first = [0u8; 4];
        reader.read_exact(&mut first)?;
        let mut rest = vec![];
        reader.read_to_end(&mut rest)?;
        assert_eq!(reader.bytes_read(), 11);

        let (digest, size) = reader.finish();
        assert_eq!(size, 11);
        assert_eq!(digest, ContentDigest::md5(b"hello world"));
        assert_eq!(&first, b"hell");
        assert_eq!(rest, b"o world");

        Ok(())
    }
}
