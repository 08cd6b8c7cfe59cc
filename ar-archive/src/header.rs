// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Member header encoding.

use {
    crate::{ArError, ArResult, HEADER_TRAILER},
    chrono::{DateTime, TimeZone, Utc},
    std::time::{SystemTime, UNIX_EPOCH},
};

/// Size in bytes of an encoded member header, trailer included.
pub const HEADER_SIZE: usize = 60;

const NAME_WIDTH: usize = 16;
const MTIME_WIDTH: usize = 12;
const UID_WIDTH: usize = 6;
const GID_WIDTH: usize = 6;
const MODE_WIDTH: usize = 8;
const SIZE_WIDTH: usize = 10;

/// Metadata for a single archive member.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ArHeader {
    /// Member name.
    ///
    /// Only the final path component is stored. On disk it carries a
    /// trailing `/`, which is removed again when reading.
    pub name: String,

    /// Modified time as seconds since UNIX epoch.
    pub mtime: u64,

    /// User ID.
    pub uid: u32,

    /// Group ID.
    pub gid: u32,

    /// File mode. Stored as octal text.
    pub mode: u32,

    /// Member data size in bytes, excluding any padding.
    pub size: u64,
}

impl ArHeader {
    /// Construct a header for a member of the given name and size.
    ///
    /// Ownership is root, the mode is `0644` and the modified time is the epoch.
    pub fn new(name: impl ToString, size: u64) -> Self {
        Self {
            name: name.to_string(),
            mtime: 0,
            uid: 0,
            gid: 0,
            mode: 0o644,
            size,
        }
    }

    /// Set the modified time from a [SystemTime].
    ///
    /// Sub-second precision is discarded. Times before the epoch clamp to 0.
    pub fn set_modified_time(&mut self, time: SystemTime) {
        self.mtime = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
    }

    /// Modified time as a [DateTime].
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.mtime)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    /// The name as written to the archive: the final path component plus `/`.
    pub fn stored_name(&self) -> String {
        let trimmed = self.name.trim_end_matches('/');
        let base = trimmed.rsplit('/').next().unwrap_or(trimmed);

        format!("{}/", base)
    }

    /// Serialize to the fixed-width on-disk form.
    pub fn to_bytes(&self) -> ArResult<[u8; HEADER_SIZE]> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);

        write_field(&mut buf, "name", &self.stored_name(), NAME_WIDTH)?;
        write_field(&mut buf, "mtime", &self.mtime.to_string(), MTIME_WIDTH)?;
        write_field(&mut buf, "uid", &self.uid.to_string(), UID_WIDTH)?;
        write_field(&mut buf, "gid", &self.gid.to_string(), GID_WIDTH)?;
        write_field(&mut buf, "mode", &format!("{:o}", self.mode), MODE_WIDTH)?;
        write_field(&mut buf, "size", &self.size.to_string(), SIZE_WIDTH)?;
        buf.extend_from_slice(HEADER_TRAILER);

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);

        Ok(out)
    }

    /// Parse a header from its on-disk form.
    ///
    /// Fields are trimmed of surrounding whitespace before being parsed.
    pub fn from_bytes(data: &[u8]) -> ArResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ArError::TruncatedHeader);
        }

        let (name, rest) = data.split_at(NAME_WIDTH);
        let (mtime, rest) = rest.split_at(MTIME_WIDTH);
        let (uid, rest) = rest.split_at(UID_WIDTH);
        let (gid, rest) = rest.split_at(GID_WIDTH);
        let (mode, rest) = rest.split_at(MODE_WIDTH);
        let (size, rest) = rest.split_at(SIZE_WIDTH);

        if &rest[0..HEADER_TRAILER.len()] != HEADER_TRAILER {
            return Err(ArError::BadTrailer);
        }

        let name = String::from_utf8_lossy(name);
        let name = name.trim();

        Ok(Self {
            name: name.strip_suffix('/').unwrap_or(name).to_string(),
            mtime: parse_field("mtime", mtime, 10)?,
            uid: narrow("uid", parse_field("uid", uid, 10)?)?,
            gid: narrow("gid", parse_field("gid", gid, 10)?)?,
            mode: narrow("mode", parse_field("mode", mode, 8)?)?,
            size: parse_field("size", size, 10)?,
        })
    }
}

fn write_field(buf: &mut Vec<u8>, field: &'static str, value: &str, width: usize) -> ArResult<()> {
    if value.len() > width {
        return Err(ArError::FieldOverflow {
            field,
            value: value.to_string(),
        });
    }

    buf.extend_from_slice(value.as_bytes());
    buf.resize(buf.len() + width - value.len(), b' ');

    Ok(())
}

fn parse_field(field: &'static str, data: &[u8], radix: u32) -> ArResult<u64> {
    let malformed = || ArError::MalformedField {
        field,
        value: String::from_utf8_lossy(data).to_string(),
    };

    let s = std::str::from_utf8(data).map_err(|_| malformed())?;
    u64::from_str_radix(s.trim(), radix).map_err(|_| malformed())
}

fn narrow(field: &'static str, value: u64) -> ArResult<u32> {
    u32::try_from(value).map_err(|_| ArError::MalformedField {
        field,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() -> ArResult<()> {
        let header = ArHeader {
            name: "debian-binary".into(),
            mtime: 1234567890,
            uid: 1000,
            gid: 100,
            mode: 0o100644,
            size: 4,
        };

        let data = header.to_bytes()?;
        assert_eq!(
            &data[..],
            &b"debian-binary/  1234567890  1000  100   100644  4         `\n"[..]
        );

        Ok(())
    }

    #[test]
    fn name_is_base_name() -> ArResult<()> {
        let header = ArHeader::new("usr/lib/libfoo.a", 0);
        assert_eq!(header.stored_name(), "libfoo.a/");
        assert_eq!(&header.to_bytes()?[0..16], b"libfoo.a/       ");

        Ok(())
    }

    #[test]
    fn round_trip() -> ArResult<()> {
        let headers = [
            ArHeader {
                name: "a".into(),
                mtime: 0,
                uid: 0,
                gid: 0,
                mode: 0,
                size: 0,
            },
            ArHeader {
                name: "fifteen-chars.x".into(),
                mtime: 999_999_999_999,
                uid: 999_999,
                gid: 65534,
                mode: 0o7777_7777,
                size: 9_999_999_999,
            },
            ArHeader {
                name: "control.tar.gz".into(),
                mtime: 1_600_000_000,
                uid: 0,
                gid: 0,
                mode: 0o755,
                size: 12345,
            },
        ];

        for header in headers {
            let data = header.to_bytes()?;
            assert_eq!(ArHeader::from_bytes(&data)?, header);
        }

        Ok(())
    }

    #[test]
    fn overflow_rejected() {
        let mut header = ArHeader::new("this-name-is-too-long", 0);
        assert!(matches!(
            header.to_bytes(),
            Err(ArError::FieldOverflow { field: "name", .. })
        ));

        header.name = "ok".into();
        header.size = 10_000_000_000;
        assert!(matches!(
            header.to_bytes(),
            Err(ArError::FieldOverflow { field: "size", .. })
        ));
    }

    #[test]
    fn malformed_fields() -> ArResult<()> {
        let mut data = ArHeader::new("x", 1).to_bytes()?;
        data[16..28].copy_from_slice(b"12ab        ");
        assert!(matches!(
            ArHeader::from_bytes(&data),
            Err(ArError::MalformedField { field: "mtime", .. })
        ));

        let mut data = ArHeader::new("x", 1).to_bytes()?;
        data[40..48].copy_from_slice(b"789     ");
        assert!(matches!(
            ArHeader::from_bytes(&data),
            Err(ArError::MalformedField { field: "mode", .. })
        ));

        let mut data = ArHeader::new("x", 1).to_bytes()?;
        data[58] = b'!';
        assert!(matches!(ArHeader::from_bytes(&data), Err(ArError::BadTrailer)));

        assert!(matches!(
            ArHeader::from_bytes(&data[0..30]),
            Err(ArError::TruncatedHeader)
        ));

        Ok(())
    }

    #[test]
    fn modified_time() {
        let mut header = ArHeader::new("x", 0);
        header.set_modified_time(UNIX_EPOCH + std::time::Duration::from_millis(86_400_999));
        assert_eq!(header.mtime, 86_400);
        assert_eq!(
            header.modified_time(),
            Utc.timestamp_opt(86_400, 0).single()
        );
    }
}
