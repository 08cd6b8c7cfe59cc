// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Reading .rpm package files. */

use {
    crate::{
        control::PackageControl,
        error::{Result, RpmError},
        header::HeaderSection,
        io::MultiDigester,
        lead::Lead,
        tags::*,
    },
    chrono::{DateTime, TimeZone, Utc},
    cpio_archive::NewcReader,
    flate2::read::GzDecoder,
    log::warn,
    std::io::Read,
};

/// A file extracted from a package payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayloadFile {
    pub path: String,
    pub mode: u32,
    pub mtime: u32,
    pub data: Vec<u8>,
}

impl PayloadFile {
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.mtime as i64, 0).single()
    }
}

/// A parsed `.rpm` package.
///
/// The entire package is read into memory on construction.
pub struct RpmReader {
    lead: Lead,
    signature: HeaderSection,
    metadata: HeaderSection,
    /// Metadata header as read, which the signature digests cover.
    metadata_data: Vec<u8>,
    payload: Vec<u8>,
}

impl RpmReader {
    /// Parse a package from a reader, consuming all of it.
    pub fn new(mut reader: impl Read) -> Result<Self> {
        let lead = Lead::from_reader(&mut reader)?;
        let signature = HeaderSection::from_reader_padded(&mut reader)?;
        let metadata_data = HeaderSection::read_bytes(&mut reader)?;
        let metadata = HeaderSection::parse(&metadata_data)?;

        let mut payload = vec![];
        reader.read_to_end(&mut payload)?;

        Ok(Self {
            lead,
            signature,
            metadata,
            metadata_data,
            payload,
        })
    }

    pub fn lead(&self) -> &Lead {
        &self.lead
    }

    /// The signature header.
    pub fn signature(&self) -> &HeaderSection {
        &self.signature
    }

    /// The metadata header.
    pub fn metadata(&self) -> &HeaderSection {
        &self.metadata
    }

    /// The metadata header bytes as read.
    pub fn metadata_data(&self) -> &[u8] {
        &self.metadata_data
    }

    /// The compressed payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Resolve package metadata.
    pub fn control(&self) -> Result<PackageControl> {
        PackageControl::from_header(&self.metadata)
    }

    /// Verify the signature header against the package content.
    ///
    /// Size, MD5 and SHA-1 are each checked when present in the signature
    /// header. At least one must be present.
    pub fn verify(&self) -> Result<()> {
        let mut digester = MultiDigester::default();
        digester.update(&self.metadata_data);
        digester.update(&self.payload);
        let digest = digester.finish();

        let size = self.signature.int(SIGNATURE_TAG_SIZE)?;
        let md5 = self.signature.binary(SIGNATURE_TAG_MD5)?;
        let sha1 = self.signature.binary(SIGNATURE_TAG_SHA1)?;

        if size.is_none() && md5.is_none() && sha1.is_none() {
            return Err(RpmError::MissingTag(SIGNATURE_TAG_MD5));
        }

        if let Some(expected) = size {
            if expected as u64 != digest.size {
                warn!(
                    "package size mismatch: signature has {}; content has {}",
                    expected, digest.size
                );
                return Err(RpmError::LengthMismatch {
                    expected: expected as u64,
                    actual: digest.size,
                });
            }
        }

        for (name, expected, actual) in [
            ("md5", md5, digest.md5.digest_bytes()),
            ("sha1", sha1, digest.sha1.digest_bytes()),
        ] {
            if let Some(expected) = expected {
                if expected != actual {
                    warn!("package {} digest mismatch", name);
                    return Err(RpmError::DigestMismatch(
                        name,
                        hex::encode(expected),
                        hex::encode(actual),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Decompress the payload and obtain every file in it.
    pub fn payload_files(&self) -> Result<Vec<PayloadFile>> {
        let mut reader = NewcReader::new(GzDecoder::new(&self.payload[..]));
        let mut files = vec![];

        while let Some(header) = reader.read_next()? {
            let data = reader.read_data()?;

            files.push(PayloadFile {
                path: header.name,
                mode: header.mode,
                mtime: header.mtime,
                data,
            });
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            builder::RpmBuilder,
            header::{encode_fields, Field},
            io::ContentDigest,
            lead::LEAD_SIZE,
        },
        std::{
            io::Cursor,
            time::{Duration, SystemTime},
        },
    };

    fn build_package() -> Result<Vec<u8>> {
        let td = tempfile::tempdir()?;
        let a = td.path().join("a");
        let b = td.path().join("b");
        std::fs::write(&a, b"0123456789")?;
        std::fs::write(&b, b"odd")?;

        let mut control = PackageControl::new("demo", "1.0");
        control.release = "1".into();
        control.vendor = "Acme".into();

        let mut buf = vec![];
        RpmBuilder::new(control)
            .set_mtime(Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)))
            .install_file(&a, "usr/share/demo/a")
            .install_file(&b, "usr/share/demo/b")
            .write(&mut buf)?;

        Ok(buf)
    }

    #[test]
    fn read_built_package() -> Result<()> {
        let reader = RpmReader::new(Cursor::new(build_package()?))?;

        assert_eq!(reader.lead().name(), "demo");

        let control = reader.control()?;
        assert_eq!(control.name, "demo");
        assert_eq!(control.version, "1.0");
        assert_eq!(control.release, "1");
        assert_eq!(control.vendor, "Acme");
        assert_eq!(control.summary, "");

        reader.verify()?;

        let files = reader.payload_files()?;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "usr/share/demo/a");
        assert_eq!(files[0].data, b"0123456789");
        assert_eq!(files[0].mtime, 1_600_000_000);
        assert_eq!(files[1].path, "usr/share/demo/b");
        assert_eq!(files[1].data, b"odd");
        assert_eq!(
            files[1].modified_time().map(|t| t.timestamp()),
            Some(1_600_000_000)
        );

        Ok(())
    }

    #[test]
    fn verify_covers_metadata_as_read() -> Result<()> {
        let data = build_package()?;
        let reader = RpmReader::new(Cursor::new(&data))?;
        let metadata_start = LEAD_SIZE + reader.signature().to_bytes(true)?.len();

        // A non-zero reserved word is dropped by parsing but still signed.
        let mut signed = data[metadata_start..].to_vec();
        signed[7] = 1;

        let signature = encode_fields(
            &[
                Field::int32(SIGNATURE_TAG_SIZE, signed.len() as i32),
                Field::binary(
                    SIGNATURE_TAG_MD5,
                    ContentDigest::md5(&signed).digest_bytes().to_vec(),
                ),
                Field::binary(
                    SIGNATURE_TAG_SHA1,
                    ContentDigest::sha1(&signed).digest_bytes().to_vec(),
                ),
            ],
            true,
        )?;

        let mut package = data[0..LEAD_SIZE].to_vec();
        package.extend(signature);
        package.extend(&signed);

        let reader = RpmReader::new(Cursor::new(package))?;
        assert_eq!(reader.metadata_data()[7], 1);
        assert_eq!(reader.control()?.name, "demo");
        reader.verify()?;
        assert_eq!(reader.payload_files()?.len(), 2);

        Ok(())
    }

    #[test]
    fn tampered_payload() -> Result<()> {
        let mut data = build_package()?;
        let last = data.len() - 1;
        data[last] ^= 0xff;

        let reader = RpmReader::new(Cursor::new(data))?;
        assert!(matches!(
            reader.verify(),
            Err(RpmError::DigestMismatch("md5", _, _))
        ));

        Ok(())
    }

    #[test]
    fn truncated_payload() -> Result<()> {
        let mut data = build_package()?;
        data.pop();

        let reader = RpmReader::new(Cursor::new(data))?;
        assert!(matches!(
            reader.verify(),
            Err(RpmError::LengthMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn bad_lead() -> Result<()> {
        let mut data = build_package()?;
        data[0] = 0;
        assert!(matches!(
            RpmReader::new(Cursor::new(data)),
            Err(RpmError::BadLeadMagic)
        ));

        let data = build_package()?;
        assert!(matches!(
            RpmReader::new(Cursor::new(&data[0..LEAD_SIZE + 4])),
            Err(RpmError::HeaderTruncated)
        ));

        Ok(())
    }
}
