// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The RPM lead.

The lead is a fixed 96 byte record at the start of every package. Modern
tooling mostly ignores it in favor of the headers, but it must be present
and well formed.
*/

use {
    crate::error::{Result, RpmError},
    log::warn,
    scroll::{Pread, Pwrite, SizeWith},
    std::io::{ErrorKind, Read, Write},
};

/// Magic bytes at the start of the lead.
pub const LEAD_MAGIC: u32 = 0xedab_eedb;

/// Encoded size of the lead.
pub const LEAD_SIZE: usize = 96;

/// Size of the package name field.
pub const LEAD_NAME_SIZE: usize = 66;

pub const MAJOR_VERSION: u8 = 3;
pub const MINOR_VERSION: u8 = 0;

/// Package type of binary packages.
pub const TYPE_BINARY: u16 = 0;

/// Signature type denoting a signature header follows the lead.
pub const SIGNATURE_TYPE_HEADER: u16 = 5;

/// The lead as stored.
#[derive(Clone, Copy, Debug, Pread, Pwrite, SizeWith)]
struct LeadRecord {
    magic: u32,
    major: u8,
    minor: u8,
    package_type: u16,
    arch: u16,
    name: [u8; 66],
    os: u16,
    signature_type: u16,
    reserved: [u8; 16],
}

/// The 96 byte lead record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lead {
    pub major: u8,
    pub minor: u8,
    pub package_type: u16,
    pub arch: u16,
    /// Raw name field. Names longer than 66 bytes are truncated when encoding.
    pub name: Vec<u8>,
    pub os: u16,
    pub signature_type: u16,
}

impl Lead {
    /// Construct a lead for a binary package of the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            major: MAJOR_VERSION,
            minor: MINOR_VERSION,
            package_type: TYPE_BINARY,
            arch: 0,
            name: name.as_ref().as_bytes().to_vec(),
            os: 0,
            signature_type: SIGNATURE_TYPE_HEADER,
        }
    }

    /// The package name, up to the first NUL.
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.name.len());

        String::from_utf8_lossy(&self.name[0..end]).to_string()
    }

    fn record(&self) -> LeadRecord {
        if self.name.len() > LEAD_NAME_SIZE {
            warn!(
                "package name truncated to {} bytes in lead: {}",
                LEAD_NAME_SIZE,
                String::from_utf8_lossy(&self.name)
            );
        }
        let name_len = self.name.len().min(LEAD_NAME_SIZE);

        let mut name = [0u8; LEAD_NAME_SIZE];
        name[0..name_len].copy_from_slice(&self.name[0..name_len]);

        LeadRecord {
            magic: LEAD_MAGIC,
            major: self.major,
            minor: self.minor,
            package_type: self.package_type,
            arch: self.arch,
            name,
            os: self.os,
            signature_type: self.signature_type,
            reserved: [0; 16],
        }
    }

    /// Serialize to the fixed 96 byte form.
    pub fn to_bytes(&self) -> Result<[u8; LEAD_SIZE]> {
        let mut data = [0u8; LEAD_SIZE];
        data.pwrite_with(self.record(), 0, scroll::BE)?;

        Ok(data)
    }

    /// Write the lead to a writer.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;

        Ok(())
    }

    /// Read a lead, validating its magic.
    pub fn from_reader(reader: &mut impl Read) -> Result<Self> {
        let mut data = [0u8; LEAD_SIZE];
        match reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(RpmError::BadLeadMagic);
            }
            Err(e) => {
                return Err(e.into());
            }
        }

        let record = data.pread_with::<LeadRecord>(0, scroll::BE)?;
        if record.magic != LEAD_MAGIC {
            return Err(RpmError::BadLeadMagic);
        }

        Ok(Self {
            major: record.major,
            minor: record.minor,
            package_type: record.package_type,
            arch: record.arch,
            name: record.name.to_vec(),
            os: record.os,
            signature_type: record.signature_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use {super::*, scroll::ctx::SizeWith, std::io::Cursor};

    #[test]
    fn record_size() {
        assert_eq!(LeadRecord::size_with(&scroll::BE), LEAD_SIZE);
    }

    #[test]
    fn layout() -> Result<()> {
        let mut lead = Lead::new("demo");
        lead.arch = 1;
        lead.os = 1;

        let data = lead.to_bytes()?;
        assert_eq!(data.len(), LEAD_SIZE);
        assert_eq!(&data[0..4], &[0xed, 0xab, 0xee, 0xdb]);
        assert_eq!(&data[4..10], &[3, 0, 0, 0, 0, 1]);
        assert_eq!(&data[10..14], b"demo");
        assert!(data[14..76].iter().all(|b| *b == 0));
        assert_eq!(&data[76..80], &[0, 1, 0, 5]);
        assert!(data[80..].iter().all(|b| *b == 0));

        Ok(())
    }

    #[test]
    fn long_name_truncated() -> Result<()> {
        let name = "n".repeat(100);
        let data = Lead::new(&name).to_bytes()?;
        assert_eq!(&data[10..76], &name.as_bytes()[0..66]);
        assert_eq!(&data[76..80], &[0, 0, 0, 5]);

        let exact = "e".repeat(66);
        let data = Lead::new(&exact).to_bytes()?;
        assert_eq!(&data[10..76], exact.as_bytes());

        let lead = Lead::from_reader(&mut Cursor::new(Lead::new(&name).to_bytes()?))?;
        assert_eq!(lead.name(), "n".repeat(66));

        Ok(())
    }

    #[test]
    fn round_trip() -> Result<()> {
        let mut lead = Lead::new("package-name");
        lead.arch = 12;
        lead.os = 1;

        let mut buf = vec![];
        lead.write(&mut buf)?;
        assert_eq!(buf.len(), LEAD_SIZE);

        let parsed = Lead::from_reader(&mut Cursor::new(buf))?;
        assert_eq!(parsed.name(), "package-name");
        assert_eq!(parsed.arch, 12);
        assert_eq!(parsed.os, 1);
        assert_eq!(parsed.major, MAJOR_VERSION);
        assert_eq!(parsed.signature_type, SIGNATURE_TYPE_HEADER);
        assert_eq!(parsed.to_bytes()?, lead.to_bytes()?);

        Ok(())
    }

    #[test]
    fn bad_magic() {
        assert!(matches!(
            Lead::from_reader(&mut Cursor::new([0u8; LEAD_SIZE])),
            Err(RpmError::BadLeadMagic)
        ));
        assert!(matches!(
            Lead::from_reader(&mut Cursor::new(&LEAD_MAGIC.to_be_bytes()[..])),
            Err(RpmError::BadLeadMagic)
        ));
    }
}
