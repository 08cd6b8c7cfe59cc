// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package metadata. */

use {
    crate::{
        error::{Result, RpmError},
        header::{Field, HeaderSection},
        tags::*,
    },
    std::path::{Path, PathBuf},
};

/// Descriptive metadata of a package.
///
/// Empty values are omitted from the metadata header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackageControl {
    pub name: String,
    pub version: String,
    pub release: String,
    pub summary: String,
    pub description: String,
    pub vendor: String,
    pub license: String,
    /// Project homepage.
    pub url: String,
}

impl PackageControl {
    pub fn new(name: impl ToString, version: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    /// Header fields for the metadata header, one string field per attribute.
    pub fn to_fields(&self) -> Vec<Field> {
        vec![
            Field::string(TAG_NAME, &self.name),
            Field::string(TAG_VERSION, &self.version),
            Field::string(TAG_RELEASE, &self.release),
            Field::string(TAG_SUMMARY, &self.summary),
            Field::string(TAG_DESCRIPTION, &self.description),
            Field::string(TAG_VENDOR, &self.vendor),
            Field::string(TAG_LICENSE, &self.license),
            Field::string(TAG_URL, &self.url),
        ]
    }

    /// Resolve metadata from a parsed metadata header.
    ///
    /// Only the package name is required.
    pub fn from_header(header: &HeaderSection) -> Result<Self> {
        let value = |tag| -> Result<String> { Ok(header.string(tag)?.unwrap_or_default()) };

        Ok(Self {
            name: header
                .string(TAG_NAME)?
                .ok_or(RpmError::MissingTag(TAG_NAME))?,
            version: value(TAG_VERSION)?,
            release: value(TAG_RELEASE)?,
            summary: value(TAG_SUMMARY)?,
            description: value(TAG_DESCRIPTION)?,
            vendor: value(TAG_VENDOR)?,
            license: value(TAG_LICENSE)?,
            url: value(TAG_URL)?,
        })
    }
}

/// A file to install as part of a package.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageFile {
    /// Filesystem path content is read from.
    pub source: PathBuf,
    /// Path of the file inside the package payload.
    pub path: String,
}

impl PackageFile {
    pub fn new(source: impl AsRef<Path>, path: impl ToString) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            path: path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_in_tag_order() -> Result<()> {
        let mut control = PackageControl::new("demo", "1.0");
        control.license = "MPL-2.0".into();

        let section = HeaderSection::from_fields(&control.to_fields())?;
        let tags = section.entries().iter().map(|e| e.tag).collect::<Vec<_>>();
        assert_eq!(tags, vec![TAG_NAME, TAG_VERSION, TAG_LICENSE]);

        Ok(())
    }

    #[test]
    fn header_round_trip() -> Result<()> {
        let control = PackageControl {
            name: "demo".into(),
            version: "1.0".into(),
            release: "3".into(),
            summary: "A demo".into(),
            description: "A longer\ndescription".into(),
            vendor: "Acme".into(),
            license: "MIT".into(),
            url: "https://example.com/".into(),
        };

        let data = HeaderSection::from_fields(&control.to_fields())?.to_bytes(false)?;
        let section = HeaderSection::parse(&data)?;
        assert_eq!(PackageControl::from_header(&section)?, control);

        Ok(())
    }

    #[test]
    fn name_required() -> Result<()> {
        let section = HeaderSection::from_fields(&[Field::string(TAG_VERSION, "1.0")])?;
        assert!(matches!(
            PackageControl::from_header(&section),
            Err(RpmError::MissingTag(TAG_NAME))
        ));

        Ok(())
    }
}
