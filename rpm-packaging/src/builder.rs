// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Create .rpm package files. */

use {
    crate::{
        control::{PackageControl, PackageFile},
        error::{Result, RpmError},
        header::{encode_fields, Field},
        io::{ContentDigest, DigestingReader, MultiDigester},
        lead::Lead,
        tags::*,
    },
    cpio_archive::{NewcBuilder, NewcHeader},
    flate2::{Compression, GzBuilder},
    log::debug,
    std::{
        fs::{File, Metadata},
        io::Write,
        path::Path,
        time::SystemTime,
    },
};

/// Default gzip level for the payload.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// Describes a file that was written into a package payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManifestEntry {
    /// Path of the file inside the payload.
    pub path: String,
    /// Content length in bytes.
    pub size: u64,
    /// MD5 of the file content.
    pub digest: ContentDigest,
}

/// Files written into a package payload, in payload order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BuildManifest {
    entries: Vec<ManifestEntry>,
}

impl BuildManifest {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Total content length of all files.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

/// A builder for a `.rpm` package file.
pub struct RpmBuilder {
    control: PackageControl,

    /// Files to install as part of the package.
    install_files: Vec<PackageFile>,

    compression_level: u32,
    arch: u16,
    os: u16,
    mtime: Option<SystemTime>,
}

impl RpmBuilder {
    /// Construct a new instance from package metadata.
    pub fn new(control: PackageControl) -> Self {
        Self {
            control,
            install_files: vec![],
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            arch: 0,
            os: 0,
            mtime: None,
        }
    }

    /// Set the gzip level used to compress the payload.
    ///
    /// Values above 9 are clamped to 9.
    pub fn set_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Set the architecture code recorded in the lead.
    pub fn set_architecture(mut self, arch: u16) -> Self {
        self.arch = arch;
        self
    }

    /// Set the operating system code recorded in the lead.
    pub fn set_os(mut self, os: u16) -> Self {
        self.os = os;
        self
    }

    /// Set the modified time to use on payload members.
    ///
    /// If this is called, all payload members will use the specified time, helping
    /// to make package content deterministic.
    ///
    /// If not called, each file's modified time on the filesystem is used.
    pub fn set_mtime(mut self, time: Option<SystemTime>) -> Self {
        self.mtime = time;
        self
    }

    /// Register a file as to be installed by this package.
    ///
    /// `path` is the path of the file inside the package. e.g. `usr/bin/myapp`.
    /// Content is read from `source` when the package is written.
    pub fn install_file(mut self, source: impl AsRef<Path>, path: impl ToString) -> Self {
        self.install_files.push(PackageFile::new(source, path));
        self
    }

    /// Files registered for installation, in payload order.
    pub fn files(&self) -> &[PackageFile] {
        &self.install_files
    }

    /// Write `.rpm` file content to a writer.
    ///
    /// The lead is written before the payload is assembled. If a later step fails,
    /// the writer is left holding a partial package.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<BuildManifest> {
        let mut lead = Lead::new(&self.control.name);
        lead.arch = self.arch;
        lead.os = self.os;
        lead.write(writer)?;

        let metadata = encode_fields(&self.control.to_fields(), false)?;
        let (payload, manifest) = self.write_payload()?;

        let mut digester = MultiDigester::default();
        digester.update(&metadata);
        digester.update(&payload);
        let digest = digester.finish();

        let size = i32::try_from(digest.size)
            .map_err(|_| RpmError::ValueOverflow("signature size", digest.size))?;
        let signature = encode_fields(
            &[
                Field::int32(SIGNATURE_TAG_SIZE, size),
                Field::binary(SIGNATURE_TAG_MD5, digest.md5.digest_bytes().to_vec()),
                Field::binary(SIGNATURE_TAG_SHA1, digest.sha1.digest_bytes().to_vec()),
            ],
            true,
        )?;

        debug!(
            "writing rpm {}: signature {} bytes; metadata {} bytes; payload {} bytes",
            self.control.name,
            signature.len(),
            metadata.len(),
            payload.len()
        );

        writer.write_all(&signature)?;
        writer.write_all(&metadata)?;
        writer.write_all(&payload)?;
        writer.flush()?;

        Ok(manifest)
    }

    /// Produce the gzip compressed cpio payload.
    fn write_payload(&self) -> Result<(Vec<u8>, BuildManifest)> {
        let encoder = GzBuilder::new()
            .mtime(0)
            .write(Vec::new(), Compression::new(self.compression_level));
        let mut archive = NewcBuilder::new(encoder);
        let mut manifest = BuildManifest::default();

        for file in &self.install_files {
            let path_error = |e| RpmError::IoPath(file.source.display().to_string(), e);

            let fh = File::open(&file.source).map_err(path_error)?;
            let metadata = fh.metadata().map_err(path_error)?;

            let mtime = self.mtime.map_or_else(|| metadata.modified(), Ok);
            let mtime = mtime
                .map_err(path_error)?
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);

            let header = NewcHeader::try_new(
                &file.path,
                file_mode(&file.source, &metadata),
                mtime,
                metadata.len(),
            )?;

            let mut reader = DigestingReader::new(fh);
            archive.append_from_reader(&header, &mut reader)?;
            let (digest, size) = reader.finish();

            debug!(
                "added {} to payload ({} bytes; md5 {})",
                file.path,
                size,
                digest.digest_hex()
            );

            manifest.entries.push(ManifestEntry {
                path: file.path.clone(),
                size,
                digest,
            });
        }

        let payload = archive.finish()?.finish()?;

        Ok((payload, manifest))
    }
}

#[cfg(unix)]
fn file_mode(_: &Path, metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn file_mode(path: &Path, _: &Metadata) -> u32 {
    if is_executable::is_executable(path) {
        0o100755
    } else {
        0o100644
    }
}
