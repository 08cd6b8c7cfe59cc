// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM package primitives.

An RPM package is the concatenation of:

1. A fixed 96 byte [lead::Lead].
2. A signature [header::HeaderSection] padded to 8 bytes, holding the size,
   MD5 and SHA-1 of everything that follows it.
3. A metadata [header::HeaderSection] describing the package.
4. A gzip compressed cpio (`newc`) payload holding the installed files.

[RpmBuilder] assembles packages from a [PackageControl] and files on the
filesystem. [RpmReader] parses packages and verifies their signature header.
*/

pub mod builder;
pub mod control;
pub mod error;
pub mod header;
pub mod io;
pub mod lead;
pub mod reader;
pub mod tags;

pub use {
    builder::{BuildManifest, ManifestEntry, RpmBuilder},
    control::{PackageControl, PackageFile},
    error::{Result, RpmError},
    header::{Field, HeaderSection},
    lead::Lead,
    reader::{PayloadFile, RpmReader},
};
