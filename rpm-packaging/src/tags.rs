// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Tag identifiers.

Tags in the metadata header and in the signature header live in separate
namespaces, so the same number can mean different things in each.
*/

/// Package name.
pub const TAG_NAME: u32 = 1000;
/// Package version.
pub const TAG_VERSION: u32 = 1001;
/// Package release.
pub const TAG_RELEASE: u32 = 1002;
/// One line description.
pub const TAG_SUMMARY: u32 = 1004;
/// Multi-line description.
pub const TAG_DESCRIPTION: u32 = 1005;
/// Organization distributing the package.
pub const TAG_VENDOR: u32 = 1011;
/// License of the packaged software.
pub const TAG_LICENSE: u32 = 1014;
/// Project homepage.
pub const TAG_URL: u32 = 1020;

/// Base of the signature tags that were renumbered into the low range.
pub const SIGNATURE_TAG_BASE: u32 = 256;
/// Combined size of the metadata header and the compressed payload.
pub const SIGNATURE_TAG_SIZE: u32 = 1000;
/// MD5 of the metadata header and the compressed payload.
pub const SIGNATURE_TAG_MD5: u32 = 1004;
/// SHA-1 of the metadata header and the compressed payload.
pub const SIGNATURE_TAG_SHA1: u32 = SIGNATURE_TAG_BASE + 13;
