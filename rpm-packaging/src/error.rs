// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum RpmError {
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("binary parsing error: {0}")]
    Scroll(#[from] scroll::Error),

    #[error("cpio error: {0}")]
    Cpio(#[from] cpio_archive::Error),

    #[error("lead does not begin with RPM magic")]
    BadLeadMagic,

    #[error("header section does not begin with header magic")]
    BadHeaderMagic,

    #[error("header section is truncated")]
    HeaderTruncated,

    #[error("header entry for tag {0} points outside the data store")]
    HeaderEntryOutOfBounds(u32),

    #[error("unknown header entry type: {0}")]
    UnknownEntryType(u32),

    #[error("header entry for tag {tag} has unsupported type {entry_type} with count {count}")]
    UnsupportedEntry {
        tag: u32,
        entry_type: u32,
        count: u32,
    },

    #[error("string value for tag {0} is not NUL terminated")]
    StringNotTerminated(u32),

    #[error("string value for tag {0} is not valid UTF-8")]
    Utf8(u32),

    #[error("required header tag missing: {0}")]
    MissingTag(u32),

    #[error("value does not fit in {0}: {1}")]
    ValueOverflow(&'static str, u64),

    #[error("{0} digest mismatch: signature has {1}; content has {2}")]
    DigestMismatch(&'static str, String, String),

    #[error("content length mismatch: signature has {expected}; content has {actual}")]
    LengthMismatch { expected: u64, actual: u64 },
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, RpmError>;
