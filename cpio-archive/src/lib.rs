// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! cpio archive reading and writing.

Only the *New ASCII* format (`newc`) is supported. [NewcBuilder] writes
archives member by member and [NewcReader] reads them back.
*/

pub mod newc;
pub use newc::{NewcBuilder, NewcHeader, NewcReader};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic value encountered")]
    BadMagic,

    #[error("value in header is not an ASCII string")]
    BadHeaderString,

    #[error("string value in header is not in hex: {0}")]
    BadHeaderHex(String),

    #[error("filename could not be decoded")]
    FilenameDecode,

    #[error("value does not fit in header field {0}: {1}")]
    ValueOverflow(&'static str, u64),

    #[error("entry data size mismatch: header declares {expected} bytes; got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("no current archive entry")]
    NoCurrentEntry,
}

/// Result type for this crate.
pub type CpioResult<T> = Result<T, Error>;
