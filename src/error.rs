//! Typed error categories for the editing engine.
//!
//! `std::io::ErrorKind` has no way to distinguish "caller passed bad
//! arguments" from "arithmetic would overflow" from "the unique-pts/dts
//! budget ran out", so instead of layering on top of [`std::io::Error`] this
//! crate defines its own small enum: one variant per category, each carrying
//! a message for context. [`Error::exit_code`] gives the stable mapping used
//! by platform front-ends, and is what `main`'s top-level error handler
//! consults to set the process exit status.

use std::fmt;

/// Construct an [`Error`] with a formatted message, mirroring the
/// `ioerr!(ErrorKind, "...")` convention used for `std::io::Error` elsewhere
/// in this toolchain.
#[macro_export]
macro_rules! error {
    ($kind:ident, $fmt:expr) => {
        $crate::Error::$kind(format!($fmt))
    };
    ($kind:ident, $fmt:expr, $($arg:tt)*) => {
        $crate::Error::$kind(format!($fmt, $($arg)*))
    };
}

/// All errors the engine can report, one variant per category in the design.
#[derive(Debug)]
pub enum Error {
    /// Caller-supplied parameters violate the contract.
    InvalidArguments(String),
    /// Input data violates an internal invariant.
    Invalid(String),
    /// Valid but out-of-support input.
    Unsupported(String),
    /// Arithmetic would overflow `i64` or `u32`.
    Overflow(String),
    /// Index access outside a track view's bounds.
    OutOfRange(String),
    /// Unique-pts/dts enforcement exceeded its adjustment budget.
    Unsafe(String),
    /// Demuxer/collaborator setup failed before the engine ran.
    Uninitialized(String),
    /// The underlying `Reader` could not satisfy a read.
    ReaderError(String),
    /// The input has no audio or video track where one was required.
    NoTrack(String),
    /// Settings (codec/dimension/orientation/SPS+PPS/timescale) mismatch
    /// between tracks being stitched together.
    SettingsMismatch(String),
}

impl Error {
    /// Stable exit-status mapping for platform front-ends.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Unsupported(_) => 128,
            Error::Overflow(_) => 128,
            Error::OutOfRange(_) => 128,
            Error::Unsafe(_) => 128,
            Error::NoTrack(_) => 129,
            Error::SettingsMismatch(_) => 130,
            Error::InvalidArguments(_) => 131,
            Error::Uninitialized(_) => 132,
            Error::ReaderError(_) => 132,
            Error::Invalid(_) => 133,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArguments(msg) => write!(f, "invalid arguments: {}", msg),
            Error::Invalid(msg) => write!(f, "invalid input: {}", msg),
            Error::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            Error::Overflow(msg) => write!(f, "overflow: {}", msg),
            Error::OutOfRange(msg) => write!(f, "out of range: {}", msg),
            Error::Unsafe(msg) => write!(f, "unsafe: {}", msg),
            Error::Uninitialized(msg) => write!(f, "uninitialized: {}", msg),
            Error::ReaderError(msg) => write!(f, "reader error: {}", msg),
            Error::NoTrack(msg) => write!(f, "no track: {}", msg),
            Error::SettingsMismatch(msg) => write!(f, "settings mismatch: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::ReaderError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
