//! Vendor status codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code reported by the archive service or its SDK.
///
/// `0` means success. Every other value is vendor-defined and is passed through to the
/// caller unmodified; this crate never reinterprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(i32);

impl StatusCode {
    /// The success status.
    pub const OK: StatusCode = StatusCode(0);

    #[inline]
    #[must_use]
    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for StatusCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
