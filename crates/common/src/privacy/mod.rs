//! Privacy Module
//!
//! Helpers that keep credentials out of logs, debug listings and error
//! pages. States, session values, authorization codes and tokens are only
//! ever rendered through [`redact`] or [`Redacted`].

use std::fmt;

/// Number of leading characters kept by [`redact`].
pub const REDACT_PREFIX_CHARS: usize = 8;

const REDACT_SUFFIX: &str = "...";

/// Keep at most the first eight characters of `value` and append `...`.
///
/// Truncation respects character boundaries.
#[must_use]
pub fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(REDACT_PREFIX_CHARS).collect();
    format!("{prefix}{REDACT_SUFFIX}")
}

/// `Display` adapter that renders a value through [`redact`] lazily.
///
/// ```
/// use authgate_common::privacy::Redacted;
///
/// let line = format!("state={}", Redacted("s3cr3t-state-value"));
/// assert_eq!(line, "state=s3cr3t-s...");
/// ```
#[derive(Clone, Copy)]
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars().take(REDACT_PREFIX_CHARS) {
            fmt::Write::write_char(f, ch)?;
        }
        f.write_str(REDACT_SUFFIX)
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
