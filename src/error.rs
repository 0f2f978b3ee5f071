// ⚠️ Engine errors
// Every failure of the numeric engine is local and recoverable: callers get a value back,
// never a panic.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// Template has a bad character or a length outside the accepted bounds
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Similarity extraction on numbers of different length
    #[error("length mismatch: {left} digits vs {right} digits")]
    LengthMismatch { left: usize, right: usize },

    /// Pipe-delimited record that doesn't split into number|month|year|code
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Mask range outside [0, length) or empty
    #[error("invalid mask range {start}..{end} for a {len}-digit number")]
    InvalidRange { start: usize, end: usize, len: usize },

    /// Checksum requested over an empty digit string
    #[error("empty digit string")]
    EmptyInput,

    /// Non-digit character where only literal digits are allowed
    #[error("invalid digit {found:?} at position {position}")]
    InvalidDigit { position: usize, found: char },
}

pub type CardResult<T> = std::result::Result<T, CardError>;
