// 🔍 Pattern Extractor
// Compares two card numbers and keeps only the digits they share.

use crate::digits::WILDCARD;
use crate::error::{CardError, CardResult};
use crate::record::CardRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Shared-digit mask plus the first record's expiry and code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityPattern {
    pub pattern: String,
    pub month: String,
    pub year: String,
    pub security_code: String,
}

impl SimilarityPattern {
    pub fn shared_digits(&self) -> usize {
        self.pattern.chars().filter(|c| *c != WILDCARD).count()
    }

    /// All positions differ
    pub fn is_disjoint(&self) -> bool {
        self.shared_digits() == 0
    }
}

impl fmt::Display for SimilarityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.pattern, self.month, self.year, self.security_code
        )
    }
}

fn digits_only(s: &str) -> Vec<char> {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Position-wise mask: equal digits kept, differing digits become `x`.
///
/// Separators such as spaces or dashes are dropped before comparing.
pub fn extract_pattern(a: &str, b: &str) -> CardResult<String> {
    let (a, b) = (digits_only(a), digits_only(b));
    if a.len() != b.len() {
        return Err(CardError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    Ok(a.iter()
        .zip(&b)
        .map(|(x, y)| if x == y { *x } else { WILDCARD })
        .collect())
}

/// Record-level extraction.
///
/// Expiry and security code come from `a` only; `b` contributes nothing but its number.
pub fn extract_record_pattern(a: &CardRecord, b: &CardRecord) -> CardResult<SimilarityPattern> {
    let pattern = extract_pattern(&a.number, &b.number)?;
    debug!(pattern = %pattern, "extracted similarity pattern");

    Ok(SimilarityPattern {
        pattern,
        month: a.month.clone(),
        year: a.year.clone(),
        security_code: a.security_code.clone(),
    })
}
