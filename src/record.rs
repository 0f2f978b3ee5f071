// 💳 Card records - number|month|year|code
// Wire format shared by the generator, the extractor and the extrapolator.

use crate::digits::is_literal;
use crate::error::CardError;
use crate::template::{MAX_CARD_LEN, MIN_CARD_LEN};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;

pub const FIELD_SEPARATOR: char = '|';

/// Years expire at most this far in the future when generated
pub const MAX_EXPIRY_YEARS_AHEAD: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub number: String,
    pub month: String,
    pub year: String,
    pub security_code: String,
}

impl CardRecord {
    pub fn new(number: String, month: String, year: String, security_code: String) -> Self {
        CardRecord {
            number,
            month,
            year,
            security_code,
        }
    }

    /// Same expiry and code, different number
    pub fn with_number(&self, number: String) -> Self {
        CardRecord {
            number,
            ..self.clone()
        }
    }
}

fn all_digits_between(s: &str, min: usize, max: usize) -> bool {
    is_literal(s) && (min..=max).contains(&s.len())
}

impl FromStr for CardRecord {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() != 4 {
            return Err(CardError::MalformedRecord(format!(
                "expected number|month|year|code, got {} field(s)",
                fields.len()
            )));
        }

        let (number, month, year, code) = (fields[0], fields[1], fields[2], fields[3]);

        if !all_digits_between(number, MIN_CARD_LEN, MAX_CARD_LEN) {
            return Err(CardError::MalformedRecord(format!(
                "number must be {}-{} digits, got {:?}",
                MIN_CARD_LEN, MAX_CARD_LEN, number
            )));
        }
        let month_ok = all_digits_between(month, 1, 2)
            && month.parse::<u32>().map_or(false, |m| (1..=12).contains(&m));
        if !month_ok {
            return Err(CardError::MalformedRecord(format!("bad month {:?}", month)));
        }
        if !(is_literal(year) && (year.len() == 2 || year.len() == 4)) {
            return Err(CardError::MalformedRecord(format!("bad year {:?}", year)));
        }
        if !all_digits_between(code, 3, 4) {
            return Err(CardError::MalformedRecord(format!(
                "security code must be 3-4 digits, got {:?}",
                code
            )));
        }

        Ok(CardRecord::new(
            number.to_string(),
            month.to_string(),
            year.to_string(),
            code.to_string(),
        ))
    }
}

impl fmt::Display for CardRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.number, self.month, self.year, self.security_code
        )
    }
}

/// One record per line
pub fn format_batch(records: &[CardRecord]) -> String {
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Export records as CSV with a header row
pub fn write_csv<W: io::Write>(records: &[CardRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record).context("Failed to serialize card record")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

// ============================================================================
// EXPIRY & SECURITY CODE
// ============================================================================

fn full_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

/// Expiry (month, year) not earlier than `today`'s month.
///
/// A supplied month outside 1-12 is replaced by a random one. A missing or past year is
/// replaced by one 1-5 years ahead. Two-digit years read as 20YY and the year is always
/// returned with four digits.
pub fn generate_expiry<R: Rng>(
    month: Option<&str>,
    year: Option<&str>,
    today: NaiveDate,
    rng: &mut R,
) -> (String, String) {
    let current_year = today.year();
    let current_month = today.month();

    let month = month
        .and_then(|m| m.trim().parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .unwrap_or_else(|| rng.gen_range(1..=12));

    let mut year = year
        .and_then(|y| y.trim().parse::<i32>().ok())
        .map(full_year)
        .unwrap_or_else(|| current_year + rng.gen_range(1..=MAX_EXPIRY_YEARS_AHEAD));

    if year < current_year || (year == current_year && month < current_month) {
        year = current_year + rng.gen_range(1..=MAX_EXPIRY_YEARS_AHEAD);
    }

    (format!("{:02}", month), year.to_string())
}

/// A supplied 3-4 digit code is kept; otherwise a random 3-digit code
pub fn generate_security_code<R: Rng>(custom: Option<&str>, rng: &mut R) -> String {
    match custom.map(str::trim) {
        Some(code) if all_digits_between(code, 3, 4) => code.to_string(),
        _ => rng.gen_range(100..=999).to_string(),
    }
}
