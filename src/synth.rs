// 🏭 Template Synthesizer
// Expands a BIN template into full, checksum-valid card numbers.
//
// The check digit is always appended, never drawn: every output is valid by construction
// so there is no resampling loop.

use crate::checksum::check_digit_of;
use crate::digits::{render, DigitSource, RandomDigits};
use crate::error::CardResult;
use crate::record::{generate_expiry, generate_security_code, CardRecord};
use crate::template::{CardTemplate, Slot, DEFAULT_CARD_LEN};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_QUANTITY: usize = 10;

/// One number from the template.
///
/// Wildcards and padding up to `target_length - 1` draw from `source`; a template that
/// already reaches `target_length - 1` is truncated before the check digit is appended.
pub fn synthesize_number<D: DigitSource>(template: &CardTemplate, source: &mut D) -> String {
    let body_len = template.target_length() - 1;
    let mut digits: Vec<u8> = Vec::with_capacity(template.target_length());

    for slot in template.slots().iter().take(body_len) {
        digits.push(match slot {
            Slot::Literal(d) => *d,
            Slot::Wildcard => source.next_digit(),
        });
    }
    while digits.len() < body_len {
        digits.push(source.next_digit());
    }

    let check = check_digit_of(&digits);
    digits.push(check);
    render(&digits)
}

/// `count` independent numbers from the same template
pub fn synthesize<D: DigitSource>(
    template: &CardTemplate,
    count: usize,
    mut source: D,
) -> Vec<String> {
    debug!(
        template = %template,
        bin = %template.literal_prefix(),
        wildcards = template.wildcard_count(),
        count,
        "synthesizing card numbers"
    );
    (0..count)
        .map(|_| synthesize_number(template, &mut source))
        .collect()
}

// ============================================================================
// FULL RECORD GENERATION
// ============================================================================

fn default_quantity() -> usize {
    DEFAULT_QUANTITY
}

fn default_target_length() -> usize {
    DEFAULT_CARD_LEN
}

/// Generator form: BIN plus optional expiry and code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub bin: String,

    #[serde(default)]
    pub month: Option<String>,

    #[serde(default)]
    pub year: Option<String>,

    /// Fixed code for every record; random per record when absent or invalid
    #[serde(default)]
    pub security_code: Option<String>,

    #[serde(default = "default_quantity")]
    pub quantity: usize,

    #[serde(default = "default_target_length")]
    pub target_length: usize,
}

impl GenerateRequest {
    pub fn new(bin: &str) -> Self {
        GenerateRequest {
            bin: bin.to_string(),
            month: None,
            year: None,
            security_code: None,
            quantity: DEFAULT_QUANTITY,
            target_length: DEFAULT_CARD_LEN,
        }
    }
}

/// Complete records for a generator request.
///
/// The expiry is resolved once per batch; the security code is per record unless fixed.
pub fn generate_records<R: Rng>(
    request: &GenerateRequest,
    rng: &mut R,
    today: NaiveDate,
) -> CardResult<Vec<CardRecord>> {
    let template = CardTemplate::parse(&request.bin, request.target_length)?;
    let (month, year) = generate_expiry(
        request.month.as_deref(),
        request.year.as_deref(),
        today,
        rng,
    );

    debug!(
        bin = %template,
        quantity = request.quantity,
        month = %month,
        year = %year,
        "generating card records"
    );

    let records = (0..request.quantity)
        .map(|_| {
            let number = synthesize_number(&template, &mut RandomDigits(&mut *rng));
            let code = generate_security_code(request.security_code.as_deref(), rng);
            CardRecord::new(number, month.clone(), year.clone(), code)
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::is_valid;
    use crate::digits::FixedDigits;
    use crate::error::CardError;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zero_fill_scenario() {
        let template = CardTemplate::parse("456331", 16).unwrap();
        let numbers = synthesize(&template, 1, FixedDigits::zeros());
        assert_eq!(numbers, vec!["4563310000000004".to_string()]);
        assert!(is_valid(&numbers[0]));
    }

    #[test]
    fn test_wildcards_filled_in_order() {
        let template = CardTemplate::parse("4xx331", 16).unwrap();
        let number = synthesize_number(&template, &mut FixedDigits::new(&[7, 8, 0]));
        assert!(number.starts_with("478331"));
        assert_eq!(number.len(), 16);
        assert!(is_valid(&number));
    }

    #[test]
    fn test_prefix_truncated_to_body_length() {
        let template = CardTemplate::parse("4563314563314563", 16).unwrap();
        let number = synthesize_number(&template, &mut FixedDigits::zeros());
        assert_eq!(&number[..15], "456331456331456");
        assert!(is_valid(&number));
    }

    #[test]
    fn test_other_target_lengths() {
        for len in [13, 15, 19] {
            let template = CardTemplate::parse("378282", len).unwrap();
            let numbers = synthesize(&template, 5, RandomDigits(StdRng::seed_from_u64(len as u64)));
            assert_eq!(numbers.len(), 5);
            for n in numbers {
                assert_eq!(n.len(), len);
                assert!(is_valid(&n));
            }
        }
    }

    #[test]
    fn test_generate_records() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut request = GenerateRequest::new("515462xxxx");
        request.month = Some("7".to_string());
        request.year = Some("2029".to_string());
        request.quantity = 25;

        let records = generate_records(&request, &mut rng, today).unwrap();
        assert_eq!(records.len(), 25);
        for r in &records {
            assert!(r.number.starts_with("515462"));
            assert!(is_valid(&r.number));
            assert_eq!(r.month, "07");
            assert_eq!(r.year, "2029");
            assert_eq!(r.security_code.len(), 3);
        }
    }

    #[test]
    fn test_generate_records_fixed_code() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut request = GenerateRequest::new("601100");
        request.security_code = Some("0420".to_string());
        request.quantity = 3;

        let records = generate_records(&request, &mut rng, today).unwrap();
        assert!(records.iter().all(|r| r.security_code == "0420"));
    }

    #[test]
    fn test_generate_records_invalid_bin() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let request = GenerateRequest::new("4563");
        assert!(matches!(
            generate_records(&request, &mut rng, today),
            Err(CardError::InvalidTemplate(_))
        ));
    }

    proptest! {
        #[test]
        fn synthesized_numbers_are_valid(
            bin in "[0-9xX]{6,13}",
            len in 13usize..=19,
            seed in any::<u64>(),
        ) {
            let template = CardTemplate::parse(&bin, len).unwrap();
            let numbers = synthesize(&template, 4, RandomDigits(StdRng::seed_from_u64(seed)));
            for n in numbers {
                prop_assert_eq!(n.len(), len);
                prop_assert!(is_valid(&n));
            }
        }
    }
}
