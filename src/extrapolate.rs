// 🧬 Extrapolator
// Mutates the account-identifier segment of a known card and re-solves the check digit.

use crate::checksum::check_digit_of;
use crate::digits::{parse_literal, render, DigitSource, WILDCARD};
use crate::error::{CardError, CardResult};
use crate::record::CardRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_EXTRAPOLATIONS: usize = 10;

/// Half-open span of digit positions to randomise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRange {
    pub start: usize,
    pub end: usize,
}

impl MaskRange {
    /// Issuer-specific segment of a 16-digit number: keeps the BIN (0-5) and the last four
    pub const DEFAULT: MaskRange = MaskRange { start: 6, end: 12 };

    pub fn new(start: usize, end: usize) -> Self {
        MaskRange { start, end }
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.start..self.end).contains(&position)
    }

    pub fn validate(&self, len: usize) -> CardResult<()> {
        if self.start >= self.end || self.end > len {
            return Err(CardError::InvalidRange {
                start: self.start,
                end: self.end,
                len,
            });
        }
        Ok(())
    }
}

impl Default for MaskRange {
    fn default() -> Self {
        MaskRange::DEFAULT
    }
}

/// `count` variants of `seed`.
///
/// Digits inside `mask` are redrawn, the rest copied from the seed, and the final digit is
/// always overwritten with a freshly computed check digit. Expiry and code are kept.
pub fn extrapolate<D: DigitSource>(
    seed: &CardRecord,
    count: usize,
    mask: MaskRange,
    mut source: D,
) -> CardResult<Vec<CardRecord>> {
    let seed_digits = parse_literal(&seed.number)?;
    mask.validate(seed_digits.len())?;
    let last = seed_digits.len() - 1;

    debug!(
        seed = %seed.number,
        start = mask.start,
        end = mask.end,
        count,
        "extrapolating card"
    );

    let batch = (0..count)
        .map(|_| {
            let mut digits: Vec<u8> = seed_digits
                .iter()
                .enumerate()
                .map(|(i, &d)| if mask.contains(i) { source.next_digit() } else { d })
                .collect();
            digits[last] = check_digit_of(&digits[..last]);
            seed.with_number(render(&digits))
        })
        .collect();

    Ok(batch)
}

/// Ladder of templates from a known number: the first `known` digits (6 through 12)
/// followed by wildcards up to the full length
pub fn prefix_patterns(number: &str) -> Vec<String> {
    let len = number.chars().count();
    (6..=12)
        .filter(|known| *known <= len)
        .map(|known| {
            let mut pattern: String = number.chars().take(known).collect();
            pattern.extend(std::iter::repeat(WILDCARD).take(len - known));
            pattern
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::is_valid;
    use crate::digits::{FixedDigits, RandomDigits};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seed() -> CardRecord {
        "4833160095772767|04|20|858".parse().unwrap()
    }

    #[test]
    fn test_extrapolate_scenario() {
        let seed = seed();
        let batch = extrapolate(
            &seed,
            DEFAULT_EXTRAPOLATIONS,
            MaskRange::default(),
            RandomDigits(StdRng::seed_from_u64(11)),
        )
        .unwrap();

        assert_eq!(batch.len(), 10);
        for record in &batch {
            assert_eq!(record.number.len(), 16);
            assert_eq!(&record.number[..6], "483316");
            assert_eq!(&record.number[12..15], "276");
            assert_eq!(record.month, "04");
            assert_eq!(record.year, "20");
            assert_eq!(record.security_code, "858");
            assert!(is_valid(&record.number));
        }
    }

    #[test]
    fn test_checksum_recomputed_outside_mask() {
        // Seed check digit is deliberately wrong
        let seed: CardRecord = "4111111111111112|01|2030|123".parse().unwrap();
        let batch = extrapolate(&seed, 1, MaskRange::new(6, 8), FixedDigits::new(&[1])).unwrap();
        assert_eq!(batch[0].number, "4111111111111111");
    }

    #[test]
    fn test_mask_covering_check_digit() {
        let seed = seed();
        let batch = extrapolate(&seed, 5, MaskRange::new(10, 16), FixedDigits::new(&[9, 3])).unwrap();
        for record in batch {
            assert!(is_valid(&record.number));
            assert_eq!(&record.number[..10], "4833160095");
        }
    }

    #[test]
    fn test_invalid_ranges() {
        let seed = seed();
        for (start, end) in [(6, 6), (8, 6), (10, 17)] {
            let err = extrapolate(&seed, 1, MaskRange::new(start, end), FixedDigits::zeros())
                .unwrap_err();
            assert_eq!(err, CardError::InvalidRange { start, end, len: 16 });
        }
    }

    #[test]
    fn test_prefix_patterns() {
        let patterns = prefix_patterns("4833160095772767");
        assert_eq!(patterns.len(), 7);
        assert_eq!(patterns[0], "483316xxxxxxxxxx");
        assert_eq!(patterns[6], "483316009577xxxx");
        assert!(patterns.iter().all(|p| p.len() == 16));
    }

    proptest! {
        #[test]
        fn extrapolations_keep_unmasked_digits(
            body in "[0-9]{15}",
            start in 0usize..15,
            width in 1usize..=16,
            seed_value in any::<u64>(),
        ) {
            let end = (start + width).min(16);
            let number = crate::checksum::repair(&format!("{}0", body)).unwrap();
            let seed = CardRecord::new(number.clone(), "12".into(), "2030".into(), "321".into());
            let mask = MaskRange::new(start, end);

            let batch = extrapolate(&seed, 5, mask, RandomDigits(StdRng::seed_from_u64(seed_value))).unwrap();
            for record in batch {
                prop_assert!(is_valid(&record.number));
                for (i, (a, b)) in record.number.chars().zip(number.chars()).enumerate().take(15) {
                    if !mask.contains(i) {
                        prop_assert_eq!(a, b);
                    }
                }
            }
        }
    }
}
