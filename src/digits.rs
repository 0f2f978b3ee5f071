// 🔢 Digit strings and digit sources
// Shared representation used by every engine component.

use crate::error::{CardError, CardResult};
use rand::Rng;

/// Wildcard marker for an unknown digit (input is case-insensitive)
pub const WILDCARD: char = 'x';

/// Parse a literal digit string into digit values (0-9)
pub fn parse_literal(s: &str) -> CardResult<Vec<u8>> {
    s.chars()
        .enumerate()
        .map(|(position, c)| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or(CardError::InvalidDigit { position, found: c })
        })
        .collect()
}

/// Render digit values back into a string
pub fn render(digits: &[u8]) -> String {
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

pub fn is_literal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// DIGIT SOURCES
// ============================================================================

/// Where fill digits come from: random in production, fixed in tests
pub trait DigitSource {
    /// Next digit in 0..=9
    fn next_digit(&mut self) -> u8;
}

impl<D: DigitSource + ?Sized> DigitSource for &mut D {
    fn next_digit(&mut self) -> u8 {
        (**self).next_digit()
    }
}

/// Uniform random digits from any `rand` generator
pub struct RandomDigits<R: Rng>(pub R);

impl<R: Rng> DigitSource for RandomDigits<R> {
    fn next_digit(&mut self) -> u8 {
        self.0.gen_range(0..10)
    }
}

/// Deterministic digit sequence, cycled when exhausted
#[derive(Debug, Clone)]
pub struct FixedDigits {
    digits: Vec<u8>,
    cursor: usize,
}

impl FixedDigits {
    /// Digits outside 0-9 are reduced modulo 10
    pub fn new(digits: &[u8]) -> Self {
        let digits = if digits.is_empty() {
            vec![0]
        } else {
            digits.iter().map(|d| d % 10).collect()
        };
        FixedDigits { digits, cursor: 0 }
    }

    pub fn zeros() -> Self {
        FixedDigits::new(&[0])
    }
}

impl DigitSource for FixedDigits {
    fn next_digit(&mut self) -> u8 {
        let digit = self.digits[self.cursor];
        self.cursor = (self.cursor + 1) % self.digits.len();
        digit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_and_render() {
        let digits = parse_literal("4012").unwrap();
        assert_eq!(digits, vec![4, 0, 1, 2]);
        assert_eq!(render(&digits), "4012");
    }

    #[test]
    fn test_parse_rejects_wildcard() {
        let err = parse_literal("40x2").unwrap_err();
        assert_eq!(err, CardError::InvalidDigit { position: 2, found: 'x' });
    }

    #[test]
    fn test_fixed_digits_cycle() {
        let mut source = FixedDigits::new(&[1, 2, 13]);
        let drawn: Vec<u8> = (0..5).map(|_| source.next_digit()).collect();
        assert_eq!(drawn, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_random_digits_in_range() {
        let mut source = RandomDigits(StdRng::seed_from_u64(7));
        for _ in 0..500 {
            assert!(source.next_digit() <= 9);
        }
    }

    #[test]
    fn test_is_literal() {
        assert!(is_literal("0123456789"));
        assert!(!is_literal(""));
        assert!(!is_literal("12x4"));
    }
}
