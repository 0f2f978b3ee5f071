// ✅ Checksum Module - Luhn (modulus-10) check digit
// Leaf component: the synthesizer and the extrapolator both append/overwrite through here.

use crate::digits::{parse_literal, render};
use crate::error::{CardError, CardResult};

/// Weighted Luhn sum.
///
/// `double_last` selects whether the rightmost digit of `digits` is doubled: true when
/// solving for a digit that will be appended, false when the check digit is already in
/// place.
fn luhn_sum(digits: &[u8], double_last: bool) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let doubled = (i % 2 == 0) == double_last;
            let mut v = d as u32;
            if doubled {
                v *= 2;
                if v > 9 {
                    v -= 9;
                }
            }
            v
        })
        .sum()
}

/// Check digit for already-parsed digit values
pub fn check_digit_of(partial: &[u8]) -> u8 {
    let sum = luhn_sum(partial, true);
    ((10 - sum % 10) % 10) as u8
}

/// Check digit that makes `partial + digit` valid
pub fn compute_check_digit(partial: &str) -> CardResult<u8> {
    if partial.is_empty() {
        return Err(CardError::EmptyInput);
    }
    let digits = parse_literal(partial)?;
    Ok(check_digit_of(&digits))
}

/// Luhn validity over a full number, check digit included.
///
/// Empty or non-digit input is never valid.
pub fn is_valid(number: &str) -> bool {
    match parse_literal(number) {
        Ok(digits) if !digits.is_empty() => luhn_sum(&digits, false) % 10 == 0,
        _ => false,
    }
}

/// Overwrite the trailing digit with the correct check digit
pub fn repair(number: &str) -> CardResult<String> {
    let mut digits = parse_literal(number)?;
    if digits.len() < 2 {
        return Err(CardError::EmptyInput);
    }
    let last = digits.len() - 1;
    digits[last] = check_digit_of(&digits[..last]);
    Ok(render(&digits))
}
