// 🧩 Card templates
// A BIN with optional wildcard positions plus the total length to synthesise.

use crate::digits::WILDCARD;
use crate::error::{CardError, CardResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_TEMPLATE_LEN: usize = 6;
pub const MAX_TEMPLATE_LEN: usize = 16;
pub const MIN_CARD_LEN: usize = 13;
pub const MAX_CARD_LEN: usize = 19;
pub const DEFAULT_CARD_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Literal(u8),
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    slots: Vec<Slot>,
    target_length: usize,
}

impl CardTemplate {
    /// Parse a BIN template such as `456331` or `4915xx01` for a given total length
    pub fn parse(bin: &str, target_length: usize) -> CardResult<Self> {
        let bin = bin.trim();
        let len = bin.chars().count();

        if !(MIN_TEMPLATE_LEN..=MAX_TEMPLATE_LEN).contains(&len) {
            return Err(CardError::InvalidTemplate(format!(
                "template must have {}-{} characters, got {}",
                MIN_TEMPLATE_LEN, MAX_TEMPLATE_LEN, len
            )));
        }
        if !(MIN_CARD_LEN..=MAX_CARD_LEN).contains(&target_length) {
            return Err(CardError::InvalidTemplate(format!(
                "target length must be {}-{}, got {}",
                MIN_CARD_LEN, MAX_CARD_LEN, target_length
            )));
        }
        if len > target_length {
            return Err(CardError::InvalidTemplate(format!(
                "template of {} characters is longer than target length {}",
                len, target_length
            )));
        }

        let slots = bin
            .chars()
            .map(|c| match c {
                '0'..='9' => Ok(Slot::Literal(c as u8 - b'0')),
                'x' | 'X' => Ok(Slot::Wildcard),
                other => Err(CardError::InvalidTemplate(format!(
                    "unexpected character {:?}",
                    other
                ))),
            })
            .collect::<CardResult<Vec<_>>>()?;

        Ok(CardTemplate {
            slots,
            target_length,
        })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn wildcard_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Wildcard).count()
    }

    /// Leading literal digits before the first wildcard (the effective BIN)
    pub fn literal_prefix(&self) -> String {
        self.slots
            .iter()
            .map_while(|s| match s {
                Slot::Literal(d) => Some(char::from(b'0' + d)),
                Slot::Wildcard => None,
            })
            .collect()
    }
}

impl FromStr for CardTemplate {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardTemplate::parse(s, DEFAULT_CARD_LEN)
    }
}

impl fmt::Display for CardTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in &self.slots {
            match slot {
                Slot::Literal(d) => write!(f, "{}", d)?,
                Slot::Wildcard => write!(f, "{}", WILDCARD)?,
            }
        }
        Ok(())
    }
}
