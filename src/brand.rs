// 🏷️ Brand classification by prefix (display only)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
    AmericanExpress,
    DinersClub,
    Discover,
    Jcb,
    Unknown,
}

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardBrand::Visa => "Visa",
            CardBrand::Mastercard => "Mastercard",
            CardBrand::AmericanExpress => "American Express",
            CardBrand::DinersClub => "Diners Club",
            CardBrand::Discover => "Discover",
            CardBrand::Jcb => "JCB",
            CardBrand::Unknown => "Unknown",
        }
    }
}

fn prefix_value(bin: &str, len: usize) -> Option<u32> {
    bin.get(..len).and_then(|p| p.parse().ok())
}

/// Classify a BIN or full number; wildcards after the prefix are fine
pub fn classify(bin: &str) -> CardBrand {
    let bin = bin.trim();
    let two = prefix_value(bin, 2);
    let four = prefix_value(bin, 4);

    if bin.starts_with('4') {
        return CardBrand::Visa;
    }
    match (two, four) {
        (Some(51..=55), _) => CardBrand::Mastercard,
        (Some(34 | 37), _) => CardBrand::AmericanExpress,
        (Some(36 | 38), _) | (_, Some(3095)) => CardBrand::DinersClub,
        (Some(65), _) | (_, Some(6011)) => CardBrand::Discover,
        (_, Some(3528..=3589)) => CardBrand::Jcb,
        _ => CardBrand::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("456331"), CardBrand::Visa);
        assert_eq!(classify("4xxxxx"), CardBrand::Visa);
        assert_eq!(classify("515462"), CardBrand::Mastercard);
        assert_eq!(classify("555555"), CardBrand::Mastercard);
        assert_eq!(classify("378282"), CardBrand::AmericanExpress);
        assert_eq!(classify("340000"), CardBrand::AmericanExpress);
        assert_eq!(classify("361234"), CardBrand::DinersClub);
        assert_eq!(classify("309512"), CardBrand::DinersClub);
        assert_eq!(classify("601100"), CardBrand::Discover);
        assert_eq!(classify("650000"), CardBrand::Discover);
        assert_eq!(classify("353011"), CardBrand::Jcb);
        assert_eq!(classify("560000"), CardBrand::Unknown);
        assert_eq!(classify("5"), CardBrand::Unknown);
        assert_eq!(classify(""), CardBrand::Unknown);
    }

    #[test]
    fn test_brand_labels() {
        assert_eq!(CardBrand::AmericanExpress.as_str(), "American Express");
        assert_eq!(CardBrand::Jcb.as_str(), "JCB");
    }
}
