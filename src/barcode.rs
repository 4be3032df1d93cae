//! Barcode normalization.
//!
//! Turns a raw barcode string (as typed, scanned, or exported from a
//! spreadsheet) into a [`BarcodeKey`]:
//!
//! - every non-digit character is stripped
//! - the remaining width must be 8, 12, 13 or 14 digits
//! - the GS1 modulo-10 check digit is verified, but a mismatch only tags the
//!   key as [`CheckDigit::Unchecked`]; some suppliers pad codes in ways that
//!   break the check digit and those codes still resolve upstream
//!
//! Identity is the canonical GTIN: EAN-8 stays 8 digits, everything else is
//! left-padded to 14 digits. `"012345678905"`, `"0012345678905"` and
//! `"00012345678905"` are all the same key.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Barcode symbology, derived from the width the code was supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "EAN-8")]
    Ean8,
    #[serde(rename = "UPC-A")]
    UpcA,
    #[serde(rename = "EAN-13")]
    Ean13,
    #[serde(rename = "GTIN-14")]
    Gtin14,
}

impl Format {
    fn from_width(width: usize) -> Option<Self> {
        match width {
            8 => Some(Self::Ean8),
            12 => Some(Self::UpcA),
            13 => Some(Self::Ean13),
            14 => Some(Self::Gtin14),
            _ => None,
        }
    }

    /// Human readable name, as used in report specifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ean8 => "EAN-8",
            Self::UpcA => "UPC-A",
            Self::Ean13 => "EAN-13",
            Self::Gtin14 => "GTIN-14",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the check digit comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckDigit {
    /// Supplied check digit matches the computed one
    Verified,
    /// Supplied check digit does not match; the key is still usable
    Unchecked,
}

/// Why a raw barcode was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("barcode contains no digits")]
    Empty,

    #[error("barcode has {0} digits, expected 8, 12, 13 or 14")]
    InvalidLength(usize),
}

/// A normalized barcode.
///
/// Equality and hashing only consider the canonical GTIN, so the same
/// physical product always maps to the same cache and checkpoint entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeKey {
    digits: String,
    gtin: String,
    format: Format,
    check_digit: CheckDigit,
}

impl BarcodeKey {
    /// The digits as supplied (noise stripped, width preserved).
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Canonical identity used for cache and checkpoint keys.
    pub fn as_str(&self) -> &str {
        &self.gtin
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn check_digit(&self) -> CheckDigit {
        self.check_digit
    }

    pub fn is_verified(&self) -> bool {
        self.check_digit == CheckDigit::Verified
    }

    /// The 13-digit GTIN form (EAN-8 codes are returned as-is).
    ///
    /// GS1 company prefixes are assigned against this form, so prefix
    /// lookups use it.
    pub fn gtin13(&self) -> &str {
        if self.gtin.len() == 14 {
            &self.gtin[1..]
        } else {
            &self.gtin
        }
    }
}

impl PartialEq for BarcodeKey {
    fn eq(&self, other: &Self) -> bool {
        self.gtin == other.gtin
    }
}

impl Eq for BarcodeKey {}

impl Hash for BarcodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.gtin.hash(state);
    }
}

impl fmt::Display for BarcodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// Normalize a raw barcode string.
pub fn normalize(raw: &str) -> Result<BarcodeKey, NormalizeError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let format =
        Format::from_width(digits.len()).ok_or(NormalizeError::InvalidLength(digits.len()))?;

    let check_digit = if check_digit_matches(&digits) {
        CheckDigit::Verified
    } else {
        CheckDigit::Unchecked
    };

    let gtin = match format {
        Format::Ean8 => digits.clone(),
        _ => format!("{:0>14}", digits),
    };

    Ok(BarcodeKey {
        digits,
        gtin,
        format,
        check_digit,
    })
}

/// Compute the GS1 modulo-10 check digit for a payload (all digits except
/// the check digit itself).
///
/// Weights alternate 3, 1, 3, ... starting from the rightmost payload digit,
/// which makes leading zeros irrelevant.
pub fn compute_check_digit(payload: &str) -> Option<u8> {
    let mut sum = 0u32;
    for (i, c) in payload.chars().rev().enumerate() {
        let d = c.to_digit(10)?;
        sum += if i % 2 == 0 { d * 3 } else { d };
    }
    Some(((10 - sum % 10) % 10) as u8)
}

fn check_digit_matches(digits: &str) -> bool {
    let (payload, check) = digits.split_at(digits.len() - 1);
    let Some(supplied) = check.chars().next().and_then(|c| c.to_digit(10)) else {
        return false;
    };
    compute_check_digit(payload) == Some(supplied as u8)
}


/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn valid_width_digits() -> impl Strategy<Value = String> {
        prop_oneof![
            "[0-9]{8}",
            "[0-9]{12}",
            "[0-9]{13}",
            "[0-9]{14}",
        ]
    }

    proptest! {
        /// Normalizing the same input twice gives the same key
        #[test]
        fn normalize_is_deterministic(input in valid_width_digits()) {
            let a = normalize(&input).unwrap();
            let b = normalize(&input).unwrap();
            prop_assert_eq!(a.as_str(), b.as_str());
            prop_assert_eq!(a.format(), b.format());
            prop_assert_eq!(a.check_digit(), b.check_digit());
        }

        /// Normalizing a key's canonical form returns the same key
        #[test]
        fn normalize_is_idempotent(input in valid_width_digits()) {
            let key = normalize(&input).unwrap();
            let again = normalize(key.as_str()).unwrap();
            prop_assert_eq!(&key, &again);
            prop_assert_eq!(key.check_digit(), again.check_digit());
        }

        /// Zero-padding 12/13 digit codes to 14 digits never changes identity
        #[test]
        fn padding_to_gtin14_keeps_identity(
            input in prop_oneof!["[0-9]{12}", "[0-9]{13}"],
        ) {
            let key = normalize(&input).unwrap();
            let padded = normalize(&format!("{:0>14}", input)).unwrap();
            prop_assert_eq!(&key, &padded);
            prop_assert_eq!(key.check_digit(), padded.check_digit());
        }

        /// A computed check digit always verifies
        #[test]
        fn computed_check_digit_verifies(payload in "[0-9]{12}") {
            let check = compute_check_digit(&payload).unwrap();
            let key = normalize(&format!("{}{}", payload, check)).unwrap();
            prop_assert!(key.is_verified());
        }
    }
}
