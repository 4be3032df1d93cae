//! Confidence scoring.
//!
//! Confidence is a fixed table over (source tier, enhancement, check digit)
//! so the same inputs always score the same. Values are kept in whole
//! percentage points to avoid float drift.
//!
//! | source tier  | base |   | adjustment            | delta |
//! |--------------|------|---|-----------------------|-------|
//! | Primary      | 90   |   | AI enhancement        | +5    |
//! | Specialized  | 80   |   | local heuristics      | 0     |
//! | WebSearch    | 65   |   | check digit unchecked | -15   |
//! | InputHint    | 40   |   |                       |       |
//! | PrefixTable  | 30   |   |                       |       |

use crate::barcode::CheckDigit;

use super::{EnhancerKind, SourceTier};

fn base_points(tier: SourceTier) -> i32 {
    match tier {
        SourceTier::Primary => 90,
        SourceTier::Specialized => 80,
        SourceTier::WebSearch => 65,
        SourceTier::InputHint => 40,
        SourceTier::PrefixTable => 30,
    }
}

fn enhancement_points(kind: Option<EnhancerKind>) -> i32 {
    match kind {
        Some(EnhancerKind::Ai) => 5,
        Some(EnhancerKind::Local) | None => 0,
    }
}

fn check_digit_points(check: CheckDigit) -> i32 {
    match check {
        CheckDigit::Verified => 0,
        CheckDigit::Unchecked => -15,
    }
}

/// Score a found record, in `[0.0, 1.0]`.
pub fn confidence(tier: SourceTier, enhancement: Option<EnhancerKind>, check: CheckDigit) -> f64 {
    let points =
        base_points(tier) + enhancement_points(enhancement) + check_digit_points(check);
    f64::from(points.clamp(0, 100)) / 100.0
}
