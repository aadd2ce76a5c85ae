//! Length units used by WordprocessingML and their exact conversion to points.
//!
//! Word stores almost every length in twentieths of a point (twips) and
//! border widths in eighths of a point. Both divisors divide 1000, so a
//! converted value is held as an integer count of millipoints and never
//! accumulates floating-point error.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A length in twentieths of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Twips(pub i64);

impl Twips {
    /// `w:sz` and friends are half-points; one half-point is ten twips.
    pub fn from_half_points(half_points: i64) -> Self {
        Twips(half_points.saturating_mul(10))
    }

    pub fn to_points(self) -> Points {
        Points::from_millis(self.0.saturating_mul(50))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Neg for Twips {
    type Output = Twips;

    fn neg(self) -> Twips {
        Twips(self.0.saturating_neg())
    }
}

/// A border width in eighths of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EighthPoints(pub i64);

impl EighthPoints {
    pub fn to_points(self) -> Points {
        Points::from_millis(self.0.saturating_mul(125))
    }
}

/// An exact point value, stored as millipoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Points {
    millis: i64,
}

impl Points {
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn from_whole(points: i64) -> Self {
        Self {
            millis: points.saturating_mul(1000),
        }
    }

    pub fn millis(self) -> i64 {
        self.millis
    }

    pub fn as_f64(self) -> f64 {
        self.millis as f64 / 1000.0
    }

    pub fn is_zero(self) -> bool {
        self.millis == 0
    }
}

/// Shortest exact decimal form followed by `pt`, e.g. `12pt`, `-0.75pt`, `0.125pt`.
impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pt", format_millis(self.millis))
    }
}

/// Render a millis fixed-point integer as the shortest exact decimal.
pub fn format_millis(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    let whole = abs / 1000;
    let frac = abs % 1000;
    if frac == 0 {
        return format!("{}{}", sign, whole);
    }
    let digits = format!("{:03}", frac);
    format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}

/// A unitless ratio `numerator / denominator` rendered with at most three
/// decimals (half-up). Used for `auto` line spacing, which is expressed in
/// 240ths of a line and does not always terminate.
pub fn format_ratio(numerator: i64, denominator: i64) -> Option<String> {
    if denominator == 0 {
        return None;
    }
    let (scaled, denominator) = (i128::from(numerator) * 1000, i128::from(denominator));
    let mut millis = scaled / denominator;
    let remainder = (scaled % denominator).abs() * 2;
    if remainder >= denominator.abs() {
        millis += if (scaled < 0) != (denominator < 0) { -1 } else { 1 };
    }
    let millis = millis.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
    Some(format_millis(millis))
}
