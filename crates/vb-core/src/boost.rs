//! Boost percentages
//!
//! A boost is an integer percentage of unity gain: 100 leaves the audio
//! unchanged, 0 mutes it and 600 is the ceiling. Every constructor clamps, so
//! a `Boost` held anywhere in the engine is always in range.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_BOOST: u16 = 0;
pub const MAX_BOOST: u16 = 600;
pub const DEFAULT_BOOST: u16 = 100;

/// Clamped boost percentage in `[0, 600]`.
///
/// Deserializes from any JSON number (fractional values are truncated and
/// out-of-range values clamped) and serializes as a plain integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "u16")]
pub struct Boost(u16);

impl Boost {
    pub const MIN: Self = Self(MIN_BOOST);
    pub const MAX: Self = Self(MAX_BOOST);
    pub const DEFAULT: Self = Self(DEFAULT_BOOST);

    /// Clamp an integer into range.
    #[inline]
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(MIN_BOOST as i64, MAX_BOOST as i64) as u16)
    }

    /// Truncate and clamp a float. Returns `None` for NaN.
    #[inline]
    pub fn from_f64(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        // `as` saturates on infinities
        Some(Self::clamped(value.trunc() as i64))
    }

    /// Parse user input the way a number field reports it: optional leading
    /// whitespace and sign, then digits. Anything after the digits is ignored,
    /// so `"150.7"` reads as 150. Returns `None` when no digit is present.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let (negative, digits) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let mut value: i64 = 0;
        let mut seen_digit = false;
        for b in digits.bytes() {
            if !b.is_ascii_digit() {
                break;
            }
            seen_digit = true;
            value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
        }

        if !seen_digit {
            return None;
        }
        Some(Self::clamped(if negative { -value } else { value }))
    }

    #[inline]
    pub const fn percent(self) -> u16 {
        self.0
    }

    /// Linear gain multiplier for the audio graph (100% = 1.0).
    #[inline]
    pub fn gain(self) -> f32 {
        self.0 as f32 / 100.0
    }

    #[inline]
    pub const fn is_default(self) -> bool {
        self.0 == DEFAULT_BOOST
    }
}

impl Default for Boost {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<f64> for Boost {
    fn from(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_default()
    }
}

impl From<Boost> for u16 {
    fn from(boost: Boost) -> Self {
        boost.0
    }
}

impl fmt::Display for Boost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
