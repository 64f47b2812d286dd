//! Hex colours and the colour scales used by the views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scale::{ContinuousScale, ScaleKind};

/// An sRGB colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Straight RGB interpolation, `t` clamped to `0..=1`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn interpolate(self, other: Self, t: f64) -> Self {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let channel = |a: u8, b: u8| {
            (f64::from(b) - f64::from(a))
                .mul_add(t, f64::from(a))
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = InvalidColourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidColourError { raw: s.to_string() };
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl TryFrom<String> for Rgb {
    type Error = InvalidColourError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Error returned for anything but `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidColourError {
    pub raw: String,
}

impl fmt::Display for InvalidColourError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid colour '{}': expected #rrggbb", self.raw)
    }
}

impl std::error::Error for InvalidColourError {}

/// Two-colour ramp over a continuous domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequentialScale {
    scale: ContinuousScale,
    low: Rgb,
    high: Rgb,
}

impl SequentialScale {
    #[must_use]
    pub const fn new(kind: ScaleKind, domain: (f64, f64), low: Rgb, high: Rgb) -> Self {
        Self {
            scale: ContinuousScale::new(kind, domain, (0.0, 1.0)),
            low,
            high,
        }
    }

    #[must_use]
    pub fn colour(&self, value: f64) -> Rgb {
        self.low.interpolate(self.high, self.scale.normalize(value))
    }
}

/// Three-colour ramp with a fixed midpoint, clamped at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergingScale {
    domain: (f64, f64, f64),
    colours: (Rgb, Rgb, Rgb),
}

impl DivergingScale {
    #[must_use]
    pub const fn new(domain: (f64, f64, f64), low: Rgb, mid: Rgb, high: Rgb) -> Self {
        Self {
            domain,
            colours: (low, mid, high),
        }
    }

    #[must_use]
    pub fn colour(&self, value: f64) -> Rgb {
        let (lo, mid, hi) = self.domain;
        let (low, centre, high) = self.colours;
        if value <= mid {
            let span = mid - lo;
            let t = if span > 0.0 { (value - lo) / span } else { 1.0 };
            low.interpolate(centre, t)
        } else {
            let span = hi - mid;
            let t = if span > 0.0 { (value - mid) / span } else { 0.0 };
            centre.interpolate(high, t)
        }
    }
}

/// Assigns palette colours to category names in domain order, cycling
/// when the domain outgrows the palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalScale {
    assigned: BTreeMap<String, Rgb>,
}

impl OrdinalScale {
    #[must_use]
    pub fn new<I, S>(domain: I, palette: &[Rgb]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut assigned = BTreeMap::new();
        if !palette.is_empty() {
            for name in domain {
                let next = palette[assigned.len() % palette.len()];
                assigned.entry(name.into()).or_insert(next);
            }
        }
        Self { assigned }
    }

    /// Colour of `name`, or `None` for a name outside the domain.
    #[must_use]
    pub fn colour(&self, name: &str) -> Option<Rgb> {
        self.assigned.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(s: &str) -> Rgb {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_formats_hex() {
        let colour = rgb("#0E1031");
        assert_eq!(colour, Rgb::new(0x0e, 0x10, 0x31));
        assert_eq!(colour.to_string(), "#0e1031");
        assert!("0e1031".parse::<Rgb>().is_err());
        assert!("#0e103".parse::<Rgb>().is_err());
        assert!("#zz1031".parse::<Rgb>().is_err());
    }

    #[test]
    fn sequential_endpoints() {
        let scale =
            SequentialScale::new(ScaleKind::Sqrt, (0.0, 4.0), rgb("#fdf6c1"), rgb("#0e1031"));
        assert_eq!(scale.colour(0.0), rgb("#fdf6c1"));
        assert_eq!(scale.colour(4.0), rgb("#0e1031"));
        assert_eq!(scale.colour(1.0), rgb("#fdf6c1").interpolate(rgb("#0e1031"), 0.5));
    }

    #[test]
    fn diverging_is_centred() {
        let scale = DivergingScale::new(
            (0.0, 0.5, 1.0),
            rgb("#2166ac"),
            rgb("#f7f7f7"),
            rgb("#b2182b"),
        );
        assert_eq!(scale.colour(0.5), rgb("#f7f7f7"));
        assert_eq!(scale.colour(-1.0), rgb("#2166ac"));
        assert_eq!(scale.colour(2.0), rgb("#b2182b"));
    }

    #[test]
    fn ordinal_is_keyed_by_name() {
        let palette = [rgb("#e15759"), rgb("#f28e2c")];
        let scale = OrdinalScale::new(["other", "indian", "other", "asian"], &palette);
        assert_eq!(scale.colour("other"), Some(palette[0]));
        assert_eq!(scale.colour("indian"), Some(palette[1]));
        assert_eq!(scale.colour("asian"), Some(palette[0]));
        assert_eq!(scale.colour("black"), None);
    }
}
