//! Scales mapping data values to pixel positions and sizes.

use chrono::{Datelike, Days, NaiveDate};
use outage_map_outage_models::YearMonth;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Interpolation used by a [`ContinuousScale`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScaleKind {
    Linear,
    #[default]
    Sqrt,
}

/// A linear or square-root mapping from a domain onto a range.
///
/// A degenerate domain (both ends equal) maps every value to the middle of
/// the range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousScale {
    kind: ScaleKind,
    domain: (f64, f64),
    range: (f64, f64),
}

impl ContinuousScale {
    #[must_use]
    pub const fn new(kind: ScaleKind, domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            kind,
            domain,
            range,
        }
    }

    #[must_use]
    pub const fn linear(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self::new(ScaleKind::Linear, domain, range)
    }

    #[must_use]
    pub const fn sqrt(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self::new(ScaleKind::Sqrt, domain, range)
    }

    fn transform(&self, value: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear => value,
            ScaleKind::Sqrt => value.signum() * value.abs().sqrt(),
        }
    }

    /// Position of `value` in the domain as a fraction (not clamped).
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        let d0 = self.transform(self.domain.0);
        let d1 = self.transform(self.domain.1);
        let span = d1 - d0;
        if span == 0.0 || !span.is_finite() {
            0.5
        } else {
            (self.transform(value) - d0) / span
        }
    }

    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        let t = self.normalize(value);
        (self.range.1 - self.range.0).mul_add(t, self.range.0)
    }
}

/// Evenly spaced bands for an ordinal domain of `count` items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    start: f64,
    step: f64,
    bandwidth: f64,
    padding_inner: f64,
    count: usize,
}

impl BandScale {
    /// Lays out `count` bands over `range`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        count: usize,
        range: (f64, f64),
        padding_inner: f64,
        padding_outer: f64,
        align: f64,
    ) -> Self {
        let n = count as f64;
        let width = range.1 - range.0;
        let step = width / padding_outer.mul_add(2.0, n - padding_inner).max(1.0);
        let start = range.0 + step.mul_add(-(n - padding_inner), width) * align;
        Self {
            start,
            step,
            bandwidth: step * (1.0 - padding_inner),
            padding_inner,
            count,
        }
    }

    /// Left edge of band `index`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn position(&self, index: usize) -> f64 {
        self.step.mul_add(index as f64, self.start)
    }

    #[must_use]
    pub const fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Left edge of the cell owned by band 0: the band start minus half the
    /// inner gap.
    #[must_use]
    pub fn cell_origin(&self) -> f64 {
        self.step.mul_add(-self.padding_inner / 2.0, self.start)
    }
}

/// Continuous time axis aligned with a monthly [`BandScale`].
///
/// Each month owns one band step, centred on its bar, and days are spread
/// evenly within their month. Positions before the first month or after
/// the last clamp to the axis ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    first: YearMonth,
    months: usize,
    origin: f64,
    step: f64,
}

impl TimeScale {
    #[must_use]
    pub fn new(first: YearMonth, band: &BandScale) -> Self {
        Self {
            first,
            months: band.count(),
            origin: band.cell_origin(),
            step: band.step(),
        }
    }

    /// Date under pixel `x`.
    ///
    /// The right end of the axis maps to the first day after the last
    /// month.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn invert(&self, x: f64) -> Option<NaiveDate> {
        if self.months == 0 || self.step <= 0.0 {
            return None;
        }
        let position = ((x - self.origin) / self.step).clamp(0.0, self.months as f64);
        // Month boundaries computed from band positions carry rounding
        // noise; snap them so they do not fall into the previous month.
        let position = if (position - position.round()).abs() < 1e-9 {
            position.round()
        } else {
            position
        };
        let index = position.floor();
        let month = self.first.offset(index as i64);
        let fraction = position - index;
        let day = (fraction * f64::from(month.days_in_month())).floor() as u64;
        month.first_day()?.checked_add_days(Days::new(day))
    }

    /// Pixel position of `date`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(&self, date: NaiveDate) -> f64 {
        let month = YearMonth::from_date(date);
        let index = (month.ordinal() - self.first.ordinal()) as f64;
        let fraction = f64::from(date.day0()) / f64::from(month.days_in_month());
        let position = (index + fraction).clamp(0.0, self.months as f64);
        self.step.mul_add(position, self.origin)
    }
}
