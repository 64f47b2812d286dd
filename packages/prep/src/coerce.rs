//! Lenient numeric parsing for CSV fields.
//!
//! Numeric columns are coerced rather than validated: a value that does
//! not parse becomes zero and is counted in the [`DataQualityReport`].

use crate::quality::DataQualityReport;

/// Parses a non-negative count, accepting integral floats like `"12.0"`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_count(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return Some(n);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
        Some(value.round() as u64)
    } else {
        None
    }
}

/// Parses a finite float.
#[must_use]
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerces fields of one input file, recording every fallback to zero.
pub struct Coercer<'a> {
    file: &'static str,
    report: &'a mut DataQualityReport,
}

impl<'a> Coercer<'a> {
    #[must_use]
    pub const fn new(file: &'static str, report: &'a mut DataQualityReport) -> Self {
        Self { file, report }
    }

    /// A non-negative count, or zero.
    pub fn count(&mut self, column: &str, raw: Option<&str>) -> u64 {
        match raw.and_then(parse_count) {
            Some(n) => n,
            None => {
                self.coerced(column, raw);
                0
            }
        }
    }

    /// A finite float, or zero.
    pub fn float(&mut self, column: &str, raw: Option<&str>) -> f64 {
        match raw.and_then(parse_float) {
            Some(v) => v,
            None => {
                self.coerced(column, raw);
                0.0
            }
        }
    }

    fn coerced(&mut self, column: &str, raw: Option<&str>) {
        log::debug!(
            "[{}] coercing {column}={:?} to 0",
            self.file,
            raw.unwrap_or("<missing>")
        );
        self.report.record_coercion(self.file, column);
    }

    /// The report this coercer writes to.
    pub fn report(&mut self) -> &mut DataQualityReport {
        &mut *self.report
    }
}
