#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County, state and cartogram reference types.
//!
//! Counties are the unit the outage data is reported in; states are the
//! unit the cartogram is drawn in. These types carry the joined reference
//! data (names, population, demographics, grid positions) and are
//! independent of the outage records themselves.

pub mod fips;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumString};

/// Canonical county identifier (five-digit county FIPS code).
///
/// Source files disagree on the representation (`"06037"`, `"6037"`,
/// `6037`, `"6037.0"`); all of them canonicalize to the same integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(u32);

impl RegionId {
    /// Largest valid five-digit code.
    pub const MAX: u32 = 99_999;

    /// Creates a region id from its integer form.
    #[must_use]
    pub const fn new(code: u32) -> Option<Self> {
        if code == 0 || code > Self::MAX {
            None
        } else {
            Some(Self(code))
        }
    }

    /// Parses any of the textual forms a FIPS code shows up in.
    ///
    /// Returns `None` for empty, non-numeric, fractional or out-of-range
    /// input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('"');
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(code) = trimmed.parse::<u32>() {
            return Self::new(code);
        }
        let value = trimmed.parse::<f64>().ok()?;
        Self::from_f64(value)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.fract() != 0.0 || value < 1.0 || value > f64::from(Self::MAX)
        {
            return None;
        }
        Self::new(value as u32)
    }

    /// Returns the integer form of the code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self.0
    }

    /// Returns the state FIPS code (the leading two digits).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn state_fips(self) -> u8 {
        (self.0 / 1000) as u8
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

impl std::str::FromStr for RegionId {
    type Err = InvalidRegionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidRegionIdError {
            raw: s.to_string(),
        })
    }
}

impl Serialize for RegionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RegionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Integer(u64),
            Float(f64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Integer(n) => u32::try_from(n).ok().and_then(Self::new),
            Raw::Float(f) => Self::from_f64(f),
            Raw::Text(s) => Self::parse(&s),
        };
        parsed.ok_or_else(|| serde::de::Error::custom("invalid county FIPS code"))
    }
}

/// Error returned when a string is not a valid county FIPS code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRegionIdError {
    /// The rejected input.
    pub raw: String,
}

impl fmt::Display for InvalidRegionIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid county FIPS code '{}'", self.raw)
    }
}

impl std::error::Error for InvalidRegionIdError {}

/// Population estimates for one county keyed by year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationSeries(BTreeMap<i32, u64>);

impl PopulationSeries {
    /// Records the estimate for `year`, replacing any previous value.
    pub fn insert(&mut self, year: i32, population: u64) {
        self.0.insert(year, population);
    }

    /// Returns the estimate for a single year.
    #[must_use]
    pub fn get(&self, year: i32) -> Option<u64> {
        self.0.get(&year).copied()
    }

    /// Returns `true` if no year has an estimate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(year, population)` pairs in year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        self.0.iter().map(|(y, p)| (*y, *p))
    }

    /// Population used as the per-capita denominator for a span of years.
    ///
    /// Averages the estimates of the years inside `years`; when none of
    /// those years has an estimate (or `years` is `None`) every available
    /// year is averaged instead. Returns `None` only for an empty series.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn representative(&self, years: Option<RangeInclusive<i32>>) -> Option<f64> {
        let mean = |values: Vec<u64>| {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<u64>() as f64 / values.len() as f64)
            }
        };

        if let Some(years) = years {
            let within: Vec<u64> = self.0.range(years).map(|(_, p)| *p).collect();
            if let Some(value) = mean(within) {
                return Some(value);
            }
        }
        mean(self.0.values().copied().collect())
    }
}

impl FromIterator<(i32, u64)> for PopulationSeries {
    fn from_iter<T: IntoIterator<Item = (i32, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A county joined with its reference data.
///
/// Every joined field is optional: a county present in the boundary file
/// but missing from a table still renders, with the affected metric
/// reported as unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// County FIPS code.
    pub id: RegionId,
    /// County name from the boundary file.
    pub name: Option<String>,
    /// State name from the boundary file.
    pub state_name: Option<String>,
    /// Two-letter state abbreviation.
    pub state_code: String,
    /// Population estimates, if the county joined the population table.
    pub population: Option<PopulationSeries>,
    /// All-time outage count, if the county has outage rows.
    pub outage_total: Option<u64>,
    /// All-time customers-out total, if the county has outage rows.
    pub customers_out_total: Option<f64>,
    /// Whether a usable boundary polygon was loaded for this county.
    pub has_boundary: bool,
}

/// Race categories shown in the cartogram pie charts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RaceCategory {
    /// Some other race alone
    Other,
    /// American Indian and Alaska Native alone
    Indian,
    /// Native Hawaiian and Other Pacific Islander alone
    Hawaiian,
    /// Asian alone
    Asian,
    /// Two or more races
    Mixed,
    /// Black or African American alone
    Black,
}

impl RaceCategory {
    /// Slice order for every pie chart. Fixed so that colours and slice
    /// positions stay put across re-renders.
    pub const PIE_ORDER: &'static [Self] = &[
        Self::Other,
        Self::Indian,
        Self::Hawaiian,
        Self::Asian,
        Self::Mixed,
        Self::Black,
    ];
}

/// Non-white population counts for one state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Demographics(BTreeMap<RaceCategory, f64>);

impl Demographics {
    /// Sets the count for `category`.
    pub fn set(&mut self, category: RaceCategory, count: f64) {
        self.0.insert(category, count);
    }

    /// Count for `category`; categories never set count as zero.
    #[must_use]
    pub fn count(&self, category: RaceCategory) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    /// Pie slices in [`RaceCategory::PIE_ORDER`], including empty ones.
    #[must_use]
    pub fn pie_slices(&self) -> Vec<PieSlice> {
        RaceCategory::PIE_ORDER
            .iter()
            .map(|category| PieSlice {
                category: *category,
                value: self.count(*category),
            })
            .collect()
    }
}

impl FromIterator<(RaceCategory, f64)> for Demographics {
    fn from_iter<T: IntoIterator<Item = (RaceCategory, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One value of a pie chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieSlice {
    /// Category the slice represents.
    pub category: RaceCategory,
    /// Population count.
    pub value: f64,
}

/// Per-state reference row for the cartogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReference {
    /// Two-letter state abbreviation.
    pub state_code: String,
    /// Full state name, if the reference table carries one.
    pub state_name: Option<String>,
    /// Zero-based grid column.
    pub grid_x: u32,
    /// Zero-based grid row.
    pub grid_y: u32,
    /// Total population.
    pub total_population: f64,
    /// Average customers without power across the whole dataset.
    pub average_customers_out: f64,
    /// White-alone population.
    pub white_population: f64,
    /// Non-white population breakdown.
    pub demographics: Demographics,
}

impl StateReference {
    /// Share of the population that is not white-alone, in `0..=1`.
    ///
    /// Zero when the total population is unknown.
    #[must_use]
    pub fn non_white_proportion(&self) -> f64 {
        if self.total_population > 0.0 {
            ((self.total_population - self.white_population) / self.total_population)
                .clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Affected share derived from the reference table's own average.
    #[must_use]
    pub fn reference_affected_proportion(&self) -> f64 {
        if self.total_population > 0.0 {
            self.average_customers_out / self.total_population
        } else {
            0.0
        }
    }
}

/// A cartogram tile before layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartogramTile {
    /// Two-letter state abbreviation.
    pub state_code: String,
    /// Zero-based grid column.
    pub grid_x: u32,
    /// Zero-based grid row.
    pub grid_y: u32,
    /// Share of the population affected by outages.
    pub affected_proportion: f64,
    /// Share of the population that is not white-alone.
    pub non_white_proportion: f64,
    /// Demographic breakdown in [`RaceCategory::PIE_ORDER`].
    pub pie_slices: Vec<PieSlice>,
}
