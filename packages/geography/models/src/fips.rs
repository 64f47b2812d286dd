//! US state FIPS code utilities.
//!
//! Maps between numeric state FIPS codes, two-letter abbreviations and full
//! state names for the 50 states, DC and Puerto Rico. County identifiers
//! embed the state code in their leading digits, so most lookups start from
//! a [`RegionId`](crate::RegionId).

/// A single row of the state reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    /// Numeric state FIPS code (e.g. `6` for California).
    pub fips: u8,
    /// Two-letter postal abbreviation.
    pub abbr: &'static str,
    /// Full state name.
    pub name: &'static str,
}

const fn state(fips: u8, abbr: &'static str, name: &'static str) -> StateInfo {
    StateInfo { fips, abbr, name }
}

/// Every state-level unit that can appear in the outage data.
pub const STATES: &[StateInfo] = &[
    state(1, "AL", "Alabama"),
    state(2, "AK", "Alaska"),
    state(4, "AZ", "Arizona"),
    state(5, "AR", "Arkansas"),
    state(6, "CA", "California"),
    state(8, "CO", "Colorado"),
    state(9, "CT", "Connecticut"),
    state(10, "DE", "Delaware"),
    state(11, "DC", "District of Columbia"),
    state(12, "FL", "Florida"),
    state(13, "GA", "Georgia"),
    state(15, "HI", "Hawaii"),
    state(16, "ID", "Idaho"),
    state(17, "IL", "Illinois"),
    state(18, "IN", "Indiana"),
    state(19, "IA", "Iowa"),
    state(20, "KS", "Kansas"),
    state(21, "KY", "Kentucky"),
    state(22, "LA", "Louisiana"),
    state(23, "ME", "Maine"),
    state(24, "MD", "Maryland"),
    state(25, "MA", "Massachusetts"),
    state(26, "MI", "Michigan"),
    state(27, "MN", "Minnesota"),
    state(28, "MS", "Mississippi"),
    state(29, "MO", "Missouri"),
    state(30, "MT", "Montana"),
    state(31, "NE", "Nebraska"),
    state(32, "NV", "Nevada"),
    state(33, "NH", "New Hampshire"),
    state(34, "NJ", "New Jersey"),
    state(35, "NM", "New Mexico"),
    state(36, "NY", "New York"),
    state(37, "NC", "North Carolina"),
    state(38, "ND", "North Dakota"),
    state(39, "OH", "Ohio"),
    state(40, "OK", "Oklahoma"),
    state(41, "OR", "Oregon"),
    state(42, "PA", "Pennsylvania"),
    state(44, "RI", "Rhode Island"),
    state(45, "SC", "South Carolina"),
    state(46, "SD", "South Dakota"),
    state(47, "TN", "Tennessee"),
    state(48, "TX", "Texas"),
    state(49, "UT", "Utah"),
    state(50, "VT", "Vermont"),
    state(51, "VA", "Virginia"),
    state(53, "WA", "Washington"),
    state(54, "WV", "West Virginia"),
    state(55, "WI", "Wisconsin"),
    state(56, "WY", "Wyoming"),
    state(72, "PR", "Puerto Rico"),
];

/// Looks up a state by its numeric FIPS code.
#[must_use]
pub fn by_fips(fips: u8) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.fips == fips)
}

/// Looks up a state by its two-letter abbreviation (case-insensitive).
#[must_use]
pub fn by_abbr(abbr: &str) -> Option<&'static StateInfo> {
    let abbr = abbr.trim();
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(abbr))
}

/// Looks up a state by its full name (case-insensitive).
#[must_use]
pub fn by_name(name: &str) -> Option<&'static StateInfo> {
    let name = name.trim();
    STATES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Maps a numeric FIPS code to the two-letter abbreviation.
///
/// Returns `"??"` for unrecognized codes.
#[must_use]
pub fn state_abbr(fips: u8) -> &'static str {
    by_fips(fips).map_or("??", |s| s.abbr)
}
