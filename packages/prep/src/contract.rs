//! Column names and filters for the input files.
//!
//! The upstream exports are the only schema this dashboard has, so every
//! header name lives here instead of in the loaders. The default contract
//! matches the embedded `contract.toml`; a replacement can be read from
//! TOML at startup.

use std::collections::BTreeMap;

use outage_map_geography_models::RaceCategory;
use serde::{Deserialize, Serialize};

/// The embedded default contract, kept in sync with [`DataContract::default`].
pub const DEFAULT_CONTRACT_TOML: &str = include_str!("../contract.toml");

/// Column names and filters for every input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataContract {
    /// Boundary features whose state name is listed here are dropped.
    pub excluded_states: Vec<String>,
    /// Counties whose state FIPS code is listed here are dropped from
    /// every table.
    pub excluded_state_fips: Vec<u8>,
    pub outages: OutageColumns,
    pub population: PopulationColumns,
    pub geometry: GeometryProperties,
    pub cartogram: CartogramColumns,
}

/// Headers of the monthly outage CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutageColumns {
    pub region_id: String,
    pub year: String,
    pub month: String,
    pub outage_count: String,
    pub customers_out: String,
}

/// Headers of the county population CSV.
///
/// Every header starting with `year_prefix` followed by a four-digit year
/// is read as that year's estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationColumns {
    pub region_id: String,
    pub state_code: String,
    pub year_prefix: String,
}

/// Feature property names of the boundary `GeoJSON`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryProperties {
    pub region_id: String,
    pub state_name: String,
    pub region_name: String,
}

/// Headers of the per-state cartogram reference CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartogramColumns {
    pub state_code: String,
    pub state_name: String,
    pub grid_x: String,
    pub grid_y: String,
    /// Value of the first grid column in the file (subtracted on load).
    pub grid_column_base: u32,
    /// Value of the first grid row in the file (subtracted on load).
    pub grid_row_base: u32,
    pub total_population: String,
    pub average_customers_out: String,
    pub white: String,
    /// Header for each pie chart category, keyed by category name
    /// (`other`, `indian`, ...).
    pub race_columns: BTreeMap<String, String>,
}

impl CartogramColumns {
    /// Header holding the count for `category`, if the contract maps it.
    #[must_use]
    pub fn race_column(&self, category: RaceCategory) -> Option<&str> {
        self.race_columns
            .get(category.as_ref())
            .map(String::as_str)
    }
}

impl DataContract {
    /// Parses a contract from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or missing required fields.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::de::from_str(toml_str)
    }

    /// Returns `true` if counties of this state are excluded.
    #[must_use]
    pub fn excludes_state_fips(&self, fips: u8) -> bool {
        self.excluded_state_fips.contains(&fips)
    }

    /// Returns `true` if boundary features of this state are excluded.
    #[must_use]
    pub fn excludes_state_name(&self, name: &str) -> bool {
        self.excluded_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name.trim()))
    }
}

impl Default for DataContract {
    fn default() -> Self {
        let race_columns = [
            (RaceCategory::Other, "Some Other Race alone"),
            (
                RaceCategory::Indian,
                "American Indian and Alaska Native alone",
            ),
            (
                RaceCategory::Hawaiian,
                "Native Hawaiian and Other Pacific Islander alone",
            ),
            (RaceCategory::Asian, "Asian alone"),
            (RaceCategory::Mixed, "Population of two or more races:"),
            (RaceCategory::Black, "Black or African American alone"),
        ]
        .into_iter()
        .map(|(category, column)| (category.to_string(), column.to_string()))
        .collect();

        Self {
            excluded_states: vec!["Puerto Rico".to_string()],
            excluded_state_fips: vec![72],
            outages: OutageColumns {
                region_id: "fips_code".to_string(),
                year: "year".to_string(),
                month: "month".to_string(),
                outage_count: "outage_count".to_string(),
                customers_out: "total_customers_out".to_string(),
            },
            population: PopulationColumns {
                region_id: "fips_code".to_string(),
                state_code: "state_abbr".to_string(),
                year_prefix: "pop_".to_string(),
            },
            geometry: GeometryProperties {
                region_id: "fips_code".to_string(),
                state_name: "state".to_string(),
                region_name: "county".to_string(),
            },
            cartogram: CartogramColumns {
                state_code: "abbr".to_string(),
                state_name: "state".to_string(),
                grid_x: "x".to_string(),
                grid_y: "y".to_string(),
                grid_column_base: 0,
                grid_row_base: 1,
                total_population: "total".to_string(),
                average_customers_out: "average_customers_out".to_string(),
                white: "White alone".to_string(),
                race_columns,
            },
        }
    }
}
