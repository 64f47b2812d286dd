//! Readers for the four input files.
//!
//! Each reader takes any [`Read`] and the [`DataContract`]; opening files is
//! the caller's business. Missing key columns are fatal, everything below
//! that (bad numbers, unknown keys, excluded states) is counted in the
//! [`DataQualityReport`] and skipped or coerced.

use std::collections::BTreeMap;
use std::io::Read;

use csv::StringRecord;
use geo::MultiPolygon;
use outage_map_geography::boundary::{feature_multipolygon, property_string, read_features};
use outage_map_geography_models::{
    Demographics, PopulationSeries, RaceCategory, RegionId, StateReference, fips,
};
use outage_map_outage_models::{OutageRecord, YearMonth};

use crate::coerce::{Coercer, parse_count};
use crate::contract::DataContract;
use crate::quality::{DataQualityReport, DropReason};
use crate::PrepError;

pub const OUTAGES_FILE: &str = "outages";
pub const POPULATION_FILE: &str = "population";
pub const GEOMETRY_FILE: &str = "geometry";
pub const CARTOGRAM_FILE: &str = "cartogram";

/// A county feature from the boundary document.
#[derive(Debug, Clone)]
pub struct RawBoundary {
    pub id: RegionId,
    pub name: Option<String>,
    pub state_name: Option<String>,
    pub polygon: Option<MultiPolygon<f64>>,
}

/// A county row from the population table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPopulation {
    pub id: RegionId,
    pub state_code: Option<String>,
    pub series: PopulationSeries,
}

/// Header lookup for one CSV file.
struct Headers {
    file: &'static str,
    record: StringRecord,
}

impl Headers {
    fn read<R: Read>(file: &'static str, reader: &mut csv::Reader<R>) -> Result<Self, PrepError> {
        let record = reader.headers().map_err(csv_error(file))?.clone();
        Ok(Self { file, record })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.record.iter().position(|h| h.trim() == name)
    }

    fn required(&self, name: &str) -> Result<usize, PrepError> {
        self.optional(name).ok_or_else(|| PrepError::MissingColumn {
            file: self.file,
            column: name.to_string(),
        })
    }

    /// Optional column that should normally be present; warns once when
    /// it is not.
    fn expected(&self, name: &str) -> Option<usize> {
        let idx = self.optional(name);
        if idx.is_none() {
            log::warn!("[{}] column '{name}' not found; treating as zero", self.file);
        }
        idx
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

fn field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty())
}

fn csv_error(file: &'static str) -> impl Fn(csv::Error) -> PrepError {
    move |source| PrepError::Csv { file, source }
}

/// Reads the monthly outage CSV.
///
/// # Errors
///
/// Returns [`PrepError`] if the CSV is unreadable or a key column is
/// missing.
pub fn read_outages(
    reader: impl Read,
    contract: &DataContract,
    report: &mut DataQualityReport,
) -> Result<Vec<OutageRecord>, PrepError> {
    let columns = &contract.outages;
    let mut rdr = csv_reader(reader);
    let headers = Headers::read(OUTAGES_FILE, &mut rdr)?;
    let id_idx = headers.required(&columns.region_id)?;
    let year_idx = headers.required(&columns.year)?;
    let month_idx = headers.required(&columns.month)?;
    let count_idx = headers.required(&columns.outage_count)?;
    let customers_idx = headers.expected(&columns.customers_out);

    let mut coercer = Coercer::new(OUTAGES_FILE, report);
    let mut out = Vec::new();

    for record in rdr.records() {
        let record = record.map_err(csv_error(OUTAGES_FILE))?;

        let Some(id) = field(&record, Some(id_idx)).and_then(RegionId::parse) else {
            coercer
                .report()
                .record_drop(OUTAGES_FILE, DropReason::InvalidRegionId);
            continue;
        };
        if contract.excludes_state_fips(id.state_fips()) {
            coercer
                .report()
                .record_drop(OUTAGES_FILE, DropReason::Excluded);
            continue;
        }

        let Some(period) = parse_period(
            field(&record, Some(year_idx)),
            field(&record, Some(month_idx)),
        ) else {
            coercer
                .report()
                .record_drop(OUTAGES_FILE, DropReason::InvalidPeriod);
            continue;
        };

        let outage_count = coercer.count(&columns.outage_count, field(&record, Some(count_idx)));
        let customers_out = if customers_idx.is_some() {
            coercer.float(&columns.customers_out, field(&record, customers_idx))
        } else {
            0.0
        };

        out.push(OutageRecord {
            region_id: id,
            period,
            outage_count,
            customers_out,
        });
    }

    log::info!("[{OUTAGES_FILE}] read {} monthly rows", out.len());
    Ok(out)
}

fn parse_period(year: Option<&str>, month: Option<&str>) -> Option<YearMonth> {
    let year = i32::try_from(parse_count(year?)?).ok()?;
    let month = u32::try_from(parse_count(month?)?).ok()?;
    YearMonth::new(year, month).ok()
}

/// Reads the county population CSV.
///
/// # Errors
///
/// Returns [`PrepError`] if the CSV is unreadable or the key column is
/// missing.
pub fn read_population(
    reader: impl Read,
    contract: &DataContract,
    report: &mut DataQualityReport,
) -> Result<Vec<RawPopulation>, PrepError> {
    let columns = &contract.population;
    let mut rdr = csv_reader(reader);
    let headers = Headers::read(POPULATION_FILE, &mut rdr)?;
    let id_idx = headers.required(&columns.region_id)?;
    let state_idx = headers.optional(&columns.state_code);

    let year_columns: Vec<(usize, i32, String)> = headers
        .record
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let year = name.trim().strip_prefix(columns.year_prefix.as_str())?;
            let year: i32 = year.parse().ok()?;
            (1..=9999)
                .contains(&year)
                .then(|| (idx, year, name.trim().to_string()))
        })
        .collect();

    if year_columns.is_empty() {
        log::warn!(
            "[{POPULATION_FILE}] no '{}<year>' columns found",
            columns.year_prefix
        );
    }

    let mut coercer = Coercer::new(POPULATION_FILE, report);
    let mut out = Vec::new();

    for record in rdr.records() {
        let record = record.map_err(csv_error(POPULATION_FILE))?;

        let Some(id) = field(&record, Some(id_idx)).and_then(RegionId::parse) else {
            coercer
                .report()
                .record_drop(POPULATION_FILE, DropReason::InvalidRegionId);
            continue;
        };
        if contract.excludes_state_fips(id.state_fips()) {
            coercer
                .report()
                .record_drop(POPULATION_FILE, DropReason::Excluded);
            continue;
        }

        let series = year_columns
            .iter()
            .map(|(idx, year, name)| (*year, coercer.count(name, field(&record, Some(*idx)))))
            .collect();

        out.push(RawPopulation {
            id,
            state_code: field(&record, state_idx).map(str::to_string),
            series,
        });
    }

    log::info!("[{POPULATION_FILE}] read {} county rows", out.len());
    Ok(out)
}

/// Reads the county boundary `GeoJSON`.
///
/// # Errors
///
/// Returns [`PrepError`] if the document is not a valid feature collection.
pub fn read_boundaries(
    reader: impl Read,
    contract: &DataContract,
    report: &mut DataQualityReport,
) -> Result<Vec<RawBoundary>, PrepError> {
    let props = &contract.geometry;
    let features = read_features(reader)?;
    let mut out = Vec::with_capacity(features.len());

    for feature in &features {
        let Some(id) =
            property_string(feature, &props.region_id).and_then(|s| RegionId::parse(&s))
        else {
            report.record_drop(GEOMETRY_FILE, DropReason::InvalidRegionId);
            continue;
        };

        let state_name = property_string(feature, &props.state_name);
        let excluded_by_name = state_name
            .as_deref()
            .is_some_and(|name| contract.excludes_state_name(name));
        if excluded_by_name || contract.excludes_state_fips(id.state_fips()) {
            report.record_drop(GEOMETRY_FILE, DropReason::Excluded);
            continue;
        }

        let polygon = feature_multipolygon(feature);
        if polygon.is_none() {
            report.regions_without_boundary.insert(id);
        }

        out.push(RawBoundary {
            id,
            name: property_string(feature, &props.region_name),
            state_name,
            polygon,
        });
    }

    log::info!("[{GEOMETRY_FILE}] read {} county features", out.len());
    Ok(out)
}

/// Reads the per-state cartogram reference CSV.
///
/// # Errors
///
/// Returns [`PrepError`] if the CSV is unreadable or a key column is
/// missing.
pub fn read_state_references(
    reader: impl Read,
    contract: &DataContract,
    report: &mut DataQualityReport,
) -> Result<Vec<StateReference>, PrepError> {
    let columns = &contract.cartogram;
    let mut rdr = csv_reader(reader);
    let headers = Headers::read(CARTOGRAM_FILE, &mut rdr)?;
    let code_idx = headers.required(&columns.state_code)?;
    let x_idx = headers.required(&columns.grid_x)?;
    let y_idx = headers.required(&columns.grid_y)?;
    let total_idx = headers.required(&columns.total_population)?;
    let name_idx = headers.optional(&columns.state_name);
    let average_idx = headers.expected(&columns.average_customers_out);
    let white_idx = headers.expected(&columns.white);

    let race_idx: BTreeMap<RaceCategory, (String, Option<usize>)> = RaceCategory::PIE_ORDER
        .iter()
        .filter_map(|category| {
            let column = columns.race_column(*category)?;
            Some((*category, (column.to_string(), headers.expected(column))))
        })
        .collect();

    let mut coercer = Coercer::new(CARTOGRAM_FILE, report);
    let mut out = Vec::new();

    for record in rdr.records() {
        let record = record.map_err(csv_error(CARTOGRAM_FILE))?;

        let Some(state) = field(&record, Some(code_idx)).and_then(fips::by_abbr) else {
            coercer
                .report()
                .record_drop(CARTOGRAM_FILE, DropReason::UnknownState);
            continue;
        };
        if contract.excludes_state_fips(state.fips) {
            coercer
                .report()
                .record_drop(CARTOGRAM_FILE, DropReason::Excluded);
            continue;
        }

        let mut optional_float = |column: &str, idx: Option<usize>| {
            if idx.is_some() {
                coercer.float(column, field(&record, idx))
            } else {
                0.0
            }
        };

        let average_customers_out = optional_float(&columns.average_customers_out, average_idx);
        let white_population = optional_float(&columns.white, white_idx);
        let demographics: Demographics = race_idx
            .iter()
            .map(|(category, (column, idx))| (*category, optional_float(column, *idx)))
            .collect();

        let grid_x = coercer.count(&columns.grid_x, field(&record, Some(x_idx)));
        let grid_y = coercer.count(&columns.grid_y, field(&record, Some(y_idx)));
        let total_population =
            coercer.float(&columns.total_population, field(&record, Some(total_idx)));

        out.push(StateReference {
            state_code: state.abbr.to_string(),
            state_name: field(&record, name_idx)
                .map(str::to_string)
                .or_else(|| Some(state.name.to_string())),
            grid_x: grid_index(grid_x, columns.grid_column_base),
            grid_y: grid_index(grid_y, columns.grid_row_base),
            total_population,
            average_customers_out,
            white_population,
            demographics,
        });
    }

    log::info!("[{CARTOGRAM_FILE}] read {} state rows", out.len());
    Ok(out)
}

fn grid_index(raw: u64, base: u32) -> u32 {
    u32::try_from(raw).unwrap_or(u32::MAX).saturating_sub(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outage_rows_drop_bad_keys_and_excluded_states() {
        let csv = "fips_code,year,month,outage_count,total_customers_out\n\
                   06037,2021,3,10,100\n\
                   6037.0,2021,4,oops,\n\
                   72001,2021,3,5,5\n\
                   abc,2021,3,5,5\n\
                   06037,2021,13,5,5\n";
        let mut report = DataQualityReport::default();
        let rows = read_outages(csv.as_bytes(), &DataContract::default(), &mut report).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].outage_count, 10);
        assert_eq!(rows[1].outage_count, 0);
        assert_eq!(rows[1].region_id, rows[0].region_id);
        assert_eq!(report.coerced_values["outages.outage_count"], 1);
        assert_eq!(report.coerced_values["outages.total_customers_out"], 1);
        assert_eq!(report.total_dropped(DropReason::Excluded), 1);
        assert_eq!(report.total_dropped(DropReason::InvalidRegionId), 1);
        assert_eq!(report.total_dropped(DropReason::InvalidPeriod), 1);
    }

    #[test]
    fn missing_key_column_is_fatal() {
        let csv = "county,year,month,outage_count\n1,2021,1,1\n";
        let mut report = DataQualityReport::default();
        let err = read_outages(csv.as_bytes(), &DataContract::default(), &mut report).unwrap_err();
        assert!(matches!(
            err,
            PrepError::MissingColumn { file: "outages", ref column } if column == "fips_code"
        ));
    }

    #[test]
    fn population_detects_year_columns() {
        let csv = "fips_code,state_abbr,pop_2019,pop_2020,pop_total\n\
                   6037,CA,100,bad,999\n";
        let mut report = DataQualityReport::default();
        let rows = read_population(csv.as_bytes(), &DataContract::default(), &mut report).unwrap();

        assert_eq!(rows.len(), 1);
        let series: Vec<(i32, u64)> = rows[0].series.iter().collect();
        assert_eq!(series, vec![(2019, 100), (2020, 0)]);
        assert_eq!(rows[0].state_code.as_deref(), Some("CA"));
        assert_eq!(report.coerced_values["population.pop_2020"], 1);
    }

    #[test]
    fn boundaries_skip_excluded_state_names() {
        let doc = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature",
             "properties":{"fips_code":"06037","state":"California","county":"Los Angeles"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type":"Feature","properties":{"fips_code":"12001","state":"Puerto Rico","county":"X"},
             "geometry":{"type":"Polygon","coordinates":[[[2,2],[3,2],[3,3],[2,3],[2,2]]]}},
            {"type":"Feature",
             "properties":{"fips_code":"06001","state":"California","county":"Alameda"},
             "geometry":null}
        ]}"#;
        let mut report = DataQualityReport::default();
        let rows = read_boundaries(doc.as_bytes(), &DataContract::default(), &mut report).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name.as_deref(), Some("Los Angeles"));
        assert!(rows[0].polygon.is_some());
        assert!(rows[1].polygon.is_none());
        assert!(report
            .regions_without_boundary
            .contains(&RegionId::new(6001).unwrap()));
        assert_eq!(report.total_dropped(DropReason::Excluded), 1);
    }

    #[test]
    fn state_references_shift_grid_rows_and_default_missing_races() {
        let csv = "abbr,x,y,total,average_customers_out,White alone,Asian alone\n\
                   CA,1,3,1000,10,600,200\n\
                   ZZ,0,1,5,0,5,0\n";
        let mut report = DataQualityReport::default();
        let rows =
            read_state_references(csv.as_bytes(), &DataContract::default(), &mut report).unwrap();

        assert_eq!(rows.len(), 1);
        let ca = &rows[0];
        assert_eq!((ca.grid_x, ca.grid_y), (1, 2));
        assert_eq!(ca.state_name.as_deref(), Some("California"));
        assert!((ca.demographics.count(RaceCategory::Asian) - 200.0).abs() < f64::EPSILON);
        assert!(ca.demographics.count(RaceCategory::Black).abs() < f64::EPSILON);
        assert!((ca.non_white_proportion() - 0.4).abs() < 1e-12);
        assert_eq!(report.total_dropped(DropReason::UnknownState), 1);
    }
}
