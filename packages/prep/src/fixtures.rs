//! A small, fully joined dataset for tests.
//!
//! Two California counties (Los Angeles with outage and population rows,
//! Alameda with a boundary only), one Washington county, an outage-only
//! county without a boundary and Puerto Rico rows that the default contract
//! excludes.

use crate::contract::DataContract;
use crate::dataset::Dataset;
use crate::progress::null_progress;
use crate::{SourceReaders, prepare};

pub const GEOMETRY: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature",
     "properties": {"fips_code": "06037", "state": "California", "county": "Los Angeles"},
     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
    {"type": "Feature",
     "properties": {"fips_code": 6001, "state": "California", "county": "Alameda"},
     "geometry": {"type": "Polygon", "coordinates": [[[1,0],[2,0],[2,1],[1,1],[1,0]]]}},
    {"type": "Feature",
     "properties": {"fips_code": "53033", "state": "Washington", "county": "King"},
     "geometry": {"type": "Polygon", "coordinates": [[[0,2],[1,2],[1,3],[0,3],[0,2]]]}},
    {"type": "Feature",
     "properties": {"fips_code": "72001", "state": "Puerto Rico", "county": "Adjuntas"},
     "geometry": {"type": "Polygon", "coordinates": [[[5,5],[6,5],[6,6],[5,6],[5,5]]]}}
  ]
}"#;

pub const OUTAGES: &str = "\
fips_code,year,month,outage_count,total_customers_out
6037,2021,2,4,40
6037,2021,3,10,100
6037,2021,4,20,200
6037,2021,5,30,300
6037,2021,6,8,80
53033,2020,1,2,20
53033,2021,3,5,50
6999,2020,7,1,5
72001,2021,3,99,999
";

pub const POPULATION: &str = "\
fips_code,state_abbr,pop_2020,pop_2021
06037,CA,10000,10000
53033,WA,2000,2000
72001,PR,500,500
";

pub const CARTOGRAM: &str = "\
state,abbr,x,y,total,average_customers_out,White alone,Some Other Race alone,American Indian and Alaska Native alone,Native Hawaiian and Other Pacific Islander alone,Asian alone,Population of two or more races:,Black or African American alone
California,CA,0,3,40000,400,20000,4000,1000,500,8000,3500,3000
Washington,WA,0,1,8000,40,6000,400,200,100,600,500,200
";

/// Readers over the fixture files.
#[must_use]
pub fn sources() -> SourceReaders {
    SourceReaders {
        geometry: Box::new(GEOMETRY.as_bytes()),
        outages: Box::new(OUTAGES.as_bytes()),
        population: Box::new(POPULATION.as_bytes()),
        cartogram: Box::new(CARTOGRAM.as_bytes()),
    }
}

/// The fixture files prepared with the default contract.
///
/// # Panics
///
/// Panics if the fixture files no longer parse.
#[must_use]
pub fn dataset() -> Dataset {
    prepare(sources(), &DataContract::default(), &null_progress())
        .expect("fixture files should prepare")
}
