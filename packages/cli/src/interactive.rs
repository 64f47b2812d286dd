//! Menu-driven dashboard session using `dialoguer`.

use dialoguer::{Input, Select};
use outage_map_dashboard::{Dashboard, Interaction};
use outage_map_geography_models::RegionId;
use outage_map_outage_models::YearMonth;

use crate::summary;

/// Actions offered by the session menu.
enum Action {
    SelectRange,
    ClearRange,
    ClickCounty,
    ClickPoint,
    ClickBackground,
    ToggleGranularity,
    ToggleDisplay,
    Reset,
    PrintSnapshot,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::SelectRange,
        Self::ClearRange,
        Self::ClickCounty,
        Self::ClickPoint,
        Self::ClickBackground,
        Self::ToggleGranularity,
        Self::ToggleDisplay,
        Self::Reset,
        Self::PrintSnapshot,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::SelectRange => "Brush a month range",
            Self::ClearRange => "Clear the month range",
            Self::ClickCounty => "Click a county by FIPS code",
            Self::ClickPoint => "Click the map at a coordinate",
            Self::ClickBackground => "Click the map background",
            Self::ToggleGranularity => "Toggle county/state selection",
            Self::ToggleDisplay => "Toggle map/cartogram",
            Self::Reset => "Reset",
            Self::PrintSnapshot => "Print snapshot JSON",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the session menu until the user quits.
///
/// # Errors
///
/// Returns an error if a prompt fails or the snapshot cannot be
/// serialized.
pub fn run(mut dashboard: Dashboard) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    print!("{}", summary::snapshot(&dashboard.snapshot()));

    loop {
        println!();
        let idx = Select::new()
            .with_prompt("Dashboard")
            .items(&labels)
            .default(0)
            .interact()?;

        let interaction = match Action::ALL[idx] {
            Action::SelectRange => {
                let start: YearMonth = prompt_parsed("Start month (YYYY-MM)")?;
                let end: YearMonth = prompt_parsed("End month (YYYY-MM)")?;
                Interaction::SelectRange { start, end }
            }
            Action::ClearRange => Interaction::ClearBrush,
            Action::ClickCounty => Interaction::ClickRegion {
                region: prompt_parsed::<RegionId>("County FIPS code")?,
            },
            Action::ClickPoint => Interaction::ClickPoint {
                lon: prompt_parsed("Longitude")?,
                lat: prompt_parsed("Latitude")?,
            },
            Action::ClickBackground => Interaction::ClickBackground,
            Action::ToggleGranularity => Interaction::ToggleGranularity,
            Action::ToggleDisplay => Interaction::ToggleDisplay,
            Action::Reset => Interaction::Reset,
            Action::PrintSnapshot => {
                println!("{}", serde_json::to_string_pretty(&dashboard.snapshot())?);
                continue;
            }
            Action::Quit => return Ok(()),
        };

        match dashboard.apply(&interaction) {
            Ok(reports) => {
                for failure in reports.iter().flat_map(|r| &r.failures) {
                    println!("  {} failed: {}", failure.key, failure.error);
                }
                print!("{}", summary::snapshot(&dashboard.snapshot()));
            }
            Err(e) => println!("Ignored: {e}"),
        }
    }
}

/// Prompts until the input parses as `T`.
fn prompt_parsed<T>(prompt: &str) -> Result<T, dialoguer::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    loop {
        let raw: String = Input::new().with_prompt(prompt).interact_text()?;
        match raw.trim().parse() {
            Ok(value) => return Ok(value),
            Err(e) => println!("Invalid value '{raw}': {e}"),
        }
    }
}
