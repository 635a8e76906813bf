//! Monthly child/adult share on foggy days at one location.

use chrono::Datelike;
use serde::Serialize;

use crate::dataset::{ADULT_COUNT, CHILD_COUNT, Dataset};

pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub const CHILDREN_LABEL: &str = "Kinder";
pub const ADULTS_LABEL: &str = "Erwachsene";

/// One row of the focus report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusShare {
    pub month: &'static str,
    pub group: &'static str,
    pub share: f64,
}

/// The fixed selection behind the focus report.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusQuery {
    pub location: String,
    pub year: i32,
    /// Lower-case substring looked for in the weather condition.
    pub weather_needle: String,
}

impl Default for FocusQuery {
    fn default() -> Self {
        Self {
            location: "Bahnhofstrasse (Nord)".to_string(),
            year: 2024,
            weather_needle: "fog".to_string(),
        }
    }
}

impl FocusQuery {
    /// Always 24 rows: children then adults for each month, Jan to Dec.
    #[tracing::instrument(skip(dataset), fields(rows = dataset.len()))]
    pub fn run(&self, dataset: &Dataset) -> Vec<FocusShare> {
        let mut children = [0.0_f64; 12];
        let mut adults = [0.0_f64; 12];

        let timestamps = dataset.timestamps();
        let locations = dataset.locations().unwrap_or(&[]);
        let weather = dataset.weather_conditions().unwrap_or(&[]);

        for row in 0..dataset.len() {
            let ts = timestamps[row];
            if ts.year() != self.year {
                continue;
            }
            if locations.get(row).and_then(Option::as_deref) != Some(self.location.as_str()) {
                continue;
            }
            let foggy = weather
                .get(row)
                .and_then(Option::as_deref)
                .is_some_and(|w| w.to_lowercase().contains(&self.weather_needle));
            if !foggy {
                continue;
            }

            let month = ts.month0() as usize;
            children[month] += dataset.numeric(CHILD_COUNT, row).unwrap_or(0.0);
            adults[month] += dataset.numeric(ADULT_COUNT, row).unwrap_or(0.0);
        }

        MONTH_ABBREVIATIONS
            .iter()
            .zip(children.iter().zip(adults.iter()))
            .flat_map(|(&month, (&kids, &grown))| {
                let total = kids + grown;
                let (child_share, adult_share) = if total > 0.0 {
                    (kids / total, grown / total)
                } else {
                    (0.0, 0.0)
                };
                [
                    FocusShare {
                        month,
                        group: CHILDREN_LABEL,
                        share: child_share,
                    },
                    FocusShare {
                        month,
                        group: ADULTS_LABEL,
                        share: adult_share,
                    },
                ]
            })
            .collect()
    }
}
