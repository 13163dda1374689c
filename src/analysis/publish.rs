//! Aggregate-only snapshot for the read-only viewer.
//!
//! The snapshot never carries individual refusal or passenger rows. Trend rows are
//! recomputed from raw records for every available semester rather than taken from
//! the stage outputs, which only cover the semester under analysis.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::session::AnalysisResults;
use crate::model::{ClassificationConfig, PassengerRecord, Priority, RefusalRecord};
use crate::semester::Semester;

/// Version 1 snapshots had no `classificationConfig`.
pub const SNAPSHOT_VERSION: u32 = 2;

const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedSnapshot {
    pub metadata: SnapshotMetadata,
    pub summary: SnapshotSummary,
    pub airlines: Vec<PublishedAirline>,
    pub routes: Vec<PublishedRoute>,
    pub trends: Vec<TrendPoint>,
    pub top10: TopLists,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_config: Option<ClassificationConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub published_at: String,
    pub semester: Semester,
    pub semester_range: SemesterRange,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub total_inads: usize,
    pub total_pax: u64,
    pub airlines_analyzed: usize,
    pub airlines_above_threshold: usize,
    pub routes_analyzed: usize,
    pub routes_above_threshold: usize,
    pub median_density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedAirline {
    pub airline: String,
    pub airline_name: String,
    pub inad_count: usize,
    pub passes_threshold: bool,
}

/// A Stage 2 route; the density fields are present only for routes that reached Stage 3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRoute {
    pub airline: String,
    pub airline_name: String,
    pub last_stop: String,
    pub inad_count: usize,
    pub passes_threshold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pax: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub semester: String,
    pub year: i32,
    pub half: u8,
    pub inad_count: usize,
    pub pax: u64,
    pub density: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopLists {
    pub last_stops: Vec<LastStopCount>,
    pub airlines: Vec<AirlineCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastStopCount {
    pub last_stop: String,
    pub inad_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlineCount {
    pub airline: String,
    pub airline_name: String,
    pub inad_count: usize,
}

pub struct PublishInput<'a> {
    pub refusals: &'a [RefusalRecord],
    pub passengers: &'a [PassengerRecord],
    pub results: &'a AnalysisResults,
    pub semesters: &'a [Semester],
    pub config: &'a ClassificationConfig,
}

/// Display names keyed by airline code; the first non-empty name seen wins.
pub fn airline_names(refusals: &[RefusalRecord]) -> HashMap<String, String> {
    let mut names = HashMap::<String, String>::new();
    for record in refusals {
        if let Some(name) = &record.airline_name {
            names
                .entry(record.airline.clone())
                .or_insert_with(|| name.trim().to_string());
        }
    }
    names
}

fn display_name(names: &HashMap<String, String>, airline: &str) -> String {
    names
        .get(airline)
        .cloned()
        .unwrap_or_else(|| airline.to_string())
}

fn top_counts<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts = HashMap::<&str, usize>::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_N);
    ranked
}

fn top_lists(
    refusals: &[RefusalRecord],
    semester: Semester,
    names: &HashMap<String, String>,
) -> TopLists {
    let included = refusals
        .iter()
        .filter(|record| record.included() && semester.contains(record.year, record.month))
        .collect::<Vec<_>>();

    TopLists {
        last_stops: top_counts(included.iter().map(|record| record.last_stop.as_str()))
            .into_iter()
            .map(|(last_stop, inad_count)| LastStopCount {
                last_stop,
                inad_count,
            })
            .collect(),
        airlines: top_counts(included.iter().map(|record| record.airline.as_str()))
            .into_iter()
            .map(|(airline, inad_count)| AirlineCount {
                airline_name: display_name(names, &airline),
                airline,
                inad_count,
            })
            .collect(),
    }
}

pub fn trend_series(
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
    semesters: &[Semester],
) -> Vec<TrendPoint> {
    let mut ordered = semesters.to_vec();
    ordered.sort();
    ordered.dedup();

    ordered
        .into_iter()
        .map(|semester| {
            let inad_count = refusals
                .iter()
                .filter(|record| record.included() && semester.contains(record.year, record.month))
                .count();
            let pax = passengers
                .iter()
                .filter(|record| semester.contains(record.year, record.month))
                .fold(0u64, |total, record| total.saturating_add(record.pax));

            TrendPoint {
                semester: semester.label(),
                year: semester.year,
                half: semester.half.number(),
                inad_count,
                pax,
                density: (pax > 0).then(|| inad_count as f64 / pax as f64 * 1000.0),
            }
        })
        .collect()
}

/// Pure: the publish timestamp is supplied by the caller.
pub fn build_snapshot(input: &PublishInput<'_>, published_at: &str) -> PublishedSnapshot {
    let results = input.results;
    let semester = results.semester;
    let names = airline_names(input.refusals);

    let airlines = results
        .airlines
        .iter()
        .map(|airline| PublishedAirline {
            airline: airline.key.0.clone(),
            airline_name: display_name(&names, &airline.key.0),
            inad_count: airline.inad_count,
            passes_threshold: airline.passes_threshold,
        })
        .collect::<Vec<_>>();

    let classified = results
        .density
        .routes
        .iter()
        .map(|route| (route.route(), route))
        .collect::<HashMap<_, _>>();

    let routes = results
        .routes
        .iter()
        .map(|route| {
            let density = classified.get(&route.key);
            PublishedRoute {
                airline: route.key.airline.clone(),
                airline_name: display_name(&names, &route.key.airline),
                last_stop: route.key.last_stop.clone(),
                inad_count: route.inad_count,
                passes_threshold: route.passes_threshold,
                pax: density.map(|d| d.pax),
                density: density.and_then(|d| d.density),
                reliable: density.map(|d| d.reliable),
                priority: density.map(|d| d.priority),
                confidence: density.map(|d| d.confidence),
            }
        })
        .collect::<Vec<_>>();

    let current = trend_series(input.refusals, input.passengers, &[semester]).pop();

    let summary = SnapshotSummary {
        total_inads: current.as_ref().map(|point| point.inad_count).unwrap_or(0),
        total_pax: current.as_ref().map(|point| point.pax).unwrap_or(0),
        airlines_analyzed: results.airlines.len(),
        airlines_above_threshold: results.passing_airlines(),
        routes_analyzed: results.routes.len(),
        routes_above_threshold: results.passing_routes(),
        median_density: results.density.threshold,
    };

    let snapshot = PublishedSnapshot {
        metadata: SnapshotMetadata {
            published_at: published_at.to_string(),
            semester,
            semester_range: SemesterRange {
                start: semester.start_date(),
                end: semester.end_date(),
            },
            version: SNAPSHOT_VERSION,
        },
        summary,
        airlines,
        routes,
        trends: trend_series(input.refusals, input.passengers, input.semesters),
        top10: top_lists(input.refusals, semester, &names),
        classification_config: Some(input.config.clone()),
    };

    debug!(
        semester = %semester,
        airlines = snapshot.airlines.len(),
        routes = snapshot.routes.len(),
        trend_points = snapshot.trends.len(),
        "snapshot built"
    );
    snapshot
}

#[cfg(test)]
mod tests;
