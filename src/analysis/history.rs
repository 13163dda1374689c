use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use super::density::PartnerMap;
use super::session::{AnalysisResults, run_pipeline};
use crate::model::{
    ClassificationConfig, DensityReport, DensityResult, PassengerRecord, Priority, RefusalRecord,
    RouteKey, ThresholdMethod,
};
use crate::semester::Semester;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub semester: Semester,
    pub total_inads: usize,
    pub total_pax: u64,
    pub airlines_passing: usize,
    pub routes_passing: usize,
    pub high_priority: usize,
    pub watch_list: usize,
    pub threshold: f64,
    /// Included refusals per million passengers.
    pub inad_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedAppearance {
    pub semester: Semester,
    pub priority: Priority,
    pub density: Option<f64>,
    pub inad_count: usize,
    pub pax: u64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    New,
    Improving,
    Worsening,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemicCase {
    pub airline: String,
    pub last_stop: String,
    pub total_appearances: usize,
    pub max_consecutive: usize,
    pub is_systemic: bool,
    pub trend: Trend,
    pub trend_percent: f64,
    pub history: Vec<FlaggedAppearance>,
}

impl SystemicCase {
    pub fn latest(&self) -> Option<&FlaggedAppearance> {
        self.history.last()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub semesters: Vec<SemesterSummary>,
    pub systemic_cases: Vec<SystemicCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterComparison {
    pub new_routes: Vec<RouteKey>,
    pub resolved_routes: Vec<RouteKey>,
    pub persistent_routes: Vec<RouteKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlineComparison {
    pub airline: String,
    pub total_routes: usize,
    pub flagged_routes: usize,
    pub flagged_percent: f64,
    pub mean_density: Option<f64>,
}

pub fn summarize(
    results: &AnalysisResults,
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
) -> SemesterSummary {
    let semester = results.semester;
    let total_inads = refusals
        .iter()
        .filter(|record| record.included() && semester.contains(record.year, record.month))
        .count();
    let total_pax = passengers
        .iter()
        .filter(|record| semester.contains(record.year, record.month))
        .fold(0u64, |total, record| total.saturating_add(record.pax));

    SemesterSummary {
        semester,
        total_inads,
        total_pax,
        airlines_passing: results.passing_airlines(),
        routes_passing: results.passing_routes(),
        high_priority: results.density.count(Priority::HighPriority),
        watch_list: results.density.count(Priority::WatchList),
        threshold: results.density.threshold,
        inad_rate: if total_pax > 0 {
            total_inads as f64 / total_pax as f64 * 1_000_000.0
        } else {
            0.0
        },
    }
}

/// Runs the full pipeline for each semester in chronological order and looks for
/// routes that stay flagged.
pub fn analyze_history(
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
    partners: &PartnerMap,
    semesters: &[Semester],
    config: &ClassificationConfig,
) -> HistoryReport {
    let mut ordered = semesters.to_vec();
    ordered.sort();
    ordered.dedup();

    let mut runs = Vec::with_capacity(ordered.len());
    for semester in ordered {
        match run_pipeline(refusals, passengers, partners, semester, config) {
            Ok(results) => runs.push(results),
            Err(error) => warn!(semester = %semester, error = %error, "skipping semester"),
        }
    }

    HistoryReport {
        semesters: runs
            .iter()
            .map(|results| summarize(results, refusals, passengers))
            .collect(),
        systemic_cases: detect_systemic(&runs, config.systemic_semesters),
    }
}

/// Longest run of adjacent half-years in an ascending list.
fn longest_consecutive_run(semesters: &[Semester]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<Semester> = None;

    for semester in semesters {
        current = match previous {
            Some(prev) if prev.next() == *semester => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*semester);
    }
    longest
}

fn trend_of(history: &[FlaggedAppearance]) -> (Trend, f64) {
    if history.len() < 2 {
        return (Trend::New, 0.0);
    }

    let densities = history
        .iter()
        .filter_map(|entry| entry.density)
        .collect::<Vec<_>>();
    let (first, last) = match densities.as_slice() {
        [first, .., last] => (*first, *last),
        _ => return (Trend::Unknown, 0.0),
    };

    let trend = if last < first {
        Trend::Improving
    } else {
        Trend::Worsening
    };
    let percent = if first > 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };
    (trend, percent)
}

/// `runs` must be in chronological order.
pub fn detect_systemic(runs: &[AnalysisResults], required_consecutive: usize) -> Vec<SystemicCase> {
    let mut index = HashMap::<RouteKey, usize>::new();
    let mut histories = Vec::<(RouteKey, Vec<FlaggedAppearance>)>::new();

    for run in runs {
        for route in run.density.routes.iter().filter(|r| r.priority.is_flagged()) {
            let appearance = FlaggedAppearance {
                semester: run.semester,
                priority: route.priority,
                density: route.density,
                inad_count: route.inad_count,
                pax: route.pax,
            };
            let key = route.route();
            match index.get(&key) {
                Some(&position) => histories[position].1.push(appearance),
                None => {
                    index.insert(key.clone(), histories.len());
                    histories.push((key, vec![appearance]));
                }
            }
        }
    }

    let mut cases = histories
        .into_iter()
        .map(|(key, history)| {
            let semesters = history.iter().map(|entry| entry.semester).collect::<Vec<_>>();
            let max_consecutive = longest_consecutive_run(&semesters);
            let (trend, trend_percent) = trend_of(&history);
            SystemicCase {
                airline: key.airline,
                last_stop: key.last_stop,
                total_appearances: history.len(),
                max_consecutive,
                is_systemic: max_consecutive >= required_consecutive,
                trend,
                trend_percent,
                history,
            }
        })
        .collect::<Vec<_>>();

    let latest_density = |case: &SystemicCase| {
        case.latest()
            .and_then(|entry| entry.density)
            .unwrap_or(0.0)
    };
    cases.sort_by(|a, b| {
        b.is_systemic
            .cmp(&a.is_systemic)
            .then_with(|| b.total_appearances.cmp(&a.total_appearances))
            .then_with(|| latest_density(b).total_cmp(&latest_density(a)))
    });

    debug!(
        routes = cases.len(),
        systemic = cases.iter().filter(|case| case.is_systemic).count(),
        required_consecutive,
        "systemic detection complete"
    );
    cases
}

fn flagged_set(routes: &[DensityResult]) -> BTreeSet<RouteKey> {
    routes
        .iter()
        .filter(|route| route.priority.is_flagged())
        .map(DensityResult::route)
        .collect()
}

pub fn compare_semesters(
    current: &[DensityResult],
    previous: &[DensityResult],
) -> SemesterComparison {
    let current = flagged_set(current);
    let previous = flagged_set(previous);

    SemesterComparison {
        new_routes: current.difference(&previous).cloned().collect(),
        resolved_routes: previous.difference(&current).cloned().collect(),
        persistent_routes: current.intersection(&previous).cloned().collect(),
    }
}

/// Whether an airline's flagged routes are isolated or airline-wide. `None` when the
/// airline has no classified routes.
pub fn airline_comparison(routes: &[DensityResult], airline: &str) -> Option<AirlineComparison> {
    let own = routes
        .iter()
        .filter(|route| route.airline == airline)
        .collect::<Vec<_>>();
    if own.is_empty() {
        return None;
    }

    let flagged_routes = own.iter().filter(|route| route.priority.is_flagged()).count();
    let densities = own.iter().filter_map(|route| route.density).collect::<Vec<_>>();
    let mean_density =
        (!densities.is_empty()).then(|| densities.iter().sum::<f64>() / densities.len() as f64);

    Some(AirlineComparison {
        airline: airline.to_string(),
        total_routes: own.len(),
        flagged_routes,
        flagged_percent: flagged_routes as f64 / own.len() as f64 * 100.0,
        mean_density,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalRoute {
    pub airline: String,
    pub last_stop: String,
    pub inad_count: usize,
    pub pax: u64,
    pub density: Option<f64>,
    pub confidence: u8,
}

impl From<&DensityResult> for LegalRoute {
    fn from(route: &DensityResult) -> Self {
        Self {
            airline: route.airline.clone(),
            last_stop: route.last_stop.clone(),
            inad_count: route.inad_count,
            pax: route.pax,
            density: route.density,
            confidence: route.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIssue {
    pub airline: String,
    pub last_stop: String,
    pub warning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemicEntry {
    pub airline: String,
    pub last_stop: String,
    pub total_appearances: usize,
    pub trend: Trend,
    pub trend_percent: f64,
}

/// Evidence summary of one classified semester, optionally narrowed to one airline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    pub total_routes_analyzed: usize,
    pub high_priority_count: usize,
    pub watch_list_count: usize,
    /// `None` when no route is left after the airline filter.
    pub threshold: Option<f64>,
    pub threshold_method: Option<ThresholdMethod>,
    pub high_priority_routes: Vec<LegalRoute>,
    pub watch_list_routes: Vec<LegalRoute>,
    pub data_quality_issues: Vec<QualityIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systemic_cases: Option<Vec<SystemicEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systemic_count: Option<usize>,
}

pub fn legal_summary(
    report: &DensityReport,
    systemic: Option<&[SystemicCase]>,
    airline: Option<&str>,
) -> LegalSummary {
    let in_scope = |code: &str| airline.is_none_or(|wanted| wanted == code);
    let routes = report
        .routes
        .iter()
        .filter(|route| in_scope(&route.airline))
        .collect::<Vec<_>>();
    let with_priority = |priority: Priority| {
        routes
            .iter()
            .filter(|route| route.priority == priority)
            .map(|route| LegalRoute::from(*route))
            .collect::<Vec<_>>()
    };

    let high_priority_routes = with_priority(Priority::HighPriority);
    let watch_list_routes = with_priority(Priority::WatchList);
    let data_quality_issues = routes
        .iter()
        .filter_map(|route| {
            route.quality_warning.as_ref().map(|warning| QualityIssue {
                airline: route.airline.clone(),
                last_stop: route.last_stop.clone(),
                warning: warning.clone(),
            })
        })
        .collect::<Vec<_>>();

    let systemic_cases = systemic.map(|cases| {
        cases
            .iter()
            .filter(|case| case.is_systemic && in_scope(&case.airline))
            .map(|case| SystemicEntry {
                airline: case.airline.clone(),
                last_stop: case.last_stop.clone(),
                total_appearances: case.total_appearances,
                trend: case.trend,
                trend_percent: case.trend_percent,
            })
            .collect::<Vec<_>>()
    });
    let (threshold, threshold_method) = if routes.is_empty() {
        (None, None)
    } else {
        (Some(report.threshold), Some(report.threshold_method))
    };

    debug!(
        airline = airline.unwrap_or("all"),
        routes = routes.len(),
        high_priority = high_priority_routes.len(),
        watch_list = watch_list_routes.len(),
        "legal summary built"
    );

    LegalSummary {
        airline: airline.map(str::to_string),
        total_routes_analyzed: routes.len(),
        high_priority_count: high_priority_routes.len(),
        watch_list_count: watch_list_routes.len(),
        threshold,
        threshold_method,
        high_priority_routes,
        watch_list_routes,
        data_quality_issues,
        systemic_count: systemic_cases.as_ref().map(Vec::len),
        systemic_cases,
    }
}
