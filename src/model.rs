use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codes::{self, RefusalCategory};

/// One INAD case. `included` is derived from the refusal code on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefusalRecord {
    pub airline: String,
    pub last_stop: String,
    pub year: i32,
    pub month: u32,
    pub refusal_code: String,
    pub airline_name: Option<String>,
    included: bool,
}

impl RefusalRecord {
    pub fn new(
        airline: impl Into<String>,
        last_stop: impl Into<String>,
        year: i32,
        month: u32,
        refusal_code: impl Into<String>,
    ) -> Self {
        let refusal_code = refusal_code.into();
        let included = codes::is_included_code(&refusal_code);
        Self {
            airline: airline.into(),
            last_stop: last_stop.into(),
            year,
            month,
            refusal_code,
            airline_name: None,
            included,
        }
    }

    pub fn with_airline_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.airline_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    pub fn included(&self) -> bool {
        self.included
    }

    pub fn category(&self) -> RefusalCategory {
        codes::categorize(&self.refusal_code)
    }

    pub fn route(&self) -> RouteKey {
        RouteKey::new(&self.airline, &self.last_stop)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassengerRecord {
    pub airline: String,
    pub airport: String,
    pub pax: u64,
    pub year: i32,
    pub month: u32,
}

impl PassengerRecord {
    pub fn new(
        airline: impl Into<String>,
        airport: impl Into<String>,
        pax: u64,
        year: i32,
        month: u32,
    ) -> Self {
        Self {
            airline: airline.into(),
            airport: airport.into(),
            pax,
            year,
            month,
        }
    }

    /// The airport plays the role of the refusal data's last stop.
    pub fn route(&self) -> RouteKey {
        RouteKey::new(&self.airline, &self.airport)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AirlineKey(pub String);

impl fmt::Display for AirlineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteKey {
    pub airline: String,
    pub last_stop: String,
}

impl RouteKey {
    pub fn new(airline: &str, last_stop: &str) -> Self {
        Self {
            airline: airline.to_string(),
            last_stop: last_stop.to_string(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.airline, self.last_stop)
    }
}

/// Stage 1 (airline) or Stage 2 (route) screening outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResult<K> {
    pub key: K,
    pub inad_count: usize,
    pub passes_threshold: bool,
}

pub type AirlineScreening = ScreeningResult<AirlineKey>;
pub type RouteScreening = ScreeningResult<RouteKey>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    HighPriority,
    WatchList,
    Unreliable,
    Clear,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::HighPriority,
        Priority::WatchList,
        Priority::Unreliable,
        Priority::Clear,
    ];

    pub fn rank(self) -> u8 {
        match self {
            Self::HighPriority => 0,
            Self::WatchList => 1,
            Self::Unreliable => 2,
            Self::Clear => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighPriority => "HIGH_PRIORITY",
            Self::WatchList => "WATCH_LIST",
            Self::Unreliable => "UNRELIABLE",
            Self::Clear => "CLEAR",
        }
    }

    pub fn is_flagged(self) -> bool {
        matches!(self, Self::HighPriority | Self::WatchList)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityResult {
    pub airline: String,
    pub last_stop: String,
    pub inad_count: usize,
    pub pax: u64,
    /// Refusals per thousand passengers; `None` when no passengers matched.
    pub density: Option<f64>,
    pub reliable: bool,
    pub priority: Priority,
    pub confidence: u8,
    pub months_with_data: usize,
    pub quality_warning: Option<String>,
    pub category_breakdown: BTreeMap<RefusalCategory, usize>,
}

impl DensityResult {
    pub fn route(&self) -> RouteKey {
        RouteKey::new(&self.airline, &self.last_stop)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    #[default]
    Median,
    Mean,
    TrimmedMean,
}

impl ThresholdMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Median => "median",
            Self::Mean => "mean",
            Self::TrimmedMean => "trimmed_mean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassificationConfig {
    pub min_inad: usize,
    pub min_pax: u64,
    /// Per-mille floor for HIGH_PRIORITY.
    pub min_density: f64,
    pub high_priority_multiplier: f64,
    pub high_priority_min_inad: usize,
    pub threshold_method: ThresholdMethod,
    pub trimmed_percent: f64,
    pub systemic_semesters: usize,
    pub pax_completeness_months: usize,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            min_inad: 6,
            min_pax: 5000,
            min_density: 0.10,
            high_priority_multiplier: 1.5,
            high_priority_min_inad: 10,
            threshold_method: ThresholdMethod::Median,
            trimmed_percent: 0.1,
            systemic_semesters: 2,
            pax_completeness_months: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityReport {
    pub threshold: f64,
    pub threshold_method: ThresholdMethod,
    pub routes: Vec<DensityResult>,
}

impl DensityReport {
    pub fn count(&self, priority: Priority) -> usize {
        self.routes
            .iter()
            .filter(|route| route.priority == priority)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: String,
    pub sha256: String,
    pub rows: usize,
    pub rejected_rows: usize,
}

/// Written by `analyze --manifest-out`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRunManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub semester: String,
    pub config: ClassificationConfig,
    pub sources: Vec<SourceFile>,
    pub threshold: f64,
    pub airlines_screened: usize,
    pub airlines_passing: usize,
    pub routes_screened: usize,
    pub routes_passing: usize,
    pub priority_counts: BTreeMap<String, usize>,
}
