use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::density::{PartnerMap, classify_routes};
use super::screening::{screen_airlines, screen_routes};
use crate::model::{
    AirlineScreening, ClassificationConfig, DensityReport, PassengerRecord, RefusalRecord,
    RouteScreening,
};
use crate::semester::{Semester, available_semesters, filter_passengers, filter_refusals};

/// User-correctable input states that stop a run. Not data-quality problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("both the refusal and the passenger dataset are required before analysis")]
    MissingDatasets,
    #[error("no semester selected")]
    NoSemesterSelected,
    #[error("no data for the selected semester ({0})")]
    NoDataForSemester(Semester),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub semester: Semester,
    pub airlines: Vec<AirlineScreening>,
    pub routes: Vec<RouteScreening>,
    pub density: DensityReport,
}

impl AnalysisResults {
    pub fn passing_airlines(&self) -> usize {
        self.airlines.iter().filter(|a| a.passes_threshold).count()
    }

    pub fn passing_routes(&self) -> usize {
        self.routes.iter().filter(|r| r.passes_threshold).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Ready(AnalysisResults),
    Failed(AnalysisError),
}

/// Runs Stage 1 -> 2 -> 3 for one semester. Pure apart from logging.
pub fn run_pipeline(
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
    partners: &PartnerMap,
    semester: Semester,
    config: &ClassificationConfig,
) -> Result<AnalysisResults, AnalysisError> {
    let refusals = filter_refusals(refusals, semester);
    let passengers = filter_passengers(passengers, semester);
    if refusals.is_empty() && passengers.is_empty() {
        return Err(AnalysisError::NoDataForSemester(semester));
    }
    if refusals.is_empty() || passengers.is_empty() {
        warn!(
            semester = %semester,
            refusals = refusals.len(),
            passengers = passengers.len(),
            "semester has data on one side only"
        );
    }

    let airlines = screen_airlines(&refusals, config.min_inad);
    let routes = screen_routes(&refusals, &airlines, config.min_inad);
    let density = classify_routes(&routes, &refusals, &passengers, partners, config);

    Ok(AnalysisResults {
        semester,
        airlines,
        routes,
        density,
    })
}

/// Explicit pipeline state. Mutators only record inputs; callers invoke
/// [`AnalysisSession::refresh`] to re-derive semesters and results.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    refusals: Option<Vec<RefusalRecord>>,
    passengers: Option<Vec<PassengerRecord>>,
    partners: PartnerMap,
    selected: Option<Semester>,
    config: ClassificationConfig,
    semesters: Vec<Semester>,
    state: SessionState,
}

impl AnalysisSession {
    pub fn new(config: ClassificationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set_refusals(&mut self, records: Vec<RefusalRecord>) {
        self.refusals = Some(records);
    }

    pub fn set_passengers(&mut self, records: Vec<PassengerRecord>) {
        self.passengers = Some(records);
    }

    pub fn set_partners(&mut self, partners: PartnerMap) {
        self.partners = partners;
    }

    pub fn select_semester(&mut self, semester: Option<Semester>) {
        self.selected = semester;
    }

    pub fn refusals(&self) -> &[RefusalRecord] {
        self.refusals.as_deref().unwrap_or(&[])
    }

    pub fn passengers(&self) -> &[PassengerRecord] {
        self.passengers.as_deref().unwrap_or(&[])
    }

    pub fn partners(&self) -> &PartnerMap {
        &self.partners
    }

    pub fn semesters(&self) -> &[Semester] {
        &self.semesters
    }

    pub fn results(&self) -> Option<&AnalysisResults> {
        match &self.state {
            SessionState::Ready(results) => Some(results),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match &self.state {
            SessionState::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Re-derives the semester list and, when both datasets are loaded, replaces the
    /// previous outcome wholesale. Returns the new state.
    pub fn refresh(&mut self) -> &SessionState {
        self.semesters = available_semesters(self.refusals(), self.passengers());
        debug!(semesters = self.semesters.len(), "semesters derived");

        let outcome = self.analyze();
        self.state = match outcome {
            Ok(results) => {
                info!(
                    semester = %results.semester,
                    airlines_passing = results.passing_airlines(),
                    routes_passing = results.passing_routes(),
                    threshold = results.density.threshold,
                    "analysis complete"
                );
                SessionState::Ready(results)
            }
            Err(error) => {
                warn!(error = %error, "analysis not possible");
                SessionState::Failed(error)
            }
        };
        &self.state
    }

    fn analyze(&self) -> Result<AnalysisResults, AnalysisError> {
        let (Some(refusals), Some(passengers)) = (&self.refusals, &self.passengers) else {
            return Err(AnalysisError::MissingDatasets);
        };
        let semester = self.selected.ok_or(AnalysisError::NoSemesterSelected)?;
        run_pipeline(refusals, passengers, &self.partners, semester, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semester::Half;

    fn refusals() -> Vec<RefusalRecord> {
        let mut records = Vec::new();
        for _ in 0..12 {
            records.push(RefusalRecord::new("TK", "IST", 2024, 2, "A1"));
        }
        for _ in 0..6 {
            records.push(RefusalRecord::new("LX", "PRN", 2024, 8, "C1"));
        }
        records
    }

    fn passengers() -> Vec<PassengerRecord> {
        vec![
            PassengerRecord::new("TK", "IST", 8_000, 2024, 2),
            PassengerRecord::new("LX", "PRN", 9_000, 2023, 9),
        ]
    }

    #[test]
    fn refresh_requires_both_datasets() {
        let mut session = AnalysisSession::new(ClassificationConfig::default());
        session.set_refusals(refusals());
        session.select_semester(Some(Semester::new(2024, Half::H1)));

        assert_eq!(
            session.refresh(),
            &SessionState::Failed(AnalysisError::MissingDatasets)
        );
        assert_eq!(session.semesters().len(), 2);
    }

    #[test]
    fn refresh_requires_a_selected_semester() {
        let mut session = AnalysisSession::new(ClassificationConfig::default());
        session.set_refusals(refusals());
        session.set_passengers(passengers());

        session.refresh();
        assert_eq!(session.error(), Some(&AnalysisError::NoSemesterSelected));
        assert_eq!(session.semesters().len(), 3);
    }

    #[test]
    fn failure_discards_previous_results_and_success_clears_error() {
        let mut session = AnalysisSession::new(ClassificationConfig::default());
        session.set_refusals(refusals());
        session.set_passengers(passengers());
        session.select_semester(Some(Semester::new(2024, Half::H1)));

        session.refresh();
        let results = session.results().expect("first run should succeed");
        assert_eq!(results.passing_airlines(), 1);
        assert_eq!(results.density.routes.len(), 1);
        assert_eq!(results.density.routes[0].pax, 8_000);

        session.select_semester(Some(Semester::new(2022, Half::H2)));
        session.refresh();
        assert!(session.results().is_none());
        assert_eq!(
            session.error(),
            Some(&AnalysisError::NoDataForSemester(Semester::new(2022, Half::H2)))
        );

        session.select_semester(Some(Semester::new(2024, Half::H1)));
        session.refresh();
        assert!(session.error().is_none());
        assert!(session.results().is_some());
    }

    #[test]
    fn one_sided_semester_is_still_reportable() {
        let mut session = AnalysisSession::new(ClassificationConfig::default());
        session.set_refusals(refusals());
        session.set_passengers(passengers());
        session.select_semester(Some(Semester::new(2024, Half::H2)));

        session.refresh();
        let results = session.results().expect("refusal-only semester should run");
        let route = &results.density.routes[0];
        assert_eq!(route.airline, "LX");
        assert_eq!(route.pax, 0);
        assert_eq!(route.density, None);
    }

    #[test]
    fn pipeline_output_is_identical_across_runs() {
        let semester = Semester::new(2024, Half::H1);
        let config = ClassificationConfig::default();
        let partners = PartnerMap::default();
        let first = run_pipeline(&refusals(), &passengers(), &partners, semester, &config)
            .expect("pipeline should run");
        let second = run_pipeline(&refusals(), &passengers(), &partners, semester, &config)
            .expect("pipeline should run");

        assert_eq!(
            serde_json::to_vec(&first).expect("serialize first"),
            serde_json::to_vec(&second).expect("serialize second")
        );
    }

    #[test]
    fn error_messages_are_human_readable() {
        let error = AnalysisError::NoDataForSemester(Semester::new(2024, Half::H2));
        assert_eq!(error.to_string(), "no data for the selected semester (2024 H2)");
    }
}
