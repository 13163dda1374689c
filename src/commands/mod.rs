pub mod analyze;
pub mod codes;
pub mod compare;
pub mod history;
pub mod inspect;
pub mod publish;
pub mod semesters;
pub mod summary;

use anyhow::{Context, Result};
use tracing::info;

use crate::analysis::{AnalysisError, AnalysisResults, AnalysisSession, SessionState};
use crate::cli::InputArgs;
use crate::ingest::{load_partner_map, load_passengers, load_refusals, partner_map};
use crate::model::{ClassificationConfig, SourceFile};
use crate::semester::{Semester, available_semesters};

/// A loaded session plus the provenance of every file that went into it.
pub struct LoadedInputs {
    pub session: AnalysisSession,
    pub sources: Vec<SourceFile>,
}

pub fn load_inputs(input: &InputArgs, config: ClassificationConfig) -> Result<LoadedInputs> {
    let refusals = load_refusals(&input.inad)?;
    let passengers = load_passengers(&input.pax)?;

    let mut sources = vec![refusals.source, passengers.source];
    let mut session = AnalysisSession::new(config);
    session.set_refusals(refusals.records);
    session.set_passengers(passengers.records);

    if let Some(path) = &input.partner_map {
        let partners = load_partner_map(path)?;
        sources.push(partners.source);
        session.set_partners(partner_map(partners.records));
    }

    info!(
        refusals = session.refusals().len(),
        passengers = session.passengers().len(),
        partners = session.partners().len(),
        "inputs loaded"
    );

    Ok(LoadedInputs { session, sources })
}

/// The requested semester, or the most recent one with data on either side.
pub fn resolve_semester(
    session: &AnalysisSession,
    requested: Option<Semester>,
) -> Result<Semester> {
    if let Some(semester) = requested {
        return Ok(semester);
    }
    let latest = available_semesters(session.refusals(), session.passengers())
        .last()
        .copied()
        .ok_or(AnalysisError::NoSemesterSelected)
        .context("the input files contain no usable periods")?;
    info!(semester = %latest, "defaulting to latest semester");
    Ok(latest)
}

pub fn analyze_semester(
    session: &mut AnalysisSession,
    semester: Semester,
) -> Result<AnalysisResults> {
    session.select_semester(Some(semester));
    match session.refresh() {
        SessionState::Ready(results) => Ok(results.clone()),
        SessionState::Failed(error) => Err::<AnalysisResults, _>(error.clone())
            .with_context(|| format!("analysis of {semester} failed")),
        SessionState::Idle => Err(AnalysisError::MissingDatasets.into()),
    }
}
