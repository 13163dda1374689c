use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::analysis::history::{LegalRoute, LegalSummary, analyze_history, legal_summary};
use crate::cli::SummaryArgs;
use crate::commands::{LoadedInputs, analyze_semester, load_inputs, resolve_semester};
use crate::export::format_density;
use crate::model::ClassificationConfig;
use crate::semester::{Semester, available_semesters};
use crate::util::{write_json_pretty, write_json_stdout};

/// Legal summary for one semester. Systemic cases come from the semesters up to
/// and including `semester`.
pub fn build_summary(
    loaded: &mut LoadedInputs,
    config: &ClassificationConfig,
    semester: Semester,
    airline: Option<&str>,
    systemic: bool,
) -> Result<LegalSummary> {
    let results = analyze_semester(&mut loaded.session, semester)?;

    let history = systemic.then(|| {
        let session = &loaded.session;
        let semesters = available_semesters(session.refusals(), session.passengers())
            .into_iter()
            .filter(|candidate| *candidate <= semester)
            .collect::<Vec<_>>();
        analyze_history(
            session.refusals(),
            session.passengers(),
            session.partners(),
            &semesters,
            config,
        )
    });
    let cases = history.as_ref().map(|report| report.systemic_cases.as_slice());

    Ok(legal_summary(&results.density, cases, airline))
}

pub fn run(args: SummaryArgs) -> Result<()> {
    let config = args.classification.config();
    let mut loaded = load_inputs(&args.input, config.clone())?;
    let semester = resolve_semester(&loaded.session, args.semester)?;
    let summary = build_summary(
        &mut loaded,
        &config,
        semester,
        args.airline.as_deref(),
        args.systemic,
    )?;

    info!(
        semester = %semester,
        airline = args.airline.as_deref().unwrap_or("all"),
        routes = summary.total_routes_analyzed,
        high_priority = summary.high_priority_count,
        watch_list = summary.watch_list_count,
        quality_issues = summary.data_quality_issues.len(),
        systemic = summary.systemic_count,
        "legal summary ready"
    );

    if let Some(path) = &args.out {
        write_json_pretty(path, &summary)?;
        info!(path = %path.display(), "legal summary written");
    }

    if args.json {
        return write_json_stdout(&summary);
    }
    write_text_report(semester, &summary)
}

fn write_routes(output: &mut impl Write, title: &str, routes: &[LegalRoute]) -> Result<()> {
    writeln!(output, "{title}: {}", routes.len())?;
    for route in routes {
        writeln!(
            output,
            "\t{}\t{}\tinad={}\tpax={}\tdensity={}\tconfidence={}",
            route.airline,
            route.last_stop,
            route.inad_count,
            route.pax,
            format_density(route.density),
            route.confidence,
        )?;
    }
    Ok(())
}

fn write_text_report(semester: Semester, summary: &LegalSummary) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Semester: {semester}")?;
    if let Some(airline) = &summary.airline {
        writeln!(output, "Airline: {airline}")?;
    }
    writeln!(output, "Routes analysed: {}", summary.total_routes_analyzed)?;
    match (summary.threshold, summary.threshold_method) {
        (Some(threshold), Some(method)) => {
            writeln!(output, "Threshold: {threshold:.3} ({})", method.as_str())?
        }
        _ => writeln!(output, "Threshold: N/A")?,
    }

    write_routes(&mut output, "High priority", &summary.high_priority_routes)?;
    write_routes(&mut output, "Watch list", &summary.watch_list_routes)?;

    writeln!(output, "Data quality issues: {}", summary.data_quality_issues.len())?;
    for issue in &summary.data_quality_issues {
        writeln!(output, "\t{}\t{}\t{}", issue.airline, issue.last_stop, issue.warning)?;
    }

    if let Some(cases) = &summary.systemic_cases {
        writeln!(output, "Systemic cases: {}", cases.len())?;
        for case in cases {
            writeln!(
                output,
                "\t{}\t{}\tappearances={}\ttrend={:?} ({:+.1}%)",
                case.airline,
                case.last_stop,
                case.total_appearances,
                case.trend,
                case.trend_percent,
            )?;
        }
    }

    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::write_inputs;
    use crate::semester::Half;

    #[test]
    fn summary_for_one_airline_skips_other_carriers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = write_inputs(dir.path());
        let config = ClassificationConfig::default();
        let mut loaded = load_inputs(&input, config.clone()).expect("inputs load");
        let semester = Semester::new(2024, Half::H2);

        let summary =
            build_summary(&mut loaded, &config, semester, Some("TK"), false).expect("summary");
        assert_eq!(summary.total_routes_analyzed, 1);
        assert_eq!(summary.high_priority_count + summary.watch_list_count, 1);
        assert!(summary.systemic_cases.is_none());

        let everything =
            build_summary(&mut loaded, &config, semester, None, true).expect("summary");
        assert_eq!(everything.total_routes_analyzed, 2);
        assert_eq!(everything.systemic_count, Some(0), "no route is flagged twice");
    }
}
