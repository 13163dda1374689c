use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::analysis::history::{
    AirlineComparison, SemesterComparison, airline_comparison, compare_semesters,
};
use crate::cli::CompareArgs;
use crate::commands::{analyze_semester, load_inputs};
use crate::export::format_density;
use crate::model::RouteKey;
use crate::semester::Semester;
use crate::util::write_json_stdout;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareReport {
    current: Semester,
    previous: Semester,
    comparison: SemesterComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    airline: Option<AirlineComparison>,
}

pub fn run(args: CompareArgs) -> Result<()> {
    let config = args.classification.config();
    let mut loaded = load_inputs(&args.input, config)?;

    let previous = analyze_semester(&mut loaded.session, args.previous)?;
    let current = analyze_semester(&mut loaded.session, args.current)?;
    let comparison = compare_semesters(&current.density.routes, &previous.density.routes);
    let airline = args
        .airline
        .as_deref()
        .and_then(|code| airline_comparison(&current.density.routes, code));

    info!(
        current = %args.current,
        previous = %args.previous,
        new = comparison.new_routes.len(),
        resolved = comparison.resolved_routes.len(),
        persistent = comparison.persistent_routes.len(),
        "semesters compared"
    );

    let report = CompareReport {
        current: args.current,
        previous: args.previous,
        comparison,
        airline,
    };
    if args.json {
        return write_json_stdout(&report);
    }
    write_text_report(&report)
}

fn write_routes(output: &mut impl Write, label: &str, routes: &[RouteKey]) -> Result<()> {
    writeln!(output, "{label}: {}", routes.len())?;
    for route in routes {
        writeln!(output, "\t{route}")?;
    }
    Ok(())
}

fn write_text_report(report: &CompareReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Flagged routes {} vs {}", report.current, report.previous)?;
    write_routes(&mut output, "New", &report.comparison.new_routes)?;
    write_routes(&mut output, "Resolved", &report.comparison.resolved_routes)?;
    write_routes(&mut output, "Persistent", &report.comparison.persistent_routes)?;

    if let Some(airline) = &report.airline {
        writeln!(
            output,
            "Airline {}: {} of {} routes flagged ({:.1}%), mean density {}",
            airline.airline,
            airline.flagged_routes,
            airline.total_routes,
            airline.flagged_percent,
            format_density(airline.mean_density),
        )?;
    }

    output.flush()?;
    Ok(())
}
