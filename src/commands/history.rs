use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::analysis::history::{HistoryReport, analyze_history};
use crate::cli::HistoryArgs;
use crate::commands::load_inputs;
use crate::export::format_density;
use crate::semester::available_semesters;
use crate::util::{write_json_pretty, write_json_stdout};

pub fn run(args: HistoryArgs) -> Result<()> {
    let config = args.classification.config();
    let loaded = load_inputs(&args.input, config.clone())?;
    let session = &loaded.session;

    let semesters = available_semesters(session.refusals(), session.passengers());
    let report = analyze_history(
        session.refusals(),
        session.passengers(),
        session.partners(),
        &semesters,
        &config,
    );
    info!(
        semesters = report.semesters.len(),
        flagged_routes = report.systemic_cases.len(),
        systemic = report.systemic_cases.iter().filter(|case| case.is_systemic).count(),
        required_consecutive = config.systemic_semesters,
        "history analysed"
    );

    if let Some(path) = &args.out {
        write_json_pretty(path, &report)?;
        info!(path = %path.display(), "history report written");
    }

    if args.json {
        return write_json_stdout(&report);
    }
    write_text_report(&report)
}

fn write_text_report(report: &HistoryReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Semester\tINAD\tPAX\tAirlines\tRoutes\tHigh\tWatch\tThreshold\tRate/M")?;
    for summary in &report.semesters {
        writeln!(
            output,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.3}\t{:.2}",
            summary.semester,
            summary.total_inads,
            summary.total_pax,
            summary.airlines_passing,
            summary.routes_passing,
            summary.high_priority,
            summary.watch_list,
            summary.threshold,
            summary.inad_rate,
        )?;
    }

    writeln!(output)?;
    writeln!(output, "Flagged routes: {}", report.systemic_cases.len())?;
    for case in &report.systemic_cases {
        writeln!(
            output,
            "{}\t{}\t{}\tappearances={}\tconsecutive={}\ttrend={:?} ({:+.1}%)\tlatest={}",
            if case.is_systemic { "SYSTEMIC" } else { "-" },
            case.airline,
            case.last_stop,
            case.total_appearances,
            case.max_consecutive,
            case.trend,
            case.trend_percent,
            format_density(case.latest().and_then(|entry| entry.density)),
        )?;
    }

    output.flush()?;
    Ok(())
}
