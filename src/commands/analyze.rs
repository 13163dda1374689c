use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::analysis::AnalysisResults;
use crate::cli::AnalyzeArgs;
use crate::commands::{analyze_semester, load_inputs, resolve_semester};
use crate::export::{format_density, write_density_csv_file};
use crate::model::{AnalysisRunManifest, ClassificationConfig, Priority, SourceFile};
use crate::util::{now_utc_string, write_json_pretty, write_json_stdout};

const MANIFEST_VERSION: u32 = 1;

pub fn run_manifest(
    results: &AnalysisResults,
    config: &ClassificationConfig,
    sources: Vec<SourceFile>,
    generated_at: String,
) -> AnalysisRunManifest {
    let priority_counts = Priority::ALL
        .into_iter()
        .map(|priority| (priority.as_str().to_string(), results.density.count(priority)))
        .collect::<BTreeMap<_, _>>();

    AnalysisRunManifest {
        manifest_version: MANIFEST_VERSION,
        generated_at,
        semester: results.semester.label(),
        config: config.clone(),
        sources,
        threshold: results.density.threshold,
        airlines_screened: results.airlines.len(),
        airlines_passing: results.passing_airlines(),
        routes_screened: results.routes.len(),
        routes_passing: results.passing_routes(),
        priority_counts,
    }
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = args.classification.config();
    let mut loaded = load_inputs(&args.input, config.clone())?;
    let semester = resolve_semester(&loaded.session, args.semester)?;
    let results = analyze_semester(&mut loaded.session, semester)?;

    info!(
        semester = %semester,
        threshold_method = config.threshold_method.as_str(),
        threshold = results.density.threshold,
        high_priority = results.density.count(Priority::HighPriority),
        watch_list = results.density.count(Priority::WatchList),
        unreliable = results.density.count(Priority::Unreliable),
        "stage 3 complete"
    );

    if let Some(path) = &args.csv_out {
        write_density_csv_file(path, &results.density)?;
        info!(path = %path.display(), rows = results.density.routes.len(), "density csv written");
    }

    if let Some(path) = &args.manifest_out {
        let manifest = run_manifest(&results, &config, loaded.sources, now_utc_string());
        write_json_pretty(path, &manifest)?;
        info!(path = %path.display(), "analysis manifest written");
    }

    if args.json {
        return write_json_stdout(&results);
    }
    write_text_report(&results)
}

fn write_text_report(results: &AnalysisResults) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Semester: {}", results.semester)?;
    writeln!(
        output,
        "Stage 1: {} of {} airlines pass",
        results.passing_airlines(),
        results.airlines.len()
    )?;
    writeln!(
        output,
        "Stage 2: {} of {} routes pass",
        results.passing_routes(),
        results.routes.len()
    )?;
    writeln!(
        output,
        "Stage 3: threshold {:.3} ({})",
        results.density.threshold,
        results.density.threshold_method.as_str()
    )?;

    for route in &results.density.routes {
        writeln!(
            output,
            "{}\t{}\t{}\tinad={}\tpax={}\tdensity={}\tconfidence={}",
            route.priority,
            route.airline,
            route.last_stop,
            route.inad_count,
            route.pax,
            format_density(route.density),
            route.confidence,
        )?;
        if !route.category_breakdown.is_empty() {
            let categories = route
                .category_breakdown
                .iter()
                .map(|(category, count)| format!("{}={count}", category.as_str()))
                .collect::<Vec<_>>();
            writeln!(output, "\tcategories: {}", categories.join(" "))?;
        }
        if let Some(warning) = &route.quality_warning {
            writeln!(output, "\twarning: {warning}")?;
        }
    }

    output.flush()?;
    Ok(())
}
