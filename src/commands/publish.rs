use anyhow::Result;
use tracing::info;

use crate::analysis::publish::{PublishInput, build_snapshot};
use crate::cli::PublishArgs;
use crate::commands::{analyze_semester, load_inputs, resolve_semester};
use crate::semester::available_semesters;
use crate::util::{now_utc_string, write_json_pretty};

pub fn run(args: PublishArgs) -> Result<()> {
    let config = args.classification.config();
    let mut loaded = load_inputs(&args.input, config.clone())?;
    let semester = resolve_semester(&loaded.session, args.semester)?;
    let results = analyze_semester(&mut loaded.session, semester)?;

    let session = &loaded.session;
    let semesters = available_semesters(session.refusals(), session.passengers());
    let snapshot = build_snapshot(
        &PublishInput {
            refusals: session.refusals(),
            passengers: session.passengers(),
            results: &results,
            semesters: &semesters,
            config: &config,
        },
        &now_utc_string(),
    );

    write_json_pretty(&args.out, &snapshot)?;
    info!(
        path = %args.out.display(),
        semester = %semester,
        version = snapshot.metadata.version,
        airlines = snapshot.airlines.len(),
        routes = snapshot.routes.len(),
        trend_points = snapshot.trends.len(),
        "snapshot published"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::publish::{PublishedSnapshot, SNAPSHOT_VERSION};
    use crate::cli::ClassificationArgs;
    use crate::commands::tests::write_inputs;
    use crate::util::read_json;

    fn default_classification() -> ClassificationArgs {
        ClassificationArgs {
            min_inad: 6,
            min_pax: 5000,
            min_density: 0.10,
            high_priority_multiplier: 1.5,
            high_priority_min_inad: 10,
            threshold_method: crate::cli::ThresholdMethodArg::Median,
            trimmed_percent: 0.1,
            systemic_semesters: 2,
            pax_completeness_months: 4,
        }
    }

    #[test]
    fn publish_writes_a_loadable_snapshot() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = write_inputs(dir.path());
        let out = dir.path().join("public").join("snapshot.json");

        run(PublishArgs {
            input,
            semester: None,
            classification: default_classification(),
            out: out.clone(),
        })
        .expect("publish runs");

        let snapshot: PublishedSnapshot = read_json(&out).expect("snapshot loads");
        assert_eq!(snapshot.metadata.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.metadata.semester.label(), "2024 H2");
        assert_eq!(snapshot.trends.len(), 2);
        assert_eq!(snapshot.summary.total_inads, 19);
        assert!(snapshot.classification_config.is_some());
    }
}
