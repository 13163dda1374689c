use std::io::{self, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use crate::cli::SemestersArgs;
use crate::commands::load_inputs;
use crate::model::{ClassificationConfig, PassengerRecord, RefusalRecord};
use crate::semester::{Semester, available_semesters};
use crate::util::write_json_stdout;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SemesterCoverage {
    pub semester: Semester,
    pub refusals: usize,
    pub included_refusals: usize,
    pub passenger_rows: usize,
    pub pax: u64,
}

pub fn coverage(
    refusals: &[RefusalRecord],
    passengers: &[PassengerRecord],
) -> Vec<SemesterCoverage> {
    available_semesters(refusals, passengers)
        .into_iter()
        .map(|semester| {
            let in_semester = refusals
                .iter()
                .filter(|record| semester.contains(record.year, record.month));
            let (refusal_count, included_refusals) = in_semester
                .fold((0, 0), |(all, included), record| {
                    (all + 1, included + usize::from(record.included()))
                });
            let passenger_side = passengers
                .iter()
                .filter(|record| semester.contains(record.year, record.month))
                .collect::<Vec<_>>();

            SemesterCoverage {
                semester,
                refusals: refusal_count,
                included_refusals,
                passenger_rows: passenger_side.len(),
                pax: passenger_side
                    .iter()
                    .fold(0, |total: u64, record| total.saturating_add(record.pax)),
            }
        })
        .collect()
}

pub fn run(args: SemestersArgs) -> Result<()> {
    let loaded = load_inputs(&args.input, ClassificationConfig::default())?;
    let rows = coverage(loaded.session.refusals(), loaded.session.passengers());
    info!(semesters = rows.len(), "semesters derived");

    if args.json {
        return write_json_stdout(&rows);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Semester\tRefusals\tIncluded\tPAX rows\tPAX")?;
    for row in &rows {
        writeln!(
            output,
            "{}\t{}\t{}\t{}\t{}",
            row.semester, row.refusals, row.included_refusals, row.passenger_rows, row.pax
        )?;
    }
    output.flush()?;
    Ok(())
}
