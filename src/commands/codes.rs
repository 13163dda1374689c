use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::CodesArgs;
use crate::codes::code_stats;
use crate::ingest::load_refusals;
use crate::semester::filter_refusals;
use crate::util::write_json_stdout;

pub fn run(args: CodesArgs) -> Result<()> {
    let loaded = load_refusals(&args.inad)?;
    let records = match args.semester {
        Some(semester) => filter_refusals(&loaded.records, semester),
        None => loaded.records,
    };

    let stats = code_stats(&records);
    let scope = args
        .semester
        .map(|semester| semester.label())
        .unwrap_or_else(|| "all semesters".to_string());
    info!(
        scope = %scope,
        records = records.len(),
        codes = stats.len(),
        "refusal code statistics"
    );

    if args.json {
        return write_json_stdout(&stats);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Code\tIncluded\tCount\tDescription")?;
    for stat in &stats {
        writeln!(
            output,
            "{}\t{}\t{}\t{}",
            stat.code,
            if stat.included { "yes" } else { "no" },
            stat.count,
            stat.description
        )?;
    }
    output.flush()?;
    Ok(())
}
