//! CSV boundary for the refusal, passenger and partner-map files.

use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::analysis::PartnerMap;
use crate::model::{PassengerRecord, RefusalRecord, RouteKey, SourceFile};
use crate::util::sha256_file;

#[derive(Debug, Deserialize)]
struct RefusalRow {
    airline: String,
    last_stop: String,
    year: String,
    month: String,
    #[serde(default)]
    refusal_code: String,
    #[serde(default)]
    airline_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PassengerRow {
    airline: String,
    airport: String,
    pax: String,
    year: String,
    month: String,
}

#[derive(Debug, Deserialize)]
struct PartnerRow(String, String, String);

#[derive(Debug)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub source: SourceFile,
}

/// Rows with a blank or non-numeric year, or a month outside 1..=12, are rejected.
fn parse_period(year: &str, month: &str) -> Option<(i32, u32)> {
    let year = year.trim().parse::<i32>().ok()?;
    let month = parse_whole_number(month)?;
    let month = u32::try_from(month).ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Spreadsheet exports write integers as `1234` or `1234.0`.
fn parse_whole_number(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    (value >= 0.0 && value < u64::MAX as f64 && value.fract() == 0.0).then_some(value as u64)
}

fn read_rows<T: DeserializeOwned>(
    path: &Path,
    delimiter: u8,
    has_headers: bool,
) -> Result<Vec<(u64, T)>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = if has_headers {
        Some(
            reader
                .headers()
                .with_context(|| format!("failed to read header of {}", path.display()))?
                .clone(),
        )
    } else {
        None
    };

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader
        .read_record(&mut record)
        .with_context(|| format!("failed to read {}", path.display()))?
    {
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let row = record
            .deserialize::<T>(headers.as_ref())
            .with_context(|| format!("failed to parse row in {} at line {line}", path.display()))?;
        rows.push((line, row));
    }
    Ok(rows)
}

fn source_file(path: &Path, rows: usize, rejected_rows: usize) -> Result<SourceFile> {
    Ok(SourceFile {
        path: path.display().to_string(),
        sha256: sha256_file(path)?,
        rows,
        rejected_rows,
    })
}

pub fn load_refusals(path: &Path) -> Result<Loaded<RefusalRecord>> {
    let rows = read_rows::<RefusalRow>(path, b',', true)?;
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;

    for (line, row) in rows {
        let Some((year, month)) = parse_period(&row.year, &row.month) else {
            warn!(
                path = %path.display(),
                line,
                year = %row.year,
                month = %row.month,
                "rejecting refusal row with invalid period"
            );
            rejected += 1;
            continue;
        };

        let mut record =
            RefusalRecord::new(row.airline, row.last_stop, year, month, row.refusal_code);
        if let Some(name) = row.airline_name {
            record = record.with_airline_name(name);
        }
        records.push(record);
    }

    let included = records.iter().filter(|record| record.included()).count();
    info!(
        path = %path.display(),
        rows = records.len(),
        included,
        rejected,
        "loaded refusal records"
    );

    let source = source_file(path, records.len(), rejected)?;
    Ok(Loaded { records, source })
}

pub fn load_passengers(path: &Path) -> Result<Loaded<PassengerRecord>> {
    let rows = read_rows::<PassengerRow>(path, b',', true)?;
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;

    for (line, row) in rows {
        let period = parse_period(&row.year, &row.month);
        let pax = parse_whole_number(&row.pax);
        let (Some((year, month)), Some(pax)) = (period, pax) else {
            warn!(
                path = %path.display(),
                line,
                year = %row.year,
                month = %row.month,
                pax = %row.pax,
                "rejecting passenger row with invalid period or count"
            );
            rejected += 1;
            continue;
        };

        records.push(PassengerRecord::new(row.airline, row.airport, pax, year, month));
    }

    info!(
        path = %path.display(),
        rows = records.len(),
        pax = records
            .iter()
            .fold(0u64, |total, record| total.saturating_add(record.pax)),
        rejected,
        "loaded passenger records"
    );

    let source = source_file(path, records.len(), rejected)?;
    Ok(Loaded { records, source })
}

/// `carrier;last_stop;partner` per line, no header.
pub fn load_partner_map(path: &Path) -> Result<Loaded<(RouteKey, String)>> {
    let rows = read_rows::<PartnerRow>(path, b';', false)?;
    let records = rows
        .into_iter()
        .map(|(_, PartnerRow(carrier, last_stop, partner))| {
            (RouteKey::new(&carrier, &last_stop), partner)
        })
        .collect::<Vec<_>>();

    info!(path = %path.display(), entries = records.len(), "loaded partner map");

    let source = source_file(path, records.len(), 0)?;
    Ok(Loaded { records, source })
}

pub fn partner_map(entries: Vec<(RouteKey, String)>) -> PartnerMap {
    let mut map = PartnerMap::default();
    for (route, partner) in entries {
        map.insert(route, partner);
    }
    map
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    #[test]
    fn refusal_loader_derives_inclusion_and_rejects_bad_months() {
        let file = write_temp(
            "airline,last_stop,year,month,refusal_code,airline_name\n\
             TK,IST,2024,3,A1,Turkish Airlines\n\
             TK, IST ,2024,6.0,C8,\n\
             LX,PRN,2024,13,A1,Swiss\n\
             LX,PRN,2024,,A1,Swiss\n\
             LX,PRN,2024,7,,Swiss\n",
        );

        let loaded = load_refusals(file.path()).expect("refusals load");
        assert_eq!(loaded.records.len(), 3);
        assert_eq!(loaded.source.rejected_rows, 2);
        assert_eq!(loaded.source.sha256.len(), 64);

        let first = &loaded.records[0];
        assert!(first.included());
        assert_eq!(first.airline_name.as_deref(), Some("Turkish Airlines"));

        let second = &loaded.records[1];
        assert_eq!(second.last_stop, "IST");
        assert_eq!(second.month, 6);
        assert!(!second.included());
        assert_eq!(second.airline_name, None);

        assert!(!loaded.records[2].included(), "blank codes are not included");
    }

    #[test]
    fn refusal_loader_tolerates_missing_optional_columns() {
        let file = write_temp("airline,last_stop,year,month,refusal_code\nEK,DXB,2023,11,C1\n");
        let loaded = load_refusals(file.path()).expect("refusals load");
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].airline_name, None);
    }

    #[test]
    fn passenger_loader_rejects_negative_and_fractional_counts() {
        let file = write_temp(
            "airline,airport,pax,year,month\n\
             TK,IST,8000,2024,3\n\
             TK,IST,1200.0,2024,4\n\
             TK,IST,-5,2024,5\n\
             TK,IST,10.5,2024,5\n\
             TK,IST,100,2024,0\n",
        );

        let loaded = load_passengers(file.path()).expect("passengers load");
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1].pax, 1200);
        assert_eq!(loaded.source.rejected_rows, 3);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let file = write_temp("airline,year,month\nTK,2024,3\n");
        let error = load_refusals(file.path()).expect_err("missing last_stop should fail");
        assert!(error.to_string().contains("failed to parse row"), "{error}");
    }

    #[test]
    fn partner_map_is_semicolon_delimited_without_header() {
        let file = write_temp("LX;PRN;JU\nLX;PRN;4U\nTK;IST;PC\n");
        let loaded = load_partner_map(file.path()).expect("partner map loads");
        let map = partner_map(loaded.records);

        assert_eq!(map.len(), 3);
        assert_eq!(map.partners_for(&RouteKey::new("LX", "PRN")), ["JU", "4U"]);
        assert!(map.partners_for(&RouteKey::new("EK", "DXB")).is_empty());
    }

    #[test]
    fn counts_beyond_the_u64_range_are_rejected() {
        assert_eq!(parse_whole_number("18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_whole_number("1200.0"), Some(1200));
        assert_eq!(parse_whole_number("1e20"), None);
        assert_eq!(parse_whole_number("inf"), None);
        assert_eq!(parse_whole_number("NaN"), None);
    }
}
