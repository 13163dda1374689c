use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

/// RFC 3339 UTC timestamp with second precision, as recorded in manifests and snapshots.
pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Hex SHA-256 of an input file, recorded as provenance next to its row counts.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(file), &mut hasher)
        .with_context(|| format!("failed to hash input: {}", path.display()))?;
    Ok(hex_digest(&hasher.finalize()))
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Pretty JSON followed by a newline.
fn write_json<W: Write, T: Serialize>(mut output: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    write_json(BufWriter::new(file), value)
        .with_context(|| format!("failed to write json file: {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// `--json` output on stdout.
pub fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    write_json(BufWriter::new(io::stdout().lock()), value).context("failed to write json output")
}
