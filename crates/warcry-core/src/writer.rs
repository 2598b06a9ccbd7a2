//! Format-specific writers: JSON, CSV and Markdown tables

use crate::error::Result;
use crate::record::Record;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Serialize to pretty JSON with four-space indentation and a trailing newline
///
/// Object keys come out sorted because `serde_json::Map` is ordered by key.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(out)
}

/// Write JSON to `path`, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_json_bytes(value)?)?;
    Ok(())
}

/// Column headers for flattened records, in first-seen order
fn columns(rows: &[Record]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Render a cell the way a spreadsheet would show it
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| cell_text(Some(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}

/// Write flat records as CSV, one column per key
pub fn write_csv(path: &Path, rows: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let columns = columns(rows);
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell_text(row.get(c))))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a header row and pre-rendered rows as CSV, keeping the given column order
pub fn write_csv_grid(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write flat records as a GitHub-flavoured Markdown table
pub fn write_markdown_table(path: &Path, rows: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let columns = columns(rows);
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "| {} |", columns.join(" | "))?;
    writeln!(writer, "|{}", "---|".repeat(columns.len()))?;
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| escape_markdown(&cell_text(row.get(c))))
            .collect();
        writeln!(writer, "| {} |", cells.join(" | "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Escape a value for a Markdown table cell
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', "<br>")
}
