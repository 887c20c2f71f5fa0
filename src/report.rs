//! Per-target result rows and their CSV / JSON export.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::method::WipeMethod;

pub const CSV_HEADER: [&str; 9] = [
    "path",
    "method",
    "size",
    "passes",
    "renamed",
    "verified",
    "duration_sec",
    "result",
    "error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verification {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Verification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verification::Yes => "YES",
            Verification::No => "NO",
            Verification::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WipeResult {
    Deleted,
    Missing,
    LinkRemoved,
    Partial,
    Error,
}

impl WipeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            WipeResult::Deleted => "DELETED",
            WipeResult::Missing => "MISSING",
            WipeResult::LinkRemoved => "LINK_REMOVED",
            WipeResult::Partial => "PARTIAL",
            WipeResult::Error => "ERROR",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, WipeResult::Error | WipeResult::Partial)
    }
}

impl fmt::Display for WipeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report line. Built once per terminal outcome and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Path the unlink was attempted against, after any renames.
    pub path: String,
    pub method: WipeMethod,
    pub size: u64,
    pub passes: u32,
    pub renamed: u32,
    pub verified: Verification,
    pub duration_sec: f64,
    pub result: WipeResult,
    #[serde(default)]
    pub error: String,
}

impl ReportRow {
    pub fn missing(path: &Path, method: WipeMethod) -> Self {
        Self::benign(path, method, WipeResult::Missing)
    }

    pub fn link_removed(path: &Path, method: WipeMethod) -> Self {
        Self::benign(path, method, WipeResult::LinkRemoved)
    }

    /// Nothing was overwritten, so there is nothing to verify: `N/A`, not `NO`.
    fn benign(path: &Path, method: WipeMethod, result: WipeResult) -> Self {
        Self {
            path: path.display().to_string(),
            method,
            size: 0,
            passes: 0,
            renamed: 0,
            verified: Verification::NotApplicable,
            duration_sec: 0.0,
            result,
            error: String::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    pub fn is_ok(&self) -> bool {
        !self.result.is_failure()
    }
}

/// Counters for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub deleted: usize,
    pub failed: usize,
    pub missing: usize,
    pub links_removed: usize,
    pub partial: usize,
    pub bytes_wiped: u64,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn record(&mut self, row: &ReportRow) {
        match row.result {
            WipeResult::Deleted => {
                self.deleted += 1;
                self.bytes_wiped += row.size;
            }
            WipeResult::Error => self.failed += 1,
            WipeResult::Missing => self.missing += 1,
            WipeResult::LinkRemoved => self.links_removed += 1,
            WipeResult::Partial => self.partial += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.partial > 0 || self.cancelled
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn write_csv<W: Write>(rows: &[ReportRow], mut out: W) -> Result<()> {
    writeln!(out, "{}", CSV_HEADER.join(","))?;
    for row in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{:.3},{},{}",
            csv_field(&row.path),
            row.method,
            row.size,
            row.passes,
            row.renamed,
            row.verified,
            row.duration_sec,
            row.result,
            csv_field(&row.error),
        )?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(rows: &[ReportRow], mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, rows)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write the report to `path`: JSON for a `.json` extension, CSV otherwise.
pub fn export(rows: &[ReportRow], path: &Path) -> Result<()> {
    let out = BufWriter::new(File::create(path)?);
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        write_json(rows, out)
    } else {
        write_csv(rows, out)
    }
}

pub fn human_size(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut f = n as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if f < 1024.0 {
            return format!("{:.1} {}", f, unit);
        }
        f /= 1024.0;
    }
    format!("{:.1} {}", f, UNITS[UNITS.len() - 1])
}
