//! Import of local-storage exports from the browser application
//!
//! The browser application keeps each collection under its own
//! local-storage key as a JSON string. An export is a JSON object with
//! some of those keys; each value is either the raw string or an
//! already-decoded array.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::models::{Breakdown, Equipment, MaintenanceTask, ThermalReading};

pub const DEFAULT_FILE_PATTERN: &str = r"(?i)\.json$";

const EQUIPMENTS_KEY: &str = "equipments";
const BREAKDOWNS_KEY: &str = "breakdowns";
const TASKS_KEY: &str = "maintenanceTasks";
const READINGS_KEY: &str = "thermalReadings";

/// Records decoded from one export file
#[derive(Debug, Default)]
pub struct ExportBundle {
    pub equipments: Vec<Equipment>,
    pub breakdowns: Vec<Breakdown>,
    pub maintenance_tasks: Vec<MaintenanceTask>,
    pub thermal_readings: Vec<ThermalReading>,
}

/// Find export files below `dir` whose file name matches `pattern`
pub fn find_export_files(dir: &Path, pattern: &Regex) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if entry.file_type().is_file() && pattern.is_match(filename) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

/// Decode one collection; local storage holds it as a JSON string
fn decode_collection<T: DeserializeOwned>(key: &str, value: Value) -> Result<Vec<T>> {
    let value = match value {
        Value::String(raw) => serde_json::from_str(&raw)
            .with_context(|| format!("'{key}' is not a JSON-encoded array"))?,
        Value::Null => return Ok(Vec::new()),
        other => other,
    };
    serde_json::from_value(value).with_context(|| format!("invalid records under '{key}'"))
}

/// Parse the text of a single export
pub fn parse_export(text: &str) -> Result<ExportBundle> {
    let Value::Object(mut root) =
        serde_json::from_str::<Value>(text).context("export is not valid JSON")?
    else {
        bail!("export must be a JSON object keyed by collection");
    };

    let mut bundle = ExportBundle::default();
    if let Some(value) = root.remove(EQUIPMENTS_KEY) {
        bundle.equipments = decode_collection(EQUIPMENTS_KEY, value)?;
    }
    if let Some(value) = root.remove(BREAKDOWNS_KEY) {
        bundle.breakdowns = decode_collection(BREAKDOWNS_KEY, value)?;
    }
    if let Some(value) = root.remove(TASKS_KEY) {
        bundle.maintenance_tasks = decode_collection(TASKS_KEY, value)?;
    }
    if let Some(value) = root.remove(READINGS_KEY) {
        bundle.thermal_readings = decode_collection(READINGS_KEY, value)?;
    }

    for key in root.keys() {
        debug!(key = %key, "ignoring collection");
    }

    Ok(bundle)
}

fn parse_export_file(path: &Path) -> Result<ExportBundle> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_export(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a bundle in one transaction
pub fn store_bundle(conn: &Connection, bundle: &ExportBundle) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for equipment in &bundle.equipments {
        db::upsert_equipment(&tx, equipment)?;
    }
    for breakdown in &bundle.breakdowns {
        db::upsert_breakdown(&tx, breakdown)?;
    }
    for task in &bundle.maintenance_tasks {
        db::upsert_maintenance_task(&tx, task)?;
    }
    for reading in &bundle.thermal_readings {
        db::upsert_thermal_reading(&tx, reading)?;
    }
    tx.commit()?;
    Ok(())
}

/// Import every matching export below `dir` into the database
///
/// A file that fails to parse is logged and counted, the others still
/// get imported.
pub fn import_directory(conn: &Connection, dir: &Path, pattern: &Regex) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    info!(dir = %dir.display(), "scanning for exports");
    let files = find_export_files(dir, pattern)?;
    info!(count = files.len(), "found export files");

    for path in &files {
        match parse_export_file(path) {
            Ok(bundle) => {
                store_bundle(conn, &bundle)?;

                stats.files += 1;
                stats.equipments += bundle.equipments.len();
                stats.breakdowns += bundle.breakdowns.len();
                stats.maintenance_tasks += bundle.maintenance_tasks.len();
                stats.thermal_readings += bundle.thermal_readings.len();

                debug!(
                    file = %path.display(),
                    equipments = bundle.equipments.len(),
                    breakdowns = bundle.breakdowns.len(),
                    tasks = bundle.maintenance_tasks.len(),
                    readings = bundle.thermal_readings.len(),
                    "imported"
                );
            }
            Err(e) => {
                warn!(file = %path.display(), error = ?e, "skipping export");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub files: usize,
    pub equipments: usize,
    pub breakdowns: usize,
    pub maintenance_tasks: usize,
    pub thermal_readings: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} files ({} equipment, {} breakdowns, {} tasks, {} thermal readings). Errors: {}",
            self.files,
            self.equipments,
            self.breakdowns,
            self.maintenance_tasks,
            self.thermal_readings,
            self.errors
        )
    }
}
