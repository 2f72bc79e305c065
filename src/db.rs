//! Database schema and operations

use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

use crate::error::ParseError;
use crate::models::{Breakdown, Equipment, MaintenanceTask, ThermalReading};
use crate::timefmt::{format_timestamp, parse_timestamp};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Equipment registry
        CREATE TABLE IF NOT EXISTS equipment (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            status TEXT NOT NULL,
            installation_date TEXT NOT NULL,
            next_maintenance_date TEXT NOT NULL,
            location TEXT,
            manufacturer TEXT,
            model TEXT
        );

        -- Failure events; end_time is NULL while unresolved
        CREATE TABLE IF NOT EXISTS breakdowns (
            id TEXT PRIMARY KEY,
            equipment_id TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            start_time TEXT NOT NULL,
            end_time TEXT,
            cause TEXT NOT NULL DEFAULT '',
            severity TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS maintenance_tasks (
            id TEXT PRIMARY KEY,
            equipment_id TEXT NOT NULL,
            task_type TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            scheduled_date TEXT NOT NULL,
            completed_date TEXT,
            status TEXT NOT NULL,
            frequency TEXT,
            estimated_duration REAL NOT NULL,
            actual_duration REAL
        );

        CREATE TABLE IF NOT EXISTS thermal_readings (
            id TEXT PRIMARY KEY,
            equipment_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            hot_inlet_temp REAL NOT NULL,
            hot_outlet_temp REAL NOT NULL,
            cold_inlet_temp REAL NOT NULL,
            cold_outlet_temp REAL NOT NULL,
            flow_rate_hot REAL NOT NULL,
            flow_rate_cold REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_breakdowns_equipment ON breakdowns(equipment_id);
        CREATE INDEX IF NOT EXISTS idx_tasks_equipment ON maintenance_tasks(equipment_id);
        CREATE INDEX IF NOT EXISTS idx_readings_equipment ON thermal_readings(equipment_id, timestamp);
        "#,
    )?;
    Ok(())
}

/// Insert or replace an equipment record
pub fn upsert_equipment(conn: &Connection, equipment: &Equipment) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO equipment
            (id, name, category, status, installation_date, next_maintenance_date, location, manufacturer, model)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            &equipment.id,
            &equipment.name,
            equipment.category.as_str(),
            equipment.status.as_str(),
            format_timestamp(&equipment.installation_date),
            format_timestamp(&equipment.next_maintenance_date),
            &equipment.location,
            &equipment.manufacturer,
            &equipment.model,
        ),
    )?;
    Ok(())
}

pub fn upsert_breakdown(conn: &Connection, breakdown: &Breakdown) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO breakdowns (id, equipment_id, description, start_time, end_time, cause, severity)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &breakdown.id,
            &breakdown.equipment_id,
            &breakdown.description,
            format_timestamp(&breakdown.start_time),
            breakdown.end_time.as_ref().map(format_timestamp),
            &breakdown.cause,
            breakdown.severity.as_str(),
        ),
    )?;
    Ok(())
}

pub fn upsert_maintenance_task(conn: &Connection, task: &MaintenanceTask) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO maintenance_tasks
            (id, equipment_id, task_type, title, scheduled_date, completed_date, status, frequency, estimated_duration, actual_duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        (
            &task.id,
            &task.equipment_id,
            task.task_type.as_str(),
            &task.title,
            format_timestamp(&task.scheduled_date),
            task.completed_date.as_ref().map(format_timestamp),
            task.status.as_str(),
            task.frequency.map(|f| f.as_str()),
            task.estimated_duration,
            task.actual_duration,
        ),
    )?;
    Ok(())
}

pub fn upsert_thermal_reading(conn: &Connection, reading: &ThermalReading) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO thermal_readings
            (id, equipment_id, timestamp, hot_inlet_temp, hot_outlet_temp, cold_inlet_temp, cold_outlet_temp, flow_rate_hot, flow_rate_cold)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        (
            &reading.id,
            &reading.equipment_id,
            format_timestamp(&reading.timestamp),
            reading.hot_inlet_temp,
            reading.hot_outlet_temp,
            reading.cold_inlet_temp,
            reading.cold_outlet_temp,
            reading.flow_rate_hot,
            reading.flow_rate_cold,
        ),
    )?;
    Ok(())
}

/// Clear all records (for re-import)
pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM thermal_readings;
        DELETE FROM maintenance_tasks;
        DELETE FROM breakdowns;
        DELETE FROM equipment;
        "#,
    )?;
    Ok(())
}

fn conversion_error(idx: usize, err: ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Text column holding one of the snake_case enum names
fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

fn optional_time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_timestamp(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn optional_enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = ParseError>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn equipment_from_row(row: &Row<'_>) -> rusqlite::Result<Equipment> {
    Ok(Equipment {
        id: row.get(0)?,
        name: row.get(1)?,
        category: enum_column(row, 2)?,
        status: enum_column(row, 3)?,
        installation_date: time_column(row, 4)?,
        next_maintenance_date: time_column(row, 5)?,
        location: row.get(6)?,
        manufacturer: row.get(7)?,
        model: row.get(8)?,
    })
}

fn breakdown_from_row(row: &Row<'_>) -> rusqlite::Result<Breakdown> {
    Ok(Breakdown {
        id: row.get(0)?,
        equipment_id: row.get(1)?,
        description: row.get(2)?,
        start_time: time_column(row, 3)?,
        end_time: optional_time_column(row, 4)?,
        cause: row.get(5)?,
        severity: enum_column(row, 6)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<MaintenanceTask> {
    Ok(MaintenanceTask {
        id: row.get(0)?,
        equipment_id: row.get(1)?,
        task_type: enum_column(row, 2)?,
        title: row.get(3)?,
        scheduled_date: time_column(row, 4)?,
        completed_date: optional_time_column(row, 5)?,
        status: enum_column(row, 6)?,
        frequency: optional_enum_column(row, 7)?,
        estimated_duration: row.get(8)?,
        actual_duration: row.get(9)?,
    })
}

fn reading_from_row(row: &Row<'_>) -> rusqlite::Result<ThermalReading> {
    Ok(ThermalReading {
        id: row.get(0)?,
        equipment_id: row.get(1)?,
        timestamp: time_column(row, 2)?,
        hot_inlet_temp: row.get(3)?,
        hot_outlet_temp: row.get(4)?,
        cold_inlet_temp: row.get(5)?,
        cold_outlet_temp: row.get(6)?,
        flow_rate_hot: row.get(7)?,
        flow_rate_cold: row.get(8)?,
    })
}

/// List all equipment in the database
pub fn list_equipment(conn: &Connection) -> Result<Vec<Equipment>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, status, installation_date, next_maintenance_date, location, manufacturer, model
         FROM equipment ORDER BY id",
    )?;

    let rows = stmt.query_map([], equipment_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn get_equipment(conn: &Connection, equipment_id: &str) -> Result<Option<Equipment>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, category, status, installation_date, next_maintenance_date, location, manufacturer, model
         FROM equipment WHERE id = ?1",
    )?;

    let mut rows = stmt.query_map([equipment_id], equipment_from_row)?;
    Ok(rows.next().transpose()?)
}

pub fn list_breakdowns(conn: &Connection) -> Result<Vec<Breakdown>> {
    let mut stmt = conn.prepare(
        "SELECT id, equipment_id, description, start_time, end_time, cause, severity
         FROM breakdowns ORDER BY start_time",
    )?;

    let rows = stmt.query_map([], breakdown_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn list_maintenance_tasks(conn: &Connection) -> Result<Vec<MaintenanceTask>> {
    let mut stmt = conn.prepare(
        "SELECT id, equipment_id, task_type, title, scheduled_date, completed_date, status, frequency, estimated_duration, actual_duration
         FROM maintenance_tasks ORDER BY scheduled_date",
    )?;

    let rows = stmt.query_map([], task_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Thermal readings of one piece of equipment, oldest first
pub fn get_thermal_readings(conn: &Connection, equipment_id: &str) -> Result<Vec<ThermalReading>> {
    let mut stmt = conn.prepare(
        "SELECT id, equipment_id, timestamp, hot_inlet_temp, hot_outlet_temp, cold_inlet_temp, cold_outlet_temp, flow_rate_hot, flow_rate_cold
         FROM thermal_readings
         WHERE equipment_id = ?1
         ORDER BY timestamp",
    )?;

    let rows = stmt.query_map([equipment_id], reading_from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Row counts per table, in schema order
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::new();
    for table in ["equipment", "breakdowns", "maintenance_tasks", "thermal_readings"] {
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        counts.push((table, count));
    }
    Ok(counts)
}
