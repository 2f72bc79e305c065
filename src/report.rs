//! Reports built from a record repository
//!
//! These functions fetch records through a [`Repository`], hand the
//! plain slices to the calculators, and wrap the results in types that
//! render as text or serialize to JSON.

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config;
use crate::models::{
    Equipment, EquipmentMetrics, HeatExchangerEfficiency, HistoricalPoint, PerformanceMetrics,
    PerformanceStatus, Period, TheoreticalMetrics, Trend,
};
use crate::reliability;
use crate::repository::Repository;
use crate::schedule::{self, BreakdownAlert, DueNotice, Recurrence};
use crate::thermal::{self, ThermalSettings};

fn require_equipment(repo: &impl Repository, equipment_id: &str) -> Result<Equipment> {
    repo.equipment(equipment_id)?
        .ok_or_else(|| anyhow!("equipment '{}' not found", equipment_id))
}

/// Indicators of one piece of equipment with the theoretical cross-check
#[derive(Debug, Clone, Serialize)]
pub struct EquipmentReport {
    pub metrics: EquipmentMetrics,
    pub status: PerformanceStatus,
    pub theoretical: TheoreticalMetrics,
}

pub fn equipment_report(
    repo: &impl Repository,
    equipment_id: &str,
    period: &Period,
) -> Result<EquipmentReport> {
    let equipment = require_equipment(repo, equipment_id)?;
    let breakdowns = repo.breakdowns()?;
    let tasks = repo.maintenance_tasks()?;

    let metrics = reliability::equipment_metrics(&equipment, &breakdowns, &tasks, period);
    let theoretical =
        reliability::theoretical_equipment_metrics(&equipment.id, &breakdowns, &tasks, period);

    if !theoretical.consistency_check.is_consistent {
        debug!(
            equipment = %equipment.id,
            deviation = theoretical.consistency_check.deviation,
            "observed and theoretical availability disagree"
        );
    }

    Ok(EquipmentReport {
        status: reliability::performance_status(metrics.metrics.availability),
        metrics,
        theoretical,
    })
}

impl fmt::Display for EquipmentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics.metrics;
        let t = &self.theoretical;

        writeln!(f, "=== {} ({}) ===", self.metrics.equipment_name, self.metrics.equipment_id)?;
        writeln!(f, "Period: {}", self.metrics.period)?;
        writeln!(f)?;
        writeln!(f, "  MTBF:          {:.1} h", m.mtbf)?;
        writeln!(f, "  MTTR:          {:.1} h", m.mttr)?;
        writeln!(f, "  Availability:  {:.1} % ({})", m.availability, self.status)?;
        writeln!(f, "  Interventions: {}", m.intervention_count)?;
        writeln!(f)?;
        writeln!(f, "Theoretical availability: {:.1} %", t.theoretical_availability)?;
        writeln!(
            f,
            "Deviation: {:.1} points ({})",
            t.consistency_check.deviation,
            if t.consistency_check.is_consistent {
                "consistent"
            } else {
                "inconsistent"
            }
        )?;
        Ok(())
    }
}

/// Fleet indicators plus the per-equipment breakdown
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub period: String,
    pub global: PerformanceMetrics,
    pub status: PerformanceStatus,
    pub equipment: Vec<EquipmentMetrics>,
}

pub fn fleet_report(repo: &impl Repository, period: &Period) -> Result<FleetReport> {
    let equipments = repo.equipments()?;
    let breakdowns = repo.breakdowns()?;
    let tasks = repo.maintenance_tasks()?;

    let global = reliability::global_metrics(&equipments, &breakdowns, &tasks, period);
    let equipment = equipments
        .iter()
        .map(|e| reliability::equipment_metrics(e, &breakdowns, &tasks, period))
        .collect();

    Ok(FleetReport {
        period: period.label(),
        status: reliability::performance_status(global.availability),
        global,
        equipment,
    })
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Fleet Summary ===")?;
        writeln!(f, "Period: {}", self.period)?;
        writeln!(f)?;

        writeln!(
            f,
            "{:<32} {:>10} {:>10} {:>8} {:>6}",
            "Equipment", "MTBF (h)", "MTTR (h)", "Avail %", "Int."
        )?;
        writeln!(f, "{}", "-".repeat(70))?;
        for e in &self.equipment {
            writeln!(
                f,
                "{:<32} {:>10.1} {:>10.1} {:>8.1} {:>6}",
                e.equipment_name,
                e.metrics.mtbf,
                e.metrics.mttr,
                e.metrics.availability,
                e.metrics.intervention_count
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Fleet (unweighted mean):")?;
        writeln!(f, "  MTBF:          {:.1} h", self.global.mtbf)?;
        writeln!(f, "  MTTR:          {:.1} h", self.global.mttr)?;
        writeln!(f, "  Availability:  {:.1} % ({})", self.global.availability, self.status)?;
        writeln!(f, "  Interventions: {}", self.global.intervention_count)?;
        Ok(())
    }
}

/// A month of history with its availability trend against the month before
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRow {
    #[serde(flatten)]
    pub point: HistoricalPoint,
    pub availability_trend: Trend,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub rows: Vec<HistoryRow>,
}

pub fn history_report(
    repo: &impl Repository,
    months: u32,
    now: DateTime<Utc>,
) -> Result<HistoryReport> {
    let equipments = repo.equipments()?;
    let breakdowns = repo.breakdowns()?;
    let tasks = repo.maintenance_tasks()?;

    let points = reliability::historical_data(&equipments, &breakdowns, &tasks, months, now);
    let mut previous: Option<f64> = None;
    let rows = points
        .into_iter()
        .map(|point| {
            let availability_trend = match previous {
                Some(prev) => reliability::trend(point.availability, prev),
                None => Trend::None,
            };
            previous = Some(point.availability);
            HistoryRow {
                point,
                availability_trend,
            }
        })
        .collect();

    Ok(HistoryReport { rows })
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:>10} {:>10} {:>8} {:>6}  {}",
            "Month", "MTBF (h)", "MTTR (h)", "Avail %", "Int.", "Trend"
        )?;
        writeln!(f, "{}", "-".repeat(56))?;
        for row in &self.rows {
            let p = &row.point;
            writeln!(
                f,
                "{:<10} {:>10.1} {:>10.1} {:>8.1} {:>6}  {}",
                p.month, p.mtbf, p.mttr, p.availability, p.interventions, row.availability_trend
            )?;
        }
        Ok(())
    }
}

pub fn thermal_report(
    repo: &impl Repository,
    equipment_id: &str,
    settings: &ThermalSettings,
    now: DateTime<Utc>,
) -> Result<HeatExchangerEfficiency> {
    config::design_efficiency(settings.design_efficiency)?;
    let equipment = require_equipment(repo, equipment_id)?;
    let readings = repo.thermal_readings(&equipment.id)?;
    debug!(equipment = %equipment.id, readings = readings.len(), "evaluating heat exchanger");
    Ok(thermal::evaluate_heat_exchanger(&equipment, &readings, settings, now))
}

/// Text rendering of a heat-exchanger assessment
pub struct ThermalSummary<'a>(pub &'a HeatExchangerEfficiency);

impl fmt::Display for ThermalSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        let t = &r.thermodynamic_data;

        writeln!(f, "=== {} ({}) ===", r.equipment_name, r.equipment_id)?;
        writeln!(
            f,
            "Efficiency:  {:.1} % (design {:.1} %)",
            r.current_efficiency, r.design_efficiency
        )?;
        writeln!(f, "Degradation: {:+.2} %/month", r.degradation_rate)?;
        writeln!(f, "Alert:       {} -> {}", r.alert_level, r.recommended_action)?;
        writeln!(
            f,
            "Maintenance: {}",
            r.predicted_maintenance_date.format("%Y-%m-%d")
        )?;
        writeln!(f)?;
        writeln!(f, "Latest reading:")?;
        writeln!(
            f,
            "  Heat transfer: {:.1} kW of {:.1} kW possible",
            t.actual_heat_transfer, t.max_possible_heat_transfer
        )?;
        writeln!(f, "  Effectiveness: {:.1} %", t.effectiveness)?;
        writeln!(f, "  NTU:           {:.2}", t.ntu)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DueReport {
    pub breakdowns: Vec<BreakdownAlert>,
    pub notices: Vec<DueNotice>,
    pub recurrences: Vec<Recurrence>,
}

pub fn due_report(repo: &impl Repository, now: DateTime<Utc>) -> Result<DueReport> {
    let tasks = repo.maintenance_tasks()?;
    let breakdowns = repo.breakdowns()?;
    Ok(DueReport {
        breakdowns: schedule::open_breakdowns(&breakdowns, now),
        notices: schedule::due_notices(&tasks, now),
        recurrences: schedule::pending_recurrences(&tasks, now),
    })
}

impl fmt::Display for DueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.breakdowns.is_empty() && self.notices.is_empty() && self.recurrences.is_empty() {
            return writeln!(
                f,
                "No maintenance due in the next {} days.",
                schedule::NOTICE_HORIZON_DAYS
            );
        }

        if !self.breakdowns.is_empty() {
            writeln!(f, "Open breakdowns:")?;
            for b in &self.breakdowns {
                writeln!(
                    f,
                    "  [{:?}] {} - {} ({}, open {:.0} h)",
                    b.priority, b.equipment_id, b.description, b.severity, b.hours_open
                )?;
            }
        }

        if !self.notices.is_empty() {
            writeln!(f, "Maintenance due:")?;
            for n in &self.notices {
                writeln!(
                    f,
                    "  [{:?}] {} - {} ({}, {} on {})",
                    n.priority,
                    n.equipment_id,
                    n.title,
                    n.kind.label(),
                    n.days_until_due,
                    n.scheduled_date.format("%Y-%m-%d")
                )?;
            }
        }

        if !self.recurrences.is_empty() {
            writeln!(f, "Recurring tasks to reschedule:")?;
            for r in &self.recurrences {
                writeln!(
                    f,
                    "  {} - {} (due {}, from {})",
                    r.equipment_id,
                    r.title,
                    r.due.format("%Y-%m-%d"),
                    r.source_task_id
                )?;
            }
        }
        Ok(())
    }
}
