//! Reliability indicators: MTBF, MTTR, availability
//!
//! All functions are pure over the supplied slices and the analysis
//! window. Events are attributed to a window by their start (breakdowns)
//! or scheduled date (maintenance tasks), inclusive at both ends.
//!
//! Two asymmetries hold throughout:
//! - MTBF and availability clip breakdown intervals to the window, MTTR
//!   uses the raw repair duration.
//! - Unresolved breakdowns count as failures for MTBF but contribute no
//!   downtime.

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;

use crate::models::{
    Breakdown, ConsistencyCheck, Equipment, EquipmentMetrics, HistoricalPoint, MaintenanceTask,
    PerformanceMetrics, PerformanceStatus, Period, TaskStatus, TheoreticalMetrics, Trend,
    hours_between,
};

/// Maximum gap between observed and theoretical availability, in percentage points
pub const CONSISTENCY_TOLERANCE: f64 = 5.0;

/// Relative change below which a trend is considered stable
pub const TREND_THRESHOLD: f64 = 0.05;

/// Longest monthly history, in months
pub const MAX_HISTORY_MONTHS: u32 = 1200;

fn breakdowns_in<'a>(
    equipment_id: &'a str,
    breakdowns: &'a [Breakdown],
    period: &'a Period,
) -> impl Iterator<Item = &'a Breakdown> + 'a {
    breakdowns
        .iter()
        .filter(move |b| b.equipment_id == equipment_id && period.contains(b.start_time))
}

fn tasks_in<'a>(
    equipment_id: &'a str,
    tasks: &'a [MaintenanceTask],
    period: &'a Period,
) -> impl Iterator<Item = &'a MaintenanceTask> + 'a {
    tasks
        .iter()
        .filter(move |t| t.equipment_id == equipment_id && period.contains(t.scheduled_date))
}

/// Downtime of resolved breakdowns, clipped to the window
fn clipped_breakdown_downtime<'a>(
    breakdowns: impl Iterator<Item = &'a Breakdown>,
    period: &Period,
) -> f64 {
    breakdowns
        .filter_map(|b| b.end_time.map(|end| period.clipped_hours(b.start_time, end)))
        .sum()
}

/// Mean Time Between Failures, in hours
///
/// Without any failure in the window the whole window counts as one
/// uninterrupted operating interval.
pub fn mtbf(equipment_id: &str, breakdowns: &[Breakdown], period: &Period) -> f64 {
    let total_hours = period.hours();
    let failures: Vec<&Breakdown> = breakdowns_in(equipment_id, breakdowns, period).collect();

    if failures.is_empty() {
        return total_hours;
    }

    let downtime = clipped_breakdown_downtime(failures.iter().copied(), period);
    (total_hours - downtime) / failures.len() as f64
}

/// Mean Time To Repair, in hours; 0 when nothing was repaired
pub fn mttr(equipment_id: &str, breakdowns: &[Breakdown], period: &Period) -> f64 {
    let repairs: Vec<f64> = breakdowns_in(equipment_id, breakdowns, period)
        .filter_map(|b| b.end_time.map(|end| hours_between(b.start_time, end)))
        .collect();

    if repairs.is_empty() {
        return 0.0;
    }

    repairs.iter().sum::<f64>() / repairs.len() as f64
}

/// Share of the window the equipment was up, in percent
pub fn availability(
    equipment_id: &str,
    breakdowns: &[Breakdown],
    tasks: &[MaintenanceTask],
    period: &Period,
) -> f64 {
    let total_hours = period.hours();
    if total_hours <= 0.0 {
        return 0.0;
    }

    let breakdown_downtime =
        clipped_breakdown_downtime(breakdowns_in(equipment_id, breakdowns, period), period);

    let maintenance_downtime: f64 = tasks_in(equipment_id, tasks, period)
        .filter(|t| t.status == TaskStatus::Completed && t.completed_date.is_some())
        .map(MaintenanceTask::duration_hours)
        .sum();

    let uptime = total_hours - breakdown_downtime - maintenance_downtime;
    (uptime / total_hours * 100.0).clamp(0.0, 100.0)
}

/// Breakdowns plus maintenance tasks (any status) in the window
pub fn intervention_count(
    equipment_id: &str,
    breakdowns: &[Breakdown],
    tasks: &[MaintenanceTask],
    period: &Period,
) -> usize {
    breakdowns_in(equipment_id, breakdowns, period).count()
        + tasks_in(equipment_id, tasks, period).count()
}

/// `MTBF / (MTBF + MTTR) × 100`
pub fn theoretical_availability(mtbf: f64, mttr: f64) -> f64 {
    if mtbf <= 0.0 || mttr <= 0.0 {
        return 0.0;
    }
    mtbf / (mtbf + mttr) * 100.0
}

/// MTBF implied by an availability (percent) and MTTR
pub fn theoretical_mtbf(availability: f64, mttr: f64) -> f64 {
    if availability <= 0.0 || availability >= 100.0 || mttr <= 0.0 {
        return 0.0;
    }
    let a = availability / 100.0;
    a * mttr / (1.0 - a)
}

/// MTTR implied by an availability (percent) and MTBF
pub fn theoretical_mttr(availability: f64, mtbf: f64) -> f64 {
    if availability <= 0.0 || availability >= 100.0 || mtbf <= 0.0 {
        return 0.0;
    }
    let a = availability / 100.0;
    mtbf * (1.0 - a) / a
}

/// Observed indicators checked against the steady-state availability model
///
/// A large deviation points at data quality problems (unresolved
/// breakdowns, maintenance downtime) or at a model mismatch.
pub fn theoretical_equipment_metrics(
    equipment_id: &str,
    breakdowns: &[Breakdown],
    tasks: &[MaintenanceTask],
    period: &Period,
) -> TheoreticalMetrics {
    let observed_mtbf = mtbf(equipment_id, breakdowns, period);
    let observed_mttr = mttr(equipment_id, breakdowns, period);
    let observed_availability = availability(equipment_id, breakdowns, tasks, period);
    let theoretical = theoretical_availability(observed_mtbf, observed_mttr);
    let deviation = (observed_availability - theoretical).abs();

    TheoreticalMetrics {
        observed_mtbf,
        observed_mttr,
        observed_availability,
        theoretical_availability: theoretical,
        consistency_check: ConsistencyCheck {
            is_consistent: deviation <= CONSISTENCY_TOLERANCE,
            deviation,
        },
    }
}

pub fn equipment_metrics(
    equipment: &Equipment,
    breakdowns: &[Breakdown],
    tasks: &[MaintenanceTask],
    period: &Period,
) -> EquipmentMetrics {
    EquipmentMetrics {
        equipment_id: equipment.id.clone(),
        equipment_name: equipment.name.clone(),
        metrics: PerformanceMetrics {
            mtbf: mtbf(&equipment.id, breakdowns, period),
            mttr: mttr(&equipment.id, breakdowns, period),
            availability: availability(&equipment.id, breakdowns, tasks, period),
            intervention_count: intervention_count(&equipment.id, breakdowns, tasks, period),
        },
        period: period.label(),
    }
}

/// Fleet indicators
///
/// MTBF, MTTR and availability are an unweighted mean over equipment:
/// every unit weighs the same whatever its runtime. Interventions are
/// summed.
pub fn global_metrics(
    equipments: &[Equipment],
    breakdowns: &[Breakdown],
    tasks: &[MaintenanceTask],
    period: &Period,
) -> PerformanceMetrics {
    if equipments.is_empty() {
        return PerformanceMetrics::default();
    }

    let mut totals = PerformanceMetrics::default();
    for equipment in equipments {
        let m = equipment_metrics(equipment, breakdowns, tasks, period).metrics;
        totals.mtbf += m.mtbf;
        totals.mttr += m.mttr;
        totals.availability += m.availability;
        totals.intervention_count += m.intervention_count;
    }

    let count = equipments.len() as f64;
    PerformanceMetrics {
        mtbf: totals.mtbf / count,
        mttr: totals.mttr / count,
        availability: totals.availability / count,
        intervention_count: totals.intervention_count,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One fleet snapshot per calendar month, oldest first, ending with the month of `now`
pub fn historical_data(
    equipments: &[Equipment],
    breakdowns: &[Breakdown],
    tasks: &[MaintenanceTask],
    months_back: u32,
    now: DateTime<Utc>,
) -> Vec<HistoricalPoint> {
    let current = now.year() * 12 + now.month0() as i32;
    if months_back > MAX_HISTORY_MONTHS {
        debug!(requested = months_back, limit = MAX_HISTORY_MONTHS, "capping history length");
    }
    let months = months_back.min(MAX_HISTORY_MONTHS) as i32;

    (0..months)
        .rev()
        .filter_map(|offset| {
            let index = current - offset;
            Period::month(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .map(|period| {
            let metrics = global_metrics(equipments, breakdowns, tasks, &period);
            HistoricalPoint {
                month: period.month_label(),
                mtbf: round1(metrics.mtbf),
                mttr: round1(metrics.mttr),
                availability: round1(metrics.availability),
                interventions: metrics.intervention_count,
            }
        })
        .collect()
}

pub fn performance_status(availability: f64) -> PerformanceStatus {
    if availability >= 95.0 {
        PerformanceStatus::Excellent
    } else if availability >= 90.0 {
        PerformanceStatus::Good
    } else if availability >= 80.0 {
        PerformanceStatus::Warning
    } else {
        PerformanceStatus::Critical
    }
}

/// Direction of change relative to `previous`
///
/// Without a usable reference (zero or non-finite) the trend is
/// `Trend::None`.
pub fn trend(current: f64, previous: f64) -> Trend {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return Trend::None;
    }

    let change = (current - previous) / previous;
    if change.abs() < TREND_THRESHOLD {
        Trend::Stable
    } else if change > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentCategory, EquipmentStatus, Severity, TaskType};
    use chrono::{Duration, TimeZone};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, h, 0, 0).unwrap()
    }

    /// 2025-06-01 00:00 to 2025-07-01 00:00, 720 hours
    fn june() -> Period {
        Period::new(at(1, 0), Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap())
    }

    fn breakdown(equipment_id: &str, start: DateTime<Utc>, hours: Option<i64>) -> Breakdown {
        Breakdown {
            id: format!("bd-{}", start.timestamp()),
            equipment_id: equipment_id.to_string(),
            description: String::new(),
            start_time: start,
            end_time: hours.map(|h| start + Duration::hours(h)),
            cause: String::new(),
            severity: Severity::Medium,
        }
    }

    fn task(
        equipment_id: &str,
        scheduled: DateTime<Utc>,
        status: TaskStatus,
        hours: f64,
    ) -> MaintenanceTask {
        MaintenanceTask {
            id: format!("task-{}", scheduled.timestamp()),
            equipment_id: equipment_id.to_string(),
            task_type: TaskType::Preventive,
            title: "Inspection".to_string(),
            scheduled_date: scheduled,
            completed_date: (status == TaskStatus::Completed).then_some(scheduled),
            status,
            frequency: None,
            estimated_duration: hours,
            actual_duration: None,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    fn equipment(id: &str) -> Equipment {
        Equipment {
            id: id.to_string(),
            name: format!("Unit {id}"),
            category: EquipmentCategory::WaterPump,
            status: EquipmentStatus::Operational,
            installation_date: at(1, 0),
            next_maintenance_date: at(1, 0),
            location: None,
            manufacturer: None,
            model: None,
        }
    }

    #[test]
    fn mtbf_without_failures_is_the_window_length() {
        let other = vec![breakdown("eq-2", at(3, 0), Some(5))];
        assert_eq!(mtbf("eq-1", &[], &june()), 720.0);
        assert_eq!(mtbf("eq-1", &other, &june()), 720.0);
    }

    #[test]
    fn two_four_hour_breakdowns_in_thirty_days() {
        let breakdowns = vec![
            breakdown("eq-1", at(5, 8), Some(4)),
            breakdown("eq-1", at(20, 14), Some(4)),
        ];
        assert_eq!(mttr("eq-1", &breakdowns, &june()), 4.0);
        assert_eq!(mtbf("eq-1", &breakdowns, &june()), 356.0);
    }

    #[test]
    fn unresolved_breakdowns_count_as_failures_without_downtime() {
        let breakdowns = vec![
            breakdown("eq-1", at(5, 0), Some(10)),
            breakdown("eq-1", at(25, 0), None),
        ];
        assert_eq!(mtbf("eq-1", &breakdowns, &june()), 355.0);
        assert_eq!(mttr("eq-1", &breakdowns, &june()), 10.0);
    }

    #[test]
    fn mtbf_clips_but_mttr_does_not() {
        // Starts 6 hours before the end of the window, lasts 10 hours
        let end = june().end;
        let breakdowns = vec![breakdown("eq-1", end - Duration::hours(6), Some(10))];
        assert_eq!(mtbf("eq-1", &breakdowns, &june()), 714.0);
        assert_eq!(mttr("eq-1", &breakdowns, &june()), 10.0);
    }

    #[test]
    fn breakdowns_outside_the_window_are_ignored() {
        let breakdowns = vec![breakdown(
            "eq-1",
            Utc.with_ymd_and_hms(2025, 5, 31, 20, 0, 0).unwrap(),
            Some(10),
        )];
        assert_eq!(mtbf("eq-1", &breakdowns, &june()), 720.0);
        assert_eq!(mttr("eq-1", &breakdowns, &june()), 0.0);
        assert_eq!(availability("eq-1", &breakdowns, &[], &june()), 100.0);
    }

    #[test]
    fn availability_counts_completed_maintenance_only() {
        let breakdowns = vec![breakdown("eq-1", at(5, 0), Some(36))];
        let tasks = vec![
            task("eq-1", at(10, 0), TaskStatus::Completed, 36.0),
            task("eq-1", at(12, 0), TaskStatus::Scheduled, 100.0),
            task("eq-1", at(14, 0), TaskStatus::Cancelled, 100.0),
        ];
        assert_close(availability("eq-1", &breakdowns, &tasks, &june()), 90.0);
    }

    #[test]
    fn availability_prefers_actual_duration() {
        let mut done = task("eq-1", at(10, 0), TaskStatus::Completed, 100.0);
        done.actual_duration = Some(72.0);
        assert_close(availability("eq-1", &[], &[done], &june()), 90.0);
    }

    #[test]
    fn availability_stays_within_bounds() {
        // Overlapping outages longer than the window
        let breakdowns = vec![
            breakdown("eq-1", at(1, 0), Some(700)),
            breakdown("eq-1", at(2, 0), Some(700)),
        ];
        let tasks = vec![task("eq-1", at(3, 0), TaskStatus::Completed, 500.0)];
        let value = availability("eq-1", &breakdowns, &tasks, &june());
        assert_eq!(value, 0.0);

        for hours in [0, 1, 50, 719, 720, 10_000] {
            let breakdowns = vec![breakdown("eq-1", at(1, 0), Some(hours))];
            let value = availability("eq-1", &breakdowns, &[], &june());
            assert!((0.0..=100.0).contains(&value), "{hours}h gave {value}");
        }
    }

    #[test]
    fn empty_window_has_no_availability() {
        let instant = at(1, 0);
        assert_eq!(availability("eq-1", &[], &[], &Period::new(instant, instant)), 0.0);
    }

    #[test]
    fn interventions_include_every_task_status() {
        let breakdowns = vec![breakdown("eq-1", at(2, 0), None)];
        let tasks = vec![
            task("eq-1", at(3, 0), TaskStatus::Scheduled, 1.0),
            task("eq-1", at(4, 0), TaskStatus::Cancelled, 1.0),
            task("eq-2", at(4, 0), TaskStatus::Completed, 1.0),
        ];
        assert_eq!(intervention_count("eq-1", &breakdowns, &tasks, &june()), 3);
    }

    #[test]
    fn theoretical_availability_is_monotonic() {
        let base = theoretical_availability(100.0, 10.0);
        assert!(theoretical_availability(200.0, 10.0) > base);
        assert!(theoretical_availability(100.0, 20.0) < base);
        assert_eq!(theoretical_availability(0.0, 10.0), 0.0);
        assert_eq!(theoretical_availability(100.0, 0.0), 0.0);
    }

    #[test]
    fn inverse_helpers_recover_their_inputs() {
        for (m, r) in [(356.0, 4.0), (1.0, 1.0), (8760.0, 0.5)] {
            let a = theoretical_availability(m, r);
            assert!(((theoretical_mtbf(a, r) - m) / m).abs() < 1e-6);
            assert!(((theoretical_mttr(a, m) - r) / r).abs() < 1e-6);
        }
    }

    #[test]
    fn inverse_helpers_reject_degenerate_inputs() {
        assert_eq!(theoretical_mtbf(0.0, 4.0), 0.0);
        assert_eq!(theoretical_mtbf(100.0, 4.0), 0.0);
        assert_eq!(theoretical_mtbf(90.0, 0.0), 0.0);
        assert_eq!(theoretical_mttr(-5.0, 100.0), 0.0);
        assert_eq!(theoretical_mttr(120.0, 100.0), 0.0);
        assert_eq!(theoretical_mttr(90.0, -1.0), 0.0);
    }

    #[test]
    fn consistency_check_on_breakdown_only_history() {
        let breakdowns = vec![
            breakdown("eq-1", at(5, 8), Some(4)),
            breakdown("eq-1", at(20, 14), Some(4)),
        ];
        let result = theoretical_equipment_metrics("eq-1", &breakdowns, &[], &june());
        assert_eq!(result.observed_mttr, 4.0);
        // (720 - 8) / 720 vs 356 / 360
        assert!((result.observed_availability - 98.888_888).abs() < 1e-4);
        assert!((result.theoretical_availability - 98.888_888).abs() < 1e-4);
        assert!(result.consistency_check.is_consistent);
    }

    #[test]
    fn maintenance_downtime_breaks_consistency() {
        let breakdowns = vec![breakdown("eq-1", at(5, 0), Some(4))];
        let tasks = vec![task("eq-1", at(10, 0), TaskStatus::Completed, 144.0)];
        let result = theoretical_equipment_metrics("eq-1", &breakdowns, &tasks, &june());
        assert!(!result.consistency_check.is_consistent);
        assert!(result.consistency_check.deviation > CONSISTENCY_TOLERANCE);
    }

    #[test]
    fn fleet_average_is_unweighted() {
        let fleet = vec![equipment("eq-1"), equipment("eq-2")];
        let breakdowns = vec![breakdown("eq-1", at(5, 0), Some(72))];
        let tasks = vec![task("eq-2", at(6, 0), TaskStatus::Scheduled, 2.0)];
        let global = global_metrics(&fleet, &breakdowns, &tasks, &june());

        assert_eq!(global.mtbf, (648.0 + 720.0) / 2.0);
        assert_eq!(global.mttr, 36.0);
        assert_close(global.availability, 95.0);
        assert_eq!(global.intervention_count, 2);
    }

    #[test]
    fn empty_fleet_yields_zeros() {
        assert_eq!(global_metrics(&[], &[], &[], &june()), PerformanceMetrics::default());
    }

    #[test]
    fn equipment_metrics_carry_identity_and_period() {
        let result = equipment_metrics(&equipment("eq-9"), &[], &[], &june());
        assert_eq!(result.equipment_name, "Unit eq-9");
        assert_eq!(result.period, "2025-06-01 - 2025-07-01");
        assert_eq!(result.metrics.availability, 100.0);
    }

    #[test]
    fn history_walks_back_month_by_month() {
        let now = Utc.with_ymd_and_hms(2025, 2, 14, 9, 0, 0).unwrap();
        let fleet = vec![equipment("eq-1")];
        let breakdowns = vec![breakdown(
            "eq-1",
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
            Some(3),
        )];
        let history = historical_data(&fleet, &breakdowns, &[], 3, now);

        let months: Vec<&str> = history.iter().map(|p| p.month.as_str()).collect();
        assert_eq!(months, ["Dec 2024", "Jan 2025", "Feb 2025"]);
        assert_eq!(history[1].interventions, 1);
        assert_eq!(history[1].mttr, 3.0);
        // January window is 30 days long: midnight Jan 1 to midnight Jan 31
        assert_eq!(history[1].mtbf, 717.0);
        assert_eq!(history[0].availability, 100.0);
    }

    #[test]
    fn oversized_history_is_capped() {
        let now = Utc.with_ymd_and_hms(2025, 2, 14, 9, 0, 0).unwrap();
        let history = historical_data(&[], &[], &[], 3_000_000_000, now);
        assert_eq!(history.len(), MAX_HISTORY_MONTHS as usize);
        assert_eq!(history[0].month, "Mar 1925");
        assert_eq!(history.last().map(|p| p.month.as_str()), Some("Feb 2025"));

        assert!(historical_data(&[], &[], &[], 0, now).is_empty());
    }

    #[test]
    fn status_ladder() {
        assert_eq!(performance_status(99.0), PerformanceStatus::Excellent);
        assert_eq!(performance_status(95.0), PerformanceStatus::Excellent);
        assert_eq!(performance_status(90.0), PerformanceStatus::Good);
        assert_eq!(performance_status(85.0), PerformanceStatus::Warning);
        assert_eq!(performance_status(79.9), PerformanceStatus::Critical);
    }

    #[test]
    fn trend_guards_zero_reference() {
        assert_eq!(trend(10.0, 0.0), Trend::None);
        assert_eq!(trend(f64::NAN, 1.0), Trend::None);
        assert_eq!(trend(102.0, 100.0), Trend::Stable);
        assert_eq!(trend(110.0, 100.0), Trend::Up);
        assert_eq!(trend(90.0, 100.0), Trend::Down);
    }
}
