//! Maintenance due dates and priorities

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

use crate::models::{Breakdown, Frequency, MaintenanceTask, Severity, TaskStatus, hours_between};

/// Scheduled tasks further out than this are not reported
pub const NOTICE_HORIZON_DAYS: i64 = 7;

const SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueKind {
    Overdue,
    DueToday,
    DueSoon,
    ToSchedule,
}

impl DueKind {
    pub fn label(&self) -> &'static str {
        match self {
            DueKind::Overdue => "overdue",
            DueKind::DueToday => "due today",
            DueKind::DueSoon => "due soon",
            DueKind::ToSchedule => "to schedule",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueNotice {
    pub task_id: String,
    pub equipment_id: String,
    pub title: String,
    pub scheduled_date: DateTime<Utc>,
    pub days_until_due: i64,
    pub kind: DueKind,
    pub priority: Priority,
}

/// A completed recurring task whose next occurrence has come due
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub source_task_id: String,
    pub equipment_id: String,
    pub title: String,
    pub due: DateTime<Utc>,
}

/// An unresolved breakdown awaiting repair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownAlert {
    pub breakdown_id: String,
    pub equipment_id: String,
    pub description: String,
    pub severity: Severity,
    pub start_time: DateTime<Utc>,
    pub hours_open: f64,
    pub priority: Priority,
}

/// Whole days from `now` to `date`, rounded up
pub fn days_until(date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (date - now).num_milliseconds();
    let day = Duration::days(1).num_milliseconds();
    millis.div_euclid(day) + i64::from(millis.rem_euclid(day) != 0)
}

pub fn maintenance_due(task: &MaintenanceTask, now: DateTime<Utc>) -> Option<DueNotice> {
    if task.status != TaskStatus::Scheduled {
        return None;
    }

    let days = days_until(task.scheduled_date, now);
    let (kind, priority) = match days {
        d if d < 0 => (DueKind::Overdue, Priority::Urgent),
        0 => (DueKind::DueToday, Priority::High),
        d if d <= SOON_DAYS => (DueKind::DueSoon, Priority::High),
        d if d <= NOTICE_HORIZON_DAYS => (DueKind::ToSchedule, Priority::Medium),
        _ => return None,
    };

    Some(DueNotice {
        task_id: task.id.clone(),
        equipment_id: task.equipment_id.clone(),
        title: task.title.clone(),
        scheduled_date: task.scheduled_date,
        days_until_due: days,
        kind,
        priority,
    })
}

/// Notices for every scheduled task, most urgent first
pub fn due_notices(tasks: &[MaintenanceTask], now: DateTime<Utc>) -> Vec<DueNotice> {
    let mut notices: Vec<DueNotice> = tasks
        .iter()
        .filter_map(|t| maintenance_due(t, now))
        .collect();
    notices.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.days_until_due.cmp(&b.days_until_due))
    });
    notices
}

/// Next occurrence of a completed recurring task
pub fn next_due_date(task: &MaintenanceTask) -> Option<DateTime<Utc>> {
    if task.status != TaskStatus::Completed {
        return None;
    }
    let completed = task.completed_date?;

    match task.frequency? {
        Frequency::Daily => Some(completed + Duration::days(1)),
        Frequency::Weekly => Some(completed + Duration::days(7)),
        Frequency::Monthly => completed.checked_add_months(Months::new(1)),
        Frequency::Quarterly => completed.checked_add_months(Months::new(3)),
        Frequency::Annually => completed.checked_add_months(Months::new(12)),
    }
}

pub fn pending_recurrences(tasks: &[MaintenanceTask], now: DateTime<Utc>) -> Vec<Recurrence> {
    tasks
        .iter()
        .filter_map(|task| {
            let due = next_due_date(task)?;
            (days_until(due, now) <= 0).then(|| Recurrence {
                source_task_id: task.id.clone(),
                equipment_id: task.equipment_id.clone(),
                title: task.title.clone(),
                due,
            })
        })
        .collect()
}

pub fn breakdown_priority(severity: Severity) -> Priority {
    match severity {
        Severity::Critical => Priority::Urgent,
        Severity::High => Priority::High,
        Severity::Medium => Priority::Medium,
        Severity::Low => Priority::Low,
    }
}

/// Breakdowns without an end time, most urgent and then oldest first
pub fn open_breakdowns(breakdowns: &[Breakdown], now: DateTime<Utc>) -> Vec<BreakdownAlert> {
    let mut alerts: Vec<BreakdownAlert> = breakdowns
        .iter()
        .filter(|b| b.end_time.is_none())
        .map(|b| BreakdownAlert {
            breakdown_id: b.id.clone(),
            equipment_id: b.equipment_id.clone(),
            description: b.description.clone(),
            severity: b.severity,
            start_time: b.start_time,
            hours_open: hours_between(b.start_time, now).max(0.0),
            priority: breakdown_priority(b.severity),
        })
        .collect();
    alerts.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.start_time.cmp(&b.start_time))
    });
    alerts
}
