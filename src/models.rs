//! Data models for equipment, maintenance events and calculation results

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::timefmt;

/// Enums stored as snake_case text in SQLite and in the JSON exports
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseError::unknown($kind, other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentCategory {
    HeatExchanger,
    CoolingTower,
    WaterPump,
    OilPump,
    WaterPrefilter,
    WaterFilter,
    OilFilter,
}

text_enum!(EquipmentCategory, "equipment category", {
    HeatExchanger => "heat_exchanger",
    CoolingTower => "cooling_tower",
    WaterPump => "water_pump",
    OilPump => "oil_pump",
    WaterPrefilter => "water_prefilter",
    WaterFilter => "water_filter",
    OilFilter => "oil_filter",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    Operational,
    Maintenance,
    Breakdown,
    Offline,
}

text_enum!(EquipmentStatus, "equipment status", {
    Operational => "operational",
    Maintenance => "maintenance",
    Breakdown => "breakdown",
    Offline => "offline",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

text_enum!(Severity, "severity", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Preventive,
    Corrective,
}

text_enum!(TaskType, "task type", {
    Preventive => "preventive",
    Corrective => "corrective",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

text_enum!(TaskStatus, "task status", {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

text_enum!(Frequency, "frequency", {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Annually => "annually",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: EquipmentCategory,
    pub status: EquipmentStatus,
    #[serde(deserialize_with = "timefmt::deserialize")]
    pub installation_date: DateTime<Utc>,
    #[serde(deserialize_with = "timefmt::deserialize")]
    pub next_maintenance_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// A failure event; `end_time` is absent while unresolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub id: String,
    pub equipment_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "timefmt::deserialize")]
    pub start_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "timefmt::deserialize_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cause: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTask {
    pub id: String,
    pub equipment_id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub title: String,
    #[serde(deserialize_with = "timefmt::deserialize")]
    pub scheduled_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "timefmt::deserialize_option")]
    pub completed_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    pub estimated_duration: f64, // hours
    #[serde(default)]
    pub actual_duration: Option<f64>,
}

impl MaintenanceTask {
    /// Downtime attributed to this task, in hours
    pub fn duration_hours(&self) -> f64 {
        self.actual_duration.unwrap_or(self.estimated_duration)
    }
}

/// One set of heat-exchanger measurements (°C, kg/s)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermalReading {
    pub id: String,
    pub equipment_id: String,
    #[serde(deserialize_with = "timefmt::deserialize")]
    pub timestamp: DateTime<Utc>,
    pub hot_inlet_temp: f64,
    pub hot_outlet_temp: f64,
    pub cold_inlet_temp: f64,
    pub cold_outlet_temp: f64,
    pub flow_rate_hot: f64,
    pub flow_rate_cold: f64,
}

/// Analysis window; both bounds are inclusive for event membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Period { start, end }
    }

    /// The `days` days ending at `now`
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Period::new(now - Duration::days(days), now)
    }

    /// First day of the month to last day of the month, both at midnight
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let last = next.pred_opt()?;
        Some(Period::new(
            timefmt::start_of_day(first),
            timefmt::start_of_day(last),
        ))
    }

    pub fn hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Length of `[from, to]` once clipped to this window, never negative
    pub fn clipped_hours(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
        let start = from.max(self.start);
        let end = to.min(self.end);
        hours_between(start, end).max(0.0)
    }

    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }

    pub fn month_label(&self) -> String {
        format!("{} {}", month_abbrev(self.start.month()), self.start.year())
    }
}

fn month_abbrev(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("???")
}

pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub mtbf: f64, // hours
    pub mttr: f64, // hours
    pub availability: f64, // percent
    pub intervention_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentMetrics {
    pub equipment_id: String,
    pub equipment_name: String,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    pub period: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyCheck {
    pub is_consistent: bool,
    pub deviation: f64, // percentage points
}

/// Observed metrics cross-checked against `A = MTBF / (MTBF + MTTR)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TheoreticalMetrics {
    pub observed_mtbf: f64,
    pub observed_mttr: f64,
    pub observed_availability: f64,
    pub theoretical_availability: f64,
    pub consistency_check: ConsistencyCheck,
}

/// One month of fleet metrics for trend charts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalPoint {
    pub month: String,
    pub mtbf: f64,
    pub mttr: f64,
    pub availability: f64,
    pub interventions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceStatus {
    Excellent,
    Good,
    Warning,
    Critical,
}

text_enum!(PerformanceStatus, "performance status", {
    Excellent => "excellent",
    Good => "good",
    Warning => "warning",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// No reference value to compare against
    None,
    Up,
    Down,
    Stable,
}

text_enum!(Trend, "trend", {
    None => "none",
    Up => "up",
    Down => "down",
    Stable => "stable",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

text_enum!(AlertLevel, "alert level", {
    Green => "green",
    Yellow => "yellow",
    Orange => "orange",
    Red => "red",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    None,
    Monitoring,
    Cleaning,
    Maintenance,
    Replacement,
}

text_enum!(RecommendedAction, "recommended action", {
    None => "none",
    Monitoring => "monitoring",
    Cleaning => "cleaning",
    Maintenance => "maintenance",
    Replacement => "replacement",
});

/// Snapshot computed from the most recent reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThermodynamicData {
    pub actual_heat_transfer: f64, // kW
    pub max_possible_heat_transfer: f64, // kW
    pub ntu: f64,
    pub effectiveness: f64, // percent
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatExchangerEfficiency {
    pub equipment_id: String,
    pub equipment_name: String,
    pub current_efficiency: f64,
    pub design_efficiency: f64,
    pub degradation_rate: f64, // percent per month, negative = degrading
    pub predicted_maintenance_date: DateTime<Utc>,
    pub recommended_action: RecommendedAction,
    pub alert_level: AlertLevel,
    pub thermodynamic_data: ThermodynamicData,
}
