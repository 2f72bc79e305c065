//! Sample maintenance data for trying the calculator without an export
//!
//! Mirrors the default records of the browser application: four pieces
//! of equipment, two preventive tasks and a month of slowly degrading
//! heat-exchanger readings. Dates are laid out relative to `now`.

use chrono::{DateTime, Duration, Utc};

use crate::import::ExportBundle;
use crate::models::{
    Breakdown, Equipment, EquipmentCategory, EquipmentStatus, Frequency, MaintenanceTask,
    Severity, TaskStatus, TaskType, ThermalReading,
};

struct SampleEquipment {
    id: &'static str,
    name: &'static str,
    category: EquipmentCategory,
    status: EquipmentStatus,
    location: &'static str,
    manufacturer: &'static str,
    model: &'static str,
    age_days: i64,
    maintenance_in_days: i64,
}

const EQUIPMENT: [SampleEquipment; 4] = [
    SampleEquipment {
        id: "eq-001",
        name: "Échangeur Thermique Principal",
        category: EquipmentCategory::HeatExchanger,
        status: EquipmentStatus::Operational,
        location: "Zone A - Ligne 1",
        manufacturer: "Alfa Laval",
        model: "M15-BFG",
        age_days: 730,
        maintenance_in_days: 30,
    },
    SampleEquipment {
        id: "eq-002",
        name: "Tour de Refroidissement Nord",
        category: EquipmentCategory::CoolingTower,
        status: EquipmentStatus::Operational,
        location: "Zone B - Extérieur",
        manufacturer: "SPX Cooling",
        model: "Marley NC",
        age_days: 880,
        maintenance_in_days: 45,
    },
    SampleEquipment {
        id: "eq-003",
        name: "Pompe Eau Primaire",
        category: EquipmentCategory::WaterPump,
        status: EquipmentStatus::Operational,
        location: "Salle des Machines",
        manufacturer: "Grundfos",
        model: "CR 64-2",
        age_days: 675,
        maintenance_in_days: 5,
    },
    SampleEquipment {
        id: "eq-004",
        name: "Pompe Huile Hydraulique",
        category: EquipmentCategory::OilPump,
        status: EquipmentStatus::Maintenance,
        location: "Zone C - Hydraulique",
        manufacturer: "Bosch Rexroth",
        model: "A10VSO",
        age_days: 800,
        maintenance_in_days: 0,
    },
];

/// Design effectiveness of the sample exchanger before fouling
const BASE_EFFICIENCY: f64 = 0.85;
/// Fouling loss per day
const DAILY_LOSS: f64 = 0.002;
const READING_DAYS: i64 = 30;

fn equipments(now: DateTime<Utc>) -> Vec<Equipment> {
    EQUIPMENT
        .iter()
        .map(|s| Equipment {
            id: s.id.to_string(),
            name: s.name.to_string(),
            category: s.category,
            status: s.status,
            installation_date: now - Duration::days(s.age_days),
            next_maintenance_date: now + Duration::days(s.maintenance_in_days),
            location: Some(s.location.to_string()),
            manufacturer: Some(s.manufacturer.to_string()),
            model: Some(s.model.to_string()),
        })
        .collect()
}

fn breakdown(
    now: DateTime<Utc>,
    id: &str,
    equipment_id: &str,
    days_ago: i64,
    repair_hours: Option<i64>,
    severity: Severity,
    cause: &str,
) -> Breakdown {
    let start_time = now - Duration::days(days_ago);
    Breakdown {
        id: id.to_string(),
        equipment_id: equipment_id.to_string(),
        description: cause.to_string(),
        start_time,
        end_time: repair_hours.map(|h| start_time + Duration::hours(h)),
        cause: cause.to_string(),
        severity,
    }
}

fn breakdowns(now: DateTime<Utc>) -> Vec<Breakdown> {
    vec![
        breakdown(now, "bd-001", "eq-003", 52, Some(6), Severity::High, "Garniture mécanique"),
        breakdown(now, "bd-002", "eq-003", 18, Some(3), Severity::Medium, "Cavitation"),
        breakdown(now, "bd-003", "eq-002", 25, Some(12), Severity::Medium, "Ventilateur bloqué"),
        breakdown(
            now,
            "bd-004",
            "eq-004",
            2,
            None,
            Severity::Critical,
            "Fuite circuit haute pression",
        ),
    ]
}

fn maintenance_tasks(now: DateTime<Utc>) -> Vec<MaintenanceTask> {
    vec![
        MaintenanceTask {
            id: "task-001".to_string(),
            equipment_id: "eq-001".to_string(),
            task_type: TaskType::Preventive,
            title: "Inspection Échangeur Thermique".to_string(),
            scheduled_date: now + Duration::days(2),
            completed_date: None,
            status: TaskStatus::Scheduled,
            frequency: Some(Frequency::Monthly),
            estimated_duration: 4.0,
            actual_duration: None,
        },
        MaintenanceTask {
            id: "task-002".to_string(),
            equipment_id: "eq-002".to_string(),
            task_type: TaskType::Preventive,
            title: "Nettoyage Tour de Refroidissement".to_string(),
            scheduled_date: now - Duration::days(9),
            completed_date: Some(now - Duration::days(9)),
            status: TaskStatus::Completed,
            frequency: Some(Frequency::Weekly),
            estimated_duration: 8.0,
            actual_duration: Some(7.5),
        },
        MaintenanceTask {
            id: "task-003".to_string(),
            equipment_id: "eq-004".to_string(),
            task_type: TaskType::Corrective,
            title: "Remplacement flexible haute pression".to_string(),
            scheduled_date: now - Duration::days(1),
            completed_date: None,
            status: TaskStatus::Scheduled,
            frequency: None,
            estimated_duration: 6.0,
            actual_duration: None,
        },
    ]
}

/// One reading per day for the last month, losing 0.2 % efficiency per day
fn thermal_readings(now: DateTime<Utc>) -> Vec<ThermalReading> {
    (0..=READING_DAYS)
        .rev()
        .map(|days_ago| {
            let efficiency =
                BASE_EFFICIENCY * (1.0 - (READING_DAYS - days_ago) as f64 * DAILY_LOSS);
            let hot_inlet = 87.5;
            let cold_inlet = 26.5;
            let delta = (hot_inlet - cold_inlet) * efficiency;

            ThermalReading {
                id: format!("thermal-eq-001-{days_ago}"),
                equipment_id: "eq-001".to_string(),
                timestamp: now - Duration::days(days_ago),
                hot_inlet_temp: hot_inlet,
                hot_outlet_temp: hot_inlet - delta * 0.8,
                cold_inlet_temp: cold_inlet,
                cold_outlet_temp: cold_inlet + delta * 0.6,
                flow_rate_hot: 2.75,
                flow_rate_cold: 3.25,
            }
        })
        .collect()
}

pub fn sample_bundle(now: DateTime<Utc>) -> ExportBundle {
    ExportBundle {
        equipments: equipments(now),
        breakdowns: breakdowns(now),
        maintenance_tasks: maintenance_tasks(now),
        thermal_readings: thermal_readings(now),
    }
}
