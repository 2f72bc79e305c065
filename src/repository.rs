//! Record sources for the report layer
//!
//! The calculators take plain slices; this trait is how the reports get
//! those slices without caring where the records live.

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::models::{Breakdown, Equipment, MaintenanceTask, ThermalReading};

pub trait Repository {
    fn equipments(&self) -> Result<Vec<Equipment>>;

    fn breakdowns(&self) -> Result<Vec<Breakdown>>;

    fn maintenance_tasks(&self) -> Result<Vec<MaintenanceTask>>;

    /// Readings of one piece of equipment, in any order
    fn thermal_readings(&self, equipment_id: &str) -> Result<Vec<ThermalReading>>;

    fn equipment(&self, equipment_id: &str) -> Result<Option<Equipment>> {
        Ok(self.equipments()?.into_iter().find(|e| e.id == equipment_id))
    }
}

/// Records stored in the SQLite database
pub struct SqliteRepository<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        SqliteRepository { conn }
    }
}

impl Repository for SqliteRepository<'_> {
    fn equipments(&self) -> Result<Vec<Equipment>> {
        db::list_equipment(self.conn)
    }

    fn breakdowns(&self) -> Result<Vec<Breakdown>> {
        db::list_breakdowns(self.conn)
    }

    fn maintenance_tasks(&self) -> Result<Vec<MaintenanceTask>> {
        db::list_maintenance_tasks(self.conn)
    }

    fn thermal_readings(&self, equipment_id: &str) -> Result<Vec<ThermalReading>> {
        db::get_thermal_readings(self.conn, equipment_id)
    }

    fn equipment(&self, equipment_id: &str) -> Result<Option<Equipment>> {
        db::get_equipment(self.conn, equipment_id)
    }
}

/// Records held in memory, for fixtures and callers that already have them loaded
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    pub equipments: Vec<Equipment>,
    pub breakdowns: Vec<Breakdown>,
    pub maintenance_tasks: Vec<MaintenanceTask>,
    pub thermal_readings: Vec<ThermalReading>,
}

impl Repository for MemoryRepository {
    fn equipments(&self) -> Result<Vec<Equipment>> {
        Ok(self.equipments.clone())
    }

    fn breakdowns(&self) -> Result<Vec<Breakdown>> {
        Ok(self.breakdowns.clone())
    }

    fn maintenance_tasks(&self) -> Result<Vec<MaintenanceTask>> {
        Ok(self.maintenance_tasks.clone())
    }

    fn thermal_readings(&self, equipment_id: &str) -> Result<Vec<ThermalReading>> {
        Ok(self
            .thermal_readings
            .iter()
            .filter(|r| r.equipment_id == equipment_id)
            .cloned()
            .collect())
    }
}
