//! Reliability and thermal-efficiency calculations for maintenance management
//!
//! The calculation engine lives in [`reliability`] and [`thermal`]: pure
//! functions over slices of records and an explicit analysis window.
//! [`schedule`] derives due dates and priorities from maintenance tasks.
//! Everything else feeds records in ([`db`], [`import`], [`sample`],
//! [`repository`]) or renders results ([`report`]).

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod reliability;
pub mod report;
pub mod repository;
pub mod sample;
pub mod schedule;
pub mod thermal;
pub mod timefmt;

pub use error::{ConfigError, ParseError};
pub use models::{
    AlertLevel, Breakdown, Equipment, EquipmentMetrics, HeatExchangerEfficiency,
    MaintenanceTask, PerformanceMetrics, Period, RecommendedAction, TheoreticalMetrics,
    ThermalReading, Trend,
};
pub use repository::{MemoryRepository, Repository, SqliteRepository};
pub use thermal::{DegradationMethod, ThermalSettings};
