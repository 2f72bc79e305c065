//! GMAO reliability calculator
//!
//! Reliability indicators and heat-exchanger efficiency for maintenance data.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use gmao_reliability::config::{self, AnalysisConfig};
use gmao_reliability::models::Period;
use gmao_reliability::report::{self, ThermalSummary};
use gmao_reliability::{SqliteRepository, db, import, sample, timefmt};

#[derive(Parser)]
#[command(name = "gmao-reliability")]
#[command(about = "Reliability and thermal-efficiency calculations for maintenance data")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "gmao.db")]
    database: PathBuf,

    /// Path to the analysis configuration (TOML)
    #[arg(short, long, env = "GMAO_CONFIG", default_value = "gmao.toml")]
    config: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import local-storage JSON exports from a directory
    Import {
        /// Directory containing the exports
        source_dir: PathBuf,

        /// Clear existing data before import
        #[arg(long)]
        clear: bool,

        /// Regular expression selecting export file names
        #[arg(long, default_value = import::DEFAULT_FILE_PATTERN, value_parser = parse_pattern)]
        pattern: Regex,
    },

    /// Load sample data for testing (without an export)
    LoadSample,

    /// List all equipment in the database
    ListEquipment,

    /// MTBF, MTTR and availability for the fleet or one unit
    Metrics {
        /// Equipment ID; the whole fleet when omitted
        #[arg(short, long)]
        equipment: Option<String>,

        /// Window start (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_time)]
        from: Option<DateTime<Utc>>,

        /// Window end (YYYY-MM-DD or RFC 3339), defaults to now
        #[arg(long, value_parser = parse_time)]
        to: Option<DateTime<Utc>>,

        /// Window length in days when --from is not given
        #[arg(
            long,
            default_value = "30",
            value_parser = clap::value_parser!(i64).range(1..=36_500)
        )]
        days: i64,
    },

    /// Monthly fleet indicators for trend charts
    History {
        /// Number of months, including the current one
        #[arg(short, long, value_parser = parse_months)]
        months: Option<u32>,
    },

    /// Thermal efficiency assessment of a heat exchanger
    Thermal {
        /// Equipment ID
        equipment: String,

        /// Design efficiency in percent, in (0, 100]
        #[arg(long, value_parser = parse_design)]
        design: Option<f64>,
    },

    /// Open breakdowns, maintenance coming due and recurring tasks to reschedule
    Due,
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, gmao_reliability::ParseError> {
    timefmt::parse_timestamp(value)
}

fn parse_design(value: &str) -> Result<f64> {
    Ok(config::design_efficiency(value.parse()?)?)
}

fn parse_months(value: &str) -> Result<u32> {
    Ok(config::history_months(value.parse()?)?)
}

fn parse_pattern(value: &str) -> Result<Regex, regex::Error> {
    Regex::new(value)
}

fn print<T: Serialize + std::fmt::Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", value);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let now = Utc::now();

    let config: AnalysisConfig = config::load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;
    let repo = SqliteRepository::new(&conn);

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import {
            source_dir,
            clear,
            pattern,
        } => {
            if clear {
                println!("Clearing existing data...");
                db::clear_all(&conn)?;
            }

            let stats = import::import_directory(&conn, &source_dir, &pattern)?;
            println!("{}", stats);
        }

        Commands::LoadSample => {
            db::clear_all(&conn)?;
            import::store_bundle(&conn, &sample::sample_bundle(now))?;
            println!("Sample data loaded successfully!");
            for (table, count) in db::table_counts(&conn)? {
                println!("  {:<18} {}", table, count);
            }
        }

        Commands::ListEquipment => {
            let equipments = db::list_equipment(&conn)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&equipments)?);
            } else if equipments.is_empty() {
                println!("No equipment in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<10} {:<32} {:<16} {:<12}", "ID", "Name", "Type", "Status");
                println!("{}", "-".repeat(72));
                for e in equipments {
                    println!(
                        "{:<10} {:<32} {:<16} {:<12}",
                        e.id, e.name, e.category, e.status
                    );
                }
            }
        }

        Commands::Metrics {
            equipment,
            from,
            to,
            days,
        } => {
            let end = to.unwrap_or(now);
            let period = match from {
                Some(start) => Period::new(start, end),
                None => Period::last_days(end, days),
            };
            if period.end < period.start {
                anyhow::bail!("window end {} is before its start {}", period.end, period.start);
            }

            match equipment {
                Some(id) => print(&report::equipment_report(&repo, &id, &period)?, cli.json)?,
                None => print(&report::fleet_report(&repo, &period)?, cli.json)?,
            }
        }

        Commands::History { months } => {
            let months = months.unwrap_or(config.history.months);
            print(&report::history_report(&repo, months, now)?, cli.json)?;
        }

        Commands::Thermal { equipment, design } => {
            let mut settings = config.thermal;
            if let Some(design) = design {
                settings.design_efficiency = design;
            }
            let result = report::thermal_report(&repo, &equipment, &settings, now)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", ThermalSummary(&result));
            }
        }

        Commands::Due => {
            print(&report::due_report(&repo, now)?, cli.json)?;
        }
    }

    Ok(())
}
