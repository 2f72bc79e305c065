//! Heat-exchanger thermal efficiency analysis
//!
//! Effectiveness is computed from the four terminal temperatures; heat
//! transfer assumes water on both sides (fixed cp) and NTU uses the
//! counter-flow single-pass relation `ε = 1 − e^(−NTU)`.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::models::{
    AlertLevel, Equipment, HeatExchangerEfficiency, RecommendedAction, ThermalReading,
    ThermodynamicData, hours_between,
};

/// Specific heat of water, kJ/(kg·K)
pub const WATER_CP: f64 = 4.18;

pub const DEFAULT_DESIGN_EFFICIENCY: f64 = 85.0;

/// Number of most recent readings averaged into the current efficiency
pub const RECENT_READINGS: usize = 10;

/// Trend window for the degradation rate
pub const TREND_MONTHS: u32 = 3;

/// Maintenance is due once efficiency falls to this share of design
pub const MAINTENANCE_THRESHOLD_RATIO: f64 = 0.75;

/// Degradation faster than this (percent per month) asks for monitoring
pub const MONITORING_RATE: f64 = -2.0;

const NTU_CAP: f64 = 10.0;
const AVERAGE_MONTH_DAYS: f64 = 30.44;
const MAX_PREDICTION_MONTHS: f64 = 1200.0;
const DEFAULT_PREDICTION_DAYS: i64 = 90;

/// How the degradation slope is fitted over the trend window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationMethod {
    /// Slope between the first and last reading only
    #[default]
    Endpoints,
    /// Ordinary least-squares fit over every reading in the window
    LeastSquares,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThermalSettings {
    pub design_efficiency: f64, // percent
    pub degradation_method: DegradationMethod,
}

impl Default for ThermalSettings {
    fn default() -> Self {
        ThermalSettings {
            design_efficiency: DEFAULT_DESIGN_EFFICIENCY,
            degradation_method: DegradationMethod::Endpoints,
        }
    }
}

/// Thermal effectiveness in percent, 0..=100
///
/// Readings without a driving temperature difference (cold inlet at or
/// above hot inlet) yield 0.
pub fn effectiveness(reading: &ThermalReading) -> f64 {
    let hot_side_delta = reading.hot_inlet_temp - reading.hot_outlet_temp;
    let cold_side_delta = reading.cold_outlet_temp - reading.cold_inlet_temp;
    let max_possible_delta = reading.hot_inlet_temp - reading.cold_inlet_temp;

    if max_possible_delta <= 0.0 || max_possible_delta.is_nan() {
        debug!(
            reading = %reading.id,
            hot_inlet = reading.hot_inlet_temp,
            cold_inlet = reading.cold_inlet_temp,
            "no driving temperature difference"
        );
        return 0.0;
    }

    let ratio = hot_side_delta.max(cold_side_delta) / max_possible_delta;
    ratio.clamp(0.0, 1.0) * 100.0
}

/// Heat released by the hot stream, kW
pub fn actual_heat_transfer(reading: &ThermalReading) -> f64 {
    reading.flow_rate_hot * WATER_CP * (reading.hot_inlet_temp - reading.hot_outlet_temp)
}

/// Upper bound on transferable heat, kW
pub fn max_heat_transfer(reading: &ThermalReading) -> f64 {
    reading.flow_rate_hot.min(reading.flow_rate_cold)
        * WATER_CP
        * (reading.hot_inlet_temp - reading.cold_inlet_temp)
}

pub fn ntu(reading: &ThermalReading) -> f64 {
    let eps = effectiveness(reading) / 100.0;
    if eps < 0.99 {
        -(1.0 - eps).ln()
    } else {
        NTU_CAP
    }
}

fn months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    hours_between(from, to) / 24.0 / AVERAGE_MONTH_DAYS
}

fn sorted_by_time(readings: &[&ThermalReading]) -> Vec<(DateTime<Utc>, f64)> {
    let mut points: Vec<(DateTime<Utc>, f64)> = readings
        .iter()
        .map(|r| (r.timestamp, effectiveness(r)))
        .collect();
    points.sort_by_key(|(timestamp, _)| *timestamp);
    points
}

/// Change of effectiveness in percent per month over the last three months
///
/// Negative means degrading. Fewer than two readings in the window, or
/// readings that all share one timestamp, give 0.
pub fn degradation_rate(
    readings: &[ThermalReading],
    now: DateTime<Utc>,
    method: DegradationMethod,
) -> f64 {
    let cutoff = now
        .checked_sub_months(Months::new(TREND_MONTHS))
        .unwrap_or(now);
    let recent: Vec<&ThermalReading> = readings.iter().filter(|r| r.timestamp >= cutoff).collect();
    let points = sorted_by_time(&recent);

    let (Some(&(first_at, first_eff)), Some(&(last_at, last_eff))) = (points.first(), points.last())
    else {
        return 0.0;
    };
    if points.len() < 2 {
        return 0.0;
    }

    let span = months_between(first_at, last_at);
    if span <= 0.0 {
        return 0.0;
    }

    match method {
        DegradationMethod::Endpoints => (last_eff - first_eff) / span,
        DegradationMethod::LeastSquares => least_squares_slope(&points, first_at),
    }
}

fn least_squares_slope(points: &[(DateTime<Utc>, f64)], origin: DateTime<Utc>) -> f64 {
    let n = points.len() as f64;
    let xs: Vec<f64> = points.iter().map(|(t, _)| months_between(origin, *t)).collect();
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, (_, y)) in xs.iter().zip(points) {
        covariance += (x - mean_x) * (y - mean_y);
        variance += (x - mean_x).powi(2);
    }

    if variance == 0.0 {
        0.0
    } else {
        covariance / variance
    }
}

/// Alert level and action for an efficiency ratio (current / design)
///
/// First match wins; the degradation rate only matters once the ratio
/// is at least 0.85. NaN ratios end up green.
pub fn classify(efficiency_ratio: f64, degradation_rate: f64) -> (AlertLevel, RecommendedAction) {
    if efficiency_ratio < 0.60 {
        (AlertLevel::Red, RecommendedAction::Replacement)
    } else if efficiency_ratio < 0.75 {
        (AlertLevel::Orange, RecommendedAction::Maintenance)
    } else if efficiency_ratio < 0.85 {
        (AlertLevel::Yellow, RecommendedAction::Cleaning)
    } else if degradation_rate < MONITORING_RATE {
        (AlertLevel::Yellow, RecommendedAction::Monitoring)
    } else {
        (AlertLevel::Green, RecommendedAction::None)
    }
}

/// Date at which efficiency is expected to reach 75 % of design
///
/// Linear extrapolation from `today`, rounded up to whole months. Not
/// degrading, or already below the threshold, means `today`.
pub fn predict_maintenance_date(
    current_efficiency: f64,
    design_efficiency: f64,
    degradation_rate: f64,
    today: DateTime<Utc>,
) -> DateTime<Utc> {
    let threshold = design_efficiency * MAINTENANCE_THRESHOLD_RATIO;

    if degradation_rate >= 0.0 || degradation_rate.is_nan() || current_efficiency <= threshold {
        return today;
    }

    let months_until = (current_efficiency - threshold) / degradation_rate.abs();
    let months = months_until.ceil().min(MAX_PREDICTION_MONTHS) as u32;
    today.checked_add_months(Months::new(months)).unwrap_or(today)
}

/// Full assessment of one heat exchanger from its reading history
///
/// Readings belonging to other equipment are ignored; order does not
/// matter.
pub fn evaluate_heat_exchanger(
    equipment: &Equipment,
    readings: &[ThermalReading],
    settings: &ThermalSettings,
    now: DateTime<Utc>,
) -> HeatExchangerEfficiency {
    let design_efficiency = settings.design_efficiency;
    let mut history: Vec<ThermalReading> = readings
        .iter()
        .filter(|r| r.equipment_id == equipment.id)
        .cloned()
        .collect();
    history.sort_by_key(|r| r.timestamp);

    let Some(latest) = history.last() else {
        debug!(equipment = %equipment.id, "no thermal readings, assuming design efficiency");
        return HeatExchangerEfficiency {
            equipment_id: equipment.id.clone(),
            equipment_name: equipment.name.clone(),
            current_efficiency: design_efficiency,
            design_efficiency,
            degradation_rate: 0.0,
            predicted_maintenance_date: now + Duration::days(DEFAULT_PREDICTION_DAYS),
            recommended_action: RecommendedAction::None,
            alert_level: AlertLevel::Green,
            thermodynamic_data: ThermodynamicData::default(),
        };
    };

    let recent = &history[history.len().saturating_sub(RECENT_READINGS)..];
    let current_efficiency =
        recent.iter().map(effectiveness).sum::<f64>() / recent.len() as f64;

    let rate = degradation_rate(&history, now, settings.degradation_method);

    let thermodynamic_data = ThermodynamicData {
        actual_heat_transfer: actual_heat_transfer(latest),
        max_possible_heat_transfer: max_heat_transfer(latest),
        ntu: ntu(latest),
        effectiveness: effectiveness(latest),
    };

    let (alert_level, recommended_action) = classify(current_efficiency / design_efficiency, rate);

    HeatExchangerEfficiency {
        equipment_id: equipment.id.clone(),
        equipment_name: equipment.name.clone(),
        current_efficiency,
        design_efficiency,
        degradation_rate: rate,
        predicted_maintenance_date: predict_maintenance_date(
            current_efficiency,
            design_efficiency,
            rate,
            now,
        ),
        recommended_action,
        alert_level,
        thermodynamic_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EquipmentCategory, EquipmentStatus};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn reading(
        days_ago: i64,
        hot_in: f64,
        hot_out: f64,
        cold_in: f64,
        cold_out: f64,
    ) -> ThermalReading {
        ThermalReading {
            id: format!("thermal-{days_ago}"),
            equipment_id: "eq-001".to_string(),
            timestamp: now() - Duration::days(days_ago),
            hot_inlet_temp: hot_in,
            hot_outlet_temp: hot_out,
            cold_inlet_temp: cold_in,
            cold_outlet_temp: cold_out,
            flow_rate_hot: 2.5,
            flow_rate_cold: 3.0,
        }
    }

    /// A reading whose cold side gives exactly `pct` percent effectiveness
    fn reading_with(days_ago: i64, pct: f64) -> ThermalReading {
        reading(days_ago, 100.0, 90.0, 0.0, pct)
    }

    fn exchanger() -> Equipment {
        Equipment {
            id: "eq-001".to_string(),
            name: "Main heat exchanger".to_string(),
            category: EquipmentCategory::HeatExchanger,
            status: EquipmentStatus::Operational,
            installation_date: now(),
            next_maintenance_date: now(),
            location: None,
            manufacturer: None,
            model: None,
        }
    }

    #[test]
    fn effectiveness_uses_the_larger_side() {
        let r = reading(0, 90.0, 70.0, 20.0, 50.0);
        assert!((effectiveness(&r) - 30.0 / 70.0 * 100.0).abs() < 1e-9);
        assert!((effectiveness(&r) - 42.857).abs() < 1e-3);
    }

    #[test]
    fn no_driving_force_means_zero_effectiveness() {
        for (hot, cold) in [(20.0, 20.0), (20.0, 60.0)] {
            let mut r = reading(0, hot, 10.0, cold, 80.0);
            r.flow_rate_hot = 50.0;
            r.flow_rate_cold = 0.0;
            assert_eq!(effectiveness(&r), 0.0);
        }
    }

    #[test]
    fn effectiveness_is_clamped() {
        // Cold outlet above hot inlet is a measurement error
        assert_eq!(effectiveness(&reading(0, 80.0, 70.0, 20.0, 95.0)), 100.0);
        assert_eq!(effectiveness(&reading(0, 80.0, 85.0, 20.0, 15.0)), 0.0);
    }

    #[test]
    fn heat_transfer_assumes_water() {
        let r = reading(0, 90.0, 70.0, 20.0, 50.0);
        assert!((actual_heat_transfer(&r) - 2.5 * 4.18 * 20.0).abs() < 1e-9);
        assert!((max_heat_transfer(&r) - 2.5 * 4.18 * 70.0).abs() < 1e-9);
    }

    #[test]
    fn ntu_is_capped_near_full_effectiveness() {
        let half = reading_with(0, 50.0);
        assert!((ntu(&half) - 2f64.ln()).abs() < 1e-9);
        assert_eq!(ntu(&reading_with(0, 99.5)), 10.0);
        assert_eq!(ntu(&reading(0, 10.0, 5.0, 20.0, 25.0)), 0.0);
    }

    #[test]
    fn degradation_uses_first_and_last_reading() {
        let readings = vec![
            reading_with(0, 70.0),
            reading_with(61, 80.0),
            reading_with(30, 40.0),
        ];
        let rate = degradation_rate(&readings, now(), DegradationMethod::Endpoints);
        let months = 61.0 / 30.44;
        assert!((rate - (70.0 - 80.0) / months).abs() < 1e-9);
    }

    #[test]
    fn degradation_ignores_readings_older_than_three_months() {
        let readings = vec![reading_with(200, 95.0), reading_with(10, 80.0)];
        assert_eq!(degradation_rate(&readings, now(), DegradationMethod::Endpoints), 0.0);
    }

    #[test]
    fn degradation_needs_elapsed_time() {
        let readings = vec![reading_with(5, 95.0), reading_with(5, 80.0)];
        assert_eq!(degradation_rate(&readings, now(), DegradationMethod::LeastSquares), 0.0);
        assert_eq!(degradation_rate(&[], now(), DegradationMethod::Endpoints), 0.0);
    }

    #[test]
    fn least_squares_matches_a_clean_line() {
        // One point per ~10 days losing 1 % each time
        let readings: Vec<ThermalReading> = (0..9)
            .map(|i| reading_with(80 - i * 10, 80.0 - i as f64))
            .collect();
        let endpoints = degradation_rate(&readings, now(), DegradationMethod::Endpoints);
        let fitted = degradation_rate(&readings, now(), DegradationMethod::LeastSquares);
        assert!(fitted < 0.0);
        assert!((fitted - endpoints).abs() < 1e-9);
    }

    #[test]
    fn least_squares_resists_a_noisy_endpoint() {
        let mut readings: Vec<ThermalReading> =
            (0..9).map(|i| reading_with(80 - i * 10, 80.0)).collect();
        readings.push(reading_with(0, 60.0));
        let endpoints = degradation_rate(&readings, now(), DegradationMethod::Endpoints);
        let fitted = degradation_rate(&readings, now(), DegradationMethod::LeastSquares);
        assert!(fitted < 0.0);
        assert!(fitted > endpoints);
    }

    #[test]
    fn classification_ladder() {
        assert_eq!(classify(50.0 / 85.0, 0.0), (AlertLevel::Red, RecommendedAction::Replacement));
        assert_eq!(classify(0.60, 0.0), (AlertLevel::Orange, RecommendedAction::Maintenance));
        assert_eq!(classify(0.75, 0.0), (AlertLevel::Yellow, RecommendedAction::Cleaning));
        assert_eq!(classify(0.85, -2.5), (AlertLevel::Yellow, RecommendedAction::Monitoring));
        assert_eq!(classify(0.85, -2.0), (AlertLevel::Green, RecommendedAction::None));
        assert_eq!(classify(0.50, -10.0), (AlertLevel::Red, RecommendedAction::Replacement));
    }

    #[test]
    fn classification_is_total() {
        let ratios = [
            f64::NEG_INFINITY,
            -1.0,
            0.0,
            0.59,
            0.6,
            0.7,
            0.8,
            0.9,
            1.5,
            f64::INFINITY,
            f64::NAN,
        ];
        let rates = [f64::NEG_INFINITY, -5.0, -2.0, 0.0, 3.0, f64::NAN];
        for ratio in ratios {
            for rate in rates {
                let (level, action) = classify(ratio, rate);
                let expected = match level {
                    AlertLevel::Red => vec![RecommendedAction::Replacement],
                    AlertLevel::Orange => vec![RecommendedAction::Maintenance],
                    AlertLevel::Yellow => {
                        vec![RecommendedAction::Cleaning, RecommendedAction::Monitoring]
                    }
                    AlertLevel::Green => vec![RecommendedAction::None],
                };
                assert!(expected.contains(&action), "{ratio} / {rate}");
            }
        }
    }

    #[test]
    fn prediction_extrapolates_in_whole_months() {
        let today = now();
        let predicted = predict_maintenance_date(80.0, 85.0, -3.0, today);
        assert_eq!(predicted, today.checked_add_months(Months::new(6)).unwrap());
    }

    #[test]
    fn prediction_is_today_when_not_degrading_or_already_due() {
        let today = now();
        assert_eq!(predict_maintenance_date(80.0, 85.0, 0.0, today), today);
        assert_eq!(predict_maintenance_date(80.0, 85.0, 1.5, today), today);
        assert_eq!(predict_maintenance_date(60.0, 85.0, -3.0, today), today);
        assert_eq!(predict_maintenance_date(63.75, 85.0, -3.0, today), today);
    }

    #[test]
    fn prediction_survives_negligible_degradation() {
        let today = now();
        let predicted = predict_maintenance_date(80.0, 85.0, -1e-12, today);
        assert!(predicted > today);
    }

    #[test]
    fn empty_history_defaults_to_design() {
        for design in [85.0, 70.0] {
            let settings = ThermalSettings {
                design_efficiency: design,
                ..ThermalSettings::default()
            };
            let result = evaluate_heat_exchanger(&exchanger(), &[], &settings, now());
            assert_eq!(result.alert_level, AlertLevel::Green);
            assert_eq!(result.recommended_action, RecommendedAction::None);
            assert_eq!(result.current_efficiency, design);
            assert_eq!(result.predicted_maintenance_date, now() + Duration::days(90));
        }
    }

    #[test]
    fn readings_of_other_equipment_are_ignored() {
        let mut foreign = reading_with(1, 10.0);
        foreign.equipment_id = "eq-999".to_string();
        let result =
            evaluate_heat_exchanger(&exchanger(), &[foreign], &ThermalSettings::default(), now());
        assert_eq!(result.current_efficiency, 85.0);
    }

    #[test]
    fn current_efficiency_averages_the_last_ten_readings() {
        let mut readings: Vec<ThermalReading> = (0..10).map(|i| reading_with(i, 80.0)).collect();
        // Older readings fall outside the last ten
        readings.extend((20..25).map(|i| reading_with(i, 20.0)));
        let result =
            evaluate_heat_exchanger(&exchanger(), &readings, &ThermalSettings::default(), now());
        assert!((result.current_efficiency - 80.0).abs() < 1e-9);
    }

    #[test]
    fn badly_fouled_exchanger_needs_replacement() {
        let readings = vec![reading_with(30, 52.0), reading_with(0, 48.0)];
        let result =
            evaluate_heat_exchanger(&exchanger(), &readings, &ThermalSettings::default(), now());
        assert!((result.current_efficiency - 50.0).abs() < 1e-9);
        assert_eq!(result.alert_level, AlertLevel::Red);
        assert_eq!(result.recommended_action, RecommendedAction::Replacement);
        assert!(result.degradation_rate < 0.0);
        assert_eq!(result.predicted_maintenance_date, now());
    }

    #[test]
    fn snapshot_comes_from_the_latest_reading() {
        let readings = vec![reading(0, 90.0, 70.0, 20.0, 50.0), reading_with(3, 90.0)];
        let result =
            evaluate_heat_exchanger(&exchanger(), &readings, &ThermalSettings::default(), now());
        let snapshot = result.thermodynamic_data;
        assert!((snapshot.effectiveness - 42.857).abs() < 1e-3);
        assert!((snapshot.actual_heat_transfer - 209.0).abs() < 1e-9);
        assert!((snapshot.max_possible_heat_transfer - 731.5).abs() < 1e-9);
    }

    #[test]
    fn healthy_but_fast_degrading_exchanger_is_monitored() {
        let readings = vec![reading_with(60, 95.0), reading_with(0, 85.0)];
        let result =
            evaluate_heat_exchanger(&exchanger(), &readings, &ThermalSettings::default(), now());
        assert!(result.current_efficiency / 85.0 >= 0.85);
        assert!(result.degradation_rate < -2.0);
        assert_eq!(result.alert_level, AlertLevel::Yellow);
        assert_eq!(result.recommended_action, RecommendedAction::Monitoring);
    }
}
