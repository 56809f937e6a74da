//! Alert rules: threshold validation, breach detection, and the wording shown
//! on the dashboard.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{Condition, Measurement, NotificationConfig, ThresholdLog};

/// Bounds an operator may configure for temperature thresholds, in °C.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 25.0..=35.0;

/// Bounds an operator may configure for humidity thresholds, in %.
pub const HUMIDITY_RANGE: RangeInclusive<f64> = 60.0..=80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    Sensor,
    Actuator,
}

/// Readings over the bound are critical, readings under it are warnings.
pub fn severity(log: &ThresholdLog) -> Severity {
    if log.value > log.threshold {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// e.g. `"Temperature above threshold: 31.5°C (limit: 29°C)"`.
pub fn threshold_message(log: &ThresholdLog) -> String {
    let unit = log.measurement.unit();
    format!(
        "{} {} threshold: {}{unit} (limit: {}{unit})",
        log.measurement.label(),
        log.condition,
        log.value,
        log.threshold,
    )
}

pub fn actuator_activated_message(name: &str) -> String {
    format!("{name} activated")
}

pub fn actuator_activation_message(name: &str) -> String {
    format!("Activation of {name}")
}

/// Checks every rule and returns all violations, so the caller can report
/// them together.
pub fn validate_config(config: &NotificationConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    check_pair(
        &mut errors,
        "temperature",
        "°C",
        &TEMPERATURE_RANGE,
        config.temperature_min,
        config.temperature_max,
    );
    check_pair(
        &mut errors,
        "humidity",
        "%",
        &HUMIDITY_RANGE,
        config.humidity_min,
        config.humidity_max,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_pair(
    errors: &mut Vec<String>,
    name: &str,
    unit: &str,
    range: &RangeInclusive<f64>,
    min: f64,
    max: f64,
) {
    for (field, value) in [("min", min), ("max", max)] {
        if !range.contains(&value) {
            errors.push(format!(
                "{name}_{field} must be between {}{unit} and {}{unit}",
                range.start(),
                range.end(),
            ));
        }
    }
    if min >= max {
        errors.push(format!("{name}_min must be lower than {name}_max"));
    }
}

/// Returns the crossed bound for a reading, if any: `(Above, max)` when the
/// value exceeds the maximum, `(Below, min)` when it is under the minimum.
pub fn breach(
    config: &NotificationConfig,
    measurement: Measurement,
    value: f64,
) -> Option<(Condition, f64)> {
    let (min, max) = config.bounds(measurement);
    if value > max {
        Some((Condition::Above, max))
    } else if value < min {
        Some((Condition::Below, min))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn config(t_min: f64, t_max: f64, h_min: f64, h_max: f64) -> NotificationConfig {
        NotificationConfig {
            id: 1,
            incubator_id: 1,
            temperature_min: t_min,
            temperature_max: t_max,
            humidity_min: h_min,
            humidity_max: h_max,
        }
    }

    fn log(measurement: Measurement, value: f64, threshold: f64, condition: Condition) -> ThresholdLog {
        ThresholdLog {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            measurement,
            value,
            threshold,
            condition,
            component_id: 1,
            incubator_id: 1,
        }
    }

    #[test]
    fn over_threshold_is_critical() {
        let l = log(Measurement::Temperature, 31.0, 29.0, Condition::Above);
        assert_eq!(severity(&l), Severity::Critical);
    }

    #[test]
    fn under_threshold_is_warning() {
        let l = log(Measurement::Humidity, 55.0, 60.0, Condition::Below);
        assert_eq!(severity(&l), Severity::Warning);
    }

    #[test]
    fn temperature_message_uses_celsius() {
        let l = log(Measurement::Temperature, 31.5, 29.0, Condition::Above);
        assert_eq!(
            threshold_message(&l),
            "Temperature above threshold: 31.5°C (limit: 29°C)"
        );
    }

    #[test]
    fn humidity_message_uses_percent() {
        let l = log(Measurement::Humidity, 58.25, 60.0, Condition::Below);
        assert_eq!(
            threshold_message(&l),
            "Humidity below threshold: 58.25% (limit: 60%)"
        );
    }

    #[test]
    fn actuator_messages() {
        assert_eq!(actuator_activated_message("Heater"), "Heater activated");
        assert_eq!(actuator_activation_message("Fan"), "Activation of Fan");
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&config(26.0, 29.0, 60.0, 80.0)).is_ok());
        assert!(validate_config(&config(25.0, 35.0, 60.0, 80.0)).is_ok());
    }

    #[test]
    fn out_of_range_bounds_are_reported() {
        let errors = validate_config(&config(20.0, 29.0, 60.0, 85.0)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("temperature_min must be between 25°C and 35°C"));
        assert!(errors[1].starts_with("humidity_max must be between 60% and 80%"));
    }

    #[test]
    fn min_must_be_strictly_below_max() {
        let errors = validate_config(&config(30.0, 30.0, 75.0, 65.0)).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "temperature_min must be lower than temperature_max".to_owned(),
                "humidity_min must be lower than humidity_max".to_owned(),
            ]
        );
    }

    #[test]
    fn breach_above_max() {
        let c = config(26.0, 29.0, 60.0, 80.0);
        assert_eq!(
            breach(&c, Measurement::Temperature, 29.5),
            Some((Condition::Above, 29.0))
        );
    }

    #[test]
    fn breach_below_min() {
        let c = config(26.0, 29.0, 60.0, 80.0);
        assert_eq!(
            breach(&c, Measurement::Humidity, 59.9),
            Some((Condition::Below, 60.0))
        );
    }

    #[test]
    fn bounds_themselves_are_not_breaches() {
        let c = config(26.0, 29.0, 60.0, 80.0);
        assert_eq!(breach(&c, Measurement::Temperature, 26.0), None);
        assert_eq!(breach(&c, Measurement::Temperature, 29.0), None);
        assert_eq!(breach(&c, Measurement::Humidity, 80.0), None);
    }
}
