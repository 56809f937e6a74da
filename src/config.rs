use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::{Context, Result};

use crate::db::models::ComponentKind;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Well-known device positions shown on the dashboard status panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Dht11A,
    Dht11B,
    Heater,
    Humidifier,
    Fan,
}

impl Slot {
    /// Kind of component a slot must point at to report its status.
    pub fn expected_kind(self) -> ComponentKind {
        match self {
            Slot::Dht11A | Slot::Dht11B => ComponentKind::Sensor,
            Slot::Heater | Slot::Humidifier | Slot::Fan => ComponentKind::Actuator,
        }
    }
}

impl FromStr for Slot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dht11_a" => Ok(Self::Dht11A),
            "dht11_b" => Ok(Self::Dht11B),
            "heater" => Ok(Self::Heater),
            "humidifier" => Ok(Self::Humidifier),
            "fan" => Ok(Self::Fan),
            other => Err(anyhow::anyhow!("unknown slot: {other:?}")),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Slot::Dht11A => "dht11_a",
            Slot::Dht11B => "dht11_b",
            Slot::Heater => "heater",
            Slot::Humidifier => "humidifier",
            Slot::Fan => "fan",
        };
        f.write_str(s)
    }
}

pub const DEFAULT_COMPONENT_SLOTS: &str = "dht11_a:1,dht11_b:2,humidifier:3,fan:4,heater:5";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// How far back `/alerts/active` looks, in hours.
    pub active_alert_window_hours: i64,
    /// Maps slot → component id,
    /// Format: `"slot1:id1,slot2:id2"` (e.g. `"heater:5,fan:4"`).
    pub component_slots: HashMap<Slot, i64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: optional("DATABASE_URL", "sqlite://incubator.db?mode=rwc"),
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            active_alert_window_hours: parse_window_hours(&optional(
                "ACTIVE_ALERT_WINDOW_HOURS",
                "24",
            ))?,
            component_slots: parse_component_slots(&optional(
                "COMPONENT_SLOTS",
                DEFAULT_COMPONENT_SLOTS,
            ))?,
        })
    }
}

/// Upper bound for `ACTIVE_ALERT_WINDOW_HOURS`: one hundred years.
pub const MAX_WINDOW_HOURS: i64 = 24 * 365 * 100;

fn parse_window_hours(raw: &str) -> Result<i64> {
    let hours: i64 = raw
        .trim()
        .parse()
        .context("ACTIVE_ALERT_WINDOW_HOURS must be a positive integer")?;
    anyhow::ensure!(hours > 0, "ACTIVE_ALERT_WINDOW_HOURS must be a positive integer");
    anyhow::ensure!(
        hours <= MAX_WINDOW_HOURS,
        "ACTIVE_ALERT_WINDOW_HOURS must not exceed {MAX_WINDOW_HOURS}"
    );
    Ok(hours)
}

/// Parse `"slot1:id1,slot2:id2"` into a `HashMap<Slot, i64>`.
///
/// Returns an error immediately if any entry is malformed, names an
/// unrecognised slot, or carries a non-numeric component id.
pub fn parse_component_slots(raw: &str) -> Result<HashMap<Slot, i64>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let (slot, id) = entry.split_once(':').with_context(|| {
                format!("COMPONENT_SLOTS entry must be 'slot:component_id', got: {entry:?}")
            })?;
            let slot = slot
                .trim()
                .parse::<Slot>()
                .with_context(|| format!("unknown slot in COMPONENT_SLOTS entry {entry:?}"))?;
            let id = id
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid component id in COMPONENT_SLOTS entry {entry:?}"))?;
            Ok((slot, id))
        })
        .collect()
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
