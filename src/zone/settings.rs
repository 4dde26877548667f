//! Per-zone tunable resolution with cascading defaults.
//!
//! Every tunable the session and spawn engines read goes through here:
//! zone override -> global template -> caller-supplied fallback, with type
//! coercion and numeric clamping applied uniformly. An unparseable or
//! out-of-range value falls back and is warned about once per distinct
//! offending value, so a bad config line cannot flood the log.

use hashbrown::HashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::warn;

use crate::zone::point::ZoneId;

/// Resolves named settings for zones. See module docs for the cascade order.
#[derive(Debug, Default)]
pub struct ZoneSettings {
    /// Global template: defaults shared by every zone
    template: HashMap<String, Value>,
    /// Per-zone overrides
    overrides: HashMap<ZoneId, HashMap<String, Value>>,
    /// "path=value" keys already warned about
    warned: Mutex<FxHashSet<String>>,
}

impl ZoneSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a global template default shared by all zones.
    pub fn set_template_value(&mut self, path: impl Into<String>, value: Value) {
        self.template.insert(path.into(), value);
    }

    /// Sets a per-zone override.
    pub fn set_zone_value(&mut self, zone: &str, path: impl Into<String>, value: Value) {
        self.overrides
            .entry(zone.to_string())
            .or_default()
            .insert(path.into(), value);
    }

    /// Drops all overrides for a zone (used when the zone is deleted).
    pub fn clear_zone(&mut self, zone: &str) {
        self.overrides.remove(zone);
    }

    fn resolve(&self, zone: &str, path: &str) -> Option<&Value> {
        self.overrides
            .get(zone)
            .and_then(|m| m.get(path))
            .or_else(|| self.template.get(path))
    }

    /// Warn at most once per distinct (path, offending value) pair.
    fn warn_once(&self, path: &str, offending: &str, reason: &str) {
        let key = format!("{}={}", path, offending);
        if self.warned.lock().insert(key) {
            warn!("Setting '{}': {} ('{}'), using fallback", path, reason, offending);
        }
    }

    /// Integer setting with coercion (number, integral float, or numeric string).
    pub fn get_int(&self, zone: &str, path: &str, fallback: i64) -> i64 {
        self.get_int_in(zone, path, fallback, i64::MIN, i64::MAX)
    }

    /// Integer setting clamped into `[min, max]`.
    pub fn get_int_in(&self, zone: &str, path: &str, fallback: i64, min: i64, max: i64) -> i64 {
        let fallback = fallback.clamp(min, max);
        let Some(value) = self.resolve(zone, path) else {
            return fallback;
        };
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v >= min && v <= max => v,
            Some(v) => {
                self.warn_once(path, &v.to_string(), "value out of range");
                v.clamp(min, max)
            }
            None => {
                self.warn_once(path, &value.to_string(), "not an integer");
                fallback
            }
        }
    }

    /// Float setting with coercion.
    pub fn get_f64(&self, zone: &str, path: &str, fallback: f64) -> f64 {
        self.get_f64_in(zone, path, fallback, f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Float setting clamped into `[min, max]`.
    pub fn get_f64_in(&self, zone: &str, path: &str, fallback: f64, min: f64, max: f64) -> f64 {
        let fallback = fallback.clamp(min, max);
        let Some(value) = self.resolve(zone, path) else {
            return fallback;
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() && v >= min && v <= max => v,
            Some(v) if v.is_finite() => {
                self.warn_once(path, &v.to_string(), "value out of range");
                v.clamp(min, max)
            }
            _ => {
                self.warn_once(path, &value.to_string(), "not a number");
                fallback
            }
        }
    }

    /// Boolean setting; accepts bool or "true"/"false" strings.
    pub fn get_bool(&self, zone: &str, path: &str, fallback: bool) -> bool {
        let Some(value) = self.resolve(zone, path) else {
            return fallback;
        };
        match value {
            Value::Bool(b) => *b,
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" => true,
                "false" | "no" | "off" => false,
                _ => {
                    self.warn_once(path, s, "not a boolean");
                    fallback
                }
            },
            _ => {
                self.warn_once(path, &value.to_string(), "not a boolean");
                fallback
            }
        }
    }

    /// String setting; numbers and booleans are stringified.
    pub fn get_string(&self, zone: &str, path: &str, fallback: &str) -> String {
        let Some(value) = self.resolve(zone, path) else {
            return fallback.to_string();
        };
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => {
                self.warn_once(path, &value.to_string(), "not a string");
                fallback.to_string()
            }
        }
    }

    /// String-list setting; non-string elements are skipped with a warning.
    pub fn get_list(&self, zone: &str, path: &str, fallback: &[&str]) -> Vec<String> {
        let Some(value) = self.resolve(zone, path) else {
            return fallback.iter().map(|s| s.to_string()).collect();
        };
        match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    other => {
                        self.warn_once(path, &other.to_string(), "non-string list element");
                        None
                    }
                })
                .collect(),
            _ => {
                self.warn_once(path, &value.to_string(), "not a list");
                fallback.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}
