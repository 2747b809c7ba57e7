//! Partial configuration updates.
//!
//! A [`ConfigPatch`] carries only the fields a caller wants to change. Merging
//! never fails: a numeric field that is not a number (or a numeric string), or
//! that is below its minimum, is dropped and the current value is kept. A flag
//! that is neither a boolean nor `"true"`/`"false"` is dropped the same way.

use serde::{Deserialize, Serialize};

use crate::config::schema::PipelineConfig;

/// A numeric knob as supplied by a caller, before coercion.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl NumericInput {
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            NumericInput::Number(n) => Some(*n),
            NumericInput::Text(s) => s.trim().parse::<f64>().ok(),
            NumericInput::Other(_) => None,
        };
        value.filter(|n| n.is_finite())
    }

    /// Value for a field that must be at least 1.
    pub fn positive(&self) -> Option<u64> {
        self.as_f64().filter(|n| *n >= 1.0).map(|n| n.trunc() as u64)
    }

    /// Value for a field that accepts 0; negative input clamps to 0.
    pub fn non_negative(&self) -> Option<u64> {
        self.as_f64().map(|n| n.max(0.0).trunc() as u64)
    }
}

impl From<u64> for NumericInput {
    fn from(n: u64) -> Self {
        NumericInput::Number(n as f64)
    }
}

impl From<u32> for NumericInput {
    fn from(n: u32) -> Self {
        NumericInput::Number(f64::from(n))
    }
}

impl From<i64> for NumericInput {
    fn from(n: i64) -> Self {
        NumericInput::Number(n as f64)
    }
}

impl From<i32> for NumericInput {
    fn from(n: i32) -> Self {
        NumericInput::Number(f64::from(n))
    }
}

impl From<f64> for NumericInput {
    fn from(n: f64) -> Self {
        NumericInput::Number(n)
    }
}

impl From<&str> for NumericInput {
    fn from(s: &str) -> Self {
        NumericInput::Text(s.to_string())
    }
}

/// An on/off switch as supplied by a caller, before coercion.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Other(serde_json::Value),
}

impl FlagInput {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagInput::Bool(b) => Some(*b),
            FlagInput::Other(serde_json::Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(true),
                    "false" => Some(false),
                    _ => None,
                }
            }
            FlagInput::Other(_) => None,
        }
    }
}

impl From<bool> for FlagInput {
    fn from(b: bool) -> Self {
        FlagInput::Bool(b)
    }
}

/// Partial update for the whole pipeline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub throttling: Option<ThrottlingPatch>,
    pub retry: Option<RetryPatch>,
    pub breaker: Option<BreakerPatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThrottlingPatch {
    pub enabled: Option<FlagInput>,
    pub requests: Option<NumericInput>,
    #[serde(alias = "interval_ms")]
    pub interval_ms: Option<NumericInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPatch {
    pub enabled: Option<FlagInput>,
    pub retries: Option<NumericInput>,
    #[serde(alias = "attempt_timeout_ms")]
    pub attempt_timeout_ms: Option<NumericInput>,
    #[serde(alias = "total_timeout_ms")]
    pub total_timeout_ms: Option<NumericInput>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BreakerPatch {
    pub enabled: Option<FlagInput>,
    #[serde(alias = "failure_threshold")]
    pub failure_threshold: Option<NumericInput>,
    #[serde(alias = "open_ms")]
    pub open_ms: Option<NumericInput>,
    #[serde(alias = "half_open_probe_interval_ms")]
    pub half_open_probe_interval_ms: Option<NumericInput>,
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl ConfigPatch {
    /// True when the patch names no field at all.
    pub fn is_empty(&self) -> bool {
        self.throttling.is_none() && self.retry.is_none() && self.breaker.is_none()
    }

    /// Merge this patch over `current`, returning the new configuration.
    pub fn apply_to(&self, current: &PipelineConfig) -> PipelineConfig {
        let mut next = current.clone();

        if let Some(t) = &self.throttling {
            if let Some(enabled) = t.enabled.as_ref().and_then(FlagInput::as_bool) {
                next.throttling.enabled = enabled;
            }
            if let Some(n) = t.requests.as_ref().and_then(NumericInput::positive) {
                next.throttling.requests = n;
            }
            if let Some(n) = t.interval_ms.as_ref().and_then(NumericInput::positive) {
                next.throttling.interval_ms = n;
            }
        }

        if let Some(r) = &self.retry {
            if let Some(enabled) = r.enabled.as_ref().and_then(FlagInput::as_bool) {
                next.retry.enabled = enabled;
            }
            if let Some(n) = r.retries.as_ref().and_then(NumericInput::non_negative) {
                next.retry.retries = clamp_u32(n);
            }
            if let Some(n) = r.attempt_timeout_ms.as_ref().and_then(NumericInput::positive) {
                next.retry.attempt_timeout_ms = n;
            }
            if let Some(n) = r.total_timeout_ms.as_ref().and_then(NumericInput::positive) {
                next.retry.total_timeout_ms = n;
            }
        }

        if let Some(b) = &self.breaker {
            if let Some(enabled) = b.enabled.as_ref().and_then(FlagInput::as_bool) {
                next.breaker.enabled = enabled;
            }
            if let Some(n) = b.failure_threshold.as_ref().and_then(NumericInput::positive) {
                next.breaker.failure_threshold = clamp_u32(n);
            }
            if let Some(n) = b.open_ms.as_ref().and_then(NumericInput::positive) {
                next.breaker.open_ms = n;
            }
            if let Some(n) = b
                .half_open_probe_interval_ms
                .as_ref()
                .and_then(NumericInput::positive)
            {
                next.breaker.half_open_probe_interval_ms = n;
            }
        }

        next
    }
}
