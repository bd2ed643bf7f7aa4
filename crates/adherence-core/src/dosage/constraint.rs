//! Dosage constraint definitions and their persisted record form.
//!
//! A [`DosageConstraint`] can only be built through its validating
//! constructors or by decoding a [`DosageConstraintRecord`], so malformed
//! configuration (zero, negative or sub-minute durations, non-positive counts
//! and amounts) is rejected before any dose is ever evaluated against it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConstraintError;
use crate::time_window::format_duration;

/// Open-ended parameters of a custom constraint, interpreted by the caller.
pub type CustomParameters = BTreeMap<String, serde_json::Value>;

/// The rule a constraint enforces.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Minimum spacing between two consecutive doses
    MinTimeBetweenDoses { interval: Duration },
    /// At most `count` doses in any trailing `period`
    MaxCountPerPeriod { count: u32, period: Duration },
    /// At most `amount` (in `unit`) in any trailing `period`
    MaxCumulativeAmountPerPeriod {
        amount: f64,
        unit: String,
        period: Duration,
    },
    /// Doses only allowed while the local clock is in `[start, end)`
    ActiveTimeWindow { start: NaiveTime, end: NaiveTime },
    /// Advisory rule, never blocks
    Custom { parameters: CustomParameters },
}

/// A validated dosage rule with a human-readable description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DosageConstraintRecord", into = "DosageConstraintRecord")]
pub struct DosageConstraint {
    kind: ConstraintKind,
    description: String,
}

impl DosageConstraint {
    pub fn min_time_between_doses(interval: Duration) -> Result<Self, ConstraintError> {
        ensure_positive_duration("interval", interval)?;
        Ok(Self::from_kind(ConstraintKind::MinTimeBetweenDoses { interval }))
    }

    pub fn max_count_per_period(count: u32, period: Duration) -> Result<Self, ConstraintError> {
        if count == 0 {
            return Err(ConstraintError::invalid("count", "must be at least 1"));
        }
        ensure_positive_duration("period", period)?;
        Ok(Self::from_kind(ConstraintKind::MaxCountPerPeriod { count, period }))
    }

    pub fn max_cumulative_amount_per_period(
        amount: f64,
        unit: impl Into<String>,
        period: Duration,
    ) -> Result<Self, ConstraintError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ConstraintError::invalid(
                "amount",
                format!("must be a positive number, got {}", amount),
            ));
        }
        let unit = unit.into();
        if unit.trim().is_empty() {
            return Err(ConstraintError::invalid("unit", "must not be empty"));
        }
        ensure_positive_duration("period", period)?;
        Ok(Self::from_kind(ConstraintKind::MaxCumulativeAmountPerPeriod {
            amount,
            unit,
            period,
        }))
    }

    /// Window of allowed local times; `end < start` spans midnight.
    pub fn active_time_window(start: NaiveTime, end: NaiveTime) -> Result<Self, ConstraintError> {
        if start == end {
            return Err(ConstraintError::invalid(
                "end",
                "time window must not be empty (start equals end)",
            ));
        }
        Ok(Self::from_kind(ConstraintKind::ActiveTimeWindow { start, end }))
    }

    pub fn custom(parameters: CustomParameters) -> Self {
        Self::from_kind(ConstraintKind::Custom { parameters })
    }

    /// Replace the generated description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether a violation of this constraint can block a dose.
    pub fn is_blocking(&self) -> bool {
        !matches!(self.kind, ConstraintKind::Custom { .. })
    }

    fn from_kind(kind: ConstraintKind) -> Self {
        let description = default_description(&kind);
        Self { kind, description }
    }
}

impl fmt::Display for DosageConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Durations must be a positive whole number of minutes, the record's unit.
fn ensure_positive_duration(field: &str, value: Duration) -> Result<(), ConstraintError> {
    if value <= Duration::zero() {
        return Err(ConstraintError::invalid(
            field,
            format!("duration must be positive, got {} minutes", value.num_minutes()),
        ));
    }
    if value != Duration::minutes(value.num_minutes()) {
        return Err(ConstraintError::invalid(
            field,
            format!("duration must be whole minutes, got {}s", value.num_seconds()),
        ));
    }
    Ok(())
}

fn default_description(kind: &ConstraintKind) -> String {
    match kind {
        ConstraintKind::MinTimeBetweenDoses { interval } => {
            format!("At least {} between doses", format_duration(*interval))
        }
        ConstraintKind::MaxCountPerPeriod { count, period } => {
            format!("No more than {} dose(s) per {}", count, format_duration(*period))
        }
        ConstraintKind::MaxCumulativeAmountPerPeriod {
            amount,
            unit,
            period,
        } => format!(
            "No more than {} {} per {}",
            amount,
            unit,
            format_duration(*period)
        ),
        ConstraintKind::ActiveTimeWindow { start, end } => format!(
            "Only between {} and {}",
            format_time(*start),
            format_time(*end)
        ),
        ConstraintKind::Custom { .. } => "Custom rule".to_string(),
    }
}

fn format_time(time: NaiveTime) -> String {
    if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ConstraintError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| ConstraintError::invalid(field, format!("invalid time '{}': {}", value, e)))
}

fn minutes_to_duration(field: &str, minutes: i64) -> Result<Duration, ConstraintError> {
    if minutes <= 0 {
        return Err(ConstraintError::invalid(
            field,
            format!("must be a positive number of minutes, got {}", minutes),
        ));
    }
    Duration::try_minutes(minutes)
        .ok_or_else(|| ConstraintError::invalid(field, format!("{} minutes is out of range", minutes)))
}

/// Flat, persisted form of a [`DosageConstraint`].
///
/// Durations are whole minutes and times are `HH:MM` (or `HH:MM:SS`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DosageConstraintRecord {
    MinTimeBetweenDoses {
        minutes: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    MaxCountPerPeriod {
        count: i64,
        period_minutes: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    MaxCumulativeAmountPerPeriod {
        amount: f64,
        unit: String,
        period_minutes: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    ActiveTimeWindow {
        start: String,
        end: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Custom {
        #[serde(default)]
        parameters: CustomParameters,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl TryFrom<DosageConstraintRecord> for DosageConstraint {
    type Error = ConstraintError;

    fn try_from(record: DosageConstraintRecord) -> Result<Self, Self::Error> {
        let (constraint, description) = match record {
            DosageConstraintRecord::MinTimeBetweenDoses {
                minutes,
                description,
            } => (
                Self::min_time_between_doses(minutes_to_duration("minutes", minutes)?)?,
                description,
            ),
            DosageConstraintRecord::MaxCountPerPeriod {
                count,
                period_minutes,
                description,
            } => {
                let count = u32::try_from(count).map_err(|_| {
                    ConstraintError::invalid("count", format!("must be a positive integer, got {}", count))
                })?;
                (
                    Self::max_count_per_period(
                        count,
                        minutes_to_duration("period_minutes", period_minutes)?,
                    )?,
                    description,
                )
            }
            DosageConstraintRecord::MaxCumulativeAmountPerPeriod {
                amount,
                unit,
                period_minutes,
                description,
            } => (
                Self::max_cumulative_amount_per_period(
                    amount,
                    unit,
                    minutes_to_duration("period_minutes", period_minutes)?,
                )?,
                description,
            ),
            DosageConstraintRecord::ActiveTimeWindow {
                start,
                end,
                description,
            } => (
                Self::active_time_window(parse_time("start", &start)?, parse_time("end", &end)?)?,
                description,
            ),
            DosageConstraintRecord::Custom {
                parameters,
                description,
            } => (Self::custom(parameters), description),
        };

        Ok(match description {
            Some(text) => constraint.with_description(text),
            None => constraint,
        })
    }
}

impl From<DosageConstraint> for DosageConstraintRecord {
    fn from(constraint: DosageConstraint) -> Self {
        let description = Some(constraint.description);
        match constraint.kind {
            ConstraintKind::MinTimeBetweenDoses { interval } => {
                DosageConstraintRecord::MinTimeBetweenDoses {
                    minutes: interval.num_minutes(),
                    description,
                }
            }
            ConstraintKind::MaxCountPerPeriod { count, period } => {
                DosageConstraintRecord::MaxCountPerPeriod {
                    count: i64::from(count),
                    period_minutes: period.num_minutes(),
                    description,
                }
            }
            ConstraintKind::MaxCumulativeAmountPerPeriod {
                amount,
                unit,
                period,
            } => DosageConstraintRecord::MaxCumulativeAmountPerPeriod {
                amount,
                unit,
                period_minutes: period.num_minutes(),
                description,
            },
            ConstraintKind::ActiveTimeWindow { start, end } => {
                DosageConstraintRecord::ActiveTimeWindow {
                    start: format_time(start),
                    end: format_time(end),
                    description,
                }
            }
            ConstraintKind::Custom { parameters } => DosageConstraintRecord::Custom {
                parameters,
                description,
            },
        }
    }
}

/// A tracked medication and the rules that govern it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<DosageConstraint>,
}

/// One logged dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl DoseEvent {
    /// A dose with no recorded amount.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            amount: None,
            unit: None,
        }
    }

    pub fn with_amount(timestamp: DateTime<Utc>, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            timestamp,
            amount: Some(amount),
            unit: Some(unit.into()),
        }
    }
}
