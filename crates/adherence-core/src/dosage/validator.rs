//! Decides whether a proposed dose is currently permitted.
//!
//! Constraints are evaluated in the order they are listed and evaluation
//! stops at the first violation, which is the one reported. A violation is a
//! normal result (`permitted: false`), never an error.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::constraint::{ConstraintKind, CustomParameters, DosageConstraint, DoseEvent, Medication};
use crate::time_window::{format_duration, local_time, next_window_open, utc_offset, window_contains};

/// Slack allowed when comparing summed floating-point amounts to a cap.
const AMOUNT_TOLERANCE: f64 = 1e-9;

/// Outcome of checking a proposed dose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DosageCheckResult {
    pub permitted: bool,
    pub violated_constraint: Option<DosageConstraint>,
    /// Earliest instant the violated constraint would allow a dose, when derivable
    pub next_permitted_time: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl DosageCheckResult {
    pub fn permitted() -> Self {
        Self {
            permitted: true,
            violated_constraint: None,
            next_permitted_time: None,
            reason: None,
        }
    }

    fn violation(
        constraint: &DosageConstraint,
        next_permitted_time: Option<DateTime<Utc>>,
        reason: String,
    ) -> Self {
        Self {
            permitted: false,
            violated_constraint: Some(constraint.clone()),
            next_permitted_time,
            reason: Some(reason),
        }
    }

    /// Time left until `next_permitted_time`, zero if it has already passed.
    pub fn wait_duration(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.next_permitted_time
            .map(|next| (next - now).max(Duration::zero()))
    }
}

/// Doses inside a trailing window `[end - period, end)`.
///
/// A dose exactly one period old still counts; it ages out only once the
/// window has moved past it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseWindowSummary {
    pub count: usize,
    /// Sum of recorded amounts; doses without an amount contribute nothing
    pub total_amount: f64,
    pub oldest: Option<DateTime<Utc>>,
}

/// Evaluates dose proposals against a medication's constraints.
#[derive(Debug, Clone, Copy)]
pub struct DosageConstraintValidator {
    /// Local clock used for active time windows
    offset: FixedOffset,
}

impl Default for DosageConstraintValidator {
    fn default() -> Self {
        Self {
            offset: utc_offset(),
        }
    }
}

impl DosageConstraintValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Check a proposed dose with no advisory matching for custom constraints.
    pub fn check_dose(
        &self,
        constraints: &[DosageConstraint],
        log: &[DoseEvent],
        proposed_time: DateTime<Utc>,
        proposed_amount: Option<f64>,
    ) -> DosageCheckResult {
        self.check_dose_with(constraints, log, proposed_time, proposed_amount, |_| false)
    }

    /// Check a proposed dose against every constraint of `medication`.
    pub fn check_medication(
        &self,
        medication: &Medication,
        log: &[DoseEvent],
        proposed_time: DateTime<Utc>,
        proposed_amount: Option<f64>,
    ) -> DosageCheckResult {
        tracing::debug!("Checking dose of '{}' at {}", medication.id, proposed_time);
        self.check_dose(&medication.constraints, log, proposed_time, proposed_amount)
    }

    /// Check a proposed dose.
    ///
    /// `advisory` is consulted for every custom constraint; when it returns
    /// true the constraint's description is surfaced in `reason`. Custom
    /// constraints never block.
    pub fn check_dose_with<F>(
        &self,
        constraints: &[DosageConstraint],
        log: &[DoseEvent],
        proposed_time: DateTime<Utc>,
        proposed_amount: Option<f64>,
        advisory: F,
    ) -> DosageCheckResult
    where
        F: Fn(&CustomParameters) -> bool,
    {
        let prior: Vec<&DoseEvent> = log
            .iter()
            .filter(|e| e.timestamp <= proposed_time)
            .collect();
        let mut advisories: Vec<&str> = Vec::new();

        for constraint in constraints {
            let outcome = match constraint.kind() {
                ConstraintKind::MinTimeBetweenDoses { interval } => {
                    check_min_interval(constraint, &prior, proposed_time, *interval)
                }
                ConstraintKind::MaxCountPerPeriod { count, period } => {
                    check_max_count(constraint, &prior, proposed_time, *count, *period)
                }
                ConstraintKind::MaxCumulativeAmountPerPeriod {
                    amount,
                    unit,
                    period,
                } => check_cumulative_amount(
                    constraint,
                    &prior,
                    proposed_time,
                    proposed_amount,
                    *amount,
                    unit.as_str(),
                    *period,
                ),
                ConstraintKind::ActiveTimeWindow { start, end } => {
                    let time = local_time(proposed_time, self.offset);
                    if window_contains(*start, *end, time) {
                        None
                    } else {
                        let next = next_window_open(proposed_time, self.offset, *start);
                        Some(DosageCheckResult::violation(
                            constraint,
                            Some(next),
                            format!(
                                "{} is outside the allowed window ({})",
                                time.format("%H:%M"),
                                constraint.description()
                            ),
                        ))
                    }
                }
                ConstraintKind::Custom { parameters } => {
                    if advisory(parameters) {
                        advisories.push(constraint.description());
                    }
                    None
                }
            };

            if let Some(result) = outcome {
                tracing::debug!(
                    "Dose at {} refused by '{}'",
                    proposed_time,
                    constraint.description()
                );
                return result;
            }
        }

        let mut result = DosageCheckResult::permitted();
        if !advisories.is_empty() {
            result.reason = Some(advisories.join("; "));
        }
        result
    }

    /// Count and total amount of doses in `[end - period, end)`.
    pub fn window_summary(
        &self,
        log: &[DoseEvent],
        end: DateTime<Utc>,
        period: Duration,
    ) -> DoseWindowSummary {
        let refs: Vec<&DoseEvent> = log.iter().collect();
        summarize_window(&refs, end, period)
    }
}

fn check_min_interval(
    constraint: &DosageConstraint,
    prior: &[&DoseEvent],
    proposed_time: DateTime<Utc>,
    interval: Duration,
) -> Option<DosageCheckResult> {
    let latest = prior.iter().map(|e| e.timestamp).max()?;
    let elapsed = proposed_time - latest;
    if elapsed >= interval {
        return None;
    }

    Some(DosageCheckResult::violation(
        constraint,
        Some(latest + interval),
        format!(
            "Only {} since the last dose; {} required",
            format_duration(elapsed),
            format_duration(interval)
        ),
    ))
}

fn check_max_count(
    constraint: &DosageConstraint,
    prior: &[&DoseEvent],
    proposed_time: DateTime<Utc>,
    count: u32,
    period: Duration,
) -> Option<DosageCheckResult> {
    let summary = summarize_window(prior, proposed_time, period);
    if summary.count < count as usize {
        return None;
    }

    Some(DosageCheckResult::violation(
        constraint,
        summary.oldest.map(|oldest| oldest + period),
        format!(
            "{} dose(s) already taken in the last {}; limit is {}",
            summary.count,
            format_duration(period),
            count
        ),
    ))
}

fn check_cumulative_amount(
    constraint: &DosageConstraint,
    prior: &[&DoseEvent],
    proposed_time: DateTime<Utc>,
    proposed_amount: Option<f64>,
    cap: f64,
    unit: &str,
    period: Duration,
) -> Option<DosageCheckResult> {
    if prior
        .iter()
        .any(|e| e.unit.as_deref().is_some_and(|u| u != unit))
    {
        tracing::debug!(
            "Dose log contains units other than '{}'; amounts are summed as given",
            unit
        );
    }

    let proposed = proposed_amount.unwrap_or(0.0);
    if !proposed.is_finite() || proposed < 0.0 {
        return Some(DosageCheckResult::violation(
            constraint,
            None,
            format!("Proposed amount must be a non-negative number, got {}", proposed),
        ));
    }

    let summary = summarize_window(prior, proposed_time, period);
    if summary.total_amount + proposed - cap <= AMOUNT_TOLERANCE {
        return None;
    }

    let remaining = (cap - summary.total_amount).max(0.0);
    Some(DosageCheckResult::violation(
        constraint,
        None,
        format!(
            "{} {unit} already taken in the last {}; {} {unit} more would exceed the {} {unit} limit ({} {unit} remaining)",
            summary.total_amount,
            format_duration(period),
            proposed,
            cap,
            remaining,
        ),
    ))
}

fn summarize_window(events: &[&DoseEvent], end: DateTime<Utc>, period: Duration) -> DoseWindowSummary {
    let start = end - period;
    let mut summary = DoseWindowSummary {
        count: 0,
        total_amount: 0.0,
        oldest: None,
    };

    for event in events
        .iter()
        .filter(|e| e.timestamp >= start && e.timestamp < end)
    {
        summary.count += 1;
        summary.total_amount += event.amount.unwrap_or(0.0);
        summary.oldest = Some(match summary.oldest {
            Some(oldest) => oldest.min(event.timestamp),
            None => event.timestamp,
        });
    }

    summary
}
