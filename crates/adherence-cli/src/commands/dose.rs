use std::path::PathBuf;

use adherence_core::{DoseEvent, EngineConfig, Medication};
use chrono::Duration;
use clap::Subcommand;

use super::{instant_or_now, print_json, read_json};

#[derive(Subcommand)]
pub enum DoseAction {
    /// Check whether a dose is permitted now (or at --at)
    Check {
        /// JSON file describing the medication and its constraints
        #[arg(long)]
        medication: PathBuf,
        /// JSON file with the dose log
        #[arg(long)]
        log: PathBuf,
        /// Proposed dose time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
        /// Proposed amount, in the medication's unit
        #[arg(long)]
        amount: Option<f64>,
        /// Surface custom constraints whose parameters contain this key
        #[arg(long)]
        advisory: Vec<String>,
    },
    /// Count and total the doses in a trailing window
    Window {
        /// JSON file with the dose log
        #[arg(long)]
        log: PathBuf,
        /// Window length in minutes
        #[arg(long, default_value_t = 24 * 60)]
        period_minutes: i64,
        /// End of the window (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
}

pub fn run(action: DoseAction, config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let validator = config.dosage_validator()?;

    match action {
        DoseAction::Check {
            medication,
            log,
            at,
            amount,
            advisory,
        } => {
            let medication: Medication = read_json(&medication)?;
            let log: Vec<DoseEvent> = read_json(&log)?;
            let proposed_time = instant_or_now(at.as_deref())?;

            let result = validator.check_dose_with(
                &medication.constraints,
                &log,
                proposed_time,
                amount,
                |params| advisory.iter().any(|key| params.contains_key(key)),
            );
            if !result.permitted {
                tracing::info!(
                    "Dose of '{}' refused: {}",
                    medication.name,
                    result.reason.as_deref().unwrap_or("constraint violated")
                );
            }
            print_json(&result)?;
        }
        DoseAction::Window {
            log,
            period_minutes,
            at,
        } => {
            if period_minutes <= 0 {
                return Err(format!("period must be positive, got {period_minutes} minutes").into());
            }
            let log: Vec<DoseEvent> = read_json(&log)?;
            let end = instant_or_now(at.as_deref())?;
            let summary = validator.window_summary(&log, end, Duration::minutes(period_minutes));
            print_json(&summary)?;
        }
    }
    Ok(())
}
