use std::path::PathBuf;

use adherence_core::{CompletionEvent, EngineConfig};
use clap::Args;

use super::{instant_or_now, print_json, read_json};

#[derive(Args)]
pub struct StreakArgs {
    /// JSON file with an array of completion events
    #[arg(long)]
    events: PathBuf,
    /// Only consider events for this behavior
    #[arg(long, conflicts_with = "by_behavior")]
    behavior: Option<String>,
    /// Report one streak per behavior
    #[arg(long)]
    by_behavior: bool,
    /// Evaluation instant (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<String>,
}

pub fn run(args: StreakArgs, config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let calculator = config.streak_calculator()?;
    let events: Vec<CompletionEvent> = read_json(&args.events)?;
    let now = instant_or_now(args.now.as_deref())?;
    tracing::debug!("Loaded {} completion event(s)", events.len());

    if args.by_behavior {
        return print_json(&calculator.compute_streaks_by_behavior(&events, now));
    }

    let timestamps = events
        .iter()
        .filter(|e| args.behavior.as_deref().map_or(true, |id| e.behavior_id == id))
        .map(|e| e.timestamp);
    print_json(&calculator.compute_streak(timestamps, now))
}
