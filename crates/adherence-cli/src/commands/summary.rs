use adherence_core::{EngineConfig, RegenerationMode, SummaryRegenerationPolicy, SummaryRegenerationState};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Subcommand)]
pub enum SummaryAction {
    /// Decide how the next regeneration should run
    Check {
        /// Current generation number
        #[arg(long)]
        generation: u32,
        /// Generation of the last full rebuild
        #[arg(long)]
        last_full: u32,
        /// Override the configured full regeneration interval
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Print the state after a regeneration
    Advance {
        #[arg(long)]
        generation: u32,
        #[arg(long)]
        last_full: u32,
        /// Mode the regeneration ran in
        #[arg(long, value_enum)]
        mode: ModeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Incremental,
    Full,
}

impl From<ModeArg> for RegenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Incremental => RegenerationMode::Incremental,
            ModeArg::Full => RegenerationMode::FullRebuild,
        }
    }
}

#[derive(Serialize)]
struct CheckOutput {
    needs_full_regeneration: bool,
    mode: RegenerationMode,
    gap: u32,
    interval: u32,
}

pub fn run(action: SummaryAction, config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SummaryAction::Check {
            generation,
            last_full,
            interval,
        } => {
            let state = SummaryRegenerationState::new(generation, last_full)?;
            let policy = match interval {
                Some(n) => SummaryRegenerationPolicy::with_interval(n)?,
                None => config.regeneration_policy()?,
            };
            let mode = policy.next_mode(&state);
            super::print_json(&CheckOutput {
                needs_full_regeneration: mode == RegenerationMode::FullRebuild,
                mode,
                gap: state.gap(),
                interval: policy.interval(),
            })?;
        }
        SummaryAction::Advance {
            generation,
            last_full,
            mode,
        } => {
            let state = SummaryRegenerationState::new(generation, last_full)?;
            super::print_json(&state.advance(mode.into()))?;
        }
    }
    Ok(())
}
