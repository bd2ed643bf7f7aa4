//! Drift-bounded regeneration policy for the rolling profile summary.
//!
//! The summary is normally rebuilt incrementally from the previous summary
//! plus new events. Each incremental pass compounds approximation error, so
//! every `interval` generations the summary is rebuilt from raw history.
//!
//! ## Modes
//!
//! - **Incremental**: next regeneration extends the existing summary
//! - **FullRebuild**: next regeneration discards it and starts from raw history
//!
//! The policy is a pure predicate over [`SummaryRegenerationState`]; the
//! caller performs the rebuild and stores the advanced state.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Generations between full rebuilds unless configured otherwise.
pub const DEFAULT_FULL_REGENERATION_INTERVAL: u32 = 4;

/// How the next summary regeneration should be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationMode {
    Incremental,
    FullRebuild,
}

/// Regeneration counters persisted alongside the summary.
///
/// Both counters start at 1 and `last_full_regen_number` never exceeds
/// `generation_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRegenerationState")]
pub struct SummaryRegenerationState {
    generation_number: u32,
    last_full_regen_number: u32,
}

#[derive(Deserialize)]
struct RawRegenerationState {
    generation_number: u32,
    last_full_regen_number: u32,
}

impl TryFrom<RawRegenerationState> for SummaryRegenerationState {
    type Error = ValidationError;

    fn try_from(raw: RawRegenerationState) -> Result<Self, Self::Error> {
        Self::new(raw.generation_number, raw.last_full_regen_number)
    }
}

impl Default for SummaryRegenerationState {
    fn default() -> Self {
        Self::initial()
    }
}

impl SummaryRegenerationState {
    /// State of a freshly built first summary.
    pub fn initial() -> Self {
        Self {
            generation_number: 1,
            last_full_regen_number: 1,
        }
    }

    pub fn new(generation_number: u32, last_full_regen_number: u32) -> Result<Self, ValidationError> {
        if last_full_regen_number == 0 || last_full_regen_number > generation_number {
            return Err(ValidationError::InvalidRegenerationState {
                generation: generation_number,
                last_full: last_full_regen_number,
            });
        }
        Ok(Self {
            generation_number,
            last_full_regen_number,
        })
    }

    pub fn generation_number(&self) -> u32 {
        self.generation_number
    }

    pub fn last_full_regen_number(&self) -> u32 {
        self.last_full_regen_number
    }

    /// Generations since the last full rebuild.
    pub fn gap(&self) -> u32 {
        self.generation_number - self.last_full_regen_number
    }

    /// State after a regeneration performed in `mode`.
    pub fn advance(self, mode: RegenerationMode) -> Self {
        let generation_number = self.generation_number.saturating_add(1);
        let last_full_regen_number = match mode {
            RegenerationMode::Incremental => self.last_full_regen_number,
            RegenerationMode::FullRebuild => generation_number,
        };
        Self {
            generation_number,
            last_full_regen_number,
        }
    }
}

/// True when `interval` or more generations have passed since the last full rebuild.
pub fn needs_full_regeneration(state: &SummaryRegenerationState, interval: u32) -> bool {
    state.gap() >= interval
}

/// Decides between incremental and full summary regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryRegenerationPolicy {
    interval: u32,
}

impl Default for SummaryRegenerationPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FULL_REGENERATION_INTERVAL,
        }
    }
}

impl SummaryRegenerationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(interval: u32) -> Result<Self, ValidationError> {
        if interval == 0 {
            return Err(ValidationError::InvalidInterval(interval));
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn needs_full_regeneration(&self, state: &SummaryRegenerationState) -> bool {
        needs_full_regeneration(state, self.interval)
    }

    pub fn next_mode(&self, state: &SummaryRegenerationState) -> RegenerationMode {
        if self.needs_full_regeneration(state) {
            tracing::info!(
                "Summary generation {} is {} past the last full rebuild; rebuilding from history",
                state.generation_number,
                state.gap()
            );
            RegenerationMode::FullRebuild
        } else {
            RegenerationMode::Incremental
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_with_default_interval() {
        let policy = SummaryRegenerationPolicy::new();
        assert_eq!(policy.interval(), 4);

        let gap_three = SummaryRegenerationState::new(10, 7).unwrap();
        assert!(!policy.needs_full_regeneration(&gap_three));

        let gap_four = SummaryRegenerationState::new(11, 7).unwrap();
        assert!(policy.needs_full_regeneration(&gap_four));
        assert_eq!(policy.next_mode(&gap_four), RegenerationMode::FullRebuild);
    }

    #[test]
    fn test_full_rebuild_resets_gap() {
        let state = SummaryRegenerationState::new(42, 30).unwrap();
        let rebuilt = state.advance(RegenerationMode::FullRebuild);

        assert_eq!(rebuilt.gap(), 0);
        assert_eq!(rebuilt.generation_number(), 43);
        assert_eq!(rebuilt.last_full_regen_number(), 43);
    }

    #[test]
    fn test_incremental_grows_gap() {
        let state = SummaryRegenerationState::initial().advance(RegenerationMode::Incremental);
        assert_eq!(state.generation_number(), 2);
        assert_eq!(state.last_full_regen_number(), 1);
        assert_eq!(state.gap(), 1);
    }

    #[test]
    fn test_cycle_repeats() {
        let policy = SummaryRegenerationPolicy::new();
        let mut state = SummaryRegenerationState::initial();
        let mut modes = Vec::new();

        for _ in 0..10 {
            let mode = policy.next_mode(&state);
            modes.push(mode);
            state = state.advance(mode);
        }

        use RegenerationMode::{FullRebuild as F, Incremental as I};
        assert_eq!(modes, vec![I, I, I, I, F, I, I, I, I, F]);
    }

    #[test]
    fn test_free_function_matches_policy() {
        let state = SummaryRegenerationState::new(5, 3).unwrap();
        assert!(needs_full_regeneration(&state, 2));
        assert!(!needs_full_regeneration(&state, 3));
    }

    #[test]
    fn test_invalid_state_rejected() {
        assert!(SummaryRegenerationState::new(3, 4).is_err());
        assert!(SummaryRegenerationState::new(3, 0).is_err());
        assert!(SummaryRegenerationState::new(1, 1).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_eq!(
            SummaryRegenerationPolicy::with_interval(0),
            Err(ValidationError::InvalidInterval(0))
        );
    }

    #[test]
    fn test_state_deserialization_validates() {
        let ok: SummaryRegenerationState =
            serde_json::from_str(r#"{ "generation_number": 6, "last_full_regen_number": 2 }"#).unwrap();
        assert_eq!(ok.gap(), 4);

        let bad = serde_json::from_str::<SummaryRegenerationState>(
            r#"{ "generation_number": 2, "last_full_regen_number": 6 }"#,
        );
        assert!(bad.is_err());
    }
}
