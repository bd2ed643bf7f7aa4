//! # Adherence Core Library
//!
//! Temporal analytics for a personal wellness journal. The application layer
//! loads event collections from its own storage, hands them to the engine,
//! and renders the value objects it gets back. Nothing here performs I/O
//! except the optional [`EngineConfig`] file helpers.
//!
//! ## Key Components
//!
//! - [`StreakCalculator`]: current/longest streak over completion timestamps
//! - [`DosageConstraintValidator`]: whether a proposed dose is permitted
//! - [`SummaryRegenerationPolicy`]: incremental vs. full summary rebuilds
//! - [`EngineConfig`]: TOML configuration for offsets and intervals
//!
//! All calculators are stateless and `Send + Sync`; concurrent callers may
//! evaluate the same snapshot freely.

pub mod config;
pub mod dosage;
pub mod error;
pub mod streak;
pub mod summary;
pub mod time_window;

pub use config::EngineConfig;
pub use dosage::{
    ConstraintKind, CustomParameters, DosageCheckResult, DosageConstraint, DosageConstraintRecord,
    DosageConstraintValidator, DoseEvent, DoseWindowSummary, Medication,
};
pub use error::{ConfigError, ConstraintError, CoreError, Result, ValidationError};
pub use streak::{CompletionEvent, StreakCalculator, StreakResult};
pub use summary::{
    needs_full_regeneration, RegenerationMode, SummaryRegenerationPolicy, SummaryRegenerationState,
    DEFAULT_FULL_REGENERATION_INTERVAL,
};
