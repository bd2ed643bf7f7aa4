//! Dosage constraint validation for repeating logged actions.
//!
//! Constraints describe frequency, timing and cumulative-amount limits for a
//! medication. The validator checks a proposed dose against a snapshot of the
//! dose log and reports the first constraint that refuses it.

mod constraint;
mod validator;

pub use constraint::{
    ConstraintKind, CustomParameters, DosageConstraint, DosageConstraintRecord, DoseEvent,
    Medication,
};

pub use validator::{DosageCheckResult, DosageConstraintValidator, DoseWindowSummary};
