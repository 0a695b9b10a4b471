//! `lendlens-doubts` — Dynamic doubts generator.
//!
//! Projects underwriting rule outcomes into structured follow-up questions
//! for the personal-discussion review step. Pure projection: no state, no
//! IO; persistence of answers belongs to the PD workflow outside this crate.

pub mod generate;
pub mod model;

pub use generate::generate;
pub use model::{AnswerType, Doubt, DoubtSeverity};
