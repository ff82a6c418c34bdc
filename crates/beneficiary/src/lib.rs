//! Scholarship application lifecycle: draft editing, submission, withdrawal, and the
//! completeness rules that gate submission.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
