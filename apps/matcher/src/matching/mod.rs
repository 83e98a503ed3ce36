//! The two-stage matching engine.
//!
//! - `similarity`: cosine similarity and vector normalisation.
//! - `years`: years-of-experience claims from evidence text.
//! - `stage1`: one pooled resume vector for candidate retrieval.
//! - `requirements`: per-requirement best-evidence coverage.
//! - `preferences`: location / size / industry / role alignment.
//! - `coverage`, `explain`: summaries over a finished match.
//! - `service`: the orchestrated run with cooperative cancellation.

pub mod coverage;
pub mod explain;
pub mod preferences;
pub mod requirements;
pub mod service;
pub mod similarity;
pub mod stage1;
pub mod years;

pub use service::{CancellationFlag, MatcherService};
