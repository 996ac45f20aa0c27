//! Article validation and corpus reporting.
//!
//! Validation never fails: every check returns a list of human-readable
//! messages, and an article with at least one message counts as failed in
//! the [`CorpusReport`](papercorpus_shared::CorpusReport).

mod report;
mod validator;

pub use report::{ReportAggregator, ReportBuilder};
pub use validator::Validator;
