//! API-compatible types.
//!
//! The types in this module are what the surrounding service layer
//! serialises for its clients, e.g.:
//!
//! - Field names are camelCase.
//! - Datetimes are serialised as RFC 3339 strings.

pub mod statistics;

pub use statistics::{
    OpenResponse, OptionStatistics, QuestionDetail, QuestionStatistics, SubmissionSummary,
    SurveyStatisticsReport,
};
