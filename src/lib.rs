#[macro_use]
extern crate log;

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

pub use config::Config;
pub use engine::{aggregate, check_access_code, validate, SubmissionRecorder, SurveyEngine};
pub use error::{Error, InvalidOrExpiredAccessCode, RejectionReason, Result, SubmitError};
pub use store::{InMemoryStore, SurveyStore};
