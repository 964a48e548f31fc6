pub use spec::{QuestionSpec, SurveySpec};
pub use survey_core::Survey;

mod spec;
mod survey_core;
