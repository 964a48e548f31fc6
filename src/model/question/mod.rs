pub use question_core::{Question, QuestionKind, QuestionOption};
pub use template::QuestionTemplate;

mod question_core;
mod template;
