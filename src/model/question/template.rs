use serde::{Deserialize, Serialize};

use crate::model::common::{QuestionId, TemplateId};

use super::question_core::{Question, QuestionKind};

/// A reusable question that belongs to no survey.
///
/// Templates are never referenced by surveys: attaching one copies it into a
/// fresh [`Question`] owned by the survey, so later edits to the template do
/// not reach surveys it was already copied into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTemplate {
    /// Template unique ID.
    pub id: TemplateId,
    /// Question text.
    pub text: String,
    /// Default required-ness of copies.
    pub required: bool,
    /// Open or closed, with the option catalog to copy.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl QuestionTemplate {
    /// Copy this template into a survey question with the given ID.
    pub fn instantiate(&self, id: QuestionId) -> Question {
        Question {
            id,
            text: self.text.clone(),
            required: self.required,
            display_order: 0,
            kind: self.kind.clone(),
        }
    }
}

impl From<&Question> for QuestionTemplate {
    /// Save a survey question as a template. The template ID mirrors the question ID
    /// until the caller assigns a catalog-wide one.
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            text: question.text.clone(),
            required: question.required,
            kind: question.kind.clone(),
        }
    }
}
