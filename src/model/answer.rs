use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::common::{OptionId, QuestionId, SelectionType, SubmissionId};

/// A proposed answer, as submitted. Consumed by the validator, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum AnswerRequest {
    /// Free text for an open question.
    Open {
        question_id: QuestionId,
        text_value: String,
    },
    /// Selected options for a closed question.
    Closed {
        question_id: QuestionId,
        selected_option_ids: BTreeSet<OptionId>,
        /// The selection type the submitter believed the question had.
        /// The question's own selection type is what gets enforced.
        #[serde(default)]
        selection_type: Option<SelectionType>,
    },
}

impl AnswerRequest {
    pub fn open(question_id: QuestionId, text_value: impl Into<String>) -> Self {
        Self::Open {
            question_id,
            text_value: text_value.into(),
        }
    }

    pub fn closed(question_id: QuestionId, options: impl IntoIterator<Item = OptionId>) -> Self {
        Self::Closed {
            question_id,
            selected_option_ids: options.into_iter().collect(),
            selection_type: None,
        }
    }

    pub fn question_id(&self) -> QuestionId {
        match self {
            Self::Open { question_id, .. } | Self::Closed { question_id, .. } => *question_id,
        }
    }

    /// Does this answer carry no content? Blank text and empty selections
    /// never count as answering a question.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Open { text_value, .. } => text_value.trim().is_empty(),
            Self::Closed {
                selected_option_ids,
                ..
            } => selected_option_ids.is_empty(),
        }
    }
}

/// A stored answer to one question of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnswer {
    /// The owning submission. Kept in step with the submission's own ID by
    /// [`SubmittedSurvey::resync_answers`](super::submission::SubmittedSurvey::resync_answers).
    pub submission_id: SubmissionId,
    /// The answered question.
    pub question_id: QuestionId,
    /// Text or selected options.
    #[serde(flatten)]
    pub value: AnswerValue,
}

/// The content of a stored answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum AnswerValue {
    Open { text_value: String },
    /// Option IDs in catalog display order, resolved against the question's
    /// catalog whenever they are read.
    Closed { selected_option_ids: Vec<OptionId> },
}

impl UserAnswer {
    /// The answer text, if this is a non-blank open answer.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            AnswerValue::Open { text_value } if !text_value.trim().is_empty() => Some(text_value.as_str()),
            _ => None,
        }
    }

    /// The selected option IDs; empty for open answers.
    pub fn selected_option_ids(&self) -> &[OptionId] {
        match &self.value {
            AnswerValue::Open { .. } => &[],
            AnswerValue::Closed {
                selected_option_ids,
            } => selected_option_ids,
        }
    }
}
