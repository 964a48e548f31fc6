use serde::{Deserialize, Serialize};

use crate::model::common::{renumber, OptionId, QuestionId, SelectionType};

/// A single question, owned by exactly one survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Question ID, unique within the owning survey.
    pub id: QuestionId,
    /// Question text.
    pub text: String,
    /// Must every submission answer this question?
    pub required: bool,
    /// Position within the survey, starting at 1.
    pub display_order: u32,
    /// Open or closed, with the closed question's option catalog.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// The closed set of question types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Answered with free text.
    Open,
    /// Answered by selecting from a fixed option catalog.
    #[serde(rename_all = "camelCase")]
    Closed {
        selection_type: SelectionType,
        options: Vec<QuestionOption>,
    },
}

/// A selectable option of a closed question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    /// Option ID, unique within the question's catalog.
    pub id: OptionId,
    /// Option text.
    pub text: String,
    /// Position within the catalog, starting at 1.
    pub display_order: u32,
}

impl Question {
    /// Create an open question. The display order is assigned when it joins a survey.
    pub fn open(id: QuestionId, text: impl Into<String>, required: bool) -> Self {
        Self {
            id,
            text: text.into(),
            required,
            display_order: 0,
            kind: QuestionKind::Open,
        }
    }

    /// Create a closed question whose options are ordered as given.
    pub fn closed(
        id: QuestionId,
        text: impl Into<String>,
        required: bool,
        selection_type: SelectionType,
        options: impl IntoIterator<Item = (OptionId, String)>,
    ) -> Self {
        let mut options: Vec<_> = options
            .into_iter()
            .map(|(id, text)| QuestionOption {
                id,
                text,
                display_order: 0,
            })
            .collect();
        renumber(&mut options, |o, order| o.display_order = order);
        Self {
            id,
            text: text.into(),
            required,
            display_order: 0,
            kind: QuestionKind::Closed {
                selection_type,
                options,
            },
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.kind, QuestionKind::Open)
    }

    /// The option catalog; empty for open questions.
    pub fn options(&self) -> &[QuestionOption] {
        match &self.kind {
            QuestionKind::Open => &[],
            QuestionKind::Closed { options, .. } => options,
        }
    }

    /// Look up an option of this question by ID.
    pub fn option(&self, id: OptionId) -> Option<&QuestionOption> {
        self.options().iter().find(|o| o.id == id)
    }

    /// The selection type, if this is a closed question.
    pub fn selection_type(&self) -> Option<SelectionType> {
        match self.kind {
            QuestionKind::Open => None,
            QuestionKind::Closed { selection_type, .. } => Some(selection_type),
        }
    }

    /// Mutable access to the option catalog, if this is a closed question.
    pub(crate) fn options_mut(&mut self) -> Option<&mut Vec<QuestionOption>> {
        match &mut self.kind {
            QuestionKind::Open => None,
            QuestionKind::Closed { options, .. } => Some(options),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Question {
        pub fn example_open(id: QuestionId) -> Self {
            Self::open(id, "What should we improve?", true)
        }

        pub fn example_single(id: QuestionId) -> Self {
            Self::closed(
                id,
                "Which day suits you best?",
                false,
                SelectionType::Single,
                vec![(1, "Monday".to_string()), (2, "Friday".to_string())],
            )
        }

        pub fn example_multiple(id: QuestionId) -> Self {
            Self::closed(
                id,
                "Which languages do you use?",
                false,
                SelectionType::Multiple,
                vec![
                    (1, "Rust".to_string()),
                    (2, "Go".to_string()),
                    (3, "Kotlin".to_string()),
                ],
            )
        }
    }
}
