use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AdminError;
use crate::model::{
    common::{OptionId, QuestionId, SelectionType, SurveyId},
    question::Question,
};

use super::survey_core::Survey;

/// A survey specification, as written by an operator before IDs exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySpec {
    /// Survey title.
    pub title: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Submissions are refused from this time onwards.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Question specifications, in display order.
    pub questions: Vec<QuestionSpec>,
}

impl SurveySpec {
    /// Convert this spec into an active survey. Questions are numbered 1..=N,
    /// as are the options of each closed question.
    pub fn into_survey(
        self,
        survey_id: SurveyId,
        created_at: DateTime<Utc>,
    ) -> Result<Survey, AdminError> {
        let mut survey = Survey::new(survey_id, self.title, created_at);
        survey.description = self.description;
        survey.expires_at = self.expires_at;
        for (i, spec) in self.questions.into_iter().enumerate() {
            let question_id = 1 + QuestionId::try_from(i).expect("usize to u32");
            survey.add_question(spec.into_question(question_id))?;
        }
        Ok(survey)
    }
}

/// A question specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    /// Question text.
    pub text: String,
    /// Must every submission answer this question?
    #[serde(default)]
    pub required: bool,
    /// Present for closed questions only.
    #[serde(default)]
    pub selection_type: Option<SelectionType>,
    /// Option texts for closed questions, in display order.
    #[serde(default)]
    pub options: Vec<String>,
}

impl QuestionSpec {
    /// Convert this spec into a question with the given unique ID.
    pub fn into_question(self, id: QuestionId) -> Question {
        match self.selection_type {
            None => Question::open(id, self.text, self.required),
            Some(selection_type) => Question::closed(
                id,
                self.text,
                self.required,
                selection_type,
                self.options.into_iter().enumerate().map(|(i, text)| {
                    let option_id = 1 + OptionId::try_from(i).expect("usize to u32");
                    (option_id, text)
                }),
            ),
        }
    }
}
