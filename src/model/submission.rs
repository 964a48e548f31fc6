use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    answer::UserAnswer,
    common::{QuestionId, SubmissionId, SurveyId},
};

/// One complete, immutable set of answers recorded against a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedSurvey {
    /// Submission unique ID.
    pub id: SubmissionId,
    /// The survey the answers were validated against.
    pub survey_id: SurveyId,
    /// The access code used to reach the survey, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    /// When the submission was recorded.
    pub submitted_at: DateTime<Utc>,
    /// One answer per answered question.
    #[serde(default)]
    pub answers: Vec<UserAnswer>,
}

impl SubmittedSurvey {
    /// The answer to the given question, if present.
    pub fn answer(&self, question_id: QuestionId) -> Option<&UserAnswer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    /// Point every answer back at this submission.
    pub fn resync_answers(&mut self) {
        for answer in self.answers.iter_mut() {
            answer.submission_id = self.id;
        }
    }

    /// Do all answers agree that they belong to this submission?
    pub fn is_consistent(&self) -> bool {
        self.answers.iter().all(|a| a.submission_id == self.id)
    }
}
