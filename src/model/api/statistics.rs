use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::{OptionId, QuestionId, SelectionType, SubmissionId, SurveyId};

/// Derived, read-only summary of every submission to a survey at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStatisticsReport {
    pub survey_id: SurveyId,
    pub title: String,
    /// The aggregation time all windows are measured from.
    pub generated_at: DateTime<Utc>,
    pub summary: SubmissionSummary,
    /// Per-question statistics, in display order.
    pub questions: Vec<QuestionStatistics>,
}

/// Survey-level submission rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub total_submissions: u64,
    pub submissions_last_24_hours: u64,
    pub submissions_last_7_days: u64,
    /// Total submissions divided by whole days since creation, at least one.
    pub average_per_day: f64,
}

/// Statistics for a single question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStatistics {
    pub question_id: QuestionId,
    pub text: String,
    pub display_order: u32,
    pub required: bool,
    /// Submissions that gave a non-blank answer to this question.
    pub total_responses: u64,
    #[serde(flatten)]
    pub detail: QuestionDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum QuestionDetail {
    /// Every non-blank text answer.
    Open { responses: Vec<OpenResponse> },
    /// Vote counts for every option in the catalog, zero-vote options included.
    Closed {
        selection_type: SelectionType,
        total_votes: u64,
        options: Vec<OptionStatistics>,
    },
}

/// One text answer to an open question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenResponse {
    pub submission_id: SubmissionId,
    pub submitted_at: DateTime<Utc>,
    pub text_value: String,
}

/// Vote count for one option of a closed question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionStatistics {
    pub option_id: OptionId,
    pub text: String,
    pub display_order: u32,
    pub votes: u64,
    /// Share of all votes cast on the question, in percent.
    pub percentage: f64,
}

impl QuestionStatistics {
    /// Option statistics; empty for open questions.
    pub fn options(&self) -> &[OptionStatistics] {
        match &self.detail {
            QuestionDetail::Open { .. } => &[],
            QuestionDetail::Closed { options, .. } => options,
        }
    }

    /// Text responses; empty for closed questions.
    pub fn responses(&self) -> &[OpenResponse] {
        match &self.detail {
            QuestionDetail::Open { responses } => responses,
            QuestionDetail::Closed { .. } => &[],
        }
    }
}

impl SurveyStatisticsReport {
    pub fn question(&self, question_id: QuestionId) -> Option<&QuestionStatistics> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }
}
