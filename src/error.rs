use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use crate::model::common::{OptionId, QuestionId, SurveyId};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that are critical to setting up the engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] figment::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

/// Why a survey is not currently accepting submissions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosedReason {
    /// The survey has been deactivated.
    Inactive,
    /// The survey's expiry time has passed.
    Expired,
}

impl Display for ClosedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Why a proposed set of answers was rejected.
///
/// All of these are terminal client-input errors: resubmitting the same
/// answers will be rejected the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum RejectionReason {
    #[error("Survey is not accepting submissions: {reason}")]
    SurveyNotAcceptingSubmissions { reason: ClosedReason },
    #[error("Missing answers for required questions {question_ids:?}")]
    MissingRequiredAnswers { question_ids: Vec<QuestionId> },
    #[error("More than one answer for questions {question_ids:?}")]
    DuplicateAnswers { question_ids: Vec<QuestionId> },
    #[error("Answer type does not match question {question_id}")]
    AnswerTypeMismatch { question_id: QuestionId },
    #[error("Option {option_id} does not belong to question {question_id}")]
    UnknownOption {
        question_id: QuestionId,
        option_id: OptionId,
    },
    #[error("Too many options selected for single-selection question {question_id}")]
    TooManySelections { question_id: QuestionId },
}

/// The access code does not exist, is inactive, has expired, or is used up.
/// Deliberately opaque, so as not to reveal which codes exist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Invalid or expired access code")]
pub struct InvalidOrExpiredAccessCode;

/// Errors from the full submission path: access gate, validation, recording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    AccessCode(#[from] InvalidOrExpiredAccessCode),
    #[error(transparent)]
    Rejected(#[from] RejectionReason),
    #[error("Survey {0} not found")]
    SurveyNotFound(SurveyId),
}

/// Errors from administrative changes to survey structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    #[error("Survey {survey_id} has {submissions} submissions and cannot be deleted")]
    SurveyHasExistingSubmissions {
        survey_id: SurveyId,
        submissions: usize,
    },
    #[error("Survey {0} not found")]
    SurveyNotFound(SurveyId),
    #[error("Question {0} not found")]
    QuestionNotFound(QuestionId),
    #[error("Question {0} already exists")]
    DuplicateQuestion(QuestionId),
    #[error("Question {0} is not a closed question")]
    NotClosedQuestion(QuestionId),
    #[error("Option {option_id} not found for question {question_id}")]
    OptionNotFound {
        question_id: QuestionId,
        option_id: OptionId,
    },
    #[error("Option {option_id} already exists for question {question_id}")]
    DuplicateOption {
        question_id: QuestionId,
        option_id: OptionId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_wire_shape() {
        let reason = RejectionReason::UnknownOption {
            question_id: 2,
            option_id: 9,
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "UnknownOption");
        assert_eq!(json["questionId"], 2);
        assert_eq!(json["optionId"], 9);

        let closed = RejectionReason::SurveyNotAcceptingSubmissions {
            reason: ClosedReason::Expired,
        };
        assert_eq!(serde_json::to_value(&closed).unwrap()["reason"], "EXPIRED");
        assert_eq!(
            closed.to_string(),
            "Survey is not accepting submissions: expired"
        );
    }

    #[test]
    fn access_code_error_is_opaque() {
        let err: SubmitError = InvalidOrExpiredAccessCode.into();
        assert_eq!(err.to_string(), "Invalid or expired access code");
    }
}
