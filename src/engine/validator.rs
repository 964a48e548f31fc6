use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::RejectionReason;
use crate::model::{
    answer::AnswerRequest,
    common::QuestionId,
    question::{Question, QuestionKind, QuestionOption},
    survey::Survey,
};

/// An answer that passed validation, resolved against the survey it was
/// validated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedAnswer<'s> {
    Open {
        question: &'s Question,
        text_value: String,
    },
    Closed {
        question: &'s Question,
        /// Selected options, in catalog display order.
        options: Vec<&'s QuestionOption>,
    },
}

impl<'s> ValidatedAnswer<'s> {
    pub fn question(&self) -> &'s Question {
        match self {
            Self::Open { question, .. } | Self::Closed { question, .. } => *question,
        }
    }
}

/// A type-correct set of answers, one per answered question, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAnswers<'s> {
    survey: &'s Survey,
    answers: Vec<ValidatedAnswer<'s>>,
}

impl<'s> ValidatedAnswers<'s> {
    /// The survey these answers were validated against.
    pub fn survey(&self) -> &'s Survey {
        self.survey
    }

    pub fn answers(&self) -> &[ValidatedAnswer<'s>] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl<'s> IntoIterator for ValidatedAnswers<'s> {
    type Item = ValidatedAnswer<'s>;
    type IntoIter = std::vec::IntoIter<ValidatedAnswer<'s>>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.into_iter()
    }
}

/// Check a proposed set of answers against a survey snapshot.
///
/// Checks run in a fixed order and stop at the first failing stage:
/// the survey must be accepting submissions; every required question needs
/// exactly one non-blank answer (all gaps are reported together); each
/// question may be answered at most once; answer kinds must match question
/// kinds; and closed answers may only select catalog options, at most one of
/// them for single-selection questions. Answers to questions the survey does
/// not have are dropped.
pub fn validate<'s>(
    survey: &'s Survey,
    proposed: impl IntoIterator<Item = AnswerRequest>,
    now: DateTime<Utc>,
) -> Result<ValidatedAnswers<'s>, RejectionReason> {
    survey
        .check_accepting(now)
        .map_err(|reason| RejectionReason::SurveyNotAcceptingSubmissions { reason })?;

    // Group proposed answers by question, dropping any the submitter could not have seen.
    let mut by_question: HashMap<QuestionId, Vec<AnswerRequest>> = HashMap::new();
    for answer in proposed {
        let question_id = answer.question_id();
        if survey.question(question_id).is_none() {
            debug!(
                "Ignoring answer to question {question_id}, which survey {} does not have",
                survey.id
            );
            continue;
        }
        by_question.entry(question_id).or_default().push(answer);
    }

    // Required coverage. Blank answers count as absent.
    let missing: Vec<_> = survey
        .questions()
        .iter()
        .filter(|q| q.required)
        .filter(|q| {
            by_question
                .get(&q.id)
                .map_or(true, |answers| answers.iter().all(AnswerRequest::is_blank))
        })
        .map(|q| q.id)
        .collect();
    if !missing.is_empty() {
        return Err(RejectionReason::MissingRequiredAnswers {
            question_ids: missing,
        });
    }

    let duplicated: Vec<_> = survey
        .questions()
        .iter()
        .filter(|q| by_question.get(&q.id).map_or(false, |answers| answers.len() > 1))
        .map(|q| q.id)
        .collect();
    if !duplicated.is_empty() {
        return Err(RejectionReason::DuplicateAnswers {
            question_ids: duplicated,
        });
    }

    // From here on each answered question has exactly one answer.
    let answered: Vec<(&'s Question, AnswerRequest)> = survey
        .questions()
        .iter()
        .filter_map(|q| {
            by_question
                .remove(&q.id)
                .and_then(|mut answers| answers.pop())
                .map(|answer| (q, answer))
        })
        .collect();

    // Kind matching.
    for (question, answer) in answered.iter() {
        let matches = matches!(
            (&question.kind, answer),
            (QuestionKind::Open, AnswerRequest::Open { .. })
                | (QuestionKind::Closed { .. }, AnswerRequest::Closed { .. })
        );
        if !matches {
            return Err(RejectionReason::AnswerTypeMismatch {
                question_id: question.id,
            });
        }
    }

    // Catalog membership and selection cardinality.
    for (question, answer) in answered.iter() {
        if let (
            QuestionKind::Closed { selection_type, .. },
            AnswerRequest::Closed {
                selected_option_ids,
                ..
            },
        ) = (&question.kind, answer)
        {
            if let Some(&option_id) = selected_option_ids
                .iter()
                .find(|&&id| question.option(id).is_none())
            {
                return Err(RejectionReason::UnknownOption {
                    question_id: question.id,
                    option_id,
                });
            }
            if !selection_type.allows(selected_option_ids.len()) {
                return Err(RejectionReason::TooManySelections {
                    question_id: question.id,
                });
            }
        }
    }

    let answers = answered
        .into_iter()
        .map(|(question, answer)| match answer {
            AnswerRequest::Open { text_value, .. } => ValidatedAnswer::Open {
                question,
                text_value,
            },
            AnswerRequest::Closed {
                selected_option_ids,
                ..
            } => ValidatedAnswer::Closed {
                question,
                options: question
                    .options()
                    .iter()
                    .filter(|o| selected_option_ids.contains(&o.id))
                    .collect(),
            },
        })
        .collect();

    Ok(ValidatedAnswers { survey, answers })
}
