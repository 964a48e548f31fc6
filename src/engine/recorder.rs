use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::InvalidOrExpiredAccessCode;
use crate::model::{
    access_code::AccessCodeSlot,
    answer::{AnswerValue, UserAnswer},
    common::SubmissionId,
    submission::SubmittedSurvey,
};

use super::validator::{ValidatedAnswer, ValidatedAnswers};

/// Errors from recording a submission.
#[derive(Debug, Error)]
pub enum RecordError<E: std::error::Error + 'static> {
    /// The access code became invalid (expired, deactivated, or used up)
    /// between the access gate and recording, or belongs to another survey.
    #[error(transparent)]
    AccessCode(#[from] InvalidOrExpiredAccessCode),
    /// The caller's persistence step failed; nothing was counted.
    #[error("Failed to persist submission: {0}")]
    Persist(#[source] E),
}

/// Turns validated answers into submission records.
///
/// Performs no business validation: callers must run
/// [`validate`](super::validator::validate) first.
#[derive(Debug)]
pub struct SubmissionRecorder {
    next_id: AtomicU64,
}

impl SubmissionRecorder {
    /// A recorder allocating submission IDs from 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A recorder allocating submission IDs from `first`, e.g. to continue
    /// after the highest ID already persisted.
    pub fn starting_at(first: SubmissionId) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    /// Record a submission, counting a use of the access code if one was given.
    pub fn record(
        &self,
        access_code: Option<&AccessCodeSlot>,
        answers: ValidatedAnswers<'_>,
        now: DateTime<Utc>,
    ) -> Result<SubmittedSurvey, InvalidOrExpiredAccessCode> {
        self.record_with(access_code, answers, now, |_| Ok::<_, Infallible>(()))
            .map_err(|err| match err {
                RecordError::AccessCode(err) => err,
                RecordError::Persist(never) => match never {},
            })
    }

    /// Record a submission and hand it to `persist` before counting the
    /// access code use.
    ///
    /// With an access code, the validity re-check, `persist`, and the usage
    /// increment all happen inside the code's single-writer section: either
    /// the submission is persisted and counted, or neither happens.
    pub fn record_with<E>(
        &self,
        access_code: Option<&AccessCodeSlot>,
        answers: ValidatedAnswers<'_>,
        now: DateTime<Utc>,
        persist: impl FnOnce(&SubmittedSurvey) -> Result<(), E>,
    ) -> Result<SubmittedSurvey, RecordError<E>>
    where
        E: std::error::Error + 'static,
    {
        let survey_id = answers.survey().id;
        let Some(slot) = access_code else {
            let submission = self.build(answers, None, now);
            persist(&submission).map_err(RecordError::Persist)?;
            info!(
                "Recorded submission {} for survey {survey_id}",
                submission.id
            );
            return Ok(submission);
        };

        let mut code = slot.lock();
        // An uncapped code whose counter cannot go higher is used up too.
        let next_count = match code.usage_count.checked_add(1) {
            Some(next) if slot.survey_id() == survey_id && code.is_valid(now) => next,
            _ => {
                warn!("Access code refused while recording a submission for survey {survey_id}");
                return Err(InvalidOrExpiredAccessCode.into());
            }
        };
        let submission = self.build(answers, Some(code.code.clone()), now);
        persist(&submission).map_err(RecordError::Persist)?;
        code.usage_count = next_count;
        info!(
            "Recorded submission {} for survey {survey_id} via access code ({} uses)",
            submission.id, code.usage_count
        );
        Ok(submission)
    }

    fn build(
        &self,
        answers: ValidatedAnswers<'_>,
        access_code: Option<String>,
        now: DateTime<Utc>,
    ) -> SubmittedSurvey {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let survey_id = answers.survey().id;
        let answers = answers
            .into_iter()
            .map(|answer| {
                let question_id = answer.question().id;
                let value = match answer {
                    ValidatedAnswer::Open { text_value, .. } => AnswerValue::Open { text_value },
                    ValidatedAnswer::Closed { options, .. } => AnswerValue::Closed {
                        selected_option_ids: options.iter().map(|o| o.id).collect(),
                    },
                };
                UserAnswer {
                    submission_id: id,
                    question_id,
                    value,
                }
            })
            .collect();

        let mut submission = SubmittedSurvey {
            id,
            survey_id,
            access_code,
            submitted_at: now,
            answers,
        };
        submission.resync_answers();
        debug!(
            "Built submission {id} with {} answers",
            submission.answers.len()
        );
        submission
    }
}

impl Default for SubmissionRecorder {
    fn default() -> Self {
        Self::new()
    }
}
