//! The submission and statistics engine.
//!
//! The four core operations are free-standing: [`validate`], [`record`](SubmissionRecorder::record),
//! [`aggregate`], and [`check_access_code`]. [`SurveyEngine`] strings them
//! together over a [`SurveyStore`].

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::SubmitError;
use crate::logging::OperationId;
use crate::model::{
    answer::AnswerRequest, api::statistics::SurveyStatisticsReport, common::SurveyId,
    submission::SubmittedSurvey,
};
use crate::store::SurveyStore;

mod access_gate;
mod recorder;
mod statistics;
mod validator;

pub use access_gate::{check_access_code, GrantedAccess};
pub use recorder::{RecordError, SubmissionRecorder};
pub use statistics::{aggregate, Aggregator};
pub use validator::{validate, ValidatedAnswer, ValidatedAnswers};

/// Runs submissions and statistics requests against a store.
#[derive(Debug)]
pub struct SurveyEngine<S> {
    store: S,
    recorder: SubmissionRecorder,
    aggregator: Aggregator,
}

impl<S: SurveyStore> SurveyEngine<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            recorder: SubmissionRecorder::new(),
            aggregator: Aggregator::from_config(config),
        }
    }

    /// Use a recorder that continues from existing submission IDs.
    pub fn with_recorder(mut self, recorder: SubmissionRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and record an anonymous submission to a survey.
    pub fn submit(
        &self,
        survey_id: SurveyId,
        answers: Vec<AnswerRequest>,
        now: DateTime<Utc>,
    ) -> Result<SubmittedSurvey, SubmitError> {
        let id = OperationId::next();
        info!("->submit{id} survey {survey_id}");
        let result = self
            .store
            .survey(survey_id)
            .ok_or(SubmitError::SurveyNotFound(survey_id))
            .and_then(|survey| {
                let validated = validate(&survey, answers, now)?;
                self.persist(None, validated, now)
            });
        log_outcome(id, &result);
        result
    }

    /// Resolve an access code, then validate and record a submission to the
    /// survey it grants access to, counting one use of the code.
    pub fn submit_with_code(
        &self,
        code: &str,
        answers: Vec<AnswerRequest>,
        now: DateTime<Utc>,
    ) -> Result<SubmittedSurvey, SubmitError> {
        let id = OperationId::next();
        info!("->submit{id} with access code");
        let result = check_access_code(&self.store, code, now)
            .map_err(SubmitError::from)
            .and_then(|granted| {
                let validated = validate(&granted.survey, answers, now)?;
                self.persist(Some(&granted), validated, now)
            });
        log_outcome(id, &result);
        result
    }

    /// Statistics for a survey over everything submitted so far.
    pub fn statistics(
        &self,
        survey_id: SurveyId,
        now: DateTime<Utc>,
    ) -> Option<SurveyStatisticsReport> {
        let survey = self.store.survey(survey_id)?;
        let submissions = self.store.submissions(survey_id);
        debug!(
            "Aggregating {} submissions for survey {survey_id}",
            submissions.len()
        );
        Some(self.aggregator.aggregate(&survey, &submissions, now))
    }

    fn persist(
        &self,
        granted: Option<&GrantedAccess>,
        validated: ValidatedAnswers<'_>,
        now: DateTime<Utc>,
    ) -> Result<SubmittedSurvey, SubmitError> {
        let slot = granted.map(|g| g.access_code.as_ref());
        self.recorder
            .record_with(slot, validated, now, |submission| {
                self.store.append_submission(submission.clone())
            })
            .map_err(|err| match err {
                RecordError::AccessCode(err) => err.into(),
                RecordError::Persist(err) => err,
            })
    }
}

fn log_outcome(id: OperationId, result: &Result<SubmittedSurvey, SubmitError>) {
    match result {
        Ok(submission) => info!("<-submit{id} accepted as submission {}", submission.id),
        Err(err) => warn!("<-submit{id} refused: {err}"),
    }
}
