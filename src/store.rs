//! The lookups and writes the engine needs from whatever holds surveys,
//! access codes, and submissions, plus an in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{AdminError, SubmitError};
use crate::model::{
    access_code::{AccessCode, AccessCodeSlot},
    common::SurveyId,
    submission::SubmittedSurvey,
    survey::Survey,
};

/// A source of survey snapshots and access codes, and a sink for submissions.
pub trait SurveyStore {
    /// A snapshot of the survey with the given ID.
    fn survey(&self, id: SurveyId) -> Option<Survey>;

    /// The shared slot for the given access code. Every caller asking for the
    /// same code must get the same slot, as it guards the code's usage count.
    fn access_code(&self, code: &str) -> Option<Arc<AccessCodeSlot>>;

    /// Persist a newly recorded submission.
    /// Fails if the survey no longer exists.
    fn append_submission(&self, submission: SubmittedSurvey) -> Result<(), SubmitError>;

    /// A snapshot of every submission to the given survey.
    fn submissions(&self, survey_id: SurveyId) -> Vec<SubmittedSurvey>;
}

/// Surveys, access codes, and submissions held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    surveys: RwLock<HashMap<SurveyId, Survey>>,
    access_codes: RwLock<HashMap<String, Arc<AccessCodeSlot>>>,
    submissions: RwLock<HashMap<SurveyId, Vec<SubmittedSurvey>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a survey, returning the previous version.
    pub fn insert_survey(&self, survey: Survey) -> Option<Survey> {
        write(&self.surveys).insert(survey.id, survey)
    }

    /// Insert or replace an access code, returning the previous slot.
    pub fn insert_access_code(&self, code: AccessCode) -> Option<Arc<AccessCodeSlot>> {
        write(&self.access_codes).insert(code.code.clone(), Arc::new(code.into()))
    }

    pub fn submission_count(&self, survey_id: SurveyId) -> usize {
        read(&self.submissions)
            .get(&survey_id)
            .map_or(0, Vec::len)
    }

    /// Delete a survey and its access codes. Refused while the survey has
    /// any submissions, since they are the basis of its statistics.
    pub fn delete_survey(&self, survey_id: SurveyId) -> Result<Survey, AdminError> {
        let survey = {
            // Lock order: submissions, then surveys, as in `append_submission`.
            let submissions = write(&self.submissions);
            let mut surveys = write(&self.surveys);
            let survey = surveys
                .get(&survey_id)
                .ok_or(AdminError::SurveyNotFound(survey_id))?;
            survey.ensure_deletable(submissions.get(&survey_id).map_or(0, Vec::len))?;
            surveys
                .remove(&survey_id)
                .ok_or(AdminError::SurveyNotFound(survey_id))?
        };

        // Slot locks are held across persistence, which takes the submissions
        // lock, so pruning must not touch them or hold the maps above.
        write(&self.access_codes).retain(|_, slot| slot.survey_id() != survey_id);
        info!("Deleted survey {survey_id}");
        Ok(survey)
    }
}

impl SurveyStore for InMemoryStore {
    fn survey(&self, id: SurveyId) -> Option<Survey> {
        read(&self.surveys).get(&id).cloned()
    }

    fn access_code(&self, code: &str) -> Option<Arc<AccessCodeSlot>> {
        read(&self.access_codes).get(code).cloned()
    }

    fn append_submission(&self, submission: SubmittedSurvey) -> Result<(), SubmitError> {
        let mut submissions = write(&self.submissions);
        if !read(&self.surveys).contains_key(&submission.survey_id) {
            return Err(SubmitError::SurveyNotFound(submission.survey_id));
        }
        submissions
            .entry(submission.survey_id)
            .or_default()
            .push(submission);
        Ok(())
    }

    fn submissions(&self, survey_id: SurveyId) -> Vec<SubmittedSurvey> {
        read(&self.submissions)
            .get(&survey_id)
            .cloned()
            .unwrap_or_default()
    }
}

// Writers never leave a map half-updated, so a poisoned lock is still usable.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration as StdDuration;

    use chrono::Utc;

    use crate::engine::{validate, SubmissionRecorder};
    use crate::model::answer::AnswerRequest;

    fn submission(id: u64, survey_id: SurveyId) -> SubmittedSurvey {
        SubmittedSurvey {
            id,
            survey_id,
            access_code: None,
            submitted_at: Utc::now(),
            answers: vec![],
        }
    }

    #[test]
    fn access_code_slots_are_shared() {
        let store = InMemoryStore::new();
        store.insert_access_code(AccessCode::example());
        let first = store.access_code("OFFSITE-2026").unwrap();
        let second = store.access_code("OFFSITE-2026").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(store.access_code("nope").is_none());
    }

    #[test]
    fn submissions_need_a_survey() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.append_submission(submission(1, 1)),
            Err(SubmitError::SurveyNotFound(1))
        );
        store.insert_survey(Survey::example());
        store.append_submission(submission(1, 1)).unwrap();
        assert_eq!(store.submission_count(1), 1);
        assert_eq!(store.submissions(1)[0].id, 1);
        assert!(store.submissions(2).is_empty());
    }

    #[test]
    fn surveys_with_submissions_cannot_be_deleted() {
        let store = InMemoryStore::new();
        store.insert_survey(Survey::example());
        store.insert_access_code(AccessCode::example());
        store.append_submission(submission(1, 1)).unwrap();

        assert_eq!(
            store.delete_survey(1),
            Err(AdminError::SurveyHasExistingSubmissions {
                survey_id: 1,
                submissions: 1
            })
        );
        assert!(store.survey(1).is_some());
    }

    #[test]
    fn deletion_during_access_coded_recording() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_survey(Survey::example());
        store.insert_survey(Survey::new(2, "Unused", Utc::now()));
        store.insert_access_code(AccessCode::example());
        let slot = store.access_code("OFFSITE-2026").unwrap();
        let persisting = Arc::new(Barrier::new(2));

        let recording = {
            let store = store.clone();
            let persisting = persisting.clone();
            thread::spawn(move || {
                let survey = Survey::example();
                let now = Utc::now();
                let answers = vec![AnswerRequest::open(1, "hello")];
                let validated = validate(&survey, answers, now).unwrap();
                SubmissionRecorder::new()
                    .record_with(Some(&slot), validated, now, |submission| {
                        // The slot is locked from here until the increment.
                        persisting.wait();
                        thread::sleep(StdDuration::from_millis(100));
                        store.append_submission(submission.clone())
                    })
                    .is_ok()
            })
        };

        persisting.wait();
        assert_eq!(store.delete_survey(2).unwrap().id, 2);
        assert!(recording.join().unwrap());
        assert_eq!(store.submission_count(1), 1);
        assert_eq!(store.access_code("OFFSITE-2026").unwrap().snapshot().usage_count, 1);
    }

    #[test]
    fn deleting_an_unused_survey() {
        let store = InMemoryStore::new();
        store.insert_survey(Survey::example());
        store.insert_access_code(AccessCode::example());

        assert_eq!(store.delete_survey(1).unwrap().id, 1);
        assert!(store.survey(1).is_none());
        assert!(store.access_code("OFFSITE-2026").is_none());
        assert_eq!(store.delete_survey(1), Err(AdminError::SurveyNotFound(1)));
    }
}
