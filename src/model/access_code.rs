use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::SurveyId;

/// A shareable token gating submission to a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCode {
    /// The code itself, unique across all surveys.
    pub code: String,
    /// The survey this code grants access to.
    pub survey_id: SurveyId,
    /// Deactivated codes grant nothing.
    pub is_active: bool,
    /// The code is refused from this time onwards.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// How many submissions have been recorded with this code.
    #[serde(default)]
    pub usage_count: u32,
    /// Usage cap, if any.
    #[serde(default)]
    pub max_uses: Option<u32>,
}

impl AccessCode {
    /// Create an active, unlimited, non-expiring code.
    pub fn new(code: impl Into<String>, survey_id: SurveyId) -> Self {
        Self {
            code: code.into(),
            survey_id,
            is_active: true,
            expires_at: None,
            usage_count: 0,
            max_uses: None,
        }
    }

    /// Valid iff active, unexpired, and under its usage cap.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.expires_at.map_or(true, |expires_at| expires_at > now)
            && self.max_uses.map_or(true, |max| self.usage_count < max)
    }

    /// Uses left before the cap is reached; `None` if uncapped.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_uses
            .map(|max| max.saturating_sub(self.usage_count))
    }
}

/// An access code shared between concurrent submission paths.
///
/// Holding the lock is the single-writer section for this code: the
/// validity check and the usage increment happen under one guard, so two
/// submissions can never both pass `usage_count < max_uses` and then both
/// increment.
#[derive(Debug)]
pub struct AccessCodeSlot {
    /// Fixed for the slot's lifetime, so it can be read without the lock.
    survey_id: SurveyId,
    code: Mutex<AccessCode>,
}

impl AccessCodeSlot {
    pub fn new(code: AccessCode) -> Self {
        Self {
            survey_id: code.survey_id,
            code: Mutex::new(code),
        }
    }

    /// The survey this code grants access to.
    pub fn survey_id(&self) -> SurveyId {
        self.survey_id
    }

    /// A copy of the code's current state.
    pub fn snapshot(&self) -> AccessCode {
        self.lock().clone()
    }

    /// Enter the single-writer section. A panic in another holder leaves the
    /// counter untouched, so a poisoned lock is still safe to use.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccessCode> {
        self.code.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<AccessCode> for AccessCodeSlot {
    fn from(code: AccessCode) -> Self {
        Self::new(code)
    }
}
