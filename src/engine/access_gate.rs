use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::InvalidOrExpiredAccessCode;
use crate::model::{access_code::AccessCodeSlot, survey::Survey};
use crate::store::SurveyStore;

/// What a valid access code unlocks: the survey to submit to, and the slot
/// whose usage the eventual submission must be counted against.
#[derive(Debug, Clone)]
pub struct GrantedAccess {
    pub survey: Survey,
    pub access_code: Arc<AccessCodeSlot>,
}

/// Resolve an access code to the survey it grants access to.
///
/// Every failure is reported identically, whether the code is unknown,
/// inactive, expired, used up, or points at a survey that no longer exists.
/// The validity checked here is advisory: the recorder checks it again
/// inside the code's single-writer section before counting a use.
pub fn check_access_code(
    store: &impl SurveyStore,
    code: &str,
    now: DateTime<Utc>,
) -> Result<GrantedAccess, InvalidOrExpiredAccessCode> {
    let Some(slot) = store.access_code(code) else {
        debug!("Unknown access code presented");
        return Err(InvalidOrExpiredAccessCode);
    };

    let snapshot = slot.snapshot();
    if !snapshot.is_valid(now) {
        debug!(
            "Refused access code for survey {} (active: {}, uses: {})",
            snapshot.survey_id, snapshot.is_active, snapshot.usage_count
        );
        return Err(InvalidOrExpiredAccessCode);
    }

    let survey = store.survey(snapshot.survey_id).ok_or_else(|| {
        warn!(
            "Access code refers to missing survey {}",
            snapshot.survey_id
        );
        InvalidOrExpiredAccessCode
    })?;

    Ok(GrantedAccess {
        survey,
        access_code: slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::model::access_code::AccessCode;
    use crate::store::InMemoryStore;

    fn store_with(code: AccessCode) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_survey(Survey::example());
        store.insert_access_code(code);
        store
    }

    #[test]
    fn valid_code_grants_its_survey() {
        let store = store_with(AccessCode::example());
        let granted = check_access_code(&store, "OFFSITE-2026", Utc::now()).unwrap();
        assert_eq!(granted.survey.id, 1);
        assert_eq!(granted.access_code.snapshot().code, "OFFSITE-2026");
    }

    #[test]
    fn unknown_code() {
        let store = store_with(AccessCode::example());
        assert_eq!(
            check_access_code(&store, "offsite-2026", Utc::now()).unwrap_err(),
            InvalidOrExpiredAccessCode
        );
    }

    #[test]
    fn inactive_expired_and_used_up_codes() {
        let now = Utc::now();
        let inactive = AccessCode {
            is_active: false,
            ..AccessCode::example()
        };
        let expired = AccessCode {
            expires_at: Some(now - Duration::minutes(1)),
            ..AccessCode::example()
        };
        let used_up = AccessCode {
            usage_count: 3,
            ..AccessCode::capped_example(3)
        };

        for code in [inactive, expired, used_up] {
            let store = store_with(code);
            assert_eq!(
                check_access_code(&store, "OFFSITE-2026", now).unwrap_err(),
                InvalidOrExpiredAccessCode
            );
        }
    }

    #[test]
    fn code_for_missing_survey() {
        let store = InMemoryStore::new();
        store.insert_access_code(AccessCode::example());
        assert_eq!(
            check_access_code(&store, "OFFSITE-2026", Utc::now()).unwrap_err(),
            InvalidOrExpiredAccessCode
        );
    }
}
