use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AdminError, ClosedReason};
use crate::model::{
    common::{renumber, OptionId, QuestionId, SurveyId},
    question::{Question, QuestionOption, QuestionTemplate},
};

/// A survey and its owned, ordered questions.
///
/// Question display orders always run 1..=N in list order; every structural
/// mutation below renumbers the siblings it touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SurveyRecord")]
pub struct Survey {
    /// Survey unique ID.
    pub id: SurveyId,
    /// Survey title.
    pub title: String,
    /// Optional longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deactivated surveys refuse all submissions.
    pub is_active: bool,
    /// Submissions are refused from this time onwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation time, the basis of the per-day submission average.
    pub created_at: DateTime<Utc>,
    /// Questions in display order.
    questions: Vec<Question>,
}

impl Survey {
    /// Create an active survey with no questions and no expiry.
    pub fn new(id: SurveyId, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            is_active: true,
            expires_at: None,
            created_at,
            questions: Vec::new(),
        }
    }

    /// Is the survey currently accepting submissions? If not, why not?
    pub fn check_accepting(&self, now: DateTime<Utc>) -> Result<(), ClosedReason> {
        if !self.is_active {
            return Err(ClosedReason::Inactive);
        }
        match self.expires_at {
            Some(expires_at) if expires_at <= now => Err(ClosedReason::Expired),
            _ => Ok(()),
        }
    }

    pub fn accepts_submissions(&self, now: DateTime<Utc>) -> bool {
        self.check_accepting(now).is_ok()
    }

    /// Questions in display order.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// The smallest question ID greater than every existing one.
    pub fn next_question_id(&self) -> QuestionId {
        self.questions.iter().map(|q| q.id).max().unwrap_or(0) + 1
    }

    /// Append a question at the end of the survey.
    pub fn add_question(&mut self, question: Question) -> Result<&Question, AdminError> {
        if self.question(question.id).is_some() {
            return Err(AdminError::DuplicateQuestion(question.id));
        }
        check_unique_options(&question)?;
        let mut question = question;
        if let Some(options) = question.options_mut() {
            renumber(options, |o, order| o.display_order = order);
        }
        self.questions.push(question);
        self.renumber_questions();
        Ok(&self.questions[self.questions.len() - 1])
    }

    /// Copy a template into this survey as a new question with the next free ID.
    pub fn attach_template(&mut self, template: &QuestionTemplate) -> Result<&Question, AdminError> {
        let question = template.instantiate(self.next_question_id());
        self.add_question(question)
    }

    /// Remove a question, closing the gap it leaves in the display order.
    pub fn remove_question(&mut self, id: QuestionId) -> Result<Question, AdminError> {
        let index = self.index_of(id)?;
        let removed = self.questions.remove(index);
        self.renumber_questions();
        Ok(removed)
    }

    /// Move a question to the given 1-based position, shifting its siblings.
    /// Positions past the end move the question to the end.
    pub fn move_question(&mut self, id: QuestionId, position: u32) -> Result<(), AdminError> {
        let index = self.index_of(id)?;
        let question = self.questions.remove(index);
        let target = usize::try_from(position.max(1) - 1)
            .unwrap_or(usize::MAX)
            .min(self.questions.len());
        self.questions.insert(target, question);
        self.renumber_questions();
        Ok(())
    }

    /// Append an option to a closed question's catalog.
    pub fn add_option(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
        text: impl Into<String>,
    ) -> Result<&QuestionOption, AdminError> {
        let options = self.options_mut(question_id)?;
        if options.iter().any(|o| o.id == option_id) {
            return Err(AdminError::DuplicateOption {
                question_id,
                option_id,
            });
        }
        options.push(QuestionOption {
            id: option_id,
            text: text.into(),
            display_order: 0,
        });
        renumber(options, |o, order| o.display_order = order);
        Ok(&options[options.len() - 1])
    }

    /// Remove an option from a closed question's catalog, renumbering the rest.
    pub fn remove_option(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<QuestionOption, AdminError> {
        let options = self.options_mut(question_id)?;
        let index = options
            .iter()
            .position(|o| o.id == option_id)
            .ok_or(AdminError::OptionNotFound {
                question_id,
                option_id,
            })?;
        let removed = options.remove(index);
        renumber(options, |o, order| o.display_order = order);
        Ok(removed)
    }

    /// Refuse structural deletion while any submission depends on this survey.
    pub fn ensure_deletable(&self, submissions: usize) -> Result<(), AdminError> {
        if submissions > 0 {
            return Err(AdminError::SurveyHasExistingSubmissions {
                survey_id: self.id,
                submissions,
            });
        }
        Ok(())
    }

    fn index_of(&self, id: QuestionId) -> Result<usize, AdminError> {
        self.questions
            .iter()
            .position(|q| q.id == id)
            .ok_or(AdminError::QuestionNotFound(id))
    }

    fn options_mut(&mut self, id: QuestionId) -> Result<&mut Vec<QuestionOption>, AdminError> {
        let index = self.index_of(id)?;
        self.questions[index]
            .options_mut()
            .ok_or(AdminError::NotClosedQuestion(id))
    }

    fn renumber_questions(&mut self) {
        renumber(&mut self.questions, |q, order| q.display_order = order);
    }
}

/// Option IDs key vote counts, so a catalog must not repeat one.
fn check_unique_options(question: &Question) -> Result<(), AdminError> {
    let mut seen = HashSet::new();
    match question.options().iter().find(|o| !seen.insert(o.id)) {
        Some(duplicate) => Err(AdminError::DuplicateOption {
            question_id: question.id,
            option_id: duplicate.id,
        }),
        None => Ok(()),
    }
}

/// Wire shape of a survey. Converting it into a [`Survey`] restores the
/// display order invariant, whatever orders the input carried, and refuses
/// repeated question or option IDs.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurveyRecord {
    id: SurveyId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    is_active: bool,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    questions: Vec<Question>,
}

impl TryFrom<SurveyRecord> for Survey {
    type Error = AdminError;

    fn try_from(record: SurveyRecord) -> Result<Self, Self::Error> {
        let mut questions = record.questions;
        let mut seen = HashSet::new();
        for question in questions.iter() {
            if !seen.insert(question.id) {
                return Err(AdminError::DuplicateQuestion(question.id));
            }
            check_unique_options(question)?;
        }

        questions.sort_by_key(|q| q.display_order);
        for question in questions.iter_mut() {
            if let Some(options) = question.options_mut() {
                options.sort_by_key(|o| o.display_order);
                renumber(options, |o, order| o.display_order = order);
            }
        }
        renumber(&mut questions, |q, order| q.display_order = order);
        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            is_active: record.is_active,
            expires_at: record.expires_at,
            created_at: record.created_at,
            questions,
        })
    }
}
