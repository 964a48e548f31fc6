use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::config::{Config, MAX_PERCENTAGE_PRECISION};
use crate::model::{
    api::statistics::{
        OpenResponse, OptionStatistics, QuestionDetail, QuestionStatistics, SubmissionSummary,
        SurveyStatisticsReport,
    },
    common::OptionId,
    question::{Question, QuestionKind},
    submission::SubmittedSurvey,
    survey::Survey,
};

/// Reduces a snapshot of submissions into a statistics report.
///
/// Aggregation is a stateless fold over its inputs, so one aggregator may be
/// shared by any number of threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregator {
    recent_window: Duration,
    weekly_window: Duration,
    precision: u32,
}

impl Aggregator {
    /// An aggregator rounding percentages to `precision` decimal places,
    /// capped at [`MAX_PERCENTAGE_PRECISION`].
    pub fn new(recent_window: Duration, weekly_window: Duration, precision: u32) -> Self {
        if precision > MAX_PERCENTAGE_PRECISION {
            warn!("Percentage precision {precision} capped at {MAX_PERCENTAGE_PRECISION}");
        }
        Self {
            recent_window,
            weekly_window,
            precision: precision.min(MAX_PERCENTAGE_PRECISION),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.recent_window(),
            config.weekly_window(),
            config.percentage_precision(),
        )
    }

    /// Summarise every submission to `survey`, measuring time windows from `now`.
    /// Submissions to other surveys are skipped.
    pub fn aggregate(
        &self,
        survey: &Survey,
        submissions: &[SubmittedSurvey],
        now: DateTime<Utc>,
    ) -> SurveyStatisticsReport {
        let relevant: Vec<_> = submissions
            .iter()
            .filter(|s| s.survey_id == survey.id)
            .collect();
        let skipped = submissions.len() - relevant.len();
        if skipped > 0 {
            warn!(
                "Skipped {skipped} submissions not belonging to survey {} during aggregation",
                survey.id
            );
        }

        let mut questions: Vec<_> = survey.questions().iter().collect();
        questions.sort_by_key(|q| q.display_order);
        let questions = questions
            .into_iter()
            .map(|question| self.question_statistics(question, &relevant))
            .collect();

        debug!(
            "Aggregated {} submissions for survey {}",
            relevant.len(),
            survey.id
        );
        SurveyStatisticsReport {
            survey_id: survey.id,
            title: survey.title.clone(),
            generated_at: now,
            summary: self.summary(survey, &relevant, now),
            questions,
        }
    }

    fn summary(
        &self,
        survey: &Survey,
        submissions: &[&SubmittedSurvey],
        now: DateTime<Utc>,
    ) -> SubmissionSummary {
        // Submissions dated after `now` fall in no window.
        let within = |window: Duration| {
            let cutoff = now - window;
            submissions
                .iter()
                .filter(|s| cutoff <= s.submitted_at && s.submitted_at <= now)
                .count() as u64
        };
        let total_submissions = submissions.len() as u64;
        // Whole days since creation, never less than one.
        let days = (now - survey.created_at).num_days().max(1);

        SubmissionSummary {
            total_submissions,
            submissions_last_24_hours: within(self.recent_window),
            submissions_last_7_days: within(self.weekly_window),
            average_per_day: total_submissions as f64 / days as f64,
        }
    }

    fn question_statistics(
        &self,
        question: &Question,
        submissions: &[&SubmittedSurvey],
    ) -> QuestionStatistics {
        let (total_responses, detail) = match &question.kind {
            QuestionKind::Open => {
                let responses: Vec<_> = submissions
                    .iter()
                    .flat_map(|&s| {
                        s.answers
                            .iter()
                            .filter(move |a| a.question_id == question.id)
                            .filter_map(|a| a.text())
                            .map(move |text| OpenResponse {
                                submission_id: s.id,
                                submitted_at: s.submitted_at,
                                text_value: text.to_string(),
                            })
                    })
                    .collect();
                (responses.len() as u64, QuestionDetail::Open { responses })
            }
            QuestionKind::Closed {
                selection_type,
                options,
            } => {
                let mut votes: HashMap<OptionId, u64> =
                    options.iter().map(|o| (o.id, 0)).collect();
                let mut respondents = 0;
                for submission in submissions {
                    let mut responded = false;
                    let selections = submission
                        .answers
                        .iter()
                        .filter(|a| a.question_id == question.id)
                        .flat_map(|a| a.selected_option_ids());
                    for option_id in selections {
                        // Options removed from the catalog since submission are not counted.
                        if let Some(count) = votes.get_mut(option_id) {
                            *count += 1;
                            responded = true;
                        }
                    }
                    if responded {
                        respondents += 1;
                    }
                }

                let total_votes: u64 = votes.values().sum();
                let mut options: Vec<_> = options
                    .iter()
                    .map(|o| {
                        let count = votes.get(&o.id).copied().unwrap_or(0);
                        OptionStatistics {
                            option_id: o.id,
                            text: o.text.clone(),
                            display_order: o.display_order,
                            votes: count,
                            percentage: self.percentage(count, total_votes),
                        }
                    })
                    .collect();
                options.sort_by_key(|o| o.display_order);
                (
                    respondents,
                    QuestionDetail::Closed {
                        selection_type: *selection_type,
                        total_votes,
                        options,
                    },
                )
            }
        };

        QuestionStatistics {
            question_id: question.id,
            text: question.text.clone(),
            display_order: question.display_order,
            required: question.required,
            total_responses,
            detail,
        }
    }

    fn percentage(&self, votes: u64, total_votes: u64) -> f64 {
        if total_votes == 0 {
            return 0.0;
        }
        let factor = 10f64.powi(self.precision as i32);
        (votes as f64 / total_votes as f64 * 100.0 * factor).round() / factor
    }
}

impl Default for Aggregator {
    /// 24 hour and 7 day windows, percentages to 2 decimal places.
    fn default() -> Self {
        Self::new(Duration::hours(24), Duration::days(7), 2)
    }
}

/// Summarise `submissions` to `survey` with the default windows and precision.
pub fn aggregate(
    survey: &Survey,
    submissions: &[SubmittedSurvey],
    now: DateTime<Utc>,
) -> SurveyStatisticsReport {
    Aggregator::default().aggregate(survey, submissions, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    use crate::model::{
        answer::{AnswerValue, UserAnswer},
        common::{QuestionId, SubmissionId},
    };

    fn submission(
        id: SubmissionId,
        submitted_at: DateTime<Utc>,
        answers: Vec<(QuestionId, AnswerValue)>,
    ) -> SubmittedSurvey {
        SubmittedSurvey {
            id,
            survey_id: 1,
            access_code: None,
            submitted_at,
            answers: answers
                .into_iter()
                .map(|(question_id, value)| UserAnswer {
                    submission_id: id,
                    question_id,
                    value,
                })
                .collect(),
        }
    }

    fn text(value: &str) -> AnswerValue {
        AnswerValue::Open {
            text_value: value.to_string(),
        }
    }

    fn selected(ids: &[OptionId]) -> AnswerValue {
        AnswerValue::Closed {
            selected_option_ids: ids.to_vec(),
        }
    }

    #[test]
    fn single_selection_percentages() {
        let survey = Survey::example();
        let now = Utc::now();
        let submissions: Vec<_> = (1..=10)
            .map(|id| {
                let mut answers = vec![(1, text("hello"))];
                match id {
                    1..=3 => answers.push((2, selected(&[1]))),
                    4..=5 => answers.push((2, selected(&[2]))),
                    _ => {}
                }
                submission(id, now, answers)
            })
            .collect();

        let report = aggregate(&survey, &submissions, now);
        let closed = report.question(2).unwrap();
        assert_eq!(closed.total_responses, 5);
        let percentages: Vec<_> = closed
            .options()
            .iter()
            .map(|o| (o.text.as_str(), o.votes, o.percentage))
            .collect();
        assert_eq!(percentages, vec![("A", 3, 60.0), ("B", 2, 40.0)]);
        match &closed.detail {
            QuestionDetail::Closed { total_votes, .. } => assert_eq!(*total_votes, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_votes_are_safe() {
        let survey = Survey::example();
        let report = aggregate(&survey, &[], Utc::now());
        let closed = report.question(2).unwrap();
        assert_eq!(closed.total_responses, 0);
        assert_eq!(closed.options().len(), 2);
        assert!(closed.options().iter().all(|o| o.percentage == 0.0 && o.votes == 0));
        assert_eq!(report.summary.total_submissions, 0);
        assert_eq!(report.summary.average_per_day, 0.0);
    }

    #[test]
    fn multiple_selection_counts_submission_once() {
        let mut survey = Survey::example();
        survey.add_question(Question::example_multiple(3)).unwrap();
        let now = Utc::now();
        let submissions = vec![
            submission(1, now, vec![(3, selected(&[1, 2, 3]))]),
            submission(2, now, vec![(3, selected(&[1]))]),
        ];

        let report = aggregate(&survey, &submissions, now);
        let closed = report.question(3).unwrap();
        assert_eq!(closed.total_responses, 2);
        let votes: Vec<_> = closed.options().iter().map(|o| (o.votes, o.percentage)).collect();
        assert_eq!(votes, vec![(2, 50.0), (1, 25.0), (1, 25.0)]);
    }

    #[test]
    fn open_answers_skip_blanks() {
        let survey = Survey::example();
        let now = Utc::now();
        let submissions = vec![
            submission(1, now, vec![(1, text("great"))]),
            submission(2, now, vec![(1, text("  "))]),
            submission(3, now, vec![(2, selected(&[1]))]),
            submission(4, now - Duration::hours(1), vec![(1, text("fine"))]),
        ];

        let report = aggregate(&survey, &submissions, now);
        let open = report.question(1).unwrap();
        assert_eq!(open.total_responses, 2);
        let responses: Vec<_> = open
            .responses()
            .iter()
            .map(|r| (r.submission_id, r.text_value.as_str()))
            .collect();
        assert_eq!(responses, vec![(1, "great"), (4, "fine")]);
        assert_eq!(open.responses()[1].submitted_at, now - Duration::hours(1));
    }

    #[test]
    fn removed_options_and_foreign_submissions_are_ignored() {
        let mut survey = Survey::example();
        survey.remove_option(2, 2).unwrap();
        let now = Utc::now();
        let mut foreign = submission(3, now, vec![(2, selected(&[1]))]);
        foreign.survey_id = 99;
        let submissions = vec![
            submission(1, now, vec![(2, selected(&[2]))]),
            submission(2, now, vec![(2, selected(&[1]))]),
            foreign,
        ];

        let report = aggregate(&survey, &submissions, now);
        assert_eq!(report.summary.total_submissions, 2);
        let closed = report.question(2).unwrap();
        assert_eq!(closed.total_responses, 1);
        assert_eq!(closed.options().len(), 1);
        assert_eq!(closed.options()[0].percentage, 100.0);
    }

    #[test]
    fn submission_rate_summary() {
        let now = Utc::now();
        let mut survey = Survey::example();
        survey.created_at = now - Duration::days(10) - Duration::hours(5);
        let submissions = vec![
            submission(1, now - Duration::hours(1), vec![]),
            submission(2, now - Duration::days(2), vec![]),
            submission(3, now - Duration::days(8), vec![]),
        ];

        let summary = aggregate(&survey, &submissions, now).summary;
        assert_eq!(summary.total_submissions, 3);
        assert_eq!(summary.submissions_last_24_hours, 1);
        assert_eq!(summary.submissions_last_7_days, 2);
        assert!((summary.average_per_day - 0.3).abs() < 1e-9);
    }

    #[test]
    fn later_submissions_fall_in_no_window() {
        let survey = Survey::example();
        let now = survey.created_at + Duration::days(3);
        let submissions = vec![
            submission(1, now, vec![]),
            submission(2, now + Duration::days(5), vec![]),
        ];

        let summary = aggregate(&survey, &submissions, now).summary;
        assert_eq!(summary.total_submissions, 2);
        assert_eq!(summary.submissions_last_24_hours, 1);
        assert_eq!(summary.submissions_last_7_days, 1);
    }

    #[test]
    fn creation_day_divides_by_one() {
        let now = Utc::now();
        let mut survey = Survey::example();
        survey.created_at = now - Duration::hours(3);
        let submissions = vec![submission(1, now, vec![]), submission(2, now, vec![])];
        assert_eq!(
            aggregate(&survey, &submissions, now).summary.average_per_day,
            2.0
        );
    }

    #[test]
    fn questions_reported_in_display_order() {
        let mut survey = Survey::example();
        survey.move_question(2, 1).unwrap();
        let report = aggregate(&survey, &[], Utc::now());
        let ids: Vec<_> = report.questions.iter().map(|q| q.question_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn configurable_precision() {
        let mut survey = Survey::example();
        survey.add_question(Question::example_multiple(3)).unwrap();
        let now = Utc::now();
        let submissions = vec![submission(1, now, vec![(3, selected(&[1, 2, 3]))])];
        let aggregator = Aggregator::new(Duration::hours(24), Duration::days(7), 1);
        let report = aggregator.aggregate(&survey, &submissions, now);
        assert_eq!(report.question(3).unwrap().options()[0].percentage, 33.3);
    }

    #[test]
    fn precision_is_capped() {
        let survey = Survey::example();
        let now = Utc::now();
        let submissions = vec![submission(1, now, vec![(2, selected(&[1]))])];
        let aggregator = Aggregator::new(Duration::hours(24), Duration::days(7), 400);
        let report = aggregator.aggregate(&survey, &submissions, now);
        let percentages: Vec<_> = report
            .question(2)
            .unwrap()
            .options()
            .iter()
            .map(|o| o.percentage)
            .collect();
        assert_eq!(percentages, vec![100.0, 0.0]);
    }

    #[test]
    fn duplicate_catalog_entries_cannot_skew_percentages() {
        let json = serde_json::json!({
            "id": 1,
            "title": "Repeats",
            "isActive": true,
            "createdAt": "2026-01-01T00:00:00Z",
            "questions": [{
                "id": 2, "text": "pick", "required": false, "displayOrder": 1,
                "type": "CLOSED", "selectionType": "SINGLE",
                "options": [
                    {"id": 1, "text": "A", "displayOrder": 1},
                    {"id": 1, "text": "B", "displayOrder": 2}
                ]
            }]
        });
        assert!(serde_json::from_value::<Survey>(json).is_err());

        let mut survey = Survey::example();
        let repeated = Question::closed(
            3,
            "Pick again",
            false,
            crate::model::common::SelectionType::Single,
            vec![(1, "A".to_string()), (1, "B".to_string())],
        );
        assert!(survey.add_question(repeated).is_err());
        let now = Utc::now();
        let report = aggregate(&survey, &[submission(1, now, vec![(2, selected(&[1]))])], now);
        let sum: f64 = report.question(2).unwrap().options().iter().map(|o| o.percentage).sum();
        assert_eq!(sum, 100.0);
    }

    #[test]
    fn concurrent_aggregation() {
        let survey = Arc::new(Survey::example());
        let now = Utc::now();
        let submissions: Arc<Vec<_>> = Arc::new(
            (1..=50)
                .map(|id| submission(id, now, vec![(2, selected(&[1 + (id % 2) as OptionId]))]))
                .collect(),
        );
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let survey = survey.clone();
                let submissions = submissions.clone();
                thread::spawn(move || aggregate(&survey, &submissions, now))
            })
            .collect();
        let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(reports.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(reports[0].question(2).unwrap().total_responses, 50);
    }

    proptest! {
        #[test]
        fn percentages_sum_to_one_hundred(
            selections in proptest::collection::vec(
                proptest::collection::btree_set(1u32..=3, 0..=3),
                1..40,
            )
        ) {
            let mut survey = Survey::example();
            survey.add_question(Question::example_multiple(3)).unwrap();
            let now = Utc::now();
            let submissions: Vec<_> = selections
                .iter()
                .enumerate()
                .map(|(i, ids)| {
                    let ids: Vec<_> = ids.iter().copied().collect();
                    submission(i as SubmissionId + 1, now, vec![(3, selected(&ids))])
                })
                .collect();

            let report = aggregate(&survey, &submissions, now);
            let closed = report.question(3).unwrap();
            let total_votes: u64 = closed.options().iter().map(|o| o.votes).sum();
            let respondents = selections.iter().filter(|ids| !ids.is_empty()).count() as u64;
            prop_assert_eq!(closed.total_responses, respondents);
            if total_votes > 0 {
                let sum: f64 = closed.options().iter().map(|o| o.percentage).sum();
                let tolerance = 0.01 * closed.options().len() as f64;
                prop_assert!((sum - 100.0).abs() <= tolerance, "sum was {}", sum);
            } else {
                prop_assert!(closed.options().iter().all(|o| o.percentage == 0.0));
            }
        }
    }
}
