//! A simple CLI tool for summarising a survey's submissions.
//! This uses the engine's own statistics aggregation, and reads the same
//! JSON shapes the engine's types serialise to.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Deserialize;

use survey_engine::{
    engine::Aggregator,
    model::{
        api::statistics::{QuestionDetail, QuestionStatistics, SurveyStatisticsReport},
        common::{SubmissionId, SurveyId},
        submission::SubmittedSurvey,
        survey::Survey,
    },
    Config,
};

const PROGRAM_NAME: &str = "survey-report";

const ABOUT_TEXT: &str = "Summarise the submissions to a survey.

EXIT CODES:
     0: Report produced.
   255: Ran successfully, but the dump is inconsistent.
 Other: Error.";

const DUMP_PATH: &str = "DUMP_PATH";

const DUMP_PATH_HELP: &str = "The path to a JSON dump of a survey and its submissions,\n\
of the form `{ \"survey\": ..., \"submissions\": [...] }`";

const JSON: &str = "json";

const NOW: &str = "now";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(DUMP_PATH)
                .help(DUMP_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(JSON)
                .long(JSON)
                .help("Print the report as JSON instead of text")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(NOW)
                .long(NOW)
                .value_name("RFC3339")
                .help("Measure time windows from this instant instead of the current time")
                .value_parser(parse_time)
                .action(ArgAction::Set),
        )
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// A survey and everything submitted to it.
#[derive(Debug, Deserialize)]
struct Dump {
    survey: Survey,
    #[serde(default)]
    submissions: Vec<SubmittedSurvey>,
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump, or to encode the report.
    Format(String),
    /// The configuration could not be loaded.
    Config(String),
    /// The dump does not hang together.
    Inconsistent(Inconsistency),
}

#[derive(Debug, Eq, PartialEq)]
enum Inconsistency {
    /// A submission belongs to a different survey.
    ForeignSubmission {
        submission_id: SubmissionId,
        survey_id: SurveyId,
    },
    /// Some of a submission's answers claim to belong to another submission.
    BackReference { submission_id: SubmissionId },
}

/// Check that every submission belongs to the survey and owns its answers.
fn check(dump: &Dump) -> Result<(), Inconsistency> {
    for submission in &dump.submissions {
        if submission.survey_id != dump.survey.id {
            return Err(Inconsistency::ForeignSubmission {
                submission_id: submission.id,
                survey_id: submission.survey_id,
            });
        }
        if !submission.is_consistent() {
            return Err(Inconsistency::BackReference {
                submission_id: submission.id,
            });
        }
    }
    Ok(())
}

/// Load a dump, check it, and aggregate it.
fn report(
    path: &str,
    aggregator: &Aggregator,
    now: DateTime<Utc>,
) -> Result<SurveyStatisticsReport, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let dump: Dump = serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    check(&dump).map_err(Error::Inconsistent)?;

    Ok(aggregator.aggregate(&dump.survey, &dump.submissions, now))
}

/// A human-readable rendering of a report.
struct FriendlyReport<'r> {
    report: &'r SurveyStatisticsReport,
    precision: usize,
}

impl Display for FriendlyReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let report = self.report;
        let summary = &report.summary;
        writeln!(f, "Survey {}: {}", report.survey_id, report.title)?;
        writeln!(
            f,
            "{} submission{} ({} in the last 24 hours, {} in the last 7 days, {:.2} per day)",
            summary.total_submissions,
            plural(summary.total_submissions),
            summary.submissions_last_24_hours,
            summary.submissions_last_7_days,
            summary.average_per_day
        )?;
        for question in &report.questions {
            writeln!(f)?;
            self.fmt_question(f, question)?;
        }
        Ok(())
    }
}

impl FriendlyReport<'_> {
    fn fmt_question(&self, f: &mut Formatter<'_>, question: &QuestionStatistics) -> std::fmt::Result {
        writeln!(
            f,
            "{}. {}{} - {} response{}",
            question.display_order,
            question.text,
            if question.required { " (required)" } else { "" },
            question.total_responses,
            plural(question.total_responses)
        )?;
        match &question.detail {
            QuestionDetail::Open { responses } => {
                for response in responses {
                    writeln!(f, "   \"{}\"", response.text_value)?;
                }
            }
            QuestionDetail::Closed { options, .. } => {
                for option in options {
                    writeln!(
                        f,
                        "   {}: {} vote{} ({:.*}%)",
                        option.text,
                        option.votes,
                        plural(option.votes),
                        self.precision,
                        option.percentage
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn plural(count: u64) -> &'static str {
    if count != 1 {
        "s"
    } else {
        ""
    }
}

/// Produce the report, print it, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(DUMP_PATH).unwrap(); // Required argument is guaranteed to be present.
    let now = args.get_one::<DateTime<Utc>>(NOW).copied().unwrap_or_else(Utc::now);

    let result = Config::load()
        .map_err(|e| Error::Config(e.to_string()))
        .and_then(|config| {
            let aggregator = Aggregator::from_config(&config);
            let report = report(path, &aggregator, now)?;
            if args.get_flag(JSON) {
                serde_json::to_string_pretty(&report).map_err(|e| Error::Format(e.to_string()))
            } else {
                let precision = config.percentage_precision() as usize;
                Ok(FriendlyReport {
                    report: &report,
                    precision,
                }
                .to_string())
            }
        });

    match result {
        Ok(output) => {
            println!("{}", output.trim_end());
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {}", msg);
            1
        }
        Err(Error::Config(msg)) => {
            println!("Invalid configuration: {}", msg);
            1
        }
        Err(Error::Inconsistent(inconsistency)) => {
            let msg = match inconsistency {
                Inconsistency::ForeignSubmission {
                    submission_id,
                    survey_id,
                } => format!(
                    "Submission {} belongs to survey {}.",
                    submission_id, survey_id
                ),
                Inconsistency::BackReference { submission_id } => format!(
                    "Submission {} has answers belonging to another submission.",
                    submission_id
                ),
            };
            println!("Inconsistent dump: {}", msg);
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
