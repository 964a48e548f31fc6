use serde::{Deserialize, Serialize};

/// Our survey IDs are integers.
pub type SurveyId = u32;
/// Our question IDs are integers, unique within a survey.
pub type QuestionId = u32;
/// Our option IDs are integers, unique within a question's option catalog.
pub type OptionId = u32;
/// Our question template IDs are integers.
pub type TemplateId = u32;
/// Submission IDs are allocated sequentially by the recorder.
pub type SubmissionId = u64;

/// How many options a closed question allows to be selected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionType {
    /// At most one option.
    Single,
    /// Any number of options.
    Multiple,
}

impl SelectionType {
    /// Does a selection of `count` options respect this selection type?
    pub fn allows(self, count: usize) -> bool {
        match self {
            Self::Single => count <= 1,
            Self::Multiple => true,
        }
    }
}

/// Renumber a list of ordered items so their display orders run 1..=N in list order.
pub(crate) fn renumber<T>(items: &mut [T], set_order: impl Fn(&mut T, u32)) {
    for (i, item) in items.iter_mut().enumerate() {
        let order = 1 + u32::try_from(i).expect("usize to u32");
        set_order(item, order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_allows_at_most_one() {
        assert!(SelectionType::Single.allows(0));
        assert!(SelectionType::Single.allows(1));
        assert!(!SelectionType::Single.allows(2));
        assert!(SelectionType::Multiple.allows(7));
    }

    #[test]
    fn selection_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&SelectionType::Multiple).unwrap(),
            "\"MULTIPLE\""
        );
        assert_eq!(
            serde_json::from_str::<SelectionType>("\"SINGLE\"").unwrap(),
            SelectionType::Single
        );
    }
}
