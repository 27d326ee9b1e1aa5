//! Static trivia inventory shared read-only by every conversation.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::state::session::CategoryBoard;

/// A single clue with its accepted phrasings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriviaEntry {
    /// Clue read out to the players.
    pub question: String,
    /// Accepted responses, checked in order.
    pub answers: Vec<String>,
    /// Category the clue belongs to.
    pub category: String,
    /// Points awarded for a correct response.
    pub value: u32,
}

/// Reasons a question bank cannot be built from a set of entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionBankError {
    /// The bank holds no entry at all.
    #[error("question bank is empty")]
    Empty,
    /// An entry has a blank clue text.
    #[error("entry `{category}` for {value} has an empty question")]
    EmptyQuestion {
        /// Category of the offending entry.
        category: String,
        /// Value of the offending entry.
        value: u32,
    },
    /// An entry cannot be answered.
    #[error("entry `{category}` for {value} has no accepted answer")]
    NoAnswers {
        /// Category of the offending entry.
        category: String,
        /// Value of the offending entry.
        value: u32,
    },
    /// An entry has a blank category name.
    #[error("entry `{question}` has an empty category")]
    EmptyCategory {
        /// Clue text of the offending entry.
        question: String,
    },
    /// Two entries share the same category and value.
    #[error("duplicate entry for category `{category}` and value {value}")]
    Duplicate {
        /// Category shared by both entries.
        category: String,
        /// Value shared by both entries.
        value: u32,
    },
}

/// Ordered collection of trivia entries, indexed by `(category, value)`.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    entries: Vec<TriviaEntry>,
    index: HashMap<(String, u32), usize>,
}

/// Normalise free-form spoken text (categories, answers, team names) for comparisons.
pub fn normalize_spoken(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl QuestionBank {
    /// Build a bank, rejecting entries that could never be asked or answered.
    pub fn new(entries: Vec<TriviaEntry>) -> Result<Self, QuestionBankError> {
        if entries.is_empty() {
            return Err(QuestionBankError::Empty);
        }

        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            let category = normalize_spoken(&entry.category);
            if category.is_empty() {
                return Err(QuestionBankError::EmptyCategory {
                    question: entry.question.clone(),
                });
            }
            if entry.question.trim().is_empty() {
                return Err(QuestionBankError::EmptyQuestion {
                    category,
                    value: entry.value,
                });
            }
            if entry.answers.iter().all(|answer| answer.trim().is_empty()) {
                return Err(QuestionBankError::NoAnswers {
                    category,
                    value: entry.value,
                });
            }
            if index.insert((category.clone(), entry.value), position).is_some() {
                return Err(QuestionBankError::Duplicate {
                    category,
                    value: entry.value,
                });
            }
        }

        Ok(Self { entries, index })
    }

    /// Find the entry for a category (any casing) and value.
    pub fn lookup(&self, category: &str, value: u32) -> Option<&TriviaEntry> {
        self.index
            .get(&(normalize_spoken(category), value))
            .map(|&position| &self.entries[position])
    }

    /// Every category with its full value ladder, in first-appearance order.
    pub fn categories(&self) -> IndexMap<String, Vec<u32>> {
        let mut categories: IndexMap<String, Vec<u32>> = IndexMap::new();
        for entry in &self.entries {
            categories
                .entry(normalize_spoken(&entry.category))
                .or_default()
                .push(entry.value);
        }
        for values in categories.values_mut() {
            values.sort_unstable();
        }
        categories
    }

    /// Fresh board holding every clue of the bank.
    pub fn initial_board(&self) -> CategoryBoard {
        CategoryBoard::from(self.categories())
    }

    /// Number of entries in the bank.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bank holds no entry. Always false for a constructed bank.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bank shipped with the binary, used when no configuration overrides it.
    pub fn builtin() -> Self {
        // The built-in entries are unique and non-empty.
        match Self::new(builtin_entries()) {
            Ok(bank) => bank,
            Err(err) => unreachable!("built-in question bank is invalid: {err}"),
        }
    }
}

fn entry(question: &str, answers: &[&str], category: &str, value: u32) -> TriviaEntry {
    TriviaEntry {
        question: question.to_owned(),
        answers: answers.iter().map(|answer| (*answer).to_owned()).collect(),
        category: category.to_owned(),
        value,
    }
}

fn builtin_entries() -> Vec<TriviaEntry> {
    vec![
        entry(
            "This place is the university in Dekalb?",
            &["What is a N I U", "What is Northern Illinois University"],
            "northern",
            200,
        ),
        entry(
            "This is the mascot of N I U?",
            &["What is Huskies", "What is a Husky"],
            "northern",
            400,
        ),
        entry(
            "This is the place where the Huskie Hack is?",
            &["What is Holmes Student Center", "What is a H S C"],
            "northern",
            600,
        ),
        entry(
            "This is the abbreviation of the Computer Science building?",
            &["What is P M", "What is the P M"],
            "northern",
            800,
        ),
        entry(
            "This number C S C I course is titled Intermediate Programming?",
            &["What is 241", "What is 2 4 1"],
            "northern",
            1000,
        ),
        entry(
            "This is the smallest unit",
            &["What is atom", "What is an atom"],
            "science",
            200,
        ),
        entry(
            "This is made up of 2 or more atoms",
            &["What is molecule", "What is a molecule"],
            "science",
            400,
        ),
        entry(
            "Adrenaline is another name for this hormone secreted in response to stress or fear",
            &["What is epinephrine"],
            "science",
            600,
        ),
        entry(
            "The earliest period of the Paleozoic Era, it extends from about 542 to 488 million years ago",
            &["What is the Cambrian"],
            "science",
            800,
        ),
        entry(
            "Organic chemistry focuses specifically on this element's compounds & their reactions",
            &["What is carbon"],
            "science",
            1000,
        ),
    ]
}
