//! Read-only question bank loaded from a JSON file at startup.

use std::{fmt, fs, io::ErrorKind, path::Path};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::state::game::{Question, QuestionMode};

/// Section of the bank a moderator can list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Questions of one named category.
    #[serde(alias = "categoria")]
    Category,
    /// Bonus questions.
    Bonus,
    /// Numeric estimates.
    #[serde(alias = "stima")]
    Estimate,
    /// Anagrams.
    #[serde(alias = "anagramma")]
    Anagram,
    /// Zoom images.
    Zoom,
    /// Memory grids.
    Memory,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionKind::Category => "category",
            QuestionKind::Bonus => "bonus",
            QuestionKind::Estimate => "estimate",
            QuestionKind::Anagram => "anagram",
            QuestionKind::Zoom => "zoom",
            QuestionKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// All questions available to the moderator, grouped by section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuestionBank {
    #[serde(alias = "categorie")]
    categories: IndexMap<String, Vec<Question>>,
    bonus: Vec<Question>,
    #[serde(alias = "stima")]
    estimate: Vec<Question>,
    #[serde(alias = "anagramma")]
    anagram: Vec<Question>,
    zoom: Vec<Question>,
    memory: Vec<Question>,
}

impl QuestionBank {
    /// Load the bank from `path`. A missing or malformed file yields an empty bank.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(bank) => {
                    info!(
                        path = %path.display(),
                        categories = bank.categories.len(),
                        questions = bank.len(),
                        "loaded question bank"
                    );
                    bank
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse question bank; starting with an empty bank"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "question bank not found; starting with an empty bank"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read question bank; starting with an empty bank"
                );
                Self::default()
            }
        }
    }

    /// Parse a bank document and fill in the implied fields of every question.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        let mut bank: Self = serde_json::from_str(contents)?;
        bank.normalize();
        Ok(bank)
    }

    /// Questions of section `kind`; `key` names the category for [`QuestionKind::Category`].
    ///
    /// Unknown categories list nothing.
    pub fn list(&self, kind: QuestionKind, key: Option<&str>) -> Vec<Question> {
        let questions: &[Question] = match kind {
            QuestionKind::Category => key
                .and_then(|key| self.categories.get(key.trim()))
                .map(Vec::as_slice)
                .unwrap_or_default(),
            QuestionKind::Bonus => &self.bonus,
            QuestionKind::Estimate => &self.estimate,
            QuestionKind::Anagram => &self.anagram,
            QuestionKind::Zoom => &self.zoom,
            QuestionKind::Memory => &self.memory,
        };
        questions.to_vec()
    }

    /// Category names in file order.
    pub fn categories(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    /// Total number of questions.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum::<usize>()
            + self.bonus.len()
            + self.estimate.len()
            + self.anagram.len()
            + self.zoom.len()
            + self.memory.len()
    }

    /// Whether the bank holds no question at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Questions that did not state a mode take the one implied by their section.
    fn normalize(&mut self) {
        for (name, questions) in self.categories.iter_mut() {
            for (index, question) in questions.iter_mut().enumerate() {
                if question.category.is_none() {
                    question.category = Some(name.clone());
                }
                fill_id(question, name, index);
            }
        }

        let sections = [
            ("bonus", &mut self.bonus, QuestionMode::Bonus),
            ("estimate", &mut self.estimate, QuestionMode::Estimate),
            ("anagram", &mut self.anagram, QuestionMode::Anagram),
            ("zoom", &mut self.zoom, QuestionMode::Zoom),
            ("memory", &mut self.memory, QuestionMode::Memory),
        ];
        for (section, questions, mode) in sections {
            for (index, question) in questions.iter_mut().enumerate() {
                if question.mode == QuestionMode::Buzzer {
                    question.mode = mode;
                }
                fill_id(question, section, index);
            }
        }
    }
}

fn fill_id(question: &mut Question, section: &str, index: usize) {
    if question.id.trim().is_empty() {
        question.id = format!("{section}-{}", index + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"{
        "categorie": {
            "History": [
                {"domanda": "Year of the moon landing?", "risposta": "1969"},
                {"id": "h2", "prompt": "First emperor of Rome?", "correct_answer": "Augustus", "mode": "multiple_choice", "choices": ["Nero", "Augustus"]}
            ]
        },
        "stima": [{"prompt": "Height of the Eiffel tower (m)?", "correct_answer": "330"}],
        "memory": [{"prompt": "Where was the cat?", "correct_answer": "7"}]
    }"#;

    #[test]
    fn sections_and_aliases_are_understood() {
        let bank = QuestionBank::from_json_str(BANK).unwrap();
        assert_eq!(bank.categories(), vec!["History".to_string()]);
        assert_eq!(bank.len(), 4);

        let history = bank.list(QuestionKind::Category, Some("History"));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "History-1");
        assert_eq!(history[0].correct_answer, "1969");
        assert_eq!(history[0].category.as_deref(), Some("History"));
        assert_eq!(history[1].mode, QuestionMode::MultipleChoice);
    }

    #[test]
    fn section_implies_the_mode() {
        let bank = QuestionBank::from_json_str(BANK).unwrap();
        assert_eq!(
            bank.list(QuestionKind::Estimate, None)[0].mode,
            QuestionMode::Estimate
        );
        assert_eq!(
            bank.list(QuestionKind::Memory, None)[0].mode,
            QuestionMode::Memory
        );
    }

    #[test]
    fn unknown_category_lists_nothing() {
        let bank = QuestionBank::from_json_str(BANK).unwrap();
        assert!(bank.list(QuestionKind::Category, Some("Sport")).is_empty());
        assert!(bank.list(QuestionKind::Category, None).is_empty());
    }

    #[test]
    fn missing_file_gives_empty_bank() {
        let bank = QuestionBank::load(Path::new("/definitely/not/here.json"));
        assert!(bank.is_empty());
    }

    #[test]
    fn kind_aliases() {
        let kind: QuestionKind = serde_json::from_str(r#""anagramma""#).unwrap();
        assert_eq!(kind, QuestionKind::Anagram);
    }
}
