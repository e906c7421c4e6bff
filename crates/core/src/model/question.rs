use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{ExamId, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("exam has no questions")]
    NoQuestions,

    #[error("question {id} has no options")]
    NoOptions { id: QuestionId },

    #[error("question {id} repeats option {code}")]
    DuplicateOption { id: QuestionId, code: OptionCode },

    #[error("question {id} appears more than once")]
    DuplicateQuestion { id: QuestionId },

    #[error("exam name cannot be empty")]
    EmptyName,

    #[error("unknown option code: {raw}")]
    UnknownOptionCode { raw: String },
}

//
// ─── OPTION CODES ──────────────────────────────────────────────────────────────
//

/// Short code identifying one of the four fixed option slots of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionCode {
    A,
    B,
    C,
    D,
}

impl OptionCode {
    pub const ALL: [OptionCode; 4] = [OptionCode::A, OptionCode::B, OptionCode::C, OptionCode::D];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionCode::A => "a",
            OptionCode::B => "b",
            OptionCode::C => "c",
            OptionCode::D => "d",
        }
    }

    /// Upper-case letter shown next to the option.
    #[must_use]
    pub fn label(self) -> char {
        match self {
            OptionCode::A => 'A',
            OptionCode::B => 'B',
            OptionCode::C => 'C',
            OptionCode::D => 'D',
        }
    }
}

impl fmt::Display for OptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionCode {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(OptionCode::A),
            "b" => Ok(OptionCode::B),
            "c" => Ok(OptionCode::C),
            "d" => Ok(OptionCode::D),
            _ => Err(ContentError::UnknownOptionCode { raw: s.to_string() }),
        }
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOption {
    pub code: OptionCode,
    pub text: String,
}

impl QuestionOption {
    #[must_use]
    pub fn new(code: OptionCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

/// A multiple-choice question. Carries no correctness data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<QuestionOption>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `ContentError::NoOptions` for an empty option list and
    /// `ContentError::DuplicateOption` if a code repeats.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<QuestionOption>,
    ) -> Result<Self, ContentError> {
        if options.is_empty() {
            return Err(ContentError::NoOptions { id });
        }
        for (i, option) in options.iter().enumerate() {
            if options[..i].iter().any(|prev| prev.code == option.code) {
                return Err(ContentError::DuplicateOption {
                    id,
                    code: option.code,
                });
            }
        }
        Ok(Self {
            id,
            prompt: prompt.into(),
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    #[must_use]
    pub fn has_option(&self, code: OptionCode) -> bool {
        self.options.iter().any(|option| option.code == code)
    }
}

//
// ─── EXAM CONTENT ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamMeta {
    pub id: ExamId,
    pub name: String,
    /// Duration reported by the exam bank, if any.
    pub duration_secs: Option<u32>,
}

/// The question set of one session. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamContent {
    meta: ExamMeta,
    questions: Vec<Question>,
    duration_secs: u32,
}

impl ExamContent {
    /// Build session content with an already-resolved duration. A zero
    /// duration is raised to one second.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NoQuestions` for an empty question list,
    /// `ContentError::DuplicateQuestion` for repeated ids and
    /// `ContentError::EmptyName` for a blank exam name.
    pub fn new(
        meta: ExamMeta,
        questions: Vec<Question>,
        duration_secs: u32,
    ) -> Result<Self, ContentError> {
        if meta.name.trim().is_empty() {
            return Err(ContentError::EmptyName);
        }
        if questions.is_empty() {
            return Err(ContentError::NoQuestions);
        }
        for (i, question) in questions.iter().enumerate() {
            if questions[..i].iter().any(|prev| prev.id() == question.id()) {
                return Err(ContentError::DuplicateQuestion { id: question.id() });
            }
        }
        Ok(Self {
            meta,
            questions,
            duration_secs: duration_secs.max(1),
        })
    }

    #[must_use]
    pub fn meta(&self) -> &ExamMeta {
        &self.meta
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.meta.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Always at least one.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_options() -> Vec<QuestionOption> {
        OptionCode::ALL
            .iter()
            .map(|code| QuestionOption::new(*code, format!("option {code}")))
            .collect()
    }

    fn meta() -> ExamMeta {
        ExamMeta {
            id: ExamId::new(1),
            name: "Python Basics".into(),
            duration_secs: None,
        }
    }

    #[test]
    fn option_code_parses_case_insensitively() {
        assert_eq!("B".parse::<OptionCode>().unwrap(), OptionCode::B);
        assert_eq!(" d ".parse::<OptionCode>().unwrap(), OptionCode::D);
        assert!(matches!(
            "e".parse::<OptionCode>(),
            Err(ContentError::UnknownOptionCode { .. })
        ));
    }

    #[test]
    fn question_rejects_duplicate_codes() {
        let options = vec![
            QuestionOption::new(OptionCode::A, "x"),
            QuestionOption::new(OptionCode::A, "y"),
        ];
        let err = Question::new(QuestionId::new(3), "Q", options).unwrap_err();
        assert_eq!(
            err,
            ContentError::DuplicateOption {
                id: QuestionId::new(3),
                code: OptionCode::A
            }
        );
    }

    #[test]
    fn empty_exam_is_no_content() {
        let err = ExamContent::new(meta(), Vec::new(), 60).unwrap_err();
        assert_eq!(err, ContentError::NoQuestions);
    }

    #[test]
    fn exam_rejects_repeated_question_ids() {
        let q = Question::new(QuestionId::new(1), "Q", four_options()).unwrap();
        let err = ExamContent::new(meta(), vec![q.clone(), q], 60).unwrap_err();
        assert!(matches!(err, ContentError::DuplicateQuestion { .. }));
    }

    #[test]
    fn exam_exposes_questions_in_order() {
        let questions = (1..=3)
            .map(|id| Question::new(QuestionId::new(id), format!("Q{id}"), four_options()).unwrap())
            .collect();
        let exam = ExamContent::new(meta(), questions, 120).unwrap();
        assert_eq!(exam.question_count(), 3);
        assert_eq!(exam.question(2).unwrap().prompt(), "Q3");
        assert!(exam.question(3).is_none());
        assert!(exam.question(0).unwrap().has_option(OptionCode::C));
    }

    #[test]
    fn zero_duration_is_raised_to_one_second() {
        let q = Question::new(QuestionId::new(1), "Q", four_options()).unwrap();
        let exam = ExamContent::new(meta(), vec![q], 0).unwrap();
        assert_eq!(exam.duration_secs(), 1);
    }
}
