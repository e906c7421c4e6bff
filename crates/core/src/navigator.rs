use thiserror::Error;

use crate::model::{AnswerStore, ExamContent, OptionCode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("question index {index} is out of range (question count {count})")]
    OutOfRange { index: usize, count: usize },
}

/// Result of asking the navigator to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStep {
    Moved { index: usize },
    /// Already on the last question; nothing changed.
    Exhausted,
    /// Already on the first question; nothing changed.
    Unchanged,
}

/// Tracks the displayed question and the option shown as selected for it.
///
/// `current` is always within `[0, count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionNavigator {
    current: usize,
    count: usize,
    selected: Option<OptionCode>,
}

impl QuestionNavigator {
    /// # Errors
    ///
    /// Returns `NavigationError::OutOfRange` when `count` is zero, since no
    /// position would be valid.
    pub fn new(count: usize) -> Result<Self, NavigationError> {
        if count == 0 {
            return Err(NavigationError::OutOfRange { index: 0, count });
        }
        Ok(Self {
            current: 0,
            count,
            selected: None,
        })
    }

    /// Navigator over a validated question set, which is never empty.
    #[must_use]
    pub fn for_exam(exam: &ExamContent) -> Self {
        Self {
            current: 0,
            count: exam.question_count().max(1),
            selected: None,
        }
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 == self.count
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    /// Option currently shown as selected for the displayed question.
    #[must_use]
    pub fn selected(&self) -> Option<OptionCode> {
        self.selected
    }

    /// Reload the displayed selection from the store.
    pub fn sync(&mut self, answers: &AnswerStore) {
        self.selected = answers.answer(self.current);
    }

    pub fn next(&mut self, answers: &AnswerStore) -> NavStep {
        if self.is_last() {
            return NavStep::Exhausted;
        }
        self.current += 1;
        self.sync(answers);
        NavStep::Moved {
            index: self.current,
        }
    }

    pub fn previous(&mut self, answers: &AnswerStore) -> NavStep {
        if self.is_first() {
            return NavStep::Unchanged;
        }
        self.current -= 1;
        self.sync(answers);
        NavStep::Moved {
            index: self.current,
        }
    }

    /// Jump to any question, answered or not.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::OutOfRange` and leaves the position unchanged
    /// if `index >= count()`.
    pub fn jump_to(&mut self, index: usize, answers: &AnswerStore) -> Result<NavStep, NavigationError> {
        if index >= self.count {
            return Err(NavigationError::OutOfRange {
                index,
                count: self.count,
            });
        }
        self.current = index;
        self.sync(answers);
        Ok(NavStep::Moved { index })
    }
}
