use thiserror::Error;

use crate::model::OptionCode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question index {index} is out of range (question count {count})")]
    OutOfRange { index: usize, count: usize },
}

/// Selected option per question position.
///
/// Always holds exactly one slot per question. Slots are overwritten, never
/// removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerStore {
    slots: Vec<Option<OptionCode>>,
}

impl AnswerStore {
    /// Create a store with every slot unanswered.
    #[must_use]
    pub fn new(question_count: usize) -> Self {
        Self {
            slots: vec![None; question_count],
        }
    }

    /// Record (or replace) the answer at `index`. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::OutOfRange` if `index >= len()`.
    pub fn record_answer(&mut self, index: usize, code: OptionCode) -> Result<(), AnswerError> {
        let count = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(AnswerError::OutOfRange { index, count })?;
        *slot = Some(code);
        Ok(())
    }

    #[must_use]
    pub fn answer(&self, index: usize) -> Option<OptionCode> {
        self.slots.get(index).copied().flatten()
    }

    #[must_use]
    pub fn is_answered(&self, index: usize) -> bool {
        self.answer(index).is_some()
    }

    #[must_use]
    pub fn count_answered(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slots in question order.
    pub fn iter(&self) -> impl Iterator<Item = Option<OptionCode>> + '_ {
        self.slots.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_all_unanswered() {
        let store = AnswerStore::new(4);
        assert_eq!(store.len(), 4);
        assert_eq!(store.count_answered(), 0);
        assert!(store.iter().all(|slot| slot.is_none()));
    }

    #[test]
    fn last_write_wins() {
        let mut store = AnswerStore::new(3);
        store.record_answer(1, OptionCode::A).unwrap();
        store.record_answer(1, OptionCode::C).unwrap();
        assert_eq!(store.answer(1), Some(OptionCode::C));
        assert_eq!(store.count_answered(), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn out_of_range_leaves_store_untouched() {
        let mut store = AnswerStore::new(2);
        let err = store.record_answer(2, OptionCode::B).unwrap_err();
        assert_eq!(err, AnswerError::OutOfRange { index: 2, count: 2 });
        assert_eq!(store, AnswerStore::new(2));
    }

    #[test]
    fn answer_past_end_reads_as_unanswered() {
        let store = AnswerStore::new(1);
        assert_eq!(store.answer(5), None);
        assert!(!store.is_answered(5));
    }
}
