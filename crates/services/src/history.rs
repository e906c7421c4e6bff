use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use exam_core::model::{ExamId, PerformanceLevel, SessionReport};
use storage::repository::{AttemptRecord, AttemptRepository, AttemptRow};

use crate::error::HistoryError;
use crate::sessions::ExamSession;

/// Presentation-agnostic list item for a past attempt.
///
/// Timestamps and percentages are left unformatted.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptListItem {
    pub id: i64,
    pub exam_id: ExamId,
    pub exam_name: String,
    pub percentage: f64,
    pub performance: PerformanceLevel,
    pub answered: u32,
    pub question_count: u32,
    pub timed_out: bool,
    pub completed_at: DateTime<Utc>,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_row(row: &AttemptRow) -> Self {
        let attempt = &row.attempt;
        Self {
            id: row.id,
            exam_id: attempt.exam_id,
            exam_name: attempt.exam_name.clone(),
            percentage: attempt.percentage,
            performance: PerformanceLevel::from_percentage(attempt.percentage),
            answered: attempt.answered,
            question_count: attempt.question_count,
            timed_out: attempt.timed_out,
            completed_at: attempt.completed_at,
        }
    }
}

/// Records completed attempts and reads them back.
#[derive(Clone)]
pub struct HistoryService {
    attempts: Arc<dyn AttemptRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the attempt cannot be stored.
    pub async fn record(&self, exam_id: ExamId, report: &SessionReport) -> Result<i64, HistoryError> {
        let id = self
            .attempts
            .append_attempt(&AttemptRecord::from_report(exam_id, report))
            .await?;
        info!(%exam_id, attempt_id = id, "attempt recorded");
        Ok(id)
    }

    /// Record a session that has completed.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::NotCompleted` if the session has no result yet.
    pub async fn record_session(&self, session: &ExamSession) -> Result<i64, HistoryError> {
        let report = session.report().ok_or(HistoryError::NotCompleted)?;
        self.record(session.exam().exam_id(), &report).await
    }

    /// Number of exams attended so far.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on backend failures.
    pub async fn attended_count(&self) -> Result<u64, HistoryError> {
        Ok(self.attempts.count_attempts().await?)
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on backend failures.
    pub async fn recent(&self, limit: u32) -> Result<Vec<AttemptListItem>, HistoryError> {
        let rows = self.attempts.list_attempts(limit).await?;
        Ok(rows.iter().map(AttemptListItem::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::SubmissionResult;
    use exam_core::time::fixed_now;
    use exam_core::{Clock, SubmissionTrigger};
    use storage::repository::InMemoryRepository;

    fn report(percentage: f64, trigger: SubmissionTrigger) -> SessionReport {
        SessionReport {
            exam_name: "Rust".into(),
            result: SubmissionResult {
                obtained_marks: 4.0,
                total_marks: 5.0,
                percentage,
                correct_answers: 4,
                wrong_answers: 1,
                completed_at: fixed_now(),
                question_results: Vec::new(),
            },
            trigger,
            time_used_secs: 200,
            time_remaining_secs: 100,
            answered: 5,
            question_count: 5,
        }
    }

    #[tokio::test]
    async fn records_and_counts_attempts() {
        let service = HistoryService::new(Arc::new(InMemoryRepository::new()));
        assert_eq!(service.attended_count().await.unwrap(), 0);

        service
            .record(ExamId::new(3), &report(80.0, SubmissionTrigger::UserConfirmed))
            .await
            .unwrap();
        service
            .record(ExamId::new(4), &report(95.0, SubmissionTrigger::TimeExpired))
            .await
            .unwrap();

        assert_eq!(service.attended_count().await.unwrap(), 2);
        let recent = service.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].exam_id, ExamId::new(4));
        assert!(recent[0].timed_out);
        assert_eq!(recent[0].performance, PerformanceLevel::Excellent);
        assert_eq!(recent[1].performance, PerformanceLevel::Good);
    }

    #[tokio::test]
    async fn unfinished_session_is_not_recorded() {
        let service = HistoryService::new(Arc::new(InMemoryRepository::new()));
        let session = ExamSession::new(crate::fakes::exam_content(2, 60), Clock::default());
        assert!(matches!(
            service.record_session(&session).await,
            Err(HistoryError::NotCompleted)
        ));
        assert_eq!(service.attended_count().await.unwrap(), 0);
    }
}
