use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{Credentials, ExamId, SessionReport};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── CREDENTIALS ───────────────────────────────────────────────────────────────
//

/// Key under which the access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key under which the token type is persisted.
pub const TOKEN_TYPE_KEY: &str = "token_type";

/// Key-value store for the client's access token.
///
/// Written by the login flow, cleared on logout, read before every request.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or holds an invalid token.
    async fn load(&self) -> Result<Option<Credentials>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the credentials cannot be stored.
    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn clear(&self) -> Result<(), StorageError>;
}

//
// ─── ATTEMPT HISTORY ───────────────────────────────────────────────────────────
//

/// Persisted shape of one completed exam attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub exam_id: ExamId,
    pub exam_name: String,
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub answered: u32,
    pub question_count: u32,
    pub timed_out: bool,
    pub completed_at: DateTime<Utc>,
}

impl AttemptRecord {
    #[must_use]
    pub fn from_report(exam_id: ExamId, report: &SessionReport) -> Self {
        Self {
            exam_id,
            exam_name: report.exam_name.clone(),
            obtained_marks: report.result.obtained_marks,
            total_marks: report.result.total_marks,
            percentage: report.result.percentage,
            answered: u32::try_from(report.answered).unwrap_or(u32::MAX),
            question_count: u32::try_from(report.question_count).unwrap_or(u32::MAX),
            timed_out: report.timed_out(),
            completed_at: report.result.completed_at,
        }
    }
}

/// Stored attempt along with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRow {
    pub id: i64,
    pub attempt: AttemptRecord,
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a completed attempt, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// Most recent attempts first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_attempts(&self) -> Result<u64, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    credentials: Option<Credentials>,
    attempts: Vec<AttemptRow>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-seeded with credentials.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        let repo = Self::new();
        if let Ok(mut state) = repo.state.lock() {
            state.credentials = Some(credentials);
        }
        repo
    }

    fn state(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|_| StorageError::Connection("poisoned lock".into()))
    }
}

#[async_trait]
impl CredentialStore for InMemoryRepository {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        Ok(self.state()?.credentials.clone())
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        self.state()?.credentials = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.state()?.credentials = None;
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut state = self.state()?;
        let id = i64::try_from(state.attempts.len())
            .map_err(|_| StorageError::Serialization("attempt id overflow".into()))?
            + 1;
        state.attempts.push(AttemptRow {
            id,
            attempt: attempt.clone(),
        });
        Ok(id)
    }

    async fn list_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, StorageError> {
        let state = self.state()?;
        let mut rows = state.attempts.clone();
        rows.sort_by(|a, b| {
            b.attempt
                .completed_at
                .cmp(&a.attempt.completed_at)
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn count_attempts(&self) -> Result<u64, StorageError> {
        Ok(self.state()?.attempts.len() as u64)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub credentials: Arc<dyn CredentialStore>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let credentials: Arc<dyn CredentialStore> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self {
            credentials,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::time::fixed_now;

    fn attempt(exam: u64, offset_mins: i64) -> AttemptRecord {
        AttemptRecord {
            exam_id: ExamId::new(exam),
            exam_name: format!("Exam {exam}"),
            obtained_marks: 3.0,
            total_marks: 5.0,
            percentage: 60.0,
            answered: 4,
            question_count: 5,
            timed_out: false,
            completed_at: fixed_now() + Duration::minutes(offset_mins),
        }
    }

    #[tokio::test]
    async fn credentials_round_trip_and_clear() {
        let repo = InMemoryRepository::new();
        assert!(repo.load().await.unwrap().is_none());

        let creds = Credentials::new("tok", None).unwrap();
        repo.save(&creds).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(creds));

        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn attempts_list_newest_first() {
        let repo = InMemoryRepository::new();
        repo.append_attempt(&attempt(1, 0)).await.unwrap();
        repo.append_attempt(&attempt(2, 10)).await.unwrap();
        repo.append_attempt(&attempt(1, 5)).await.unwrap();

        let rows = repo.list_attempts(2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].attempt.exam_id, ExamId::new(2));
        assert_eq!(rows[1].id, 3);
        assert_eq!(repo.count_attempts().await.unwrap(), 3);
    }
}
