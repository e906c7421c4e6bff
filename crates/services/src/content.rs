use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use exam_core::model::{ExamContent, ExamId};
use storage::repository::CredentialStore;

use crate::api::ExamApi;
use crate::error::ContentFetchError;

/// Seconds granted per question when neither the exam bank nor the table
/// names a duration.
pub const DEFAULT_SECS_PER_QUESTION: u32 = 60;

/// Decides how long a session runs.
///
/// A duration reported by the exam bank always wins. Otherwise a per-exam
/// table is consulted, then a per-question allowance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationPolicy {
    fixed: HashMap<ExamId, u32>,
    secs_per_question: u32,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        let fixed = HashMap::from([(ExamId::new(1), 10 * 60), (ExamId::new(2), 15 * 60)]);
        Self {
            fixed,
            secs_per_question: DEFAULT_SECS_PER_QUESTION,
        }
    }
}

impl DurationPolicy {
    /// Policy with no per-exam table.
    #[must_use]
    pub fn per_question(secs_per_question: u32) -> Self {
        Self {
            fixed: HashMap::new(),
            secs_per_question: secs_per_question.max(1),
        }
    }

    #[must_use]
    pub fn with_fixed(mut self, exam_id: ExamId, duration_secs: u32) -> Self {
        self.fixed.insert(exam_id, duration_secs.max(1));
        self
    }

    /// Always at least one second.
    #[must_use]
    pub fn resolve(&self, exam_id: ExamId, reported_secs: Option<u32>, question_count: usize) -> u32 {
        if let Some(secs) = reported_secs.filter(|secs| *secs > 0) {
            return secs;
        }
        if let Some(secs) = self.fixed.get(&exam_id) {
            return *secs;
        }
        let count = u32::try_from(question_count).unwrap_or(u32::MAX);
        self.secs_per_question.saturating_mul(count).max(1)
    }
}

/// Loads the question set for a session.
#[derive(Clone)]
pub struct ContentService {
    api: Arc<dyn ExamApi>,
    credentials: Arc<dyn CredentialStore>,
    policy: DurationPolicy,
}

impl ContentService {
    #[must_use]
    pub fn new(api: Arc<dyn ExamApi>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            api,
            credentials,
            policy: DurationPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: DurationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &DurationPolicy {
        &self.policy
    }

    /// Fetch and validate one exam.
    ///
    /// # Errors
    ///
    /// Returns `ContentFetchError::MissingCredentials` without contacting the
    /// exam bank when no token is stored, `ContentFetchError::Content` for an
    /// empty or malformed question set, and the classified remote failure
    /// otherwise.
    pub async fn load(&self, exam_id: ExamId) -> Result<ExamContent, ContentFetchError> {
        let credentials = self
            .credentials
            .load()
            .await?
            .ok_or(ContentFetchError::MissingCredentials)?;

        let response = self
            .api
            .fetch_exam(exam_id, &credentials)
            .await
            .map_err(|err| {
                warn!(%exam_id, error = %err, "exam fetch failed");
                ContentFetchError::from_api(exam_id, err)
            })?;

        let (meta, questions) = response.into_parts(exam_id)?;
        let duration = self
            .policy
            .resolve(meta.id, meta.duration_secs, questions.len());
        let content = ExamContent::new(meta, questions, duration)?;
        info!(
            %exam_id,
            questions = content.question_count(),
            duration_secs = content.duration_secs(),
            "exam loaded"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::fakes::{exam_json, signed_in_store, FakeExamApi};
    use storage::repository::InMemoryRepository;

    async fn load_failing(err: ApiError) -> (ContentFetchError, usize) {
        let api = Arc::new(FakeExamApi::with_exam(exam_json(7, 3, None)).failing_fetch(err));
        let service = ContentService::new(api.clone(), Arc::new(signed_in_store()));
        let err = service.load(ExamId::new(7)).await.unwrap_err();
        (err, api.fetch_count())
    }

    #[test]
    fn reported_duration_wins() {
        let policy = DurationPolicy::default();
        assert_eq!(policy.resolve(ExamId::new(1), Some(300), 5), 300);
    }

    #[test]
    fn table_then_per_question_fallback() {
        let policy = DurationPolicy::default();
        assert_eq!(policy.resolve(ExamId::new(1), None, 5), 600);
        assert_eq!(policy.resolve(ExamId::new(2), Some(0), 5), 900);
        assert_eq!(policy.resolve(ExamId::new(7), None, 5), 300);
    }

    #[test]
    fn custom_policy_overrides_table() {
        let policy = DurationPolicy::per_question(30).with_fixed(ExamId::new(9), 45);
        assert_eq!(policy.resolve(ExamId::new(9), None, 4), 45);
        assert_eq!(policy.resolve(ExamId::new(1), None, 4), 120);
    }

    #[tokio::test]
    async fn load_builds_content_with_resolved_duration() {
        let api = Arc::new(FakeExamApi::with_exam(exam_json(7, 3, None)));
        let store = Arc::new(signed_in_store());
        let service = ContentService::new(api.clone(), store);

        let content = service.load(ExamId::new(7)).await.unwrap();
        assert_eq!(content.question_count(), 3);
        assert_eq!(content.duration_secs(), 180);
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(api.last_authorization().as_deref(), Some("Bearer test-token"));
    }

    #[tokio::test]
    async fn empty_exam_is_no_content() {
        let api = Arc::new(FakeExamApi::with_exam(exam_json(7, 0, Some(5))));
        let store = Arc::new(signed_in_store());
        let service = ContentService::new(api, store);

        let err = service.load(ExamId::new(7)).await.unwrap_err();
        assert!(err.is_no_content());
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_request() {
        let api = Arc::new(FakeExamApi::with_exam(exam_json(7, 3, None)));
        let service = ContentService::new(api.clone(), Arc::new(InMemoryRepository::new()));

        let err = service.load(ExamId::new(7)).await.unwrap_err();
        assert!(matches!(err, ContentFetchError::MissingCredentials));
        assert_eq!(api.fetch_count(), 0);
    }

    #[tokio::test]
    async fn denied_fetch_is_unauthorized() {
        let (err, fetches) = load_failing(ApiError::Unauthorized {
            status: 401,
            detail: "token expired".into(),
        })
        .await;
        assert!(matches!(err, ContentFetchError::Unauthorized(detail) if detail == "token expired"));
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn unknown_exam_is_not_found() {
        let (err, fetches) = load_failing(ApiError::NotFound {
            detail: "no such exam".into(),
        })
        .await;
        assert!(matches!(
            err,
            ContentFetchError::NotFound { exam_id } if exam_id == ExamId::new(7)
        ));
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn outages_and_transport_failures_are_network_errors() {
        let (err, fetches) = load_failing(ApiError::Unavailable {
            status: 503,
            detail: "maintenance".into(),
        })
        .await;
        assert!(matches!(err, ContentFetchError::Network(msg) if msg == "503: maintenance"));
        assert_eq!(fetches, 1);

        let (err, fetches) = load_failing(ApiError::Transport("connection refused".into())).await;
        assert!(matches!(err, ContentFetchError::Network(msg) if msg == "connection refused"));
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn other_client_errors_are_reported_as_network() {
        let (err, fetches) = load_failing(ApiError::Rejected {
            status: 422,
            detail: "bad exam id".into(),
        })
        .await;
        assert!(matches!(err, ContentFetchError::Network(msg) if msg == "422: bad exam id"));
        assert_eq!(fetches, 1);
    }
}
