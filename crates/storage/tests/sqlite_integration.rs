use chrono::Duration;
use exam_core::model::{Credentials, ExamId};
use exam_core::time::fixed_now;
use storage::repository::{AttemptRecord, AttemptRepository, CredentialStore};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn attempt(exam: u64, minutes: i64, timed_out: bool) -> AttemptRecord {
    AttemptRecord {
        exam_id: ExamId::new(exam),
        exam_name: "Python Basics".into(),
        obtained_marks: 7.0,
        total_marks: 10.0,
        percentage: 70.0,
        answered: 9,
        question_count: 10,
        timed_out,
        completed_at: fixed_now() + Duration::minutes(minutes),
    }
}

#[tokio::test]
async fn sqlite_credentials_round_trip() {
    let repo = connect("memdb_credentials").await;
    assert!(repo.load().await.unwrap().is_none());

    let creds = Credentials::new("abc123", Some("Bearer".into())).unwrap();
    repo.save(&creds).await.unwrap();
    let loaded = repo.load().await.unwrap().expect("stored");
    assert_eq!(loaded.authorization_header(), "Bearer abc123");

    let rotated = Credentials::new("def456", Some("Token".into())).unwrap();
    repo.save(&rotated).await.unwrap();
    assert_eq!(repo.load().await.unwrap(), Some(rotated));

    repo.clear().await.unwrap();
    assert!(repo.load().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_attempts_are_listed_newest_first() {
    let repo = connect("memdb_attempts").await;
    repo.append_attempt(&attempt(1, 0, false)).await.unwrap();
    let latest = repo.append_attempt(&attempt(2, 30, true)).await.unwrap();
    repo.append_attempt(&attempt(1, 10, false)).await.unwrap();

    assert_eq!(repo.count_attempts().await.unwrap(), 3);

    let rows = repo.list_attempts(2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, latest);
    assert!(rows[0].attempt.timed_out);
    assert_eq!(rows[0].attempt.completed_at, fixed_now() + Duration::minutes(30));
    assert_eq!(rows[1].attempt.exam_id, ExamId::new(1));
    assert!((rows[1].attempt.percentage - 70.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert_eq!(repo.count_attempts().await.unwrap(), 0);
}
