use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, exam_id_from_i64, exam_id_to_i64, ser, u32_from_i64};
use crate::repository::{AttemptRecord, AttemptRepository, AttemptRow, StorageError};

fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<AttemptRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let exam_id = exam_id_from_i64(row.try_get::<i64, _>("exam_id").map_err(ser)?)?;
    let answered = u32_from_i64("answered", row.try_get::<i64, _>("answered").map_err(ser)?)?;
    let question_count = u32_from_i64(
        "question_count",
        row.try_get::<i64, _>("question_count").map_err(ser)?,
    )?;

    Ok(AttemptRow {
        id,
        attempt: AttemptRecord {
            exam_id,
            exam_name: row.try_get("exam_name").map_err(ser)?,
            obtained_marks: row.try_get("obtained_marks").map_err(ser)?,
            total_marks: row.try_get("total_marks").map_err(ser)?,
            percentage: row.try_get("percentage").map_err(ser)?,
            answered,
            question_count,
            timed_out: row.try_get::<i64, _>("timed_out").map_err(ser)? != 0,
            completed_at: row.try_get("completed_at").map_err(ser)?,
        },
    })
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_attempts (
                    exam_id, exam_name, obtained_marks, total_marks, percentage,
                    answered, question_count, timed_out, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(exam_id_to_i64(attempt.exam_id)?)
        .bind(&attempt.exam_name)
        .bind(attempt.obtained_marks)
        .bind(attempt.total_marks)
        .bind(attempt.percentage)
        .bind(i64::from(attempt.answered))
        .bind(i64::from(attempt.question_count))
        .bind(i64::from(attempt.timed_out))
        .bind(attempt.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_attempts(&self, limit: u32) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, exam_id, exam_name, obtained_marks, total_marks, percentage,
                    answered, question_count, timed_out, completed_at
                FROM exam_attempts
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }

    async fn count_attempts(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM exam_attempts")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        let total: i64 = row.try_get("total").map_err(ser)?;
        u64::try_from(total).map_err(ser)
    }
}
