use async_trait::async_trait;
use exam_core::model::Credentials;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{ACCESS_TOKEN_KEY, CredentialStore, StorageError, TOKEN_TYPE_KEY};

#[async_trait]
impl CredentialStore for SqliteRepository {
    async fn load(&self) -> Result<Option<Credentials>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT key, value
            FROM client_credentials
            WHERE key IN (?1, ?2)
            ",
        )
        .bind(ACCESS_TOKEN_KEY)
        .bind(TOKEN_TYPE_KEY)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut access_token: Option<String> = None;
        let mut token_type: Option<String> = None;
        for row in rows {
            let key: String = row.try_get("key").map_err(ser)?;
            let value: String = row.try_get("value").map_err(ser)?;
            match key.as_str() {
                ACCESS_TOKEN_KEY => access_token = Some(value),
                TOKEN_TYPE_KEY => token_type = Some(value),
                _ => {}
            }
        }

        let Some(access_token) = access_token else {
            return Ok(None);
        };
        Credentials::new(access_token, token_type)
            .map(Some)
            .map_err(ser)
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for (key, value) in [
            (ACCESS_TOKEN_KEY, credentials.access_token()),
            (TOKEN_TYPE_KEY, credentials.token_type()),
        ] {
            sqlx::query(
                r"
                INSERT INTO client_credentials (key, value)
                VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                ",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM client_credentials WHERE key IN (?1, ?2)")
            .bind(ACCESS_TOKEN_KEY)
            .bind(TOKEN_TYPE_KEY)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
