use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::read_marker::ReadMarker;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ReadMarkerRepository {
    /// `None` means the user has never checked notifications.
    async fn get_read_marker(&self, user_id: &Uuid) -> Result<Option<ReadMarker>, AppError>;
    /// Upsert; last write wins.
    async fn set_read_marker(&self, user_id: &Uuid, checked_at: DateTime<Utc>) -> Result<(), AppError>;
}

#[async_trait::async_trait]
impl ReadMarkerRepository for PostgresRepository {
    async fn get_read_marker(&self, user_id: &Uuid) -> Result<Option<ReadMarker>, AppError> {
        let marker = sqlx::query_as::<_, ReadMarker>(
            r#"
            SELECT user_id, last_checked_at
            FROM read_marker
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(marker)
    }

    async fn set_read_marker(&self, user_id: &Uuid, checked_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO read_marker (user_id, last_checked_at)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET last_checked_at = EXCLUDED.last_checked_at
            "#,
        )
        .bind(user_id)
        .bind(checked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
