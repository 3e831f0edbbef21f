use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::training_session::{ActivityType, Intensity, SessionRequest, TrainingSession};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

// Intermediate struct for sqlx query results with aggregated participants
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    host_user_id: Uuid,
    host_email: String,
    title: String,
    description: String,
    activity_type: String,
    intensity: String,
    date: NaiveDate,
    time: NaiveTime,
    location: String,
    distance: Option<String>,
    max_participants: Option<i32>,
    participants: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for TrainingSession {
    fn from(row: SessionRow) -> Self {
        TrainingSession {
            id: row.id,
            host_user_id: row.host_user_id,
            host_email: row.host_email,
            title: row.title,
            description: row.description,
            activity_type: activity_type_from_db(&row.activity_type),
            intensity: intensity_from_db(&row.intensity),
            date: row.date,
            time: row.time,
            location: row.location,
            distance: row.distance,
            max_participants: row.max_participants,
            participants: row.participants,
            created_at: row.created_at,
        }
    }
}

pub fn activity_type_from_db<T: AsRef<str>>(value: T) -> ActivityType {
    match value.as_ref() {
        "running" => ActivityType::Running,
        "cycling" => ActivityType::Cycling,
        "swimming" => ActivityType::Swimming,
        other => panic!("Unknown activity type: {}", other),
    }
}

pub fn activity_type_to_db(value: ActivityType) -> &'static str {
    match value {
        ActivityType::Running => "running",
        ActivityType::Cycling => "cycling",
        ActivityType::Swimming => "swimming",
    }
}

pub fn intensity_from_db<T: AsRef<str>>(value: T) -> Intensity {
    match value.as_ref() {
        "easy" => Intensity::Easy,
        "moderate" => Intensity::Moderate,
        "hard" => Intensity::Hard,
        other => panic!("Unknown intensity: {}", other),
    }
}

pub fn intensity_to_db(value: Intensity) -> &'static str {
    match value {
        Intensity::Easy => "easy",
        Intensity::Moderate => "moderate",
        Intensity::Hard => "hard",
    }
}

// Common SELECT clause for session queries with host email and
// aggregated participant ids
const SESSION_SELECT: &str = r#"
    SELECT
        s.id,
        s.host_user_id,
        u.email AS host_email,
        s.title,
        s.description,
        s.activity_type,
        s.intensity,
        s.date,
        s.time,
        s.location,
        s.distance,
        s.max_participants,
        COALESCE(array_agg(sp.user_id) FILTER (WHERE sp.user_id IS NOT NULL), '{}') AS participants,
        s.created_at
    FROM training_session s
    JOIN users u ON u.id = s.host_user_id
    LEFT JOIN session_participant sp ON sp.session_id = s.id
"#;

const SESSION_GROUP_BY: &str = " GROUP BY s.id, u.email";

#[async_trait::async_trait]
pub trait TrainingSessionRepository {
    async fn create_session(&self, request: &SessionRequest, host_user_id: &Uuid) -> Result<TrainingSession, AppError>;
    async fn get_session_by_id(&self, id: &Uuid) -> Result<Option<TrainingSession>, AppError>;
    /// All sessions, newest first (browse view).
    async fn list_sessions(&self) -> Result<Vec<TrainingSession>, AppError>;
    /// Sessions where the user hosts or participates. The membership filter
    /// is pushed into the store; callers must not rely on any ordering.
    async fn list_sessions_for_member(&self, user_id: &Uuid) -> Result<Vec<TrainingSession>, AppError>;
    /// Adds the user to the session. A second join is a no-op; joining a
    /// full session fails with `SessionFull`.
    async fn join_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<TrainingSession, AppError>;
    async fn leave_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<(), AppError>;
    /// Deletes the session; participants and messages go with it.
    async fn delete_session(&self, id: &Uuid) -> Result<(), AppError>;
    /// True when the two users host or participate in at least one common
    /// session. Used for private-profile visibility.
    async fn users_share_session(&self, a: &Uuid, b: &Uuid) -> Result<bool, AppError>;
}

#[async_trait::async_trait]
impl TrainingSessionRepository for PostgresRepository {
    async fn create_session(&self, request: &SessionRequest, host_user_id: &Uuid) -> Result<TrainingSession, AppError> {
        let mut tx = self.pool.begin().await?;

        let session_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO training_session (
                host_user_id, title, description, activity_type, intensity,
                date, time, location, distance, max_participants
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(host_user_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(activity_type_to_db(request.activity_type))
        .bind(intensity_to_db(request.intensity))
        .bind(request.date)
        .bind(request.time)
        .bind(&request.location)
        .bind(&request.distance)
        .bind(request.max_participants)
        .fetch_one(&mut *tx)
        .await?;

        // The host always counts as a participant
        sqlx::query("INSERT INTO session_participant (session_id, user_id) VALUES ($1, $2)")
            .bind(session_id)
            .bind(host_user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_session_by_id(&session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session vanished after creation".to_string()))
    }

    async fn get_session_by_id(&self, id: &Uuid) -> Result<Option<TrainingSession>, AppError> {
        let query = format!("{} WHERE s.id = $1 {}", SESSION_SELECT, SESSION_GROUP_BY);
        let row = sqlx::query_as::<_, SessionRow>(&query).bind(id).fetch_optional(&self.pool).await?;

        Ok(row.map(TrainingSession::from))
    }

    async fn list_sessions(&self) -> Result<Vec<TrainingSession>, AppError> {
        let query = format!("{} {} ORDER BY s.created_at DESC", SESSION_SELECT, SESSION_GROUP_BY);
        let rows = sqlx::query_as::<_, SessionRow>(&query).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(TrainingSession::from).collect())
    }

    async fn list_sessions_for_member(&self, user_id: &Uuid) -> Result<Vec<TrainingSession>, AppError> {
        let query = format!(
            r#"
            {}
            WHERE s.host_user_id = $1
               OR EXISTS (
                    SELECT 1 FROM session_participant m
                    WHERE m.session_id = s.id AND m.user_id = $1
               )
            {}
            "#,
            SESSION_SELECT, SESSION_GROUP_BY
        );
        let rows = sqlx::query_as::<_, SessionRow>(&query).bind(user_id).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(TrainingSession::from).collect())
    }

    async fn join_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<TrainingSession, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the session row so concurrent joins serialize on the
        // capacity check
        let max_participants: Option<Option<i32>> =
            sqlx::query_scalar("SELECT max_participants FROM training_session WHERE id = $1 FOR UPDATE")
                .bind(session_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(max_participants) = max_participants else {
            return Err(AppError::NotFound("Session not found".to_string()));
        };

        let already_member: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM session_participant WHERE session_id = $1 AND user_id = $2)")
                .bind(session_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        if !already_member {
            if let Some(max) = max_participants {
                let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_participant WHERE session_id = $1")
                    .bind(session_id)
                    .fetch_one(&mut *tx)
                    .await?;
                if count >= max as i64 {
                    return Err(AppError::SessionFull);
                }
            }

            sqlx::query("INSERT INTO session_participant (session_id, user_id) VALUES ($1, $2)")
                .bind(session_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_session_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    async fn leave_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session_participant WHERE session_id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM training_session WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(())
    }

    async fn users_share_session(&self, a: &Uuid, b: &Uuid) -> Result<bool, AppError> {
        let shared: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM session_participant pa
                JOIN session_participant pb ON pa.session_id = pb.session_id
                WHERE pa.user_id = $1 AND pb.user_id = $2
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_round_trips() {
        for activity in [ActivityType::Running, ActivityType::Cycling, ActivityType::Swimming] {
            assert_eq!(activity_type_from_db(activity_type_to_db(activity)), activity);
        }
    }

    #[test]
    fn intensity_round_trips() {
        for intensity in [Intensity::Easy, Intensity::Moderate, Intensity::Hard] {
            assert_eq!(intensity_from_db(intensity_to_db(intensity)), intensity);
        }
    }
}
