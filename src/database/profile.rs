use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::profile::{Profile, ProfileRequest, ProfileVisibility};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    email: String,
    display_name: String,
    bio: String,
    fitness_level: Option<String>,
    activities: Vec<String>,
    preferred_pace: Option<String>,
    location: Option<String>,
    image_url: Option<String>,
    strava_athlete_id: Option<i64>,
    strava_username: Option<String>,
    visibility: String,
    show_email: bool,
    show_strava: bool,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            email: row.email,
            display_name: row.display_name,
            bio: row.bio,
            fitness_level: row.fitness_level,
            activities: row.activities,
            preferred_pace: row.preferred_pace,
            location: row.location,
            image_url: row.image_url,
            strava_athlete_id: row.strava_athlete_id,
            strava_username: row.strava_username,
            visibility: visibility_from_db(&row.visibility),
            show_email: row.show_email,
            show_strava: row.show_strava,
            updated_at: row.updated_at,
        }
    }
}

pub fn visibility_from_db<T: AsRef<str>>(value: T) -> ProfileVisibility {
    match value.as_ref() {
        "public" => ProfileVisibility::Public,
        "private" => ProfileVisibility::Private,
        other => panic!("Unknown profile visibility: {}", other),
    }
}

pub fn visibility_to_db(value: ProfileVisibility) -> &'static str {
    match value {
        ProfileVisibility::Public => "public",
        ProfileVisibility::Private => "private",
    }
}

const PROFILE_SELECT: &str = r#"
    SELECT
        p.user_id,
        u.email,
        p.display_name,
        p.bio,
        p.fitness_level,
        p.activities,
        p.preferred_pace,
        p.location,
        p.image_url,
        p.strava_athlete_id,
        p.strava_username,
        p.visibility,
        p.show_email,
        p.show_strava,
        p.updated_at
    FROM profile p
    JOIN users u ON u.id = p.user_id
"#;

#[async_trait::async_trait]
pub trait ProfileRepository {
    async fn get_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, AppError>;
    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, AppError>;
    async fn upsert_profile(&self, user_id: &Uuid, request: &ProfileRequest) -> Result<Profile, AppError>;
}

#[async_trait::async_trait]
impl ProfileRepository for PostgresRepository {
    async fn get_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, AppError> {
        let query = format!("{} WHERE p.user_id = $1", PROFILE_SELECT);
        let row = sqlx::query_as::<_, ProfileRow>(&query).bind(user_id).fetch_optional(&self.pool).await?;

        Ok(row.map(Profile::from))
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, AppError> {
        let query = format!("{} WHERE p.user_id = ANY($1)", PROFILE_SELECT);
        let rows = sqlx::query_as::<_, ProfileRow>(&query).bind(user_ids).fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn upsert_profile(&self, user_id: &Uuid, request: &ProfileRequest) -> Result<Profile, AppError> {
        let query = r#"
            WITH upserted AS (
                INSERT INTO profile (
                    user_id, display_name, bio, fitness_level, activities,
                    preferred_pace, location, image_url, strava_athlete_id,
                    strava_username, visibility, show_email, show_strava, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now())
                ON CONFLICT (user_id) DO UPDATE SET
                    display_name = EXCLUDED.display_name,
                    bio = EXCLUDED.bio,
                    fitness_level = EXCLUDED.fitness_level,
                    activities = EXCLUDED.activities,
                    preferred_pace = EXCLUDED.preferred_pace,
                    location = EXCLUDED.location,
                    image_url = EXCLUDED.image_url,
                    strava_athlete_id = EXCLUDED.strava_athlete_id,
                    strava_username = EXCLUDED.strava_username,
                    visibility = EXCLUDED.visibility,
                    show_email = EXCLUDED.show_email,
                    show_strava = EXCLUDED.show_strava,
                    updated_at = now()
                RETURNING user_id, display_name, bio, fitness_level, activities,
                          preferred_pace, location, image_url, strava_athlete_id,
                          strava_username, visibility, show_email, show_strava, updated_at
            )
            SELECT p.user_id, u.email, p.display_name, p.bio, p.fitness_level,
                   p.activities, p.preferred_pace, p.location, p.image_url,
                   p.strava_athlete_id, p.strava_username, p.visibility,
                   p.show_email, p.show_strava, p.updated_at
            FROM upserted p
            JOIN users u ON u.id = p.user_id
            "#;

        let row = sqlx::query_as::<_, ProfileRow>(query)
            .bind(user_id)
            .bind(&request.display_name)
            .bind(&request.bio)
            .bind(&request.fitness_level)
            .bind(&request.activities)
            .bind(&request.preferred_pace)
            .bind(&request.location)
            .bind(&request.image_url)
            .bind(request.strava_athlete_id)
            .bind(&request.strava_username)
            .bind(visibility_to_db(request.visibility))
            .bind(request.show_email)
            .bind(request.show_strava)
            .fetch_one(&self.pool)
            .await?;

        Ok(Profile::from(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_round_trips() {
        for visibility in [ProfileVisibility::Public, ProfileVisibility::Private] {
            assert_eq!(visibility_from_db(visibility_to_db(visibility)), visibility);
        }
    }
}
