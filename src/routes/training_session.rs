use crate::auth::CurrentUser;
use crate::database::message::MessageRepository;
use crate::database::postgres_repository::PostgresRepository;
use crate::database::profile::ProfileRepository;
use crate::database::training_session::TrainingSessionRepository;
use crate::error::app_error::AppError;
use crate::models::message::{MessageRequest, MessageResponse};
use crate::models::profile::{Profile, ProfileResponse, ProfileVisibility};
use crate::models::training_session::{
    ActivityType, Intensity, SessionDetailResponse, SessionRequest, SessionResponse, SessionStats, SessionSummaryResponse,
    TrainingSession,
};
use crate::service::email::EmailService;
use crate::service::notification::is_member;
use chrono::{NaiveDate, Utc};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

fn parse_activity(value: &str) -> Result<ActivityType, AppError> {
    match value {
        "running" => Ok(ActivityType::Running),
        "cycling" => Ok(ActivityType::Cycling),
        "swimming" => Ok(ActivityType::Swimming),
        other => Err(AppError::BadRequest(format!("Unknown activity type: {}", other))),
    }
}

fn parse_intensity(value: &str) -> Result<Intensity, AppError> {
    match value {
        "easy" => Ok(Intensity::Easy),
        "moderate" => Ok(Intensity::Moderate),
        "hard" => Ok(Intensity::Hard),
        other => Err(AppError::BadRequest(format!("Unknown intensity: {}", other))),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| AppError::BadRequest(format!("Invalid date: {}", value)))
}

/// Hosts can always remove their own sessions, admins can remove any.
fn can_delete(session: &TrainingSession, user_id: &Uuid, user_email: &str, admin_emails: &[String]) -> bool {
    session.host_user_id == *user_id || admin_emails.iter().any(|admin| admin == user_email)
}

/// Splits the user's sessions into hosted and joined and derives the
/// headline stats shown on the dashboard.
fn build_summary(sessions: Vec<TrainingSession>, user_id: &Uuid, today: NaiveDate) -> SessionSummaryResponse {
    let upcoming_sessions = sessions.iter().filter(|s| s.date >= today).count() as i64;
    let (hosted, joined): (Vec<TrainingSession>, Vec<TrainingSession>) =
        sessions.into_iter().partition(|s| s.host_user_id == *user_id);

    // Seats filled across the sessions the user hosts
    let total_participants = hosted.iter().map(|s| s.participants.len() as i64).sum();

    SessionSummaryResponse {
        stats: SessionStats {
            total_sessions: (hosted.len() + joined.len()) as i64,
            upcoming_sessions,
            hosted_sessions: hosted.len() as i64,
            total_participants,
        },
        hosted: hosted.iter().map(SessionResponse::from).collect(),
        joined: joined.iter().map(SessionResponse::from).collect(),
    }
}

/// Which participant profiles the viewer may see on the detail page.
/// Private profiles stay hidden unless the viewer shares the session or
/// owns the profile.
fn visible_profiles(profiles: Vec<Profile>, session: &TrainingSession, viewer_id: &Uuid) -> Vec<ProfileResponse> {
    let viewer_is_participant = is_member(session, viewer_id);
    profiles
        .into_iter()
        .filter(|p| p.visibility == ProfileVisibility::Public || p.user_id == *viewer_id || viewer_is_participant)
        .map(|p| {
            let owner = p.user_id == *viewer_id;
            ProfileResponse::for_viewer(&p, owner)
        })
        .collect()
}

/// Publish a new session; the host is enrolled as its first participant
#[openapi(tag = "Sessions")]
#[post("/", data = "<payload>")]
pub async fn post_session(
    pool: &State<PgPool>,
    email_service: &State<Arc<EmailService>>,
    current_user: CurrentUser,
    payload: Json<SessionRequest>,
) -> Result<(Status, Json<SessionResponse>), AppError> {
    payload.validate()?;
    if payload.date < Utc::now().date_naive() {
        return Err(AppError::BadRequest("Session date cannot be in the past".to_string()));
    }

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let session = repo.create_session(&payload, &current_user.id).await?;

    let mailer = Arc::clone(email_service);
    let confirmation = session.clone();
    let host_email = current_user.email.clone();
    rocket::tokio::spawn(async move {
        if let Err(err) = mailer.send_session_created(&host_email, &confirmation).await {
            warn!(session_id = %confirmation.id, error = %err, "failed to send session creation email");
        }
    });

    Ok((Status::Created, Json(SessionResponse::from(&session))))
}

/// Browse all sessions, optionally filtered
#[openapi(tag = "Sessions")]
#[get("/?<activity_type>&<intensity>&<date>")]
pub async fn get_sessions(
    pool: &State<PgPool>,
    _current_user: CurrentUser,
    activity_type: Option<String>,
    intensity: Option<String>,
    date: Option<String>,
) -> Result<Json<Vec<SessionResponse>>, AppError> {
    let activity_filter = activity_type.as_deref().map(parse_activity).transpose()?;
    let intensity_filter = intensity.as_deref().map(parse_intensity).transpose()?;
    let date_filter = date.as_deref().map(parse_date).transpose()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let sessions = repo.list_sessions().await?;

    let responses = sessions
        .iter()
        .filter(|s| activity_filter.is_none_or(|a| s.activity_type == a))
        .filter(|s| intensity_filter.is_none_or(|i| s.intensity == i))
        .filter(|s| date_filter.is_none_or(|d| s.date == d))
        .map(SessionResponse::from)
        .collect();
    Ok(Json(responses))
}

/// The current user's hosted and joined sessions with stats
#[openapi(tag = "Sessions")]
#[get("/summary")]
pub async fn get_summary(pool: &State<PgPool>, current_user: CurrentUser) -> Result<Json<SessionSummaryResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let sessions = repo.list_sessions_for_member(&current_user.id).await?;
    Ok(Json(build_summary(sessions, &current_user.id, Utc::now().date_naive())))
}

/// Session details including host and participant profiles
#[openapi(tag = "Sessions")]
#[get("/<id>")]
pub async fn get_session(pool: &State<PgPool>, current_user: CurrentUser, id: &str) -> Result<Json<SessionDetailResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let session = repo
        .get_session_by_id(&uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    let host = repo
        .get_profile(&session.host_user_id)
        .await?
        .map(|p| {
            let owner = p.user_id == current_user.id;
            ProfileResponse::for_viewer(&p, owner)
        });

    let profiles = repo.get_profiles(&session.participants).await?;
    let participant_profiles = visible_profiles(profiles, &session, &current_user.id);

    Ok(Json(SessionDetailResponse {
        session: SessionResponse::from(&session),
        host,
        participant_profiles,
    }))
}

/// Join a session; fails with 409 when it is already full
#[openapi(tag = "Sessions")]
#[post("/<id>/join")]
pub async fn post_join(
    pool: &State<PgPool>,
    email_service: &State<Arc<EmailService>>,
    current_user: CurrentUser,
    id: &str,
) -> Result<Json<SessionResponse>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let session = repo.join_session(&uuid, &current_user.id).await?;

    let joiner_label = match repo.get_profile(&current_user.id).await {
        Ok(Some(profile)) => profile.display_label().to_string(),
        _ => current_user.email.clone(),
    };

    let mailer = Arc::clone(email_service);
    let joined = session.clone();
    rocket::tokio::spawn(async move {
        if let Err(err) = mailer.send_session_joined(&joined.host_email, &joined, &joiner_label).await {
            warn!(session_id = %joined.id, error = %err, "failed to send join notification email");
        }
    });

    Ok(Json(SessionResponse::from(&session)))
}

/// Leave a session
#[openapi(tag = "Sessions")]
#[post("/<id>/leave")]
pub async fn post_leave(pool: &State<PgPool>, current_user: CurrentUser, id: &str) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    repo.leave_session(&uuid, &current_user.id).await?;
    Ok(Status::Ok)
}

/// Delete a session with its messages; host or admin only
#[openapi(tag = "Sessions")]
#[delete("/<id>")]
pub async fn delete_session(
    pool: &State<PgPool>,
    config: &State<crate::Config>,
    current_user: CurrentUser,
    id: &str,
) -> Result<Status, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let session = repo
        .get_session_by_id(&uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    if !can_delete(&session, &current_user.id, &current_user.email, &config.admin.emails) {
        return Err(AppError::Forbidden);
    }

    repo.delete_session(&uuid).await?;
    Ok(Status::NoContent)
}

/// Chat history of a session, oldest first; members only
#[openapi(tag = "Messages")]
#[get("/<id>/messages")]
pub async fn get_messages(pool: &State<PgPool>, current_user: CurrentUser, id: &str) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let session = repo
        .get_session_by_id(&uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    if !is_member(&session, &current_user.id) {
        return Err(AppError::Forbidden);
    }

    let messages = repo.list_messages_for_session(&uuid).await?;
    Ok(Json(messages.iter().map(MessageResponse::from).collect()))
}

/// Post a message to a session's chat; members only
#[openapi(tag = "Messages")]
#[post("/<id>/messages", data = "<payload>")]
pub async fn post_message(
    pool: &State<PgPool>,
    current_user: CurrentUser,
    id: &str,
    payload: Json<MessageRequest>,
) -> Result<(Status, Json<MessageResponse>), AppError> {
    payload.validate()?;

    let repo = PostgresRepository { pool: pool.inner().clone() };
    let uuid = Uuid::parse_str(id)?;
    let session = repo
        .get_session_by_id(&uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
    if !is_member(&session, &current_user.id) {
        return Err(AppError::Forbidden);
    }

    let message = repo.create_message(&uuid, &current_user.id, &payload.body).await?;
    Ok((Status::Created, Json(MessageResponse::from(&message))))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![
        post_session,
        get_sessions,
        get_summary,
        get_session,
        post_join,
        post_leave,
        delete_session,
        get_messages,
        post_message
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockRepository, sample_profile, sample_session};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    #[test]
    fn parse_activity_accepts_known_values() {
        assert_eq!(parse_activity("cycling").unwrap(), ActivityType::Cycling);
        assert!(parse_activity("rowing").is_err());
    }

    #[test]
    fn parse_intensity_accepts_known_values() {
        assert_eq!(parse_intensity("hard").unwrap(), Intensity::Hard);
        assert!(parse_intensity("brutal").is_err());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("2026-09-12").unwrap(), day(12));
        assert!(parse_date("12/09/2026").is_err());
    }

    #[test]
    fn host_can_delete_own_session() {
        let host = Uuid::new_v4();
        let session = sample_session(host, &[]);
        assert!(can_delete(&session, &host, "host@example.com", &[]));
    }

    #[test]
    fn admin_can_delete_any_session() {
        let session = sample_session(Uuid::new_v4(), &[]);
        let admins = vec!["admin@example.com".to_string()];
        assert!(can_delete(&session, &Uuid::new_v4(), "admin@example.com", &admins));
    }

    #[test]
    fn participant_cannot_delete_session() {
        let participant = Uuid::new_v4();
        let session = sample_session(Uuid::new_v4(), &[participant]);
        assert!(!can_delete(&session, &participant, "member@example.com", &[]));
    }

    #[test]
    fn summary_partitions_hosted_and_joined() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut hosted = sample_session(user, &[other]);
        hosted.date = day(20);
        let mut joined = sample_session(other, &[user]);
        joined.date = day(1);

        let summary = build_summary(vec![hosted, joined], &user, day(10));

        assert_eq!(summary.stats.total_sessions, 2);
        assert_eq!(summary.stats.hosted_sessions, 1);
        assert_eq!(summary.stats.upcoming_sessions, 1);
        assert_eq!(summary.hosted.len(), 1);
        assert_eq!(summary.joined.len(), 1);
    }

    #[test]
    fn summary_counts_seats_in_hosted_sessions_only() {
        let user = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let hosted = sample_session(user, &[a, b]);
        let joined = sample_session(a, &[user, b]);

        let summary = build_summary(vec![hosted, joined], &user, day(1));
        // host plus two participants
        assert_eq!(summary.stats.total_participants, 3);
    }

    #[test]
    fn private_profiles_hidden_from_outsiders() {
        let member = Uuid::new_v4();
        let session = sample_session(Uuid::new_v4(), &[member]);
        let mut profile = sample_profile(member, "Quiet runner");
        profile.visibility = ProfileVisibility::Private;

        let outsider = Uuid::new_v4();
        assert!(visible_profiles(vec![profile.clone()], &session, &outsider).is_empty());

        // Co-members still see each other
        let co_member = session.host_user_id;
        assert_eq!(visible_profiles(vec![profile], &session, &co_member).len(), 1);
    }

    #[tokio::test]
    async fn join_full_session_returns_conflict() {
        let host = Uuid::new_v4();
        let mut session = sample_session(host, &[Uuid::new_v4()]);
        session.max_participants = Some(3);
        let id = session.id;
        let repo = MockRepository::default().with_session(session);

        // last open seat
        let joined = repo.join_session(&id, &Uuid::new_v4()).await.unwrap();
        assert!(joined.is_full());

        let err = repo.join_session(&id, &Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::SessionFull));
    }

    #[tokio::test]
    async fn rejoining_a_full_session_stays_a_no_op() {
        let host = Uuid::new_v4();
        let mut session = sample_session(host, &[]);
        session.max_participants = Some(1);
        let id = session.id;
        let repo = MockRepository::default().with_session(session);

        let joined = repo.join_session(&id, &host).await.unwrap();
        assert_eq!(joined.participants, vec![host]);
    }
}
