use crate::database::message::MessageRepository;
use crate::database::profile::ProfileRepository;
use crate::database::read_marker::ReadMarkerRepository;
use crate::database::training_session::TrainingSessionRepository;
use crate::error::app_error::AppError;
use crate::models::message::Message;
use crate::models::profile::{Profile, ProfileRequest, ProfileVisibility};
use crate::models::read_marker::ReadMarker;
use crate::models::training_session::{ActivityType, Intensity, SessionRequest, TrainingSession};
use crate::service::notification::is_member;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory stand-in for the Postgres repository. State is seeded through
/// the `with_*` builders and mutated by the write operations, so tests can
/// drive the same code paths the real store does.
#[derive(Default)]
pub struct MockRepository {
    sessions: Mutex<Vec<TrainingSession>>,
    messages: Mutex<Vec<Message>>,
    markers: Mutex<HashMap<Uuid, DateTime<Utc>>>,
    profiles: Mutex<Vec<Profile>>,
    // Sessions that error with NotFound when their messages are fetched,
    // simulating a delete racing the notification scan.
    vanished: Mutex<Vec<Uuid>>,
}

impl MockRepository {
    pub fn with_session(self, session: TrainingSession) -> Self {
        self.sessions.lock().unwrap().push(session);
        self
    }

    pub fn with_message(self, message: Message) -> Self {
        self.messages.lock().unwrap().push(message);
        self
    }

    pub fn with_marker(self, user_id: Uuid, last_checked_at: DateTime<Utc>) -> Self {
        self.markers.lock().unwrap().insert(user_id, last_checked_at);
        self
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.profiles.lock().unwrap().push(profile);
        self
    }

    pub fn with_vanished_session(self, session_id: Uuid) -> Self {
        self.vanished.lock().unwrap().push(session_id);
        self
    }
}

#[async_trait::async_trait]
impl TrainingSessionRepository for MockRepository {
    async fn create_session(&self, request: &SessionRequest, host_user_id: &Uuid) -> Result<TrainingSession, AppError> {
        let session = TrainingSession {
            id: Uuid::new_v4(),
            host_user_id: *host_user_id,
            host_email: "host@example.com".to_string(),
            title: request.title.clone(),
            description: request.description.clone(),
            activity_type: request.activity_type,
            intensity: request.intensity,
            date: request.date,
            time: request.time,
            location: request.location.clone(),
            distance: request.distance.clone(),
            max_participants: request.max_participants,
            participants: vec![*host_user_id],
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn get_session_by_id(&self, id: &Uuid) -> Result<Option<TrainingSession>, AppError> {
        Ok(self.sessions.lock().unwrap().iter().find(|s| s.id == *id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<TrainingSession>, AppError> {
        let mut sessions = self.sessions.lock().unwrap().clone();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn list_sessions_for_member(&self, user_id: &Uuid) -> Result<Vec<TrainingSession>, AppError> {
        let mut sessions: Vec<TrainingSession> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| is_member(s, user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn join_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<TrainingSession, AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == *session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        if session.participants.contains(user_id) {
            return Ok(session.clone());
        }
        if session.is_full() {
            return Err(AppError::SessionFull);
        }
        session.participants.push(*user_id);
        Ok(session.clone())
    }

    async fn leave_session(&self, session_id: &Uuid, user_id: &Uuid) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == *session_id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        session.participants.retain(|p| p != user_id);
        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<(), AppError> {
        self.sessions.lock().unwrap().retain(|s| s.id != *id);
        self.messages.lock().unwrap().retain(|m| m.session_id != *id);
        Ok(())
    }

    async fn users_share_session(&self, a: &Uuid, b: &Uuid) -> Result<bool, AppError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .any(|s| is_member(s, a) && is_member(s, b)))
    }
}

#[async_trait::async_trait]
impl MessageRepository for MockRepository {
    async fn create_message(&self, session_id: &Uuid, author_user_id: &Uuid, body: &str) -> Result<Message, AppError> {
        if !self.sessions.lock().unwrap().iter().any(|s| s.id == *session_id) {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        let message = Message {
            id: Uuid::new_v4(),
            session_id: *session_id,
            author_user_id: *author_user_id,
            author_email: "author@example.com".to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn list_messages_for_session(&self, session_id: &Uuid) -> Result<Vec<Message>, AppError> {
        if self.vanished.lock().unwrap().contains(session_id) {
            return Err(AppError::NotFound("Session not found".to_string()));
        }

        let mut messages: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_id == *session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }
}

#[async_trait::async_trait]
impl ReadMarkerRepository for MockRepository {
    async fn get_read_marker(&self, user_id: &Uuid) -> Result<Option<ReadMarker>, AppError> {
        Ok(self.markers.lock().unwrap().get(user_id).map(|ts| ReadMarker {
            user_id: *user_id,
            last_checked_at: *ts,
        }))
    }

    async fn set_read_marker(&self, user_id: &Uuid, checked_at: DateTime<Utc>) -> Result<(), AppError> {
        self.markers.lock().unwrap().insert(*user_id, checked_at);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProfileRepository for MockRepository {
    async fn get_profile(&self, user_id: &Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.profiles.lock().unwrap().iter().find(|p| p.user_id == *user_id).cloned())
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, AppError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|p| user_ids.contains(&p.user_id))
            .cloned()
            .collect())
    }

    async fn upsert_profile(&self, user_id: &Uuid, request: &ProfileRequest) -> Result<Profile, AppError> {
        let profile = Profile {
            user_id: *user_id,
            email: "member@example.com".to_string(),
            display_name: request.display_name.clone(),
            bio: request.bio.clone(),
            fitness_level: request.fitness_level.clone(),
            activities: request.activities.clone(),
            preferred_pace: request.preferred_pace.clone(),
            location: request.location.clone(),
            image_url: request.image_url.clone(),
            strava_athlete_id: request.strava_athlete_id,
            strava_username: request.strava_username.clone(),
            visibility: request.visibility,
            show_email: request.show_email,
            show_strava: request.show_strava,
            updated_at: Utc::now(),
        };

        let mut profiles = self.profiles.lock().unwrap();
        profiles.retain(|p| p.user_id != *user_id);
        profiles.push(profile.clone());
        Ok(profile)
    }
}

pub fn sample_session(host_user_id: Uuid, participants: &[Uuid]) -> TrainingSession {
    let mut all_participants = vec![host_user_id];
    all_participants.extend_from_slice(participants);

    TrainingSession {
        id: Uuid::new_v4(),
        host_user_id,
        host_email: "host@example.com".to_string(),
        title: "Morning run".to_string(),
        description: "Easy loop around the lake".to_string(),
        activity_type: ActivityType::Running,
        intensity: Intensity::Easy,
        date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
        time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
        location: "Lakeside park".to_string(),
        distance: Some("10 km".to_string()),
        max_participants: None,
        participants: all_participants,
        created_at: Utc::now(),
    }
}

pub fn sample_message(session_id: Uuid, author_user_id: Uuid, created_at: DateTime<Utc>) -> Message {
    Message {
        id: Uuid::new_v4(),
        session_id,
        author_user_id,
        author_email: "author@example.com".to_string(),
        body: "see you there".to_string(),
        created_at,
    }
}

pub fn sample_profile(user_id: Uuid, display_name: &str) -> Profile {
    Profile {
        user_id,
        email: "member@example.com".to_string(),
        display_name: display_name.to_string(),
        bio: "Weekend runner".to_string(),
        fitness_level: Some("intermediate".to_string()),
        activities: vec!["running".to_string()],
        preferred_pace: Some("5:30/km".to_string()),
        location: Some("Utrecht".to_string()),
        image_url: None,
        strava_athlete_id: None,
        strava_username: None,
        visibility: ProfileVisibility::Public,
        show_email: false,
        show_strava: false,
        updated_at: Utc::now(),
    }
}
