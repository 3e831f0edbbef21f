use crate::models::profile::ProfileResponse;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Running,
    Cycling,
    Swimming,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Easy,
    #[default]
    Moderate,
    Hard,
}

/// A scheduled group training activity with a host and participants.
/// The host is always present in `participants`.
#[derive(Debug, Clone, Default)]
pub struct TrainingSession {
    pub id: Uuid,
    pub host_user_id: Uuid,
    pub host_email: String,
    pub title: String,
    pub description: String,
    pub activity_type: ActivityType,
    pub intensity: Intensity,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub distance: Option<String>,
    pub max_participants: Option<i32>,
    pub participants: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TrainingSession {
    /// True when the session can take no further participants.
    pub fn is_full(&self) -> bool {
        match self.max_participants {
            Some(max) => self.participants.len() >= max as usize,
            None => false,
        }
    }
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct SessionRequest {
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: String,
    pub activity_type: ActivityType,
    pub intensity: Intensity,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[validate(length(min = 2, max = 200))]
    pub location: String,
    #[validate(length(max = 50))]
    pub distance: Option<String>,
    #[validate(range(min = 2, max = 500))]
    pub max_participants: Option<i32>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub host_user_id: Uuid,
    pub title: String,
    pub description: String,
    pub activity_type: ActivityType,
    pub intensity: Intensity,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub distance: Option<String>,
    pub max_participants: Option<i32>,
    pub participant_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&TrainingSession> for SessionResponse {
    fn from(session: &TrainingSession) -> Self {
        Self {
            id: session.id,
            host_user_id: session.host_user_id,
            title: session.title.clone(),
            description: session.description.clone(),
            activity_type: session.activity_type,
            intensity: session.intensity,
            date: session.date,
            time: session.time,
            location: session.location.clone(),
            distance: session.distance.clone(),
            max_participants: session.max_participants,
            participant_count: session.participants.len() as i64,
            created_at: session.created_at,
        }
    }
}

/// Detail view: the session plus the host and participant profiles.
#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub host: Option<ProfileResponse>,
    pub participant_profiles: Vec<ProfileResponse>,
}

#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionStats {
    pub total_sessions: i64,
    pub upcoming_sessions: i64,
    pub hosted_sessions: i64,
    pub total_participants: i64,
}

/// Dashboard view: the user's hosted and joined sessions plus headline stats.
#[derive(Serialize, Debug, JsonSchema)]
pub struct SessionSummaryResponse {
    pub stats: SessionStats,
    pub hosted: Vec<SessionResponse>,
    pub joined: Vec<SessionResponse>,
}

#[cfg(test)]
mod tests {
    use crate::test_utils::sample_session;
    use uuid::Uuid;

    #[test]
    fn unbounded_session_is_never_full() {
        let session = sample_session(Uuid::new_v4(), &[Uuid::new_v4(), Uuid::new_v4()]);
        assert!(!session.is_full());
    }

    #[test]
    fn session_is_full_exactly_at_the_bound() {
        // host plus one participant, room for three
        let mut session = sample_session(Uuid::new_v4(), &[Uuid::new_v4()]);
        session.max_participants = Some(3);
        assert!(!session.is_full());

        session.participants.push(Uuid::new_v4());
        assert!(session.is_full());
    }
}
