use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    #[default]
    Public,
    /// Visible only to the owner and to users sharing a session with them.
    Private,
}

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    pub fitness_level: Option<String>,
    pub activities: Vec<String>,
    pub preferred_pace: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub strava_athlete_id: Option<i64>,
    pub strava_username: Option<String>,
    pub visibility: ProfileVisibility,
    pub show_email: bool,
    pub show_strava: bool,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Label used wherever a user is shown: display name when set,
    /// account email otherwise.
    pub fn display_label(&self) -> &str {
        if self.display_name.is_empty() { &self.email } else { &self.display_name }
    }
}

#[derive(Deserialize, Debug, Validate, JsonSchema)]
pub struct ProfileRequest {
    #[validate(length(max = 80))]
    pub display_name: String,
    #[validate(length(max = 1000))]
    pub bio: String,
    #[validate(length(max = 40))]
    pub fitness_level: Option<String>,
    pub activities: Vec<String>,
    #[validate(length(max = 40))]
    pub preferred_pace: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub strava_athlete_id: Option<i64>,
    #[validate(length(max = 80))]
    pub strava_username: Option<String>,
    pub visibility: ProfileVisibility,
    pub show_email: bool,
    pub show_strava: bool,
}

#[derive(Serialize, Debug, Clone, JsonSchema)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub display_name: String,
    /// Present only for the owner or when the profile opts into showing it.
    pub email: Option<String>,
    pub bio: String,
    pub fitness_level: Option<String>,
    pub activities: Vec<String>,
    pub preferred_pace: Option<String>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub strava_username: Option<String>,
}

impl ProfileResponse {
    /// Build the view of `profile` as seen by `viewer_is_owner`.
    /// Email and Strava linkage are redacted per the profile's flags.
    pub fn for_viewer(profile: &Profile, viewer_is_owner: bool) -> Self {
        Self {
            user_id: profile.user_id,
            display_name: profile.display_label().to_string(),
            email: (viewer_is_owner || profile.show_email).then(|| profile.email.clone()),
            bio: profile.bio.clone(),
            fitness_level: profile.fitness_level.clone(),
            activities: profile.activities.clone(),
            preferred_pace: profile.preferred_pace.clone(),
            location: profile.location.clone(),
            image_url: profile.image_url.clone(),
            strava_username: if viewer_is_owner || profile.show_strava {
                profile.strava_username.clone()
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> Profile {
        Profile {
            email: "runner@example.com".to_string(),
            display_name: "Sam".to_string(),
            strava_username: Some("sam-runs".to_string()),
            ..Profile::default()
        }
    }

    #[test]
    fn display_label_falls_back_to_email() {
        let mut profile = sample_profile();
        profile.display_name.clear();
        assert_eq!(profile.display_label(), "runner@example.com");
    }

    #[test]
    fn email_hidden_from_other_viewers_by_default() {
        let profile = sample_profile();
        let view = ProfileResponse::for_viewer(&profile, false);
        assert!(view.email.is_none());
        assert!(view.strava_username.is_none());
    }

    #[test]
    fn owner_always_sees_own_email_and_strava() {
        let profile = sample_profile();
        let view = ProfileResponse::for_viewer(&profile, true);
        assert_eq!(view.email.as_deref(), Some("runner@example.com"));
        assert_eq!(view.strava_username.as_deref(), Some("sam-runs"));
    }
}
