use crate::database::message::MessageRepository;
use crate::database::profile::ProfileRepository;
use crate::database::read_marker::ReadMarkerRepository;
use crate::database::training_session::TrainingSessionRepository;
use crate::error::app_error::AppError;
use crate::models::message::Message;
use crate::models::notification::{NotificationDigest, NotificationItem};
use crate::models::read_marker::ReadMarker;
use crate::models::training_session::TrainingSession;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// Aggregates unread chat messages across every session the user hosts or
/// joined into a single digest, driven by a per-user read marker.
pub struct NotificationService<'a, R> {
    repository: &'a R,
}

impl<'a, R> NotificationService<'a, R>
where
    R: TrainingSessionRepository + MessageRepository + ReadMarkerRepository + ProfileRepository + Sync,
{
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Everything the user has not seen yet, newest first. Reading the
    /// digest never moves the read marker; that only happens through
    /// [`mark_checked`](Self::mark_checked).
    pub async fn compute_unread(&self, user_id: &Uuid) -> Result<NotificationDigest, AppError> {
        let sessions = self.repository.list_sessions_for_member(user_id).await?;
        let since = self.last_checked_at(user_id).await?;

        let fetches = sessions.iter().map(|session| async move {
            match self.repository.list_messages_for_session(&session.id).await {
                Ok(messages) => Ok(Some((session, messages))),
                // A session can be deleted between listing and fetching its
                // messages. The digest stays best-effort in that window.
                Err(AppError::NotFound(_)) => {
                    warn!(session_id = %session.id, "session disappeared while collecting notifications, skipping");
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        });

        let mut items = Vec::new();
        for (session, messages) in try_join_all(fetches).await?.into_iter().flatten() {
            items.extend(
                messages
                    .iter()
                    .filter(|message| is_unread(message, user_id, since))
                    .map(|message| notification_item(session, message)),
            );
        }

        let labels = self.author_labels(&items).await?;
        apply_author_labels(&mut items, &labels);
        sort_newest_first(&mut items);

        debug!(user_id = %user_id, count = items.len(), "computed unread notifications");
        Ok(NotificationDigest {
            count: items.len() as i64,
            items,
        })
    }

    /// Advances the read marker, defaulting to the current time. Passing an
    /// explicit timestamp lets a client acknowledge exactly what it rendered
    /// without racing messages that arrived since.
    pub async fn mark_checked(&self, user_id: &Uuid, checked_at: Option<DateTime<Utc>>) -> Result<ReadMarker, AppError> {
        let last_checked_at = checked_at.unwrap_or_else(Utc::now);
        self.repository.set_read_marker(user_id, last_checked_at).await?;
        Ok(ReadMarker {
            user_id: *user_id,
            last_checked_at,
        })
    }

    // Users without a marker row have seen nothing, so everything counts.
    async fn last_checked_at(&self, user_id: &Uuid) -> Result<DateTime<Utc>, AppError> {
        Ok(self
            .repository
            .get_read_marker(user_id)
            .await?
            .map(|marker| marker.last_checked_at)
            .unwrap_or(DateTime::UNIX_EPOCH))
    }

    async fn author_labels(&self, items: &[NotificationItem]) -> Result<HashMap<Uuid, String>, AppError> {
        let mut author_ids: Vec<Uuid> = items.iter().map(|item| item.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let profiles = self.repository.get_profiles(&author_ids).await?;
        Ok(profiles
            .into_iter()
            .map(|profile| (profile.user_id, profile.display_label().to_string()))
            .collect())
    }
}

/// A user belongs to a session when they host it or appear in its
/// participant list.
pub fn is_member(session: &TrainingSession, user_id: &Uuid) -> bool {
    session.host_user_id == *user_id || session.participants.contains(user_id)
}

/// Own messages never count as unread, and only messages strictly newer
/// than the marker do.
pub fn is_unread(message: &Message, user_id: &Uuid, since: DateTime<Utc>) -> bool {
    message.author_user_id != *user_id && message.created_at > since
}

/// Newest first; equal timestamps fall back to the message id so the order
/// is stable across requests.
pub fn sort_newest_first(items: &mut [NotificationItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.message_id.cmp(&b.message_id)));
}

fn notification_item(session: &TrainingSession, message: &Message) -> NotificationItem {
    NotificationItem {
        message_id: message.id,
        session_id: session.id,
        session_title: session.title.clone(),
        author_id: message.author_user_id,
        // Email is the fallback label, replaced when the author has a profile
        author_label: message.author_email.clone(),
        text: message.body.clone(),
        created_at: message.created_at,
    }
}

fn apply_author_labels(items: &mut [NotificationItem], labels: &HashMap<Uuid, String>) {
    for item in items.iter_mut() {
        if let Some(label) = labels.get(&item.author_id) {
            item.author_label = label.clone();
        }
    }
}
