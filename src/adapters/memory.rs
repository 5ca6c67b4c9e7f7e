//! Ephemeral [`Store`] used by tests. The seeding helpers stand in for the marketplace
//! application that owns users, jobs, applications and ratings.

use crate::adapters::store::{NewMessage, Store};
use crate::domain::activity::{Application, ApplicationStatus, Job, JobId, JobStatus, Rating};
use crate::domain::badge::{ActivityQuery, Category};
use crate::domain::conversation::{
    Conversation, ConversationCreation, ConversationId, ConversationSummary, ParticipantPair,
};
use crate::domain::message::{Message, MessageId};
use crate::domain::notification::{NewNotification, Notification, NotificationId};
use crate::domain::user::{Role, User, UserId};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, User>,
    conversations: BTreeMap<ConversationId, Conversation>,
    pairs: HashMap<ParticipantPair, ConversationId>,
    messages: BTreeMap<MessageId, Message>,
    notifications: BTreeMap<NotificationId, Notification>,
    markers: HashMap<(UserId, Category), OffsetDateTime>,
    jobs: Vec<Job>,
    applications: Vec<Application>,
    ratings: Vec<Rating>,
    next_id: i64,
    last_timestamp: Option<OffsetDateTime>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Wall clock, nudged forward so that consecutive writes never share a timestamp.
    fn now(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn push_message(&mut self, message: NewMessage) -> Result<Message> {
        let created_at = self.now();
        let id = self.next_id();
        let conversation = self.conversations.get_mut(&message.conversation_id).ok_or(AppError::NotFound)?;
        if created_at > conversation.last_message_at {
            conversation.last_message_at = created_at;
        }
        let record = Message {
            id,
            conversation_id: message.conversation_id,
            is_system_message: message.sender_id.is_none(),
            sender_id: message.sender_id,
            content: message.content,
            is_read: false,
            created_at,
        };
        self.messages.insert(id, record.clone());
        Ok(record)
    }

    fn is_unread_for(message: &Message, user_id: UserId) -> bool {
        !message.is_read && message.sender_id.is_some_and(|sender| sender != user_id)
    }

    fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == job_id)
    }
}

/// Ephemeral store for local development and tests. Holds the same invariants as the
/// Postgres store (one conversation per pair, monotonic read flags) behind a single lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user_id: UserId, display_name: &str, role: Role) {
        let mut inner = self.inner.lock().await;
        inner.users.insert(
            user_id,
            User { id: user_id, display_name: display_name.to_string(), role, deleted_at: None },
        );
    }

    pub async fn soft_delete_user(&self, user_id: UserId) {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.deleted_at = Some(now);
        }
    }

    pub async fn insert_job(&self, recruiter_id: UserId) -> JobId {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let created_at = inner.now();
        inner.jobs.push(Job { id, recruiter_id, status: JobStatus::Open, created_at });
        id
    }

    pub async fn close_job(&self, job_id: JobId) {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.iter_mut().find(|j| j.id == job_id) {
            job.status = JobStatus::Closed;
        }
    }

    pub async fn insert_application(&self, job_id: JobId, freelancer_id: UserId) -> i64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let updated_at = inner.now();
        inner.applications.push(Application {
            id,
            job_id,
            freelancer_id,
            status: ApplicationStatus::Pending,
            updated_at,
        });
        id
    }

    pub async fn set_application_status(&self, application_id: i64, status: ApplicationStatus) {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        if let Some(application) = inner.applications.iter_mut().find(|a| a.id == application_id) {
            application.status = status;
            application.updated_at = now;
        }
    }

    pub async fn insert_rating(&self, ratee_id: UserId) -> i64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let created_at = inner.now();
        inner.ratings.push(Rating { id, ratee_id, created_at });
        id
    }

    pub async fn conversation_count(&self) -> usize {
        self.inner.lock().await.conversations.len()
    }

    pub async fn message_count(&self, conversation_id: ConversationId) -> usize {
        self.inner.lock().await.messages.values().filter(|m| m.conversation_id == conversation_id).count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }

    async fn find_conversation(&self, conversation_id: ConversationId) -> Result<Option<Conversation>> {
        Ok(self.inner.lock().await.conversations.get(&conversation_id).cloned())
    }

    async fn create_conversation(
        &self,
        pair: ParticipantPair,
        sender_id: UserId,
        content: String,
    ) -> Result<ConversationCreation> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.pairs.get(&pair).and_then(|id| inner.conversations.get(id)) {
            return Ok(ConversationCreation::Existing(existing.clone()));
        }

        let id = inner.next_id();
        let created_at = inner.now();
        inner
            .conversations
            .insert(id, Conversation { id, participants: pair, created_at, last_message_at: created_at });
        inner.pairs.insert(pair, id);

        let message = inner.push_message(NewMessage { conversation_id: id, sender_id: Some(sender_id), content })?;
        let conversation = inner.conversations.get(&id).cloned().ok_or(AppError::Internal)?;
        Ok(ConversationCreation::Created { conversation, message })
    }

    async fn list_conversations(&self, user_id: UserId, preview_length: usize) -> Result<Vec<ConversationSummary>> {
        let inner = self.inner.lock().await;
        let mut summaries: Vec<ConversationSummary> = inner
            .conversations
            .values()
            .filter_map(|conversation| {
                let other_id = conversation.participants.other(user_id)?;
                let other = inner.users.get(&other_id);
                let messages: Vec<&Message> =
                    inner.messages.values().filter(|m| m.conversation_id == conversation.id).collect();
                let last = messages.iter().max_by_key(|m| (m.created_at, m.id));
                let unread_count = messages.iter().filter(|m| Inner::is_unread_for(m, user_id)).count();
                Some(ConversationSummary {
                    id: conversation.id,
                    other_user_id: other_id,
                    other_display_name: other.map_or_else(|| "Unknown user".to_string(), |u| u.display_name.clone()),
                    other_deleted: other.is_none_or(User::is_deleted),
                    last_message_at: conversation.last_message_at,
                    last_message_preview: last.map(|m| m.preview(preview_length)),
                    unread_count: i64::try_from(unread_count).unwrap_or(i64::MAX),
                })
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at).then(b.id.cmp(&a.id)));
        Ok(summaries)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message> {
        self.inner.lock().await.push_message(message)
    }

    async fn find_message(&self, message_id: MessageId) -> Result<Option<Message>> {
        Ok(self.inner.lock().await.messages.get(&message_id).cloned())
    }

    async fn list_messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let inner = self.inner.lock().await;
        let mut messages: Vec<Message> =
            inner.messages.values().filter(|m| m.conversation_id == conversation_id).cloned().collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }

    async fn mark_messages_read(&self, conversation_id: ConversationId, reader: UserId) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let mut changed = 0;
        for message in inner.messages.values_mut() {
            if message.conversation_id == conversation_id && Inner::is_unread_for(message, reader) {
                message.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_message(&self, message_id: MessageId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(removed) = inner.messages.remove(&message_id) else {
            return Ok(false);
        };

        let latest = inner
            .messages
            .values()
            .filter(|m| m.conversation_id == removed.conversation_id)
            .map(|m| m.created_at)
            .max();
        if let Some(conversation) = inner.conversations.get_mut(&removed.conversation_id) {
            conversation.last_message_at = latest.unwrap_or(conversation.created_at);
        }
        Ok(true)
    }

    async fn count_unread_messages(&self, user_id: UserId) -> Result<i64> {
        let inner = self.inner.lock().await;
        let count = inner
            .messages
            .values()
            .filter(|m| {
                inner.conversations.get(&m.conversation_id).is_some_and(|c| c.is_participant(user_id))
                    && Inner::is_unread_for(m, user_id)
            })
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let created_at = inner.now();
        let record = Notification {
            id,
            user_id: notification.user_id,
            kind: notification.kind,
            priority: notification.priority,
            title: notification.title,
            message: notification.message,
            action_url: notification.action_url,
            is_read: false,
            created_at,
        };
        inner.notifications.insert(id, record.clone());
        Ok(record)
    }

    async fn list_notifications(&self, user_id: UserId, unread_only: bool, limit: i64) -> Result<Vec<Notification>> {
        let inner = self.inner.lock().await;
        let mut notifications: Vec<Notification> = inner
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        notifications.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, notification_id: NotificationId, user_id: UserId) -> Result<Option<bool>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.notifications.get_mut(&notification_id).filter(|n| n.user_id == user_id).map(|n| {
            let changed = !n.is_read;
            n.is_read = true;
            changed
        }))
    }

    async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let mut changed = 0;
        for notification in inner.notifications.values_mut().filter(|n| n.user_id == user_id && !n.is_read) {
            notification.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_notification(&self, notification_id: NotificationId, user_id: UserId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.notifications.get(&notification_id).is_some_and(|n| n.user_id == user_id) {
            inner.notifications.remove(&notification_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn count_unread_notifications(&self, user_id: UserId) -> Result<i64> {
        let inner = self.inner.lock().await;
        let count = inner.notifications.values().filter(|n| n.user_id == user_id && !n.is_read).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn category_marker(&self, user_id: UserId, category: Category) -> Result<Option<OffsetDateTime>> {
        Ok(self.inner.lock().await.markers.get(&(user_id, category)).copied())
    }

    async fn set_category_marker(
        &self,
        user_id: UserId,
        category: Category,
        viewed_at: Option<OffsetDateTime>,
    ) -> Result<OffsetDateTime> {
        let mut inner = self.inner.lock().await;
        let viewed_at = match viewed_at {
            Some(at) => {
                // Rows written after the marker must sort strictly after it.
                if inner.last_timestamp.is_none_or(|last| last < at) {
                    inner.last_timestamp = Some(at);
                }
                at
            }
            None => inner.now(),
        };
        inner.markers.insert((user_id, category), viewed_at);
        Ok(viewed_at)
    }

    async fn count_activity(&self, user_id: UserId, query: ActivityQuery, since: Option<OffsetDateTime>) -> Result<i64> {
        let inner = self.inner.lock().await;
        let after = |ts: OffsetDateTime| since.is_none_or(|marker| ts > marker);
        let owns_job = |job_id: JobId| inner.job(job_id).is_some_and(|j| j.recruiter_id == user_id);

        let count = match query {
            ActivityQuery::ApplicationDecisions => inner
                .applications
                .iter()
                .filter(|a| a.freelancer_id == user_id && a.status != ApplicationStatus::Pending && after(a.updated_at))
                .count(),
            ActivityQuery::UnappliedOpenJobs => inner
                .jobs
                .iter()
                .filter(|j| {
                    j.status == JobStatus::Open
                        && after(j.created_at)
                        && !inner.applications.iter().any(|a| a.job_id == j.id && a.freelancer_id == user_id)
                })
                .count(),
            ActivityQuery::RatingsReceived => {
                inner.ratings.iter().filter(|r| r.ratee_id == user_id && after(r.created_at)).count()
            }
            ActivityQuery::IncomingApplications => inner
                .applications
                .iter()
                .filter(|a| owns_job(a.job_id) && a.status == ApplicationStatus::Pending && after(a.updated_at))
                .count(),
            ActivityQuery::ResolvedApplications => inner
                .applications
                .iter()
                .filter(|a| owns_job(a.job_id) && a.status.is_resolved() && after(a.updated_at))
                .count(),
        };
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}
