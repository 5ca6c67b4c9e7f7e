use crate::adapters::Store;
use crate::adapters::store::NewMessage;
use crate::config::MessagingConfig;
use crate::domain::conversation::{
    Conversation, ConversationCreation, ConversationId, ConversationSummary, ParticipantPair,
};
use crate::domain::events::DomainEvent;
use crate::domain::message::{Message, MessageId, normalize_content};
use crate::domain::user::UserId;
use crate::error::{AppError, Result};
use crate::services::event_bus::EventBus;
use crate::services::require_admin;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;

#[derive(Clone, Debug)]
struct Metrics {
    messages_sent_total: Counter<u64>,
    messages_read_total: Counter<u64>,
    conversations_started_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("marketplace-relay");
        Self {
            messages_sent_total: meter
                .u64_counter("relay_messages_sent_total")
                .with_description("Messages appended to conversations")
                .build(),
            messages_read_total: meter
                .u64_counter("relay_messages_read_total")
                .with_description("Messages flipped to read")
                .build(),
            conversations_started_total: meter
                .u64_counter("relay_conversations_started_total")
                .with_description("getOrCreate calls by outcome")
                .build(),
        }
    }
}

/// Outcome of starting a conversation. `message` is only present when this call created it.
#[derive(Debug, Clone)]
pub struct StartedConversation {
    pub conversation: Conversation,
    pub created: bool,
    pub message: Option<Message>,
}

#[derive(Clone, Debug)]
pub struct ConversationService {
    store: Arc<dyn Store>,
    events: EventBus,
    config: MessagingConfig,
    metrics: Metrics,
}

impl ConversationService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, events: EventBus, config: MessagingConfig) -> Self {
        Self { store, events, config, metrics: Metrics::new() }
    }

    /// Returns the pair's conversation, creating it with `initial_message` if none exists.
    /// An existing conversation is returned untouched; the initial message is not appended.
    ///
    /// # Errors
    /// - `InvalidTarget` if the target is the initiator or either party does not exist.
    /// - `RecipientUnavailable` if the target's account is soft-deleted.
    /// - `Forbidden` if the initiator's account is soft-deleted.
    /// - `BadRequest` if the message is empty or too long.
    #[tracing::instrument(skip(self, initial_message), err(level = "debug"))]
    pub async fn get_or_create_conversation(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        initial_message: &str,
    ) -> Result<StartedConversation> {
        let pair = ParticipantPair::new(initiator_id, target_id).ok_or(AppError::InvalidTarget)?;

        let (initiator, target) =
            tokio::try_join!(self.store.find_user(initiator_id), self.store.find_user(target_id))?;
        match initiator {
            None => return Err(AppError::InvalidTarget),
            Some(user) if user.is_deleted() => return Err(AppError::Forbidden),
            Some(_) => {}
        }
        match target {
            None => return Err(AppError::InvalidTarget),
            Some(user) if user.is_deleted() => return Err(AppError::RecipientUnavailable),
            Some(_) => {}
        }

        let content = normalize_content(initial_message, self.config.max_content_length).map_err(AppError::BadRequest)?;

        match self.store.create_conversation(pair, initiator_id, content).await? {
            ConversationCreation::Created { conversation, message } => {
                self.metrics.conversations_started_total.add(1, &[KeyValue::new("outcome", "created")]);
                self.metrics.messages_sent_total.add(1, &[KeyValue::new("kind", "user")]);
                self.events.publish(DomainEvent::MessageCreated {
                    conversation_id: conversation.id,
                    participants: conversation.participants.as_array(),
                });
                tracing::info!(conversation_id = conversation.id, "Conversation created");
                Ok(StartedConversation { conversation, created: true, message: Some(message) })
            }
            ConversationCreation::Existing(conversation) => {
                self.metrics.conversations_started_total.add(1, &[KeyValue::new("outcome", "existing")]);
                Ok(StartedConversation { conversation, created: false, message: None })
            }
        }
    }

    /// Appends a message. The recipient is always the other participant.
    ///
    /// # Errors
    /// - `Forbidden` if the conversation is unknown or the sender is not in it.
    /// - `RecipientUnavailable` if the other participant's account is gone.
    /// - `BadRequest` if the content is empty or too long.
    #[tracing::instrument(skip(self, content), err(level = "debug"))]
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
    ) -> Result<Message> {
        let conversation = self.participant_conversation(conversation_id, sender_id).await?;
        let recipient_id = conversation.participants.other(sender_id).ok_or(AppError::Forbidden)?;

        let (sender, recipient) =
            tokio::try_join!(self.store.find_user(sender_id), self.store.find_user(recipient_id))?;
        if sender.is_none_or(|u| u.is_deleted()) {
            return Err(AppError::Forbidden);
        }
        if recipient.is_none_or(|u| u.is_deleted()) {
            return Err(AppError::RecipientUnavailable);
        }

        let content = normalize_content(content, self.config.max_content_length).map_err(AppError::BadRequest)?;
        let message =
            self.store.insert_message(NewMessage { conversation_id, sender_id: Some(sender_id), content }).await?;

        self.metrics.messages_sent_total.add(1, &[KeyValue::new("kind", "user")]);
        self.events.publish(DomainEvent::MessageCreated {
            conversation_id,
            participants: conversation.participants.as_array(),
        });
        Ok(message)
    }

    /// Appends an administrative notice. System messages have no sender and never count as
    /// unread for anyone.
    ///
    /// # Errors
    /// - `Forbidden` unless the actor is an active admin.
    /// - `NotFound` if the conversation does not exist.
    #[tracing::instrument(skip(self, content), err(level = "debug"))]
    pub async fn post_system_message(
        &self,
        actor_id: UserId,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<Message> {
        require_admin(self.store.as_ref(), actor_id).await?;
        let conversation = self.store.find_conversation(conversation_id).await?.ok_or(AppError::NotFound)?;

        let content = normalize_content(content, self.config.max_content_length).map_err(AppError::BadRequest)?;
        let message = self.store.insert_message(NewMessage { conversation_id, sender_id: None, content }).await?;

        self.metrics.messages_sent_total.add(1, &[KeyValue::new("kind", "system")]);
        self.events.publish(DomainEvent::MessageCreated {
            conversation_id,
            participants: conversation.participants.as_array(),
        });
        Ok(message)
    }

    /// Conversations the user participates in, newest activity first.
    ///
    /// # Errors
    /// Returns `AppError::Database` on store failure.
    pub async fn list_conversations(&self, user_id: UserId) -> Result<Vec<ConversationSummary>> {
        self.store.list_conversations(user_id, self.config.preview_length).await
    }

    /// Returns the conversation's messages oldest first. Fetching marks every message
    /// addressed to the requester as read.
    ///
    /// # Errors
    /// Returns `Forbidden` if the requester is not a participant.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn list_messages(&self, conversation_id: ConversationId, requester_id: UserId) -> Result<Vec<Message>> {
        let conversation = self.participant_conversation(conversation_id, requester_id).await?;
        self.mark_read_in(&conversation, requester_id).await?;
        self.store.list_messages(conversation_id).await
    }

    /// Marks every unread message addressed to `reader` in the conversation as read and
    /// returns how many flipped.
    ///
    /// # Errors
    /// Returns `Forbidden` if the reader is not a participant.
    pub async fn mark_messages_read_on_fetch(&self, conversation_id: ConversationId, reader_id: UserId) -> Result<u64> {
        let conversation = self.participant_conversation(conversation_id, reader_id).await?;
        self.mark_read_in(&conversation, reader_id).await
    }

    /// Hard-deletes a message. Only its sender may do this.
    ///
    /// # Errors
    /// Returns `Forbidden` if the message is unknown or belongs to someone else.
    #[tracing::instrument(skip(self), err(level = "debug"))]
    pub async fn delete_message(&self, message_id: MessageId, requester_id: UserId) -> Result<()> {
        let message = self
            .store
            .find_message(message_id)
            .await?
            .filter(|m| m.sender_id == Some(requester_id))
            .ok_or(AppError::Forbidden)?;
        let conversation =
            self.store.find_conversation(message.conversation_id).await?.ok_or(AppError::Forbidden)?;

        if self.store.delete_message(message_id).await? {
            self.events.publish(DomainEvent::MessageDeleted {
                conversation_id: conversation.id,
                participants: conversation.participants.as_array(),
            });
        }
        Ok(())
    }

    /// Unread messages addressed to the user across all conversations.
    ///
    /// # Errors
    /// Returns `AppError::Database` on store failure.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64> {
        self.store.count_unread_messages(user_id).await
    }

    async fn participant_conversation(&self, conversation_id: ConversationId, user_id: UserId) -> Result<Conversation> {
        self.store
            .find_conversation(conversation_id)
            .await?
            .filter(|c| c.is_participant(user_id))
            .ok_or(AppError::Forbidden)
    }

    async fn mark_read_in(&self, conversation: &Conversation, reader_id: UserId) -> Result<u64> {
        let flipped = self.store.mark_messages_read(conversation.id, reader_id).await?;
        if flipped > 0 {
            self.metrics.messages_read_total.add(flipped, &[]);
            self.events.publish(DomainEvent::ReadStateChanged { user_id: reader_id });
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::user::Role;

    fn config() -> MessagingConfig {
        MessagingConfig { max_content_length: 50, preview_length: 10 }
    }

    async fn setup() -> (MemoryStore, ConversationService) {
        let store = MemoryStore::new();
        store.insert_user(1, "Finn", Role::Freelancer).await;
        store.insert_user(2, "Rita", Role::Recruiter).await;
        store.insert_user(3, "Ada", Role::Admin).await;
        let service = ConversationService::new(Arc::new(store.clone()), EventBus::new(16), config());
        (store, service)
    }

    #[tokio::test]
    async fn test_first_contact_creates_conversation_with_message() {
        let (store, service) = setup().await;

        let started = service.get_or_create_conversation(1, 2, "  Hello  ").await.unwrap();
        assert!(started.created);
        let message = started.message.unwrap();
        assert_eq!(message.content, "Hello");
        assert_eq!(message.sender_id, Some(1));
        assert!(!message.is_read);
        assert_eq!(store.message_count(started.conversation.id).await, 1);
        assert_eq!(service.unread_count(2).await.unwrap(), 1);
        assert_eq!(service.unread_count(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_existing_pair_is_returned_without_new_message() {
        let (store, service) = setup().await;

        let first = service.get_or_create_conversation(1, 2, "Hello").await.unwrap();
        let second = service.get_or_create_conversation(2, 1, "Hi again").await.unwrap();

        assert!(!second.created);
        assert!(second.message.is_none());
        assert_eq!(first.conversation.id, second.conversation.id);
        assert_eq!(store.conversation_count().await, 1);
        assert_eq!(store.message_count(first.conversation.id).await, 1);
    }

    #[tokio::test]
    async fn test_invalid_targets_write_nothing() {
        let (store, service) = setup().await;

        assert!(matches!(service.get_or_create_conversation(1, 1, "me").await, Err(AppError::InvalidTarget)));
        assert!(matches!(service.get_or_create_conversation(1, 99, "who").await, Err(AppError::InvalidTarget)));
        assert!(matches!(service.get_or_create_conversation(1, 2, "   ").await, Err(AppError::BadRequest(_))));
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn test_soft_deleted_recipient_is_unavailable() {
        let (store, service) = setup().await;
        let conversation = service.get_or_create_conversation(1, 2, "Hello").await.unwrap().conversation;

        store.soft_delete_user(2).await;

        assert!(matches!(
            service.send_message(conversation.id, 1, "Still there?").await,
            Err(AppError::RecipientUnavailable)
        ));
        assert!(matches!(
            service.get_or_create_conversation(3, 2, "Admin here").await,
            Err(AppError::RecipientUnavailable)
        ));
        assert_eq!(store.message_count(conversation.id).await, 1);
    }

    #[tokio::test]
    async fn test_non_participants_are_forbidden() {
        let (_store, service) = setup().await;
        let conversation = service.get_or_create_conversation(1, 2, "Hello").await.unwrap().conversation;

        assert!(matches!(service.send_message(conversation.id, 3, "hi").await, Err(AppError::Forbidden)));
        assert!(matches!(service.list_messages(conversation.id, 3).await, Err(AppError::Forbidden)));
        assert!(matches!(service.list_messages(4242, 1).await, Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn test_fetch_marks_only_incoming_messages_read() {
        let (_store, service) = setup().await;
        let conversation = service.get_or_create_conversation(1, 2, "Hello").await.unwrap().conversation;
        service.send_message(conversation.id, 2, "Hi Finn").await.unwrap();
        service.send_message(conversation.id, 2, "Are you free?").await.unwrap();

        assert_eq!(service.unread_count(1).await.unwrap(), 2);

        let messages = service.list_messages(conversation.id, 1).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "Hello");
        assert_eq!(service.unread_count(1).await.unwrap(), 0);
        assert_eq!(service.unread_count(2).await.unwrap(), 1);

        assert_eq!(service.mark_messages_read_on_fetch(conversation.id, 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_only_sender_may_delete() {
        let (store, service) = setup().await;
        let started = service.get_or_create_conversation(1, 2, "Hello").await.unwrap();
        let message = started.message.unwrap();

        assert!(matches!(service.delete_message(message.id, 2).await, Err(AppError::Forbidden)));
        service.delete_message(message.id, 1).await.unwrap();
        assert_eq!(store.message_count(started.conversation.id).await, 0);
        assert_eq!(service.unread_count(2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleting_latest_message_rewinds_summary() {
        let (_store, service) = setup().await;
        let started = service.get_or_create_conversation(1, 2, "Kept").await.unwrap();
        let kept = started.message.unwrap();
        let latest = service.send_message(started.conversation.id, 1, "Regretted").await.unwrap();

        service.delete_message(latest.id, 1).await.unwrap();

        let summary = &service.list_conversations(2).await.unwrap()[0];
        assert_eq!(summary.last_message_at, kept.created_at);
        assert_eq!(summary.last_message_preview.as_deref(), Some("Kept"));
        assert_eq!(summary.unread_count, 1);
    }

    #[tokio::test]
    async fn test_system_messages_require_admin_and_stay_read() {
        let (_store, service) = setup().await;
        let conversation = service.get_or_create_conversation(1, 2, "Hello").await.unwrap().conversation;

        assert!(matches!(service.post_system_message(1, conversation.id, "notice").await, Err(AppError::Forbidden)));

        let notice = service.post_system_message(3, conversation.id, "Contract signed").await.unwrap();
        assert!(notice.is_system_message);
        assert_eq!(notice.sender_id, None);
        assert_eq!(service.unread_count(1).await.unwrap(), 0);
        assert_eq!(service.unread_count(2).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_summaries_truncate_preview_and_count_unread() {
        let (_store, service) = setup().await;
        let conversation = service.get_or_create_conversation(2, 1, "A rather long opening line").await.unwrap();

        let summaries = service.list_conversations(1).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.id, conversation.conversation.id);
        assert_eq!(summary.other_user_id, 2);
        assert_eq!(summary.unread_count, 1);
        assert_eq!(summary.last_message_preview.as_deref(), Some("A rather l…"));
    }

    #[tokio::test]
    async fn test_message_events_reach_both_participants() {
        let store = MemoryStore::new();
        store.insert_user(1, "Finn", Role::Freelancer).await;
        store.insert_user(2, "Rita", Role::Recruiter).await;
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let service = ConversationService::new(Arc::new(store), bus, config());

        let started = service.get_or_create_conversation(1, 2, "Hello").await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            DomainEvent::MessageCreated { conversation_id: started.conversation.id, participants: [1, 2] }
        );
    }
}
