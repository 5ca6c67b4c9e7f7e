use crate::domain::conversation::ConversationId;
use crate::domain::user::UserId;
use time::OffsetDateTime;

pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    /// `None` for system-generated messages.
    pub sender_id: Option<UserId>,
    pub content: String,
    pub is_read: bool,
    pub is_system_message: bool,
    pub created_at: OffsetDateTime,
}

impl Message {
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        preview_of(&self.content, max_chars)
    }
}

/// First `max_chars` characters of `content`, with an ellipsis when cut.
#[must_use]
pub fn preview_of(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() { format!("{head}…") } else { head }
}

/// Validates and normalizes outgoing message content.
///
/// # Errors
/// Returns a human readable reason when the content is blank or too long.
pub fn normalize_content(content: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("Message content must not be empty".to_string());
    }
    if trimmed.chars().count() > max_chars {
        return Err(format!("Message content exceeds {max_chars} characters"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender_id: Option<UserId>) -> Message {
        Message {
            id: 1,
            conversation_id: 1,
            sender_id,
            content: "hello there".to_string(),
            is_read: false,
            is_system_message: sender_id.is_none(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let mut msg = message(Some(1));
        msg.content = "héllo wörld".to_string();
        assert_eq!(msg.preview(5), "héllo…");
        assert_eq!(msg.preview(50), "héllo wörld");
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(normalize_content("  hi  ", 10).unwrap(), "hi");
        assert!(normalize_content("   ", 10).is_err());
        assert!(normalize_content("abcdef", 5).is_err());
    }
}
