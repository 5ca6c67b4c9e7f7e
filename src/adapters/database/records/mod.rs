pub mod conversation;
pub mod message;
pub mod notification;
pub mod user;

pub use conversation::{ConversationRecord, ConversationSummaryRecord};
pub use message::MessageRecord;
pub use notification::NotificationRecord;
pub use user::UserRecord;
