pub mod conversations;
pub mod health;
pub mod messages;
pub mod notifications;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}
