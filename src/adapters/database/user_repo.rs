use crate::adapters::database::records::UserRecord;
use crate::domain::user::{User, UserId};
use crate::error::Result;
use sqlx::PgConnection;

#[derive(Clone, Debug, Default)]
pub struct UserRepository {}

impl UserRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Finds a user, including soft-deleted ones.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_by_id(&self, conn: &mut PgConnection, user_id: UserId) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, display_name, role, deleted_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        record.map(User::try_from).transpose()
    }
}
