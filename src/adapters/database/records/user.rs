use crate::domain::user::User;
use crate::error::AppError;
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct UserRecord {
    pub(crate) id: i64,
    pub(crate) display_name: String,
    pub(crate) role: String,
    pub(crate) deleted_at: Option<OffsetDateTime>,
}

impl TryFrom<UserRecord> for User {
    type Error = AppError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            display_name: record.display_name,
            role: record.role.parse().map_err(AppError::InternalMsg)?,
            deleted_at: record.deleted_at,
        })
    }
}
