use crate::domain::activity::ApplicationStatus;
use crate::domain::badge::{ActivityQuery, Category};
use crate::domain::user::UserId;
use crate::error::Result;
use sqlx::PgConnection;
use time::OffsetDateTime;

/// Category markers and the marketplace rows counted against them.
#[derive(Clone, Debug, Default)]
pub struct ActivityRepository {}

impl ActivityRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn find_marker(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        category: Category,
    ) -> Result<Option<OffsetDateTime>> {
        let viewed_at = sqlx::query_scalar::<_, OffsetDateTime>(
            "SELECT viewed_at FROM category_markers WHERE user_id = $1 AND category = $2",
        )
        .bind(user_id)
        .bind(category.as_str())
        .fetch_optional(conn)
        .await?;
        Ok(viewed_at)
    }

    /// Without an explicit time the marker takes the database clock, which also stamps
    /// the activity rows it is compared against.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the upsert fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn upsert_marker(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        category: Category,
        viewed_at: Option<OffsetDateTime>,
    ) -> Result<OffsetDateTime> {
        let stored = sqlx::query_scalar::<_, OffsetDateTime>(
            r#"
            INSERT INTO category_markers (user_id, category, viewed_at)
            VALUES ($1, $2, COALESCE($3, clock_timestamp()))
            ON CONFLICT (user_id, category) DO UPDATE SET viewed_at = EXCLUDED.viewed_at
            RETURNING viewed_at
            "#,
        )
        .bind(user_id)
        .bind(category.as_str())
        .bind(viewed_at)
        .fetch_one(conn)
        .await?;
        Ok(stored)
    }

    /// # Errors
    /// Returns `AppError::Database` if the query fails.
    #[tracing::instrument(level = "debug", skip(self, conn))]
    pub(crate) async fn count(
        &self,
        conn: &mut PgConnection,
        user_id: UserId,
        query: ActivityQuery,
        since: Option<OffsetDateTime>,
    ) -> Result<i64> {
        let sql = match query {
            ActivityQuery::ApplicationDecisions => {
                r#"
                SELECT COUNT(*) FROM applications
                WHERE freelancer_id = $1
                  AND status <> 'pending'
                  AND ($2::timestamptz IS NULL OR updated_at > $2)
                "#
            }
            ActivityQuery::UnappliedOpenJobs => {
                r#"
                SELECT COUNT(*) FROM jobs j
                WHERE j.status = 'open'
                  AND ($2::timestamptz IS NULL OR j.created_at > $2)
                  AND NOT EXISTS (
                      SELECT 1 FROM applications a WHERE a.job_id = j.id AND a.freelancer_id = $1
                  )
                "#
            }
            ActivityQuery::RatingsReceived => {
                r#"
                SELECT COUNT(*) FROM ratings
                WHERE ratee_id = $1
                  AND ($2::timestamptz IS NULL OR created_at > $2)
                "#
            }
            ActivityQuery::IncomingApplications => {
                r#"
                SELECT COUNT(*) FROM applications a
                JOIN jobs j ON j.id = a.job_id
                WHERE j.recruiter_id = $1
                  AND a.status = 'pending'
                  AND ($2::timestamptz IS NULL OR a.updated_at > $2)
                "#
            }
            ActivityQuery::ResolvedApplications => {
                r#"
                SELECT COUNT(*) FROM applications a
                JOIN jobs j ON j.id = a.job_id
                WHERE j.recruiter_id = $1
                  AND a.status = ANY($3)
                  AND ($2::timestamptz IS NULL OR a.updated_at > $2)
                "#
            }
        };

        let mut q = sqlx::query_scalar::<_, i64>(sql).bind(user_id).bind(since);
        if query == ActivityQuery::ResolvedApplications {
            let resolved: Vec<&str> = ApplicationStatus::RESOLVED.iter().map(|s| s.as_str()).collect();
            q = q.bind(resolved);
        }
        Ok(q.fetch_one(conn).await?)
    }
}
