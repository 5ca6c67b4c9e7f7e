//! Read-only views of marketplace rows owned by other parts of the system.
//! Only the fields needed for badge counting are modelled.

use crate::domain::user::UserId;
use time::OffsetDateTime;

pub type JobId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
    Hired,
    Withdrawn,
}

impl ApplicationStatus {
    pub const RESOLVED: [Self; 4] = [Self::Accepted, Self::Rejected, Self::Hired, Self::Withdrawn];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Hired => "hired",
            Self::Withdrawn => "withdrawn",
        }
    }

    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Hired | Self::Withdrawn)
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub recruiter_id: UserId,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct Application {
    pub id: i64,
    pub job_id: JobId,
    pub freelancer_id: UserId,
    pub status: ApplicationStatus,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct Rating {
    pub id: i64,
    pub ratee_id: UserId,
    pub created_at: OffsetDateTime,
}
