use crate::domain::user::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Messages,
    Applications,
    Jobs,
    Ratings,
    Notifications,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Applications => "applications",
            Self::Jobs => "jobs",
            Self::Ratings => "ratings",
            Self::Notifications => "notifications",
        }
    }

    /// Categories that clear when their tab is opened, as opposed to when items are read.
    #[must_use]
    pub const fn is_view_tracked(self) -> bool {
        matches!(self, Self::Applications | Self::Jobs | Self::Ratings)
    }

    #[must_use]
    pub const fn for_role(role: Role) -> &'static [Self] {
        match role {
            Role::Freelancer => &[Self::Messages, Self::Applications, Self::Jobs, Self::Ratings, Self::Notifications],
            Role::Recruiter => &[Self::Messages, Self::Applications, Self::Jobs, Self::Notifications],
            Role::Admin => &[Self::Messages, Self::Notifications],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "messages" => Ok(Self::Messages),
            "applications" => Ok(Self::Applications),
            "jobs" => Ok(Self::Jobs),
            "ratings" => Ok(Self::Ratings),
            "notifications" => Ok(Self::Notifications),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Which marketplace rows a view-tracked category counts for a given role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityQuery {
    /// Freelancer's own applications that left `pending`.
    ApplicationDecisions,
    /// Open jobs the freelancer has not applied to.
    UnappliedOpenJobs,
    /// Ratings the freelancer received.
    RatingsReceived,
    /// `pending` applications on the recruiter's jobs.
    IncomingApplications,
    /// Applications on the recruiter's jobs that reached a resolved status.
    ResolvedApplications,
}

impl ActivityQuery {
    #[must_use]
    pub const fn for_category(role: Role, category: Category) -> Option<Self> {
        match (role, category) {
            (Role::Freelancer, Category::Applications) => Some(Self::ApplicationDecisions),
            (Role::Freelancer, Category::Jobs) => Some(Self::UnappliedOpenJobs),
            (Role::Freelancer, Category::Ratings) => Some(Self::RatingsReceived),
            (Role::Recruiter, Category::Applications) => Some(Self::IncomingApplications),
            (Role::Recruiter, Category::Jobs) => Some(Self::ResolvedApplications),
            _ => None,
        }
    }
}

/// Derived unread/new counts per category for one user. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeCounts(BTreeMap<Category, i64>);

impl BadgeCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, category: Category, count: i64) {
        self.0.insert(category, count);
    }

    #[must_use]
    pub fn get(&self, category: Category) -> Option<i64> {
        self.0.get(&category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, i64)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }
}
