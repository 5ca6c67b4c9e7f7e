use crate::services::health_service::{ComponentStatus, Readiness};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResponse {
    pub status: ComponentStatus,
    pub database: ComponentStatus,
    pub push: ComponentStatus,
}

impl From<Readiness> for ReadinessResponse {
    fn from(readiness: Readiness) -> Self {
        let status = if readiness.is_ready() { ComponentStatus::Ok } else { ComponentStatus::Error };
        Self { status, database: readiness.database, push: readiness.push }
    }
}
