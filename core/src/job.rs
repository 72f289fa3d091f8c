use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slide_common::{GenerationRequest, JobId};
use slide_protocol::JobStatus;

/// One generation attempt: `Pending -> Building -> {Ready, Failed}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub request: GenerationRequest,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure: Option<String>,
}

impl GenerationJob {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            id: JobId::generate(),
            request,
            status: JobStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
        }
    }

    pub fn start_building(&mut self) -> bool {
        self.transition(JobStatus::Pending, JobStatus::Building)
    }

    pub fn mark_ready(&mut self) -> bool {
        let moved = self.transition(JobStatus::Building, JobStatus::Ready);
        if moved {
            self.finished_at = Some(Utc::now());
        }
        moved
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> bool {
        let moved = self.transition(JobStatus::Building, JobStatus::Failed);
        if moved {
            self.finished_at = Some(Utc::now());
            self.failure = Some(reason.into());
        }
        moved
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> bool {
        if self.status != from {
            tracing::warn!(
                "Ignoring {} -> {} for job {} in {} status",
                from,
                to,
                self.id,
                self.status
            );
            return false;
        }
        self.status = to;
        true
    }
}
