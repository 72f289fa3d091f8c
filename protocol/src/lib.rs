use serde::{Deserialize, Serialize};
use slide_common::{ChatTurn, JobId, OutputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Building,
    Ready,
    Failed,
}

impl JobStatus {
    /// Whether the job still occupies the project's single job slot.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Building)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::Building => "building",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Prev,
    Select(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    JobStatusChanged { job_id: JobId, status: JobStatus },
    ChatTurnAppended { turn: ChatTurn },
    DeckReplaced { slide_count: usize },
    CursorMoved { index: usize },
    Error { message: String },
    ShutdownComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Submit { prompt: String, mode: OutputMode },
    Revise { text: String },
    Navigate(Navigation),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub op: Op,
}

impl Submission {
    pub fn new(op: Op) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            op,
        }
    }
}
