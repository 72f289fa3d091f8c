//! Core library: the generation pipeline behind the slide workspace.
//! Views talk to [`GenerationOrchestrator`]; everything else is its state.

pub mod backend;
pub mod chat;
pub mod deck;
pub mod error;
pub mod intake;
pub mod job;
pub mod orchestrator;
pub mod project;

pub use backend::{DemoBackend, GenerationBackend};
pub use error::{ErrorReporter, GenerationError, StudioError};
pub use intake::PromptIntake;
pub use orchestrator::{GenerationOrchestrator, OrchestratorConfig};
pub use project::{Project, ProjectSnapshot};
