//! Action item lifecycle and multi-level approval/grading engine.
//!
//! Tasks are created in `PendingApproval`, approved by their supervisor,
//! worked on by one or more assignees, and each assignee's completion is
//! graded and reviewed through an approval chain of up to three levels.
//! [`WorkflowEngine`](engine::WorkflowEngine) is the entry point.

pub mod config;
pub mod engine;
pub mod error;
pub mod grade;
pub mod notify;
pub mod org;
pub mod review;
pub mod state_machine;
pub mod stats;
pub mod submission;

pub use config::EngineConfig;
pub use engine::{ReviewItem, TaskFilter, WorkflowEngine};
pub use error::{ErrorKind, Result, WorkflowError};
pub use org::{ActorId, OrgChart, OrgDirectory};
pub use review::ReviewRequest;
pub use submission::CompletionSubmission;
