mod assignment;
mod chain;
mod state;
mod task;

pub use assignment::{
    Assignment, CompletionGrade, CompletionStatus, DocumentRef, RejectionRecord,
};
pub use chain::{ApprovalChain, ApprovalChainBuilder, ApproverRole, ChainEntry, EntryStatus};
pub use state::{TaskEvent, TaskLifecycle, TaskStatus};
pub use task::{
    CreationReview, Decision, HistoryEntry, KpiLink, Priority, Task, TaskAction, TaskDefinition,
    TaskId,
};

#[cfg(test)]
pub(crate) use task::tests::{sample_definition, sample_task};
