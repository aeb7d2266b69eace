//! Dashboard counts derived from the current task set.

use serde::{Deserialize, Serialize};

use crate::state_machine::{Task, TaskStatus};

/// Read-only projection over a set of tasks. Never consulted by a guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending_creation: usize,
    /// Awaiting a completion review at any level.
    pub pending_completion: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub rejected: usize,
    pub on_hold: usize,
}

pub fn aggregate<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> TaskStats {
    tasks.into_iter().fold(TaskStats::default(), |mut stats, task| {
        stats.total += 1;
        match task.status {
            TaskStatus::PendingApproval => stats.pending_creation += 1,
            TaskStatus::PendingCompletionApproval | TaskStatus::PendingL2Review => {
                stats.pending_completion += 1
            }
            TaskStatus::NotStarted => stats.not_started += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::Rejected => stats.rejected += 1,
            TaskStatus::OnHold => stats.on_hold += 1,
        }
        stats
    })
}
