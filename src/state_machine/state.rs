use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

use super::assignment::{Assignment, CompletionStatus};

/// Task-level lifecycle status.
///
/// ```text
/// PendingApproval → NotStarted → InProgress → PendingCompletionApproval
///        ↘ Rejected                 ↑    ↓             ↓
///                                   └── PendingL2Review → Completed
/// (NotStarted | InProgress | Pending*) ⇄ OnHold
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    PendingApproval,
    NotStarted,
    InProgress,
    PendingCompletionApproval,
    PendingL2Review,
    Completed,
    Rejected,
    OnHold,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Rejected)
    }

    /// Statuses in which assignees can submit and reviewers can review.
    pub fn accepts_completion_activity(&self) -> bool {
        matches!(
            self,
            TaskStatus::InProgress
                | TaskStatus::PendingCompletionApproval
                | TaskStatus::PendingL2Review
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::PendingApproval => write!(f, "Pending Approval"),
            TaskStatus::NotStarted => write!(f, "Not Started"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::PendingCompletionApproval => write!(f, "Pending Completion Approval"),
            TaskStatus::PendingL2Review => write!(f, "Pending L2 Review"),
            TaskStatus::Completed => write!(f, "Completed"),
            TaskStatus::Rejected => write!(f, "Rejected"),
            TaskStatus::OnHold => write!(f, "On Hold"),
        }
    }
}

/// Events that drive the task-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    CreationApproved,
    CreationRejected,
    WorkStarted,
    /// A submission or review changed an assignment; status is re-aggregated.
    CompletionActivity,
    PutOnHold,
    /// Resume from hold into the remembered status.
    Resumed(TaskStatus),
}

impl fmt::Display for TaskEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEvent::CreationApproved => write!(f, "approve creation"),
            TaskEvent::CreationRejected => write!(f, "reject creation"),
            TaskEvent::WorkStarted => write!(f, "start work"),
            TaskEvent::CompletionActivity => write!(f, "submit or review completion"),
            TaskEvent::PutOnHold => write!(f, "put on hold"),
            TaskEvent::Resumed(_) => write!(f, "resume"),
        }
    }
}

/// The task-level transition table.
pub struct TaskLifecycle;

impl TaskLifecycle {
    /// Compute the status that follows `event` in `status`, given the task's
    /// current assignment set. Pure: callers apply the result.
    pub fn next(status: TaskStatus, event: TaskEvent, assignments: &[Assignment]) -> Result<TaskStatus> {
        use TaskEvent as E;
        use TaskStatus as S;

        match (status, event) {
            (S::PendingApproval, E::CreationApproved) => Ok(S::NotStarted),
            (S::PendingApproval, E::CreationRejected) => Ok(S::Rejected),
            (S::NotStarted, E::WorkStarted) => Ok(S::InProgress),
            (S::InProgress | S::PendingCompletionApproval | S::PendingL2Review, E::CompletionActivity) => {
                Ok(Self::aggregate(assignments))
            }
            (
                S::NotStarted | S::InProgress | S::PendingCompletionApproval | S::PendingL2Review,
                E::PutOnHold,
            ) => Ok(S::OnHold),
            (S::OnHold, E::Resumed(S::NotStarted)) => Ok(S::NotStarted),
            (
                S::OnHold,
                E::Resumed(S::InProgress | S::PendingCompletionApproval | S::PendingL2Review),
            ) => Ok(Self::aggregate(assignments)),
            (S::OnHold, E::Resumed(_)) => Err(WorkflowError::precondition(
                "task cannot resume into that status",
            )),
            (S::Completed | S::Rejected, _) => {
                Err(WorkflowError::precondition("task already terminal"))
            }
            (S::OnHold, _) => Err(WorkflowError::precondition("task is on hold")),
            (S::PendingApproval, _) => Err(WorkflowError::precondition(
                "task is awaiting supervisor approval",
            )),
            (S::NotStarted, E::CompletionActivity) => {
                Err(WorkflowError::precondition("task has not been started"))
            }
            (S::InProgress | S::PendingCompletionApproval | S::PendingL2Review, E::WorkStarted) => {
                Err(WorkflowError::precondition("task already started"))
            }
            (from, event) => Err(WorkflowError::precondition(format!(
                "cannot {event} while task is {from}"
            ))),
        }
    }

    /// Task status derived from the full assignment set of a started task.
    ///
    /// Any assignment awaiting Level 1 makes the task `PendingCompletionApproval`;
    /// otherwise any awaiting a later level makes it `PendingL2Review`. The task
    /// is `Completed` only when every assignment is approved.
    pub fn aggregate(assignments: &[Assignment]) -> TaskStatus {
        if !assignments.is_empty()
            && assignments
                .iter()
                .all(|a| a.completion_status == CompletionStatus::Approved)
        {
            return TaskStatus::Completed;
        }
        if assignments.iter().any(Assignment::awaits_first_review) {
            return TaskStatus::PendingCompletionApproval;
        }
        if assignments.iter().any(Assignment::awaits_later_review) {
            return TaskStatus::PendingL2Review;
        }
        TaskStatus::InProgress
    }
}
