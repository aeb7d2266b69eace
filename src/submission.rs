//! Recording an assignee's completion evidence.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Result, WorkflowError};
use crate::org::{ActorId, OrgDirectory};
use crate::state_machine::{
    ApprovalChainBuilder, Assignment, CompletionStatus, DocumentRef, Task, TaskAction, TaskEvent,
    TaskId, TaskLifecycle,
};

/// An assignee's claim that their part of a task is done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSubmission {
    pub task_id: TaskId,
    pub assignee: ActorId,
    pub notes: String,
    pub documents: Vec<DocumentRef>,
}

/// Validates a submission, stores it on the assignment and builds a fresh
/// approval chain for it.
pub struct CompletionSubmissionHandler<'a, D: OrgDirectory> {
    directory: &'a D,
    config: &'a EngineConfig,
}

impl<'a, D: OrgDirectory> CompletionSubmissionHandler<'a, D> {
    pub fn new(directory: &'a D, config: &'a EngineConfig) -> Self {
        Self { directory, config }
    }

    /// Apply `submission` to `task`. On error `task` is left untouched.
    pub fn submit(&self, task: &mut Task, submission: &CompletionSubmission) -> Result<Assignment> {
        let assignee = &submission.assignee;
        let current = task.assignment(assignee).ok_or_else(|| {
            WorkflowError::precondition(format!("{assignee} is not an assignee on this task"))
        })?;

        match current.completion_status {
            CompletionStatus::Approved => return Err(WorkflowError::conflict("already approved")),
            CompletionStatus::Submitted => {
                return Err(WorkflowError::conflict("submission already awaiting review"));
            }
            CompletionStatus::Pending | CompletionStatus::Rejected => {}
        }

        if !task.status.accepts_completion_activity() {
            TaskLifecycle::next(task.status, TaskEvent::CompletionActivity, &task.assignments)?;
        }

        if submission.documents.is_empty() {
            return Err(WorkflowError::validation("no completion evidence"));
        }
        if submission.notes.trim().chars().count() < self.config.min_completion_notes {
            return Err(WorkflowError::validation("insufficient detail"));
        }

        let entries = ApprovalChainBuilder::new(self.directory).build(task, assignee)?;

        let assignment = task.assignment_mut(assignee)?;
        assignment.completion_notes = Some(submission.notes.trim().to_string());
        assignment.completion_documents = submission.documents.clone();
        assignment.completion_grade = None;
        assignment.completion_status = CompletionStatus::Submitted;
        assignment.submitted_at = Some(Utc::now());
        assignment.approval_chain.install(entries);
        let updated = assignment.clone();

        let next = TaskLifecycle::next(task.status, TaskEvent::CompletionActivity, &task.assignments)?;
        task.record(
            assignee.clone(),
            TaskAction::CompletionSubmitted {
                assignee: assignee.clone(),
            },
            next,
        );
        Ok(updated)
    }
}
