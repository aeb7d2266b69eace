use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::org::ActorId;

use super::chain::ApprovalChain;

/// Per-assignee completion sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Pending,
    Submitted,
    Approved,
    /// Sent back by a reviewer. Behaves as pending: the assignee may resubmit,
    /// and `last_rejection` on the assignment says why.
    Rejected,
}

impl CompletionStatus {
    /// Pending or rejected: the assignee may (re)submit.
    pub fn awaits_submission(&self) -> bool {
        matches!(self, CompletionStatus::Pending | CompletionStatus::Rejected)
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionStatus::Pending => write!(f, "pending"),
            CompletionStatus::Submitted => write!(f, "submitted"),
            CompletionStatus::Approved => write!(f, "approved"),
            CompletionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Metadata for a piece of completion evidence held by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub storage_ref: String,
}

impl DocumentRef {
    pub fn new(name: impl Into<String>, size: u64, storage_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            uploaded_at: Utc::now(),
            storage_ref: storage_ref.into(),
        }
    }
}

/// The Level 1 grade recorded for the current submission cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionGrade {
    pub score: f64,
    pub effective_score: f64,
    pub quality_notes: Option<String>,
    pub graded_by: ActorId,
    pub graded_at: DateTime<Utc>,
}

/// Why the last submission was sent back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub level: u8,
    pub reviewer: ActorId,
    pub comments: String,
    pub rejected_at: DateTime<Utc>,
}

/// The completion and grading record of one assignee on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignee: ActorId,
    pub completion_status: CompletionStatus,
    pub completion_notes: Option<String>,
    pub completion_documents: Vec<DocumentRef>,
    pub completion_grade: Option<CompletionGrade>,
    pub approval_chain: ApprovalChain,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_rejection: Option<RejectionRecord>,
}

impl Assignment {
    pub fn new(assignee: ActorId) -> Self {
        Self {
            assignee,
            completion_status: CompletionStatus::Pending,
            completion_notes: None,
            completion_documents: Vec::new(),
            completion_grade: None,
            approval_chain: ApprovalChain::default(),
            submitted_at: None,
            last_rejection: None,
        }
    }

    /// Submitted and waiting on the Level 1 reviewer.
    pub fn awaits_first_review(&self) -> bool {
        self.completion_status == CompletionStatus::Submitted
            && self.approval_chain.active_level() == Some(1)
    }

    /// Submitted and waiting on a Level 2 or Level 3 reviewer.
    pub fn awaits_later_review(&self) -> bool {
        self.completion_status == CompletionStatus::Submitted
            && self.approval_chain.active_level().is_some_and(|l| l > 1)
    }

    /// Effective score of an approved assignment.
    pub fn final_score(&self) -> Option<f64> {
        if self.completion_status != CompletionStatus::Approved {
            return None;
        }
        self.completion_grade.as_ref().map(|g| g.effective_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::chain::{ApproverRole, ChainEntry, EntryStatus};

    fn id(s: &str) -> ActorId {
        ActorId::new(s).unwrap()
    }

    fn entry(level: u8, who: &str) -> ChainEntry {
        ChainEntry {
            level,
            approver: id(who),
            role: ApproverRole::Supervisor,
            status: EntryStatus::Queued,
            comments: None,
            reviewed_at: None,
        }
    }

    #[test]
    fn new_assignment_is_pending() {
        let a = Assignment::new(id("dev"));
        assert_eq!(a.completion_status, CompletionStatus::Pending);
        assert!(a.completion_status.awaits_submission());
        assert!(a.approval_chain.is_empty());
        assert_eq!(a.final_score(), None);
    }

    #[test]
    fn review_stage_follows_active_level() {
        let mut a = Assignment::new(id("dev"));
        a.completion_status = CompletionStatus::Submitted;
        a.approval_chain
            .install(vec![entry(1, "lead"), entry(2, "manager")]);
        assert!(a.awaits_first_review());
        assert!(!a.awaits_later_review());

        a.approval_chain.approve_active(None, Utc::now());
        assert!(!a.awaits_first_review());
        assert!(a.awaits_later_review());
    }

    #[test]
    fn rejected_may_resubmit() {
        assert!(CompletionStatus::Rejected.awaits_submission());
        assert!(!CompletionStatus::Submitted.awaits_submission());
        assert!(!CompletionStatus::Approved.awaits_submission());
    }
}
