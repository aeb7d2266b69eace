use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::org::{ActorId, OrgDirectory};

use super::task::Task;

/// Review status of a single approval chain slot.
///
/// Only one entry of a chain is `Pending` at a time: it is the active
/// review. Entries further down the chain wait as `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Queued,
    Pending,
    Approved,
    Rejected,
    Skipped,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Queued => write!(f, "queued"),
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Approved => write!(f, "approved"),
            EntryStatus::Rejected => write!(f, "rejected"),
            EntryStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Which organizational relationship produced an approver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Supervisor,
    SupervisorsSupervisor,
    ProjectCreator,
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApproverRole::Supervisor => write!(f, "Supervisor"),
            ApproverRole::SupervisorsSupervisor => write!(f, "Supervisor's Supervisor"),
            ApproverRole::ProjectCreator => write!(f, "Project Creator"),
        }
    }
}

/// One reviewer slot in an approval chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub level: u8,
    pub approver: ActorId,
    pub role: ApproverRole,
    pub status: EntryStatus,
    pub comments: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ChainEntry {
    fn new(level: u8, approver: ActorId, role: ApproverRole) -> Self {
        Self {
            level,
            approver,
            role,
            status: EntryStatus::Queued,
            comments: None,
            reviewed_at: None,
        }
    }
}

/// The materialized, versioned approval chain owned by an assignment.
///
/// `generation` increases every time the chain is rebuilt or cleared, so a
/// reviewer holding an outdated view can be told the chain was superseded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalChain {
    pub generation: u64,
    pub entries: Vec<ChainEntry>,
}

impl ApprovalChain {
    /// Replace the chain with freshly built entries and activate the first
    /// reviewable one.
    pub fn install(&mut self, entries: Vec<ChainEntry>) {
        self.generation += 1;
        self.entries = entries;
        self.activate_next();
    }

    /// Drop every entry, as after a rejection.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.entries.clear();
    }

    pub fn active(&self) -> Option<&ChainEntry> {
        self.entries
            .iter()
            .find(|e| e.status == EntryStatus::Pending)
    }

    pub fn active_level(&self) -> Option<u8> {
        self.active().map(|e| e.level)
    }

    pub fn has_level(&self, level: u8) -> bool {
        self.entries.iter().any(|e| e.level == level)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry approved or skipped, and at least one entry approved.
    pub fn is_fully_approved(&self) -> bool {
        self.entries.iter().any(|e| e.status == EntryStatus::Approved)
            && self
                .entries
                .iter()
                .all(|e| matches!(e.status, EntryStatus::Approved | EntryStatus::Skipped))
    }

    /// Mark the active entry approved and promote the next queued entry.
    /// Returns the level that was approved.
    pub fn approve_active(&mut self, comments: Option<String>, at: DateTime<Utc>) -> Option<u8> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.status == EntryStatus::Pending)?;
        entry.status = EntryStatus::Approved;
        entry.comments = comments;
        entry.reviewed_at = Some(at);
        let level = entry.level;
        self.activate_next();
        Some(level)
    }

    fn activate_next(&mut self) {
        if let Some(next) = self
            .entries
            .iter_mut()
            .find(|e| e.status == EntryStatus::Queued)
        {
            next.status = EntryStatus::Pending;
        }
    }
}

/// Derives the ordered list of reviewers for a submitted completion.
pub struct ApprovalChainBuilder<'a, D: OrgDirectory> {
    directory: &'a D,
}

impl<'a, D: OrgDirectory> ApprovalChainBuilder<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Build the chain for `assignee`'s submission on `task`.
    ///
    /// - Level 1 is the task's supervisor, always present.
    /// - Level 2 is the Level 1 supervisor's own supervisor, if one is on record.
    /// - Level 3 is the project creator, if the task belongs to a known project
    ///   and the creator differs from the Level 1 and Level 2 approvers.
    ///
    /// A later-level approver who is the assignee is recorded as `Skipped`.
    pub fn build(&self, task: &Task, assignee: &ActorId) -> Result<Vec<ChainEntry>> {
        let level1 = task.supervisor.clone().ok_or_else(|| {
            WorkflowError::configuration("no supervisor on record for this task")
        })?;
        if &level1 == assignee {
            return Err(WorkflowError::configuration(format!(
                "{assignee} cannot be their own Level 1 approver"
            )));
        }

        let mut entries = vec![ChainEntry::new(1, level1.clone(), ApproverRole::Supervisor)];

        let level2 = self.directory.supervisor_of(&level1);
        if let Some(level2) = &level2 {
            if level2 == &level1 {
                return Err(WorkflowError::configuration(format!(
                    "directory lists {level1} as their own supervisor"
                )));
            }
            entries.push(self.entry(2, level2, ApproverRole::SupervisorsSupervisor, assignee));
        }

        if let Some(project_id) = &task.project_id {
            if let Some(creator) = self.directory.project_creator(project_id) {
                let distinct = creator != level1 && Some(&creator) != level2.as_ref();
                if distinct {
                    entries.push(self.entry(3, &creator, ApproverRole::ProjectCreator, assignee));
                }
            }
        }

        debug!(
            task_id = %task.id,
            assignee = %assignee,
            levels = entries.len(),
            "built approval chain"
        );
        Ok(entries)
    }

    fn entry(&self, level: u8, approver: &ActorId, role: ApproverRole, assignee: &ActorId) -> ChainEntry {
        let mut entry = ChainEntry::new(level, approver.clone(), role);
        if approver == assignee {
            entry.status = EntryStatus::Skipped;
            entry.comments = Some("approver is the assignee".into());
        }
        entry
    }
}
