use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WorkflowError};
use crate::grade;
use crate::org::ActorId;

use super::assignment::{Assignment, CompletionStatus};
use super::state::TaskStatus;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A KPI the task contributes to, with the share (0–100) it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiLink {
    pub kpi_title: String,
    pub kpi_weight: f64,
}

/// Everything a caller supplies to create a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub task_weight: f64,
    #[serde(default)]
    pub milestone_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub kpis: Vec<KpiLink>,
    pub supervisor: Option<ActorId>,
    pub assignees: Vec<ActorId>,
}

impl TaskDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(WorkflowError::validation("task title must not be empty"));
        }
        if self.assignees.is_empty() {
            return Err(WorkflowError::validation("task needs at least one assignee"));
        }
        let mut seen = HashSet::new();
        if !self.assignees.iter().all(|a| seen.insert(a)) {
            return Err(WorkflowError::validation("assignees must be distinct"));
        }
        grade::validate_weight(self.task_weight)?;
        if self.task_weight > 0.0 && self.milestone_id.is_none() {
            return Err(WorkflowError::validation(
                "a standalone task must have weight 0",
            ));
        }
        for kpi in &self.kpis {
            if kpi.kpi_title.trim().is_empty() {
                return Err(WorkflowError::validation("KPI title must not be empty"));
            }
            grade::validate_weight(kpi.kpi_weight)?;
        }
        let supervisor = self.supervisor.as_ref().ok_or_else(|| {
            WorkflowError::configuration("a task cannot be created without a supervisor")
        })?;
        if self.assignees.contains(supervisor) {
            return Err(WorkflowError::configuration(format!(
                "{supervisor} cannot supervise a task assigned to them"
            )));
        }
        Ok(())
    }
}

/// The supervisor's decision on a newly created task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationReview {
    pub decision: Decision,
    pub reviewer: ActorId,
    pub comments: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => write!(f, "approve"),
            Decision::Reject => write!(f, "reject"),
        }
    }
}

/// What happened in a committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TaskAction {
    Created,
    CreationDecided { decision: Decision },
    Started,
    CompletionSubmitted { assignee: ActorId },
    Reviewed { assignee: ActorId, level: u8, decision: Decision },
    PutOnHold { reason: String },
    Resumed,
}

/// One line of the task's activity history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub actor: ActorId,
    pub action: TaskAction,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// A unit of assignable work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub task_weight: f64,
    pub milestone_id: Option<String>,
    pub project_id: Option<String>,
    pub kpis: Vec<KpiLink>,
    pub creator: ActorId,
    pub supervisor: Option<ActorId>,
    pub assignments: Vec<Assignment>,
    pub status: TaskStatus,
    /// Status to return to when resumed from `OnHold`.
    pub held_from: Option<TaskStatus>,
    pub creation_review: Option<CreationReview>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from a validated definition. Always starts in `PendingApproval`.
    pub fn new(creator: ActorId, definition: TaskDefinition) -> Result<Self> {
        definition.validate()?;
        let now = Utc::now();
        let assignments = definition
            .assignees
            .into_iter()
            .map(Assignment::new)
            .collect();
        let mut task = Self {
            id: Uuid::new_v4().to_string(),
            title: definition.title.trim().to_string(),
            description: definition.description,
            priority: definition.priority,
            due_date: definition.due_date,
            task_weight: definition.task_weight,
            milestone_id: definition.milestone_id,
            project_id: definition.project_id,
            kpis: definition.kpis,
            creator: creator.clone(),
            supervisor: definition.supervisor,
            assignments,
            status: TaskStatus::PendingApproval,
            held_from: None,
            creation_review: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        task.record(creator, TaskAction::Created, TaskStatus::PendingApproval);
        Ok(task)
    }

    pub fn assignment(&self, assignee: &ActorId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| &a.assignee == assignee)
    }

    pub fn assignment_mut(&mut self, assignee: &ActorId) -> Result<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| &a.assignee == assignee)
            .ok_or_else(|| {
                WorkflowError::precondition(format!("{assignee} is not an assignee on this task"))
            })
    }

    pub fn is_assignee(&self, actor: &ActorId) -> bool {
        self.assignment(actor).is_some()
    }

    pub fn is_supervisor(&self, actor: &ActorId) -> bool {
        self.supervisor.as_ref() == Some(actor)
    }

    /// Creator or supervisor: the people who manage the task itself.
    pub fn is_manager(&self, actor: &ActorId) -> bool {
        &self.creator == actor || self.is_supervisor(actor)
    }

    /// Set a new status and append the matching history line.
    pub fn record(&mut self, actor: ActorId, action: TaskAction, to: TaskStatus) {
        let now = Utc::now();
        let from = if self.history.is_empty() { to } else { self.status };
        self.history.push(HistoryEntry {
            at: now,
            actor,
            action,
            from,
            to,
        });
        self.status = to;
        self.updated_at = now;
    }

    /// Display progress, 0–100.
    ///
    /// Approved assignments count fully and submitted ones count half.
    pub fn progress(&self) -> u8 {
        match self.status {
            TaskStatus::Completed => return 100,
            TaskStatus::PendingApproval | TaskStatus::NotStarted | TaskStatus::Rejected => return 0,
            _ => {}
        }
        if self.assignments.is_empty() {
            return 0;
        }
        let units: usize = self
            .assignments
            .iter()
            .map(|a| match a.completion_status {
                CompletionStatus::Approved => 2,
                CompletionStatus::Submitted => 1,
                CompletionStatus::Pending | CompletionStatus::Rejected => 0,
            })
            .sum();
        ((units * 100) / (self.assignments.len() * 2)) as u8
    }
}
