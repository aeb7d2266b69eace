//! The request-scoped workflow service.
//!
//! [`WorkflowEngine`] owns the task set and exposes one method per external
//! operation. Each transition runs against a draft copy of the task while the
//! task's lock is held, and the draft replaces the stored task only when every
//! guard passed. Notifications go out after the lock is released.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, WorkflowError};
use crate::grade;
use crate::notify::{EventKind, Notifier, NotifyError, WorkflowEvent};
use crate::org::{ActorId, OrgDirectory};
use crate::review::{ReviewProcessor, ReviewRequest};
use crate::state_machine::{
    Assignment, CompletionStatus, CreationReview, Decision, Priority, Task, TaskAction,
    TaskDefinition, TaskEvent, TaskId, TaskLifecycle, TaskStatus,
};
use crate::stats::{self, TaskStats};
use crate::submission::{CompletionSubmission, CompletionSubmissionHandler};

/// `None` once the task has been deleted, so a caller that grabbed the slot
/// before the deletion cannot act on it.
type TaskSlot = Arc<Mutex<Option<Task>>>;

/// Criteria for [`WorkflowEngine::list_tasks`]. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<ActorId>,
    pub supervisor: Option<ActorId>,
    pub creator: Option<ActorId>,
    pub priority: Option<Priority>,
    pub project_id: Option<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.assignee.as_ref().is_none_or(|a| task.is_assignee(a))
            && self.supervisor.as_ref().is_none_or(|s| task.is_supervisor(s))
            && self.creator.as_ref().is_none_or(|c| &task.creator == c)
            && self.priority.is_none_or(|p| task.priority == p)
            && self
                .project_id
                .as_ref()
                .is_none_or(|p| task.project_id.as_ref() == Some(p))
    }
}

/// A submission waiting on a specific reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub task_id: TaskId,
    pub task_title: String,
    pub assignee: ActorId,
    pub level: u8,
    pub generation: u64,
}

pub struct WorkflowEngine<D, N> {
    directory: D,
    notifier: N,
    config: EngineConfig,
    tasks: RwLock<HashMap<TaskId, TaskSlot>>,
}

impl<D: OrgDirectory, N: Notifier> WorkflowEngine<D, N> {
    pub fn new(directory: D, notifier: N, config: EngineConfig) -> Self {
        Self {
            directory,
            notifier,
            config,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Create a task. It always enters `PendingApproval`.
    pub async fn create_task(&self, creator: &ActorId, definition: TaskDefinition) -> Result<Task> {
        let task = Task::new(creator.clone(), definition)?;
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), Arc::new(Mutex::new(Some(task.clone()))));
        info!(task_id = %task.id, creator = %creator, "task created");
        self.emit(WorkflowEvent::new(&task, creator, EventKind::TaskCreated))
            .await;
        Ok(task)
    }

    /// The supervisor approves or rejects a newly created task.
    pub async fn decide_creation(
        &self,
        actor: &ActorId,
        task_id: &str,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<Task> {
        let comments = comments
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let min_comment = self.config.min_rejection_comment;

        let task = self
            .transact(task_id, |task| {
                if !task.is_supervisor(actor) {
                    return Err(WorkflowError::precondition(
                        "only the designated supervisor may decide on this task",
                    ));
                }
                let event = match decision {
                    Decision::Approve => TaskEvent::CreationApproved,
                    Decision::Reject => TaskEvent::CreationRejected,
                };
                let next = TaskLifecycle::next(task.status, event, &task.assignments)?;
                if decision == Decision::Reject
                    && comments.as_ref().is_none_or(|c| c.chars().count() < min_comment)
                {
                    return Err(WorkflowError::validation(format!(
                        "rejecting a task needs comments of at least {min_comment} characters"
                    )));
                }
                task.creation_review = Some(CreationReview {
                    decision,
                    reviewer: actor.clone(),
                    comments: comments.clone(),
                    reviewed_at: chrono::Utc::now(),
                });
                task.record(actor.clone(), TaskAction::CreationDecided { decision }, next);
                Ok(())
            })
            .await?
            .1;

        info!(task_id = %task.id, %decision, status = %task.status, "creation decided");
        let kind = match decision {
            Decision::Approve => EventKind::CreationApproved,
            Decision::Reject => EventKind::CreationRejected {
                comments: comments.unwrap_or_default(),
            },
        };
        self.emit(WorkflowEvent::new(&task, actor, kind)).await;
        Ok(task)
    }

    /// An assignee starts work on an approved task.
    pub async fn start_task(&self, actor: &ActorId, task_id: &str) -> Result<Task> {
        let task = self
            .transact(task_id, |task| {
                if !task.is_assignee(actor) {
                    return Err(WorkflowError::precondition(
                        "only an assignee may start this task",
                    ));
                }
                let next = TaskLifecycle::next(task.status, TaskEvent::WorkStarted, &task.assignments)?;
                task.record(actor.clone(), TaskAction::Started, next);
                Ok(())
            })
            .await?
            .1;

        info!(task_id = %task.id, actor = %actor, "task started");
        self.emit(WorkflowEvent::new(&task, actor, EventKind::WorkStarted))
            .await;
        Ok(task)
    }

    /// An assignee submits completion evidence.
    pub async fn submit_completion(&self, submission: CompletionSubmission) -> Result<Assignment> {
        let handler = CompletionSubmissionHandler::new(&self.directory, &self.config);
        let (assignment, task) = self
            .transact(&submission.task_id, |task| handler.submit(task, &submission))
            .await?;

        info!(
            task_id = %task.id,
            assignee = %assignment.assignee,
            generation = assignment.approval_chain.generation,
            levels = assignment.approval_chain.entries.len(),
            "completion submitted"
        );
        let kind = EventKind::CompletionSubmitted {
            assignee: assignment.assignee.clone(),
            generation: assignment.approval_chain.generation,
        };
        self.emit(WorkflowEvent::new(&task, &submission.assignee, kind))
            .await;
        Ok(assignment)
    }

    /// A chain approver approves or rejects the active level.
    pub async fn review_completion(&self, request: ReviewRequest) -> Result<Assignment> {
        let processor = ReviewProcessor::new(&self.config);
        let (outcome, task) = self
            .transact(&request.task_id, |task| processor.review(task, &request))
            .await?;
        let assignment = outcome.assignment;

        info!(
            task_id = %task.id,
            assignee = %assignment.assignee,
            level = request.level,
            decision = %request.decision,
            status = %task.status,
            "completion reviewed"
        );

        let kind = match (request.decision, outcome.finalized) {
            (Decision::Reject, _) => EventKind::CompletionRejected {
                assignee: assignment.assignee.clone(),
                level: request.level,
                comments: assignment
                    .last_rejection
                    .as_ref()
                    .map(|r| r.comments.clone())
                    .unwrap_or_default(),
            },
            (Decision::Approve, true) => {
                let (score, effective_score) = assignment
                    .completion_grade
                    .as_ref()
                    .map(|g| (g.score, g.effective_score))
                    .unwrap_or_default();
                EventKind::CompletionApproved {
                    assignee: assignment.assignee.clone(),
                    score,
                    effective_score,
                    kpi_contributions: grade::kpi_contributions(effective_score, &task.kpis),
                }
            }
            (Decision::Approve, false) => EventKind::ReviewAdvanced {
                assignee: assignment.assignee.clone(),
                level: request.level,
                next_level: assignment.approval_chain.active_level().unwrap_or_default(),
            },
        };
        self.emit(WorkflowEvent::new(&task, &request.reviewer, kind))
            .await;
        Ok(assignment)
    }

    /// Pause a task. Only its creator or supervisor may do this.
    pub async fn put_on_hold(&self, actor: &ActorId, task_id: &str, reason: &str) -> Result<Task> {
        let reason = reason.trim().to_string();
        let task = self
            .transact(task_id, |task| {
                if !task.is_manager(actor) {
                    return Err(WorkflowError::precondition(
                        "only the creator or supervisor may put this task on hold",
                    ));
                }
                if reason.is_empty() {
                    return Err(WorkflowError::validation("a hold reason is required"));
                }
                let next = TaskLifecycle::next(task.status, TaskEvent::PutOnHold, &task.assignments)?;
                task.held_from = Some(task.status);
                task.record(
                    actor.clone(),
                    TaskAction::PutOnHold {
                        reason: reason.clone(),
                    },
                    next,
                );
                Ok(())
            })
            .await?
            .1;

        info!(task_id = %task.id, actor = %actor, "task put on hold");
        self.emit(WorkflowEvent::new(&task, actor, EventKind::PutOnHold { reason }))
            .await;
        Ok(task)
    }

    /// Resume a held task into the status it was paused from.
    pub async fn resume(&self, actor: &ActorId, task_id: &str) -> Result<Task> {
        let task = self
            .transact(task_id, |task| {
                if !task.is_manager(actor) {
                    return Err(WorkflowError::precondition(
                        "only the creator or supervisor may resume this task",
                    ));
                }
                let held_from = task
                    .held_from
                    .filter(|_| task.status == TaskStatus::OnHold)
                    .ok_or_else(|| WorkflowError::precondition("task is not on hold"))?;
                let next = TaskLifecycle::next(
                    task.status,
                    TaskEvent::Resumed(held_from),
                    &task.assignments,
                )?;
                task.held_from = None;
                task.record(actor.clone(), TaskAction::Resumed, next);
                Ok(())
            })
            .await?
            .1;

        info!(task_id = %task.id, actor = %actor, status = %task.status, "task resumed");
        self.emit(WorkflowEvent::new(&task, actor, EventKind::Resumed))
            .await;
        Ok(task)
    }

    /// Delete a task that has not been completed.
    pub async fn delete_task(&self, actor: &ActorId, task_id: &str) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let slot = tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))?;
        let mut guard = slot.lock().await;
        let task = guard
            .as_ref()
            .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))?;
        if !task.is_manager(actor) {
            return Err(WorkflowError::precondition(
                "only the creator or supervisor may delete this task",
            ));
        }
        if task.status == TaskStatus::Completed {
            return Err(WorkflowError::precondition(
                "completed tasks cannot be deleted",
            ));
        }
        let task = guard.take();
        tasks.remove(task_id);
        drop(guard);
        drop(tasks);

        if let Some(task) = task {
            info!(task_id = %task.id, actor = %actor, "task deleted");
            self.emit(WorkflowEvent::new(&task, actor, EventKind::TaskDeleted))
                .await;
        }
        Ok(())
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        let slot = self.slot(task_id).await?;
        let guard = slot.lock().await;
        guard
            .clone()
            .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))
    }

    /// Tasks matching `filter`, oldest first.
    pub async fn list_tasks(&self, filter: &TaskFilter) -> Vec<Task> {
        let mut out: Vec<Task> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|t| filter.matches(t))
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Dashboard counts over the current task set, recomputed on every call.
    pub async fn task_stats(&self) -> TaskStats {
        stats::aggregate(&self.snapshot().await)
    }

    /// Submissions whose active chain entry belongs to `reviewer`.
    pub async fn review_queue(&self, reviewer: &ActorId) -> Vec<ReviewItem> {
        let mut items = Vec::new();
        for task in self.list_tasks(&TaskFilter::default()).await {
            if !task.status.accepts_completion_activity() {
                continue;
            }
            for assignment in &task.assignments {
                if assignment.completion_status != CompletionStatus::Submitted {
                    continue;
                }
                if let Some(entry) = assignment.approval_chain.active() {
                    if &entry.approver == reviewer {
                        items.push(ReviewItem {
                            task_id: task.id.clone(),
                            task_title: task.title.clone(),
                            assignee: assignment.assignee.clone(),
                            level: entry.level,
                            generation: assignment.approval_chain.generation,
                        });
                    }
                }
            }
        }
        items
    }

    async fn slot(&self, task_id: &str) -> Result<TaskSlot> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))
    }

    async fn snapshot(&self) -> Vec<Task> {
        let slots: Vec<TaskSlot> = self.tasks.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(task) = slot.lock().await.clone() {
                out.push(task);
            }
        }
        out
    }

    /// Run `apply` against a draft of the task and commit it only on success.
    /// Returns the closure's output and the committed task.
    async fn transact<T>(
        &self,
        task_id: &str,
        apply: impl FnOnce(&mut Task) -> Result<T>,
    ) -> Result<(T, Task)> {
        let slot = self.slot(task_id).await?;
        let mut guard = slot.lock().await;
        let mut draft = guard
            .clone()
            .ok_or_else(|| WorkflowError::TaskNotFound(task_id.to_string()))?;
        let out = apply(&mut draft)?;
        *guard = Some(draft.clone());
        Ok((out, draft))
    }

    async fn emit(&self, event: WorkflowEvent) {
        let limit = self.config.notify_timeout();
        let delivered = timeout(limit, self.notifier.notify(&event))
            .await
            .unwrap_or_else(|_| Err(NotifyError::Timeout(limit.as_millis() as u64)));
        if let Err(e) = delivered {
            warn!(task_id = %event.task_id, error = %e, "notification failed");
        }
    }
}
