//! Applying an approver's decision to the active level of an approval chain.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{Result, WorkflowError};
use crate::grade;
use crate::org::ActorId;
use crate::state_machine::{
    Assignment, CompletionGrade, CompletionStatus, Decision, RejectionRecord, Task,
    TaskAction, TaskEvent, TaskId, TaskLifecycle, TaskStatus,
};

/// A reviewer's decision on one assignee's submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub task_id: TaskId,
    pub assignee: ActorId,
    pub reviewer: ActorId,
    pub level: u8,
    pub decision: Decision,
    #[serde(default)]
    pub comments: Option<String>,
    /// Required when the Level 1 reviewer approves; forbidden otherwise.
    #[serde(default)]
    pub grade: Option<f64>,
    /// The chain generation the reviewer was looking at.
    pub generation: u64,
}

/// What a committed review produced.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub assignment: Assignment,
    /// True when this review approved the last remaining chain level.
    pub finalized: bool,
}

/// Walks an assignment through its approval chain, one level at a time.
pub struct ReviewProcessor<'a> {
    config: &'a EngineConfig,
}

impl<'a> ReviewProcessor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Apply `request` to `task`. On error `task` is left untouched.
    pub fn review(&self, task: &mut Task, request: &ReviewRequest) -> Result<ReviewOutcome> {
        // Every chain on a completed task is fully approved, so a late review
        // there is a replay and the chain guards below refuse it.
        if !task.status.accepts_completion_activity() && task.status != TaskStatus::Completed {
            TaskLifecycle::next(task.status, TaskEvent::CompletionActivity, &task.assignments)?;
        }

        let task_weight = task.task_weight;
        let assignment = task.assignment(&request.assignee).ok_or_else(|| {
            WorkflowError::precondition(format!(
                "{} is not an assignee on this task",
                request.assignee
            ))
        })?;

        let chain = &assignment.approval_chain;
        if request.generation != chain.generation {
            return Err(WorkflowError::conflict("chain superseded"));
        }
        let active = chain
            .active()
            .filter(|entry| entry.level == request.level)
            .ok_or_else(|| WorkflowError::conflict("not your turn"))?;
        if active.approver != request.reviewer {
            return Err(WorkflowError::precondition(format!(
                "not the assigned Level {} approver",
                request.level
            )));
        }

        let comments = request
            .comments
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let finalized = match request.decision {
            Decision::Approve => self.approve(task, request, comments, task_weight)?,
            Decision::Reject => {
                self.reject(task, request, comments)?;
                false
            }
        };

        let assignment = task.assignment_mut(&request.assignee)?.clone();
        let next = TaskLifecycle::next(task.status, TaskEvent::CompletionActivity, &task.assignments)?;
        task.record(
            request.reviewer.clone(),
            TaskAction::Reviewed {
                assignee: request.assignee.clone(),
                level: request.level,
                decision: request.decision,
            },
            next,
        );
        Ok(ReviewOutcome {
            assignment,
            finalized,
        })
    }

    fn approve(
        &self,
        task: &mut Task,
        request: &ReviewRequest,
        comments: Option<String>,
        task_weight: f64,
    ) -> Result<bool> {
        let grade = match (request.level, request.grade) {
            (1, Some(score)) => Some(CompletionGrade {
                score,
                effective_score: grade::effective_score(score, task_weight)?,
                quality_notes: comments.clone(),
                graded_by: request.reviewer.clone(),
                graded_at: Utc::now(),
            }),
            (1, None) => {
                return Err(WorkflowError::validation(
                    "a grade is required to approve at Level 1",
                ));
            }
            (_, Some(_)) => {
                return Err(WorkflowError::precondition(
                    "only the Level 1 approver may grade this submission",
                ));
            }
            (_, None) => None,
        };

        let assignment = task.assignment_mut(&request.assignee)?;
        if grade.is_some() {
            assignment.completion_grade = grade;
        }
        assignment.approval_chain.approve_active(comments, Utc::now());
        let finalized = assignment.approval_chain.is_fully_approved();
        if finalized {
            assignment.completion_status = CompletionStatus::Approved;
        }
        Ok(finalized)
    }

    fn reject(&self, task: &mut Task, request: &ReviewRequest, comments: Option<String>) -> Result<()> {
        let minimum = self.config.min_rejection_for_level(request.level);
        let comments = comments
            .filter(|c| c.chars().count() >= minimum)
            .ok_or_else(|| {
                WorkflowError::validation(format!(
                    "rejection at Level {} needs comments of at least {minimum} characters",
                    request.level
                ))
            })?;

        let now = Utc::now();
        let assignment = task.assignment_mut(&request.assignee)?;
        assignment.approval_chain.clear();
        assignment.completion_grade = None;
        assignment.completion_status = CompletionStatus::Rejected;
        assignment.last_rejection = Some(RejectionRecord {
            level: request.level,
            reviewer: request.reviewer.clone(),
            comments,
            rejected_at: now,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::org::OrgChart;
    use crate::state_machine::{DocumentRef, sample_task};
    use crate::submission::{CompletionSubmission, CompletionSubmissionHandler};

    fn id(s: &str) -> ActorId {
        ActorId::new(s).unwrap()
    }

    fn submitted_task(chart: &OrgChart, config: &EngineConfig) -> Task {
        let mut task = sample_task();
        task.status = TaskStatus::InProgress;
        let sub = CompletionSubmission {
            task_id: task.id.clone(),
            assignee: id("dev"),
            notes: "Reports migrated and verified against last quarter".into(),
            documents: vec![DocumentRef::new("diff.pdf", 10, "store://diff")],
        };
        CompletionSubmissionHandler::new(chart, config)
            .submit(&mut task, &sub)
            .unwrap();
        task
    }

    fn request(task: &Task, reviewer: &str, level: u8, decision: Decision) -> ReviewRequest {
        ReviewRequest {
            task_id: task.id.clone(),
            assignee: id("dev"),
            reviewer: id(reviewer),
            level,
            decision,
            comments: None,
            grade: None,
            generation: task.assignments[0].approval_chain.generation,
        }
    }

    fn two_level_chart() -> OrgChart {
        OrgChart::new().with_supervisor(&id("lead"), &id("manager"))
    }

    #[test]
    fn level_one_approval_grades_and_completes() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(4.0);
        req.comments = Some("clean work".into());

        let out = ReviewProcessor::new(&config).review(&mut task, &req).unwrap();
        assert!(out.finalized);
        assert_eq!(out.assignment.completion_status, CompletionStatus::Approved);
        let grade = out.assignment.completion_grade.unwrap();
        assert!((grade.effective_score - 32.0).abs() < 1e-9);
        assert_eq!(grade.quality_notes.as_deref(), Some("clean work"));
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn level_one_approval_requires_grade() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let before = task.clone();
        let req = request(&task, "lead", 1, Decision::Approve);
        let err = ReviewProcessor::new(&config).review(&mut task, &req).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(task, before);
    }

    #[test]
    fn out_of_range_grade_is_validation_error() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let before = task.clone();
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(5.5);
        let err = ReviewProcessor::new(&config).review(&mut task, &req).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(task, before);
    }

    #[test]
    fn level_two_cannot_alter_grade() {
        let chart = two_level_chart();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let processor = ReviewProcessor::new(&config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(3.0);
        processor.review(&mut task, &req).unwrap();
        assert_eq!(task.status, TaskStatus::PendingL2Review);

        let mut req = request(&task, "manager", 2, Decision::Approve);
        req.grade = Some(5.0);
        let err = processor.review(&mut task, &req).unwrap_err();
        assert_eq!(
            err.reason(),
            "only the Level 1 approver may grade this submission"
        );

        req.grade = None;
        let out = processor.review(&mut task, &req).unwrap();
        assert!(out.finalized);
        assert_eq!(out.assignment.completion_grade.unwrap().score, 3.0);
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn wrong_reviewer_and_wrong_level() {
        let chart = two_level_chart();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let processor = ReviewProcessor::new(&config);

        let mut req = request(&task, "intruder", 1, Decision::Approve);
        req.grade = Some(4.0);
        assert!(matches!(
            processor.review(&mut task, &req),
            Err(WorkflowError::Precondition(_))
        ));

        let req = request(&task, "manager", 2, Decision::Approve);
        assert_eq!(
            processor.review(&mut task, &req).unwrap_err(),
            WorkflowError::conflict("not your turn")
        );
    }

    #[test]
    fn rejection_rewinds_and_discards_grade() {
        let chart = two_level_chart();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let processor = ReviewProcessor::new(&config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(3.0);
        processor.review(&mut task, &req).unwrap();

        let mut req = request(&task, "manager", 2, Decision::Reject);
        req.comments = Some("too short".into());
        assert!(matches!(
            processor.review(&mut task, &req),
            Err(WorkflowError::Validation(_))
        ));

        req.comments = Some("insufficient evidence of completion, please redo sections 2-3".into());
        let out = processor.review(&mut task, &req).unwrap();
        assert!(!out.finalized);
        let a = out.assignment;
        assert_eq!(a.completion_status, CompletionStatus::Rejected);
        assert!(a.approval_chain.is_empty());
        assert!(a.completion_grade.is_none());
        assert_eq!(a.last_rejection.as_ref().unwrap().level, 2);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn level_one_rejection_needs_ten_characters() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let processor = ReviewProcessor::new(&config);
        let mut req = request(&task, "lead", 1, Decision::Reject);
        req.comments = Some("redo".into());
        assert!(processor.review(&mut task, &req).is_err());
        req.comments = Some("missing totals".into());
        processor.review(&mut task, &req).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn stale_generation_is_superseded() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(4.0);
        req.generation -= 1;
        assert_eq!(
            ReviewProcessor::new(&config).review(&mut task, &req).unwrap_err(),
            WorkflowError::conflict("chain superseded")
        );
    }

    #[test]
    fn replayed_review_conflicts() {
        let chart = two_level_chart();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let processor = ReviewProcessor::new(&config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(4.0);
        processor.review(&mut task, &req).unwrap();
        let err = processor.review(&mut task, &req).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }

    #[test]
    fn replay_after_completion_conflicts() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        let processor = ReviewProcessor::new(&config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(4.0);
        processor.review(&mut task, &req).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);

        let before = task.clone();
        assert_eq!(
            processor.review(&mut task, &req).unwrap_err(),
            WorkflowError::conflict("not your turn")
        );
        assert_eq!(task, before);
    }

    #[test]
    fn held_task_still_refuses_reviews() {
        let chart = OrgChart::new();
        let config = EngineConfig::default();
        let mut task = submitted_task(&chart, &config);
        task.status = TaskStatus::OnHold;
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(4.0);
        assert_eq!(
            ReviewProcessor::new(&config).review(&mut task, &req).unwrap_err(),
            WorkflowError::precondition("task is on hold")
        );
    }

    #[test]
    fn level_three_rejection_needs_twenty_characters() {
        let chart = two_level_chart().with_project("apollo", &id("director"));
        let config = EngineConfig::default();
        let mut task = sample_task();
        task.project_id = Some("apollo".into());
        task.status = TaskStatus::InProgress;
        let sub = CompletionSubmission {
            task_id: task.id.clone(),
            assignee: id("dev"),
            notes: "Reports migrated and verified against last quarter".into(),
            documents: vec![DocumentRef::new("diff.pdf", 10, "store://diff")],
        };
        CompletionSubmissionHandler::new(&chart, &config)
            .submit(&mut task, &sub)
            .unwrap();
        let processor = ReviewProcessor::new(&config);
        let mut req = request(&task, "lead", 1, Decision::Approve);
        req.grade = Some(4.0);
        processor.review(&mut task, &req).unwrap();
        let req = request(&task, "manager", 2, Decision::Approve);
        processor.review(&mut task, &req).unwrap();

        let mut req = request(&task, "director", 3, Decision::Reject);
        req.comments = Some("x".repeat(19));
        assert!(matches!(
            processor.review(&mut task, &req),
            Err(WorkflowError::Validation(_))
        ));
        assert_eq!(task.assignments[0].approval_chain.active_level(), Some(3));

        req.comments = Some("x".repeat(20));
        let out = processor.review(&mut task, &req).unwrap();
        assert_eq!(out.assignment.completion_status, CompletionStatus::Rejected);
        assert!(out.assignment.approval_chain.is_empty());
        assert!(out.assignment.completion_grade.is_none());
        assert_eq!(out.assignment.last_rejection.unwrap().level, 3);
        assert_eq!(task.status, TaskStatus::InProgress);
    }
}
