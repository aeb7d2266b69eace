mod cli;
mod ui;

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use actionline::grade;
use actionline::notify::ConfiguredNotifier;
use actionline::state_machine::{Decision, DocumentRef, KpiLink, Priority, Task, TaskDefinition};
use actionline::stats;
use actionline::{
    ActorId, CompletionSubmission, EngineConfig, OrgChart, ReviewRequest, WorkflowEngine,
};
use cli::{Cli, Command};
use ui::Reporter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };

    match cli.command {
        Command::Score { grade, weight } => {
            let score = grade::effective_score(grade, weight)?;
            println!("{score:.2}");
        }
        Command::Stats { file } => run_stats(&file)?,
        Command::Demo => run_demo(config).await?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")
}

fn run_stats(file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse tasks from {}", file.display()))?;
    let reporter = Reporter::default();
    reporter.section("Task stats");
    reporter.stats(&stats::aggregate(&tasks));
    Ok(())
}

/// Walks one task through creation, a Level 2 rejection, resubmission and
/// the full three-level approval.
async fn run_demo(config: EngineConfig) -> Result<()> {
    let dev = ActorId::new("dev@example.com")?;
    let lead = ActorId::new("lead@example.com")?;
    let manager = ActorId::new("manager@example.com")?;
    let director = ActorId::new("director@example.com")?;
    let org = OrgChart::new()
        .with_supervisor(&dev, &lead)
        .with_supervisor(&lead, &manager)
        .with_project("apollo", &director);

    let notifier = ConfiguredNotifier::from_config(&config)?;
    let engine = WorkflowEngine::new(org, notifier, config);
    let reporter = Reporter::default();

    reporter.section("Creation");
    let task = engine
        .create_task(
            &director,
            TaskDefinition {
                title: "Migrate billing reports".into(),
                description: "Move monthly billing reports to the new warehouse".into(),
                priority: Priority::High,
                due_date: None,
                task_weight: 100.0,
                milestone_id: Some("q4-warehouse".into()),
                project_id: Some("apollo".into()),
                kpis: vec![KpiLink {
                    kpi_title: "Reporting accuracy".into(),
                    kpi_weight: 50.0,
                }],
                supervisor: Some(lead.clone()),
                assignees: vec![dev.clone()],
            },
        )
        .await?;
    reporter.step("task created", task.status);

    if let Err(err) = engine.start_task(&dev, &task.id).await {
        reporter.refused("start before approval", &err);
    }
    let approved = engine
        .decide_creation(&lead, &task.id, Decision::Approve, None)
        .await?;
    reporter.step("supervisor approved creation", approved.status);
    let started = engine.start_task(&dev, &task.id).await?;
    reporter.step("assignee started work", started.status);

    reporter.section("First submission");
    let submission = CompletionSubmission {
        task_id: task.id.clone(),
        assignee: dev.clone(),
        notes: "Reports migrated; totals reconciled for July through September.".into(),
        documents: vec![DocumentRef::new(
            "reconciliation.xlsx",
            48_213,
            "store://apollo/reconciliation.xlsx",
        )],
    };
    let assignment = engine.submit_completion(submission.clone()).await?;
    reporter.assignment(&assignment);

    let assignment = engine
        .review_completion(ReviewRequest {
            task_id: task.id.clone(),
            assignee: dev.clone(),
            reviewer: lead.clone(),
            level: 1,
            decision: Decision::Approve,
            comments: Some("Numbers check out".into()),
            grade: Some(3.0),
            generation: assignment.approval_chain.generation,
        })
        .await?;
    reporter.step("level 1 approved", engine.get_task(&task.id).await?.status);
    reporter.assignment(&assignment);

    let assignment = engine
        .review_completion(ReviewRequest {
            task_id: task.id.clone(),
            assignee: dev.clone(),
            reviewer: manager.clone(),
            level: 2,
            decision: Decision::Reject,
            comments: Some("insufficient evidence of completion, please redo sections 2-3".into()),
            grade: None,
            generation: assignment.approval_chain.generation,
        })
        .await?;
    reporter.step("level 2 rejected", engine.get_task(&task.id).await?.status);
    reporter.assignment(&assignment);

    reporter.section("Resubmission");
    let mut assignment = engine.submit_completion(submission).await?;
    let reviews = [
        (lead.clone(), 1, Some(4.0)),
        (manager.clone(), 2, None),
        (director.clone(), 3, None),
    ];
    for (reviewer, level, grade) in reviews {
        assignment = engine
            .review_completion(ReviewRequest {
                task_id: task.id.clone(),
                assignee: dev.clone(),
                reviewer,
                level,
                decision: Decision::Approve,
                comments: None,
                grade,
                generation: assignment.approval_chain.generation,
            })
            .await?;
        let status = engine.get_task(&task.id).await?.status;
        reporter.step(&format!("level {level} approved"), status);
    }

    reporter.section("Result");
    reporter.task(&engine.get_task(&task.id).await?);
    if let Err(err) = engine.delete_task(&director, &task.id).await {
        reporter.refused("delete completed task", &err);
    }
    reporter.section("Stats");
    reporter.stats(&engine.task_stats().await);
    Ok(())
}
