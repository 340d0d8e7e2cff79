//! One clone run: validate, walk the task listing, recreate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::build_info;
use crate::config::RunConfig;
use crate::creator::{self, CreateOutcome};
use crate::directory::EndpointDirectory;
use crate::error::{CloneError, Result};
use crate::model::{CreatedTask, MigrationType, RemapMode, ReplicationTask};
use crate::remap::{EndpointChange, PlanDecision, Remapper, SkipReason, TaskPlan};
use crate::service::MigrationService;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Probe endpoints and create tasks.
    Apply,
    /// Decide only; no probes, no creations.
    Plan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Created,
    AlreadyExists,
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub kind: OutcomeKind,
    pub old_identifier: String,
    pub identifier: String,
    pub source_endpoint_arn: String,
    pub target_endpoint_arn: String,
    pub replication_instance_arn: String,
    pub migration_type: MigrationType,
    pub change: EndpointChange,
    pub instance_replaced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskOutcome {
    fn new(kind: OutcomeKind, plan: &TaskPlan, created: Option<CreatedTask>) -> Self {
        let created = created.unwrap_or_else(|| CreatedTask {
            identifier: plan.draft.identifier.clone(),
            arn: None,
            status: None,
            created_at: None,
        });
        Self {
            kind,
            old_identifier: plan.old_identifier.clone(),
            identifier: plan.draft.identifier.clone(),
            source_endpoint_arn: plan.draft.source_endpoint_arn.clone(),
            target_endpoint_arn: plan.draft.target_endpoint_arn.clone(),
            replication_instance_arn: plan.draft.replication_instance_arn.clone(),
            migration_type: plan.draft.migration_type,
            change: plan.change,
            instance_replaced: plan.instance_replaced,
            task_arn: created.arn,
            status: created.status,
            created_at: created.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTask {
    pub identifier: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub version: String,
    pub mode: RunMode,
    pub remap_mode: RemapMode,
    pub replication_instance_arn: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tasks_seen: usize,
    pub outcomes: Vec<TaskOutcome>,
    pub skipped: Vec<SkippedTask>,
    pub summary: String,
}

fn count_kind(outcomes: &[TaskOutcome], kind: OutcomeKind) -> usize {
    outcomes.iter().filter(|o| o.kind == kind).count()
}

impl RunReport {
    pub fn count(&self, kind: OutcomeKind) -> usize {
        count_kind(&self.outcomes, kind)
    }

    pub fn created_count(&self) -> usize {
        self.count(OutcomeKind::Created)
    }
}

/// Final line for a run that created `created` tasks.
pub fn summary_line(mode: RunMode, created: usize, planned: usize) -> String {
    match mode {
        RunMode::Plan if planned > 0 => format!("{planned} tasks would be created"),
        RunMode::Plan => "No tasks would be created".to_string(),
        RunMode::Apply if created > 0 => format!("{created} tasks have been successfully created"),
        RunMode::Apply => "No tasks have been created".to_string(),
    }
}

/// State of a single run. Built at start, consumed by [`CloneRun::execute`].
pub struct CloneRun<'a, S: MigrationService + ?Sized> {
    service: &'a S,
    config: &'a RunConfig,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    tasks_seen: usize,
    outcomes: Vec<TaskOutcome>,
    skipped: Vec<SkippedTask>,
}

impl<'a, S: MigrationService + ?Sized> CloneRun<'a, S> {
    pub fn new(service: &'a S, config: &'a RunConfig) -> Self {
        Self {
            service,
            config,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            tasks_seen: 0,
            outcomes: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn execute(mut self, mode: RunMode) -> Result<RunReport> {
        tracing::info!(run_id = %self.run_id, ?mode, "process started");
        let directory = validate::validate_transforms(self.service, self.config)?;

        let mut marker: Option<String> = None;
        loop {
            let page = self.service.list_replication_tasks(
                &self.config.replication_instance_arn,
                self.config.page_size,
                marker.as_deref(),
            )?;
            for task in &page.items {
                self.process(&directory, task, mode)?;
            }
            match page.marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(self.finish(mode))
    }

    fn process(&mut self, directory: &EndpointDirectory, task: &ReplicationTask, mode: RunMode) -> Result<()> {
        self.tasks_seen += 1;
        let plan = match Remapper::new(self.config, directory).plan(task)? {
            PlanDecision::Recreate(plan) => plan,
            PlanDecision::Skip(reason) => {
                tracing::info!(task = %task.identifier, "skipping task: {reason}");
                self.skipped.push(SkippedTask {
                    identifier: task.identifier.clone(),
                    reason,
                });
                return Ok(());
            }
        };

        tracing::info!(
            current_task = %plan.old_identifier,
            new_task = %plan.draft.identifier,
            current_instance = %plan.old_replication_instance_arn,
            new_instance = %plan.draft.replication_instance_arn,
            current_source = %plan.old_source_endpoint_arn,
            new_source = %plan.draft.source_endpoint_arn,
            current_target = %plan.old_target_endpoint_arn,
            new_target = %plan.draft.target_endpoint_arn,
            migration_type = %plan.draft.migration_type,
            "{}",
            plan.change.describe()
        );

        if mode == RunMode::Plan {
            self.outcomes
                .push(TaskOutcome::new(OutcomeKind::Planned, &plan, None));
            return Ok(());
        }

        let instance = &self.config.replication_instance_arn;
        for endpoint_arn in [&plan.draft.source_endpoint_arn, &plan.draft.target_endpoint_arn] {
            if !creator::probe_endpoint(self.service, instance, endpoint_arn)? {
                tracing::error!(
                    endpoint_arn = %endpoint_arn,
                    "provided endpoint is not valid or active; rectify and run again"
                );
                return Err(CloneError::EndpointUnreachable {
                    endpoint_arn: endpoint_arn.clone(),
                });
            }
        }
        if plan.instance_replaced {
            tracing::info!(
                instance = %plan.draft.replication_instance_arn,
                "switching to the replacement replication instance for the new task"
            );
        }

        let outcome = match creator::create_task(self.service, &plan.draft)? {
            CreateOutcome::Created(created) => {
                TaskOutcome::new(OutcomeKind::Created, &plan, Some(created))
            }
            CreateOutcome::AlreadyExists => {
                TaskOutcome::new(OutcomeKind::AlreadyExists, &plan, None)
            }
        };
        self.outcomes.push(outcome);
        tracing::info!("continuing with next task");
        Ok(())
    }

    fn finish(self, mode: RunMode) -> RunReport {
        let summary = summary_line(
            mode,
            count_kind(&self.outcomes, OutcomeKind::Created),
            count_kind(&self.outcomes, OutcomeKind::Planned),
        );
        tracing::info!(
            tasks_seen = self.tasks_seen,
            skipped = self.skipped.len(),
            "{summary}"
        );

        RunReport {
            run_id: self.run_id,
            version: build_info::version_string(),
            mode,
            remap_mode: self.config.remap_mode,
            replication_instance_arn: self.config.replication_instance_arn.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            tasks_seen: self.tasks_seen,
            outcomes: self.outcomes,
            skipped: self.skipped,
            summary,
        }
    }
}

/// Validate the transform tables without listing or creating tasks.
pub fn validate_only<S: MigrationService + ?Sized>(
    service: &S,
    config: &RunConfig,
) -> Result<EndpointDirectory> {
    validate::validate_transforms(service, config)
}
