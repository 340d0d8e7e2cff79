use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::config::RunConfig;
use crate::directory::EndpointDirectory;
use crate::error::Result;
use crate::model::RemapMode;
use crate::run::{OutcomeKind, RunReport, TaskOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Pretty,
    Minimal,
}

/// What `validate` prints on success.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub remap_mode: RemapMode,
    pub source_endpoints: usize,
    pub target_endpoints: usize,
    pub source_transforms: usize,
    pub target_transforms: usize,
}

impl ValidationSummary {
    pub fn new(config: &RunConfig, directory: &EndpointDirectory) -> Self {
        Self {
            valid: true,
            remap_mode: config.remap_mode,
            source_endpoints: directory.source.len(),
            target_endpoints: directory.target.len(),
            source_transforms: config.source_transforms.len(),
            target_transforms: config.target_transforms.len(),
        }
    }
}

pub fn truncate_arn(arn: &str, max_len: usize) -> String {
    if arn.chars().count() > max_len {
        let tail: String = arn
            .chars()
            .rev()
            .take(max_len.saturating_sub(3))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", tail)
    } else {
        arn.to_string()
    }
}

fn kind_label(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::Created => "created",
        OutcomeKind::AlreadyExists => "exists",
        OutcomeKind::Planned => "planned",
    }
}

fn print_outcome_pretty(outcome: &TaskOutcome) {
    let label = match outcome.kind {
        OutcomeKind::Created => kind_label(outcome.kind).green().bold(),
        OutcomeKind::AlreadyExists => kind_label(outcome.kind).yellow().bold(),
        OutcomeKind::Planned => kind_label(outcome.kind).cyan().bold(),
    };
    println!(
        "[{}] {} -> {}",
        label,
        outcome.old_identifier,
        outcome.identifier.bold()
    );
    println!("  source: {}", outcome.source_endpoint_arn);
    println!("  target: {}", outcome.target_endpoint_arn);
    println!(
        "  instance: {}{}",
        outcome.replication_instance_arn,
        if outcome.instance_replaced { " (replaced)" } else { "" }
    );
    println!("  migration: {}", outcome.migration_type);
    if let Some(ref status) = outcome.status {
        println!("  status: {}", status);
    }
}

pub fn print_report(report: &RunReport, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(report)?),
        Format::Pretty => {
            println!(
                "{} {} ({} mode, {})",
                "run".bold(),
                report.run_id,
                report.remap_mode,
                report.version
            );
            for outcome in &report.outcomes {
                print_outcome_pretty(outcome);
                println!();
            }
            for skipped in &report.skipped {
                println!("{} {}: {}", "skip".dimmed(), skipped.identifier, skipped.reason);
            }
            if !report.skipped.is_empty() {
                println!();
            }
            println!(
                "{} ({} seen, {} skipped, {} already existed)",
                report.summary.bold(),
                report.tasks_seen,
                report.skipped.len(),
                report.count(OutcomeKind::AlreadyExists)
            );
        }
        Format::Minimal => {
            println!("{:8} {:28} {:28} TARGET", "KIND", "TASK", "SOURCE");
            println!("{}", "-".repeat(80));
            for outcome in &report.outcomes {
                println!(
                    "{:8} {:28} {:28} {}",
                    kind_label(outcome.kind),
                    truncate_arn(&outcome.identifier, 28),
                    truncate_arn(&outcome.source_endpoint_arn, 28),
                    truncate_arn(&outcome.target_endpoint_arn, 28)
                );
            }
            println!("{}", report.summary);
        }
    }
    Ok(())
}

pub fn print_validation(summary: &ValidationSummary, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(summary)?),
        Format::Pretty => {
            println!("{}", "Source and target mappings are valid".green().bold());
            println!("  mode: {}", summary.remap_mode);
            println!(
                "  source: {} transforms over {} endpoints",
                summary.source_transforms, summary.source_endpoints
            );
            println!(
                "  target: {} transforms over {} endpoints",
                summary.target_transforms, summary.target_endpoints
            );
        }
        Format::Minimal => println!("ok"),
    }
    Ok(())
}

pub fn print_config(config: &RunConfig, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(config)?),
        Format::Pretty | Format::Minimal => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}
