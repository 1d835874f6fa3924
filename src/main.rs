//! Markflow CLI - validate, inspect and manage resumable runs

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use markflow::ast::Workflow;
use markflow::error::{FixSuggestion, MarkflowError};
use markflow::resume::{compat, prepare_resume, ResumeStore};
use markflow::validate::{ValidationIssue, ValidationResult};
use markflow::MarkflowConfig;

#[derive(Parser)]
#[command(name = "markflow")]
#[command(about = "Markflow - Markdown workflow documents with resumable execution")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow file
    Validate {
        /// Path to .prompt.md file
        file: PathBuf,
    },

    /// Show the parsed header and body references
    Inspect {
        /// Path to .prompt.md file
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage saved run state
    Resume {
        #[command(subcommand)]
        action: ResumeAction,
    },
}

#[derive(Subcommand)]
enum ResumeAction {
    /// List runs that can be resumed
    List,

    /// Check whether a run can resume against a workflow file
    Check {
        /// Run identifier
        run_id: String,
        /// Path to .prompt.md file
        file: PathBuf,
        /// Accept a changed document
        #[arg(short, long)]
        force: bool,
    },

    /// Delete old snapshots
    Clean {
        /// Delete snapshots older than N days (default: config retention)
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match MarkflowConfig::load().and_then(MarkflowConfig::with_env) {
        Ok(config) => match cli.command {
            Commands::Validate { file } => validate_workflow(&config, &file).await,
            Commands::Inspect { file, json } => inspect_workflow(&file, json).await,
            Commands::Resume { action } => handle_resume_command(&config, action).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn print_issue(label: colored::ColoredString, issue: &ValidationIssue) {
    println!("  {} {}", label, issue);
    if let Some(suggestion) = issue.code.suggestion() {
        println!("      {} {}", "Fix:".yellow(), suggestion);
    }
}

fn print_validation(result: &ValidationResult) {
    for error in &result.errors {
        print_issue("error".red().bold(), error);
    }
    for warning in &result.warnings {
        print_issue("warning".yellow().bold(), warning);
    }
}

async fn validate_workflow(config: &MarkflowConfig, file: &Path) -> Result<(), MarkflowError> {
    let (workflow, result) = config.build_validator().validate_file(file).await?;
    print_validation(&result);

    if !result.is_valid() {
        return Err(MarkflowError::ValidationFailed {
            count: result.errors.len(),
            summary: result.error_summary(),
        });
    }

    println!(
        "{} Workflow '{}' is valid",
        "✓".green(),
        workflow.display_name()
    );
    println!("  Model: {}", workflow.model().unwrap_or("(default)"));
    println!("  Tools: {}", workflow.tools().len());
    println!("  Parameters: {}", workflow.content().parameter_references.len());
    println!(
        "  Sub-workflows: {}",
        workflow.content().sub_workflow_references.len()
    );
    if result.has_warnings() {
        println!("  Warnings: {}", result.warnings.len());
    }

    Ok(())
}

fn sorted(set: &std::collections::HashSet<String>) -> Vec<&str> {
    let mut items: Vec<&str> = set.iter().map(String::as_str).collect();
    items.sort_unstable();
    items
}

async fn inspect_workflow(file: &Path, json: bool) -> Result<(), MarkflowError> {
    let workflow = Workflow::parse_file(file).await?;
    let content = workflow.content();

    if json {
        let view = serde_json::json!({
            "name": workflow.name(),
            "model": workflow.model(),
            "hasHeader": workflow.has_header(),
            "contentHash": workflow.content_hash(),
            "tools": workflow.tools(),
            "config": workflow.config(),
            "extensions": workflow.extensions(),
            "extensionKeys": workflow.extension_fields().keys().collect::<Vec<_>>(),
            "parameterReferences": sorted(&content.parameter_references),
            "toolReferences": sorted(&content.tool_references),
            "subWorkflowReferences": content.sub_workflow_references,
            "outline": content.outline,
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{} {}", "Workflow:".bold(), workflow.display_name());
    println!("  Hash: {}", workflow.content_hash());
    println!("  Header: {}", if workflow.has_header() { "yes" } else { "no" });
    if let Some(model) = workflow.model() {
        println!("  Model: {}", model);
    }
    if !workflow.tools().is_empty() {
        println!("  Tools: {}", workflow.tools().join(", "));
    }
    for key in workflow.extension_fields().keys() {
        println!("  Extension: {}", key);
    }

    println!("{}", "References:".bold());
    println!("  Parameters: {}", sorted(&content.parameter_references).join(", "));
    println!("  Tools: {}", sorted(&content.tool_references).join(", "));
    for reference in &content.sub_workflow_references {
        println!(
            "  Execute (line {}): {} {:?}",
            reference.line_number, reference.path, reference.parameters
        );
    }
    Ok(())
}

async fn handle_resume_command(
    config: &MarkflowConfig,
    action: ResumeAction,
) -> Result<(), MarkflowError> {
    let store = config.build_store();

    match action {
        ResumeAction::List => {
            let runs = store.list_available().await?;
            if runs.is_empty() {
                println!("No resumable runs");
                return Ok(());
            }
            println!("Found {} resumable run(s):\n", runs.len());
            println!("{:<32} {:<24} {}", "RUN ID", "LAST CHECKPOINT", "WORKFLOW");
            println!("{}", "-".repeat(80));
            for run_id in runs {
                let Some(state) = store.read(&run_id).await? else {
                    continue;
                };
                println!(
                    "{:<32} {:<24} {}",
                    run_id,
                    state.workflow.last_checkpoint.format("%Y-%m-%d %H:%M:%S"),
                    state.workflow.file_path
                );
            }
            Ok(())
        }

        ResumeAction::Check {
            run_id,
            file,
            force,
        } => {
            let text = tokio::fs::read_to_string(&file).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MarkflowError::WorkflowNotFound {
                        path: file.display().to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
            let snapshot = store.read(&run_id).await?;
            let verdict = compat::check(snapshot.as_ref(), &text);

            let (ctx, conversation) = prepare_resume(store.as_ref(), &run_id, &text, force).await?;
            let label = match verdict {
                compat::Compatibility::Match => "compatible".green(),
                compat::Compatibility::NoStoredHash => "compatible (no stored hash)".green(),
                _ => "forced".yellow(),
            };
            println!("{} Run '{}' can resume: {}", "✓".green(), run_id, label);
            println!(
                "  Current step: {}",
                ctx.current_step.as_deref().unwrap_or("(none)")
            );
            println!("  Messages: {}", conversation.len());
            println!("  Variables: {}", ctx.variables.len());
            Ok(())
        }

        ResumeAction::Clean { days } => {
            let max_age = match days {
                Some(days) => Duration::from_secs(u64::from(days) * 24 * 60 * 60),
                None => config.retention(),
            };
            let removed = store.cleanup(max_age).await?;
            println!("Removed {} snapshot(s)", removed);
            Ok(())
        }
    }
}
