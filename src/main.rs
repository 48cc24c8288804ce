//! Project Manager - CLI Tool
//!
//! Command-line front end for the task and project services.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use project_manager::projects::NewProject;
use project_manager::store::Table;
use project_manager::tasks::tree::flatten_all;
use project_manager::tasks::{NewTask, TaskPriority, TaskStatus};
use project_manager::{AppState, Config};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pm")]
#[command(about = "CLI for the project manager record store")]
struct Cli {
    /// Path to a YAML config file (defaults to ./config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Record store base URL (overrides config.yaml)
    #[arg(long, global = true, env = "PM_STORE_URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task operations
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Project operations
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Locally queued field updates
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Show the task hierarchy
    Tree,

    /// List all tasks
    List,

    /// Show a task as JSON
    Show { id: String },

    /// Create a task
    Add {
        /// Task title
        title: String,

        #[arg(short, long)]
        desc: Option<String>,

        /// Project id or name
        #[arg(long)]
        project: Option<String>,

        #[arg(long)]
        assignee: Option<String>,

        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,

        #[arg(long, value_parser = parse_priority)]
        priority: Option<TaskPriority>,

        /// Parent task id
        #[arg(long)]
        parent: Option<String>,

        #[arg(long)]
        hours: Option<f64>,

        #[arg(long)]
        progress: Option<i64>,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// Set one field; the value is parsed as JSON, or taken as text
    Set {
        id: String,
        field: String,
        value: String,
    },

    /// Move a task under another task, or to the top level
    Move {
        id: String,

        /// New parent id; omit to move to the top level
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete a task (children move to the top level)
    Delete { id: String },

    /// Rebuild a task's embedded subtask list from its child tasks
    RefreshSubtasks { id: String },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List all projects
    List,

    /// Show a project and its tasks
    Show { id: String },

    /// Create a project
    Add {
        /// Project name
        name: String,

        #[arg(short, long)]
        desc: Option<String>,

        #[arg(long)]
        company: Option<String>,

        /// Comma-separated team member names
        #[arg(long)]
        team: Option<String>,
    },

    /// Add a task to a project
    AddTask { project: String, task: String },

    /// Remove a task from a project
    RemoveTask { project: String, task: String },
}

#[derive(Subcommand)]
enum PendingAction {
    /// Show queued updates for every table
    List,

    /// Replay queued updates
    Retry,
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| {
        let labels: Vec<&str> = TaskStatus::ALL.iter().map(|st| st.label()).collect();
        format!("unknown status '{}', expected one of: {}", s, labels.join(", "))
    })
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    TaskPriority::parse(s).ok_or_else(|| {
        let labels: Vec<&str> = TaskPriority::ALL.iter().map(|p| p.label()).collect();
        format!("unknown priority '{}', expected one of: {}", s, labels.join(", "))
    })
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| project_manager::store::decode::split_comma_list(&s))
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,project_manager=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.store_url = server;
    }
    let state = AppState::new(config)?;

    match cli.command {
        Commands::Tasks { action } => handle_tasks(&state, action).await,
        Commands::Projects { action } => handle_projects(&state, action).await,
        Commands::Pending { action } => handle_pending(&state, action).await,
    }
}

async fn handle_tasks(state: &AppState, action: TaskAction) -> Result<()> {
    let tasks = &state.tasks;
    match action {
        TaskAction::Tree => {
            let forest = tasks.load_tree().await?;
            for row in flatten_all(&forest) {
                println!(
                    "{}{} [{}] {} ({})",
                    "  ".repeat(row.level),
                    if row.has_children { "▾" } else { "•" },
                    row.task.status,
                    row.task.title,
                    row.task.id
                );
            }
        }

        TaskAction::List => {
            let list = tasks.list_ui_tasks().await?;
            println!(
                "{:<36} {:<12} {:<8} {:>4} {}",
                "ID", "STATUS", "PRI", "%", "TITLE"
            );
            println!("{}", "-".repeat(80));
            for task in list {
                println!(
                    "{:<36} {:<12} {:<8} {:>4} {}",
                    task.id, task.status, task.priority, task.progress, task.title
                );
            }
        }

        TaskAction::Show { id } => {
            let task = tasks.get_task(&id).await?;
            let ui = project_manager::tasks::transform_task_to_ui(&task);
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }

        TaskAction::Add {
            title,
            desc,
            project,
            assignee,
            status,
            priority,
            parent,
            hours,
            progress,
            tags,
            start,
            due,
        } => {
            let created = tasks
                .create_task(NewTask {
                    title,
                    description: desc,
                    project,
                    assignee,
                    status: status.unwrap_or_default(),
                    priority: priority.unwrap_or_default(),
                    start_date: start,
                    due_date: due,
                    estimated_hours: hours,
                    tags: split_list(tags),
                    progress,
                    parent_id: parent,
                    ..Default::default()
                })
                .await?;
            println!("Created task: {}", created.id);
        }

        TaskAction::Set { id, field, value } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            if !tasks.set_field(&id, &field, value).await? {
                bail!("Update of '{}' on task {} was refused", field, id);
            }
            println!("Updated {} on task {}", field, id);
        }

        TaskAction::Move { id, parent } => {
            if !tasks.move_task(&id, parent.as_deref()).await? {
                bail!("Move of task {} was refused", id);
            }
            match parent {
                Some(parent) => println!("Moved task {} under {}", id, parent),
                None => println!("Moved task {} to the top level", id),
            }
        }

        TaskAction::Delete { id } => {
            tasks.delete_task(&id).await?;
            println!("Deleted task: {}", id);
        }

        TaskAction::RefreshSubtasks { id } => {
            let subtasks = tasks.refresh_subtask_cache(&id).await?;
            println!("{}", serde_json::to_string_pretty(&subtasks)?);
        }
    }

    Ok(())
}

async fn handle_projects(state: &AppState, action: ProjectAction) -> Result<()> {
    let projects = &state.projects;
    match action {
        ProjectAction::List => {
            println!("{:<36} {:<12} {:>5} {}", "ID", "STATUS", "TASKS", "NAME");
            println!("{}", "-".repeat(80));
            for project in projects.list_projects().await? {
                println!(
                    "{:<36} {:<12} {:>5} {}",
                    project.id,
                    project.status.as_deref().unwrap_or("-"),
                    project.tasks.len(),
                    project.display_name()
                );
            }
        }

        ProjectAction::Show { id } => {
            let project = projects.get_project(&id).await?;
            let all_tasks = state.tasks.list_ui_tasks().await?;
            let members = projects.project_tasks(&id, &all_tasks).await?;
            println!("{}", serde_json::to_string_pretty(&project)?);
            println!("---");
            for task in members {
                println!("{} [{}] {}", task.id, task.status, task.title);
            }
        }

        ProjectAction::Add {
            name,
            desc,
            company,
            team,
        } => {
            let created = projects
                .create_project(NewProject {
                    name,
                    description: desc,
                    company,
                    team: split_list(team),
                    ..Default::default()
                })
                .await?;
            println!("Created project: {}", created.id);
        }

        ProjectAction::AddTask { project, task } => {
            let updated = projects.add_task_to_project(&project, &task).await?;
            println!("Project {} now has {} task(s)", updated.id, updated.tasks.len());
        }

        ProjectAction::RemoveTask { project, task } => {
            let updated = projects.remove_task_from_project(&project, &task).await?;
            println!("Project {} now has {} task(s)", updated.id, updated.tasks.len());
        }
    }

    Ok(())
}

async fn handle_pending(state: &AppState, action: PendingAction) -> Result<()> {
    match action {
        PendingAction::List => {
            for table in Table::ALL {
                let queued = state
                    .controller(table)
                    .pending_updates()
                    .await
                    .with_context(|| format!("Failed to read {}", table.pending_key()))?;
                if queued.is_empty() {
                    continue;
                }
                println!("{} ({}):", table.pending_key(), queued.len());
                for update in queued {
                    println!(
                        "  {} {} {} = {}",
                        update.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        update.task_id,
                        update.field,
                        update.value
                    );
                }
            }
        }

        PendingAction::Retry => {
            let mut failed = false;
            for (table, report) in state.retry_all().await {
                match report {
                    Ok(report) if report.attempted > 0 => println!(
                        "{}: {} synced, {} still pending",
                        table.pending_key(),
                        report.synced,
                        report.remaining
                    ),
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{}: {:#}", table.pending_key(), e);
                        failed = true;
                    }
                }
            }
            if failed {
                bail!("Some pending queues could not be replayed");
            }
        }
    }

    Ok(())
}
