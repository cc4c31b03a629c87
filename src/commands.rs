//! Non-interactive subcommands. Each one drives the same `KanbanBoard`
//! operation the board UI uses.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Config, ConnectionArgs, FileConfig, ServeConfig};
use crate::input::TextInput;
use crate::kanban_board::KanbanBoard;
use crate::store::{CmsClient, MemoryStore, TaskStore};
use crate::task::{Status, Task};
use crate::{app, proxy};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the interactive board (default)
    Board,
    /// Print every task, grouped by column
    List(ListArgs),
    /// Add a task to the todo column
    Add(AddArgs),
    /// Change a task's title and/or explanation
    Edit(EditArgs),
    /// Delete a task
    Delete(DeleteArgs),
    /// Move a task to another column
    Move(MoveArgs),
    /// Run the proxy that holds the content store credential
    Serve(ServeArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output (for piping to jq)
    Json,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Shorthand for --output json
    #[arg(long, conflicts_with = "output")]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Task title
    pub title: String,
}

#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Task ID
    pub id: String,

    /// New title (kept if omitted)
    #[arg(long, short)]
    pub title: Option<String>,

    /// New explanation (kept if omitted)
    #[arg(long, short)]
    pub explanation: Option<String>,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Task ID
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct MoveArgs {
    /// Task ID
    pub id: String,

    /// Target column: todo, in-progress or done
    pub status: Status,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to listen on (default: 127.0.0.1:8787)
    #[arg(long, env = "TODOBOARD_LISTEN")]
    pub listen: Option<String>,

    /// Content store base URL to forward to
    #[arg(long, env = "TODOBOARD_UPSTREAM", conflicts_with = "in_memory")]
    pub upstream: Option<String>,

    /// Serve tasks from memory instead of a content store
    #[arg(long)]
    pub in_memory: bool,
}

pub fn client(config: &Config) -> Result<CmsClient> {
    CmsClient::new(
        &config.endpoint,
        config.api_key.clone(),
        config.limit,
        config.timeout,
    )
    .context("Failed to build task API client")
}

fn connect(connection: &ConnectionArgs) -> Result<KanbanBoard<CmsClient>> {
    let config = Config::load(connection)?;
    Ok(KanbanBoard::new(client(&config)?))
}

pub async fn run(command: Commands, connection: &ConnectionArgs) -> Result<()> {
    match command {
        Commands::Board => app::run(connect(connection)?.into_store()).await,
        Commands::List(args) => run_list(connect(connection)?, args).await,
        Commands::Add(args) => run_add(connect(connection)?, args).await,
        Commands::Edit(args) => run_edit(connect(connection)?, args).await,
        Commands::Delete(args) => run_delete(connect(connection)?, args).await,
        Commands::Move(args) => run_move(connect(connection)?, args).await,
        Commands::Serve(args) => run_serve(args, connection).await,
    }
}

async fn run_list<S: TaskStore>(mut board: KanbanBoard<S>, args: ListArgs) -> Result<()> {
    board.load().await.context("Failed to list tasks")?;

    let format = if args.json {
        OutputFormat::Json
    } else {
        args.output
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(board.tasks())?),
        OutputFormat::Human => print!("{}", render_columns(&board)),
    }
    Ok(())
}

fn render_columns<S: TaskStore>(board: &KanbanBoard<S>) -> String {
    let mut out = String::new();
    for status in Status::ALL {
        out.push_str(&format!("{}:\n", status.title()));
        let tasks = board.get_tasks_by_status(status);
        if tasks.is_empty() {
            out.push_str("  (empty)\n");
        }
        for task in tasks {
            out.push_str(&format_task(task));
        }
    }
    out
}

fn format_task(task: &Task) -> String {
    let mut line = format!("- [{}] {} ({})\n", task.id, task.task, task.created_local());
    if let Some(explanation) = task.explanation.as_deref().filter(|e| !e.is_empty()) {
        for text in explanation.lines() {
            line.push_str(&format!("    {text}\n"));
        }
    }
    line
}

async fn run_add<S: TaskStore>(mut board: KanbanBoard<S>, args: AddArgs) -> Result<()> {
    board.new_task = TextInput::with_value(args.title.clone());
    if board.add_task().await.context("Failed to add task")? {
        println!("Added: {}", args.title);
    }
    Ok(())
}

async fn run_edit<S: TaskStore>(mut board: KanbanBoard<S>, args: EditArgs) -> Result<()> {
    if args.title.is_none() && args.explanation.is_none() {
        return Err(anyhow!("Nothing to change. Use --title and/or --explanation"));
    }

    board.load().await.context("Failed to list tasks")?;
    if !board.open_editor(&args.id) {
        return Err(anyhow!("Task {} not found", args.id));
    }
    if let Some(editor) = board.editor_mut() {
        if let Some(title) = args.title {
            editor.title = TextInput::with_value(title);
        }
        if let Some(explanation) = args.explanation {
            editor.explanation = TextInput::with_value(explanation);
        }
    }
    board.save_editor().await.context("Failed to save task")?;

    if let Some(task) = board.task(&args.id) {
        print!("{}", format_task(task));
    }
    Ok(())
}

async fn run_delete<S: TaskStore>(mut board: KanbanBoard<S>, args: DeleteArgs) -> Result<()> {
    board
        .delete_task(&args.id)
        .await
        .with_context(|| format!("Failed to delete task {}", args.id))?;
    println!("Deleted: {}", args.id);
    Ok(())
}

async fn run_move<S: TaskStore>(mut board: KanbanBoard<S>, args: MoveArgs) -> Result<()> {
    board.load().await.context("Failed to list tasks")?;
    let moved = board
        .drop_task(&args.id, Some(args.status))
        .await
        .with_context(|| format!("Failed to move task {}", args.id))?;
    if !moved {
        return Err(anyhow!("Task {} not found", args.id));
    }
    println!("Moved {} to {}", args.id, args.status.title());
    Ok(())
}

async fn run_serve(args: ServeArgs, connection: &ConnectionArgs) -> Result<()> {
    let file = FileConfig::load(connection.config.as_deref())?;
    let serve = ServeConfig::resolve(
        args.listen.as_deref(),
        args.upstream.as_deref(),
        args.in_memory,
        connection,
        &file,
    )?;

    match serve.upstream {
        Some(upstream) => {
            if upstream.api_key.is_none() {
                tracing::warn!("no API key configured; upstream requests go out unauthenticated");
            }
            tracing::info!(upstream = %upstream.endpoint, "forwarding to content store");
            proxy::serve(Arc::new(client(&upstream)?), serve.listen).await
        }
        None => {
            tracing::info!("serving tasks from memory");
            proxy::serve(Arc::new(MemoryStore::new()), serve.listen).await
        }
    }
}
