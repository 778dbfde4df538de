// task.rs — Task scope subcommands: start, finish, show.

use clap::Subcommand;
use tb_dispatch::EngineConfig;

use super::open_engine;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Begin a task with declared boundaries.
    Start {
        /// Task identifier (e.g., "TASK-42").
        task_id: String,
        /// Glob patterns for paths the task may write (repeatable).
        #[arg(long = "path")]
        paths: Vec<String>,
        /// Regex patterns for commands the task may run (repeatable).
        #[arg(long = "command")]
        commands: Vec<String>,
    },
    /// Complete (or abandon) the current task.
    Finish,
    /// Show the current task scope.
    Show,
}

pub fn execute(cmd: &TaskCommands, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    match cmd {
        TaskCommands::Start {
            task_id,
            paths,
            commands,
        } => {
            let task = engine.start_task(task_id, paths.clone(), commands.clone())?;
            println!(
                "Task '{}' started: {} path pattern(s), {} command pattern(s).",
                task.task_id,
                task.allowed_paths.len(),
                task.allowed_command_patterns.len()
            );
        }

        TaskCommands::Finish => match engine.finish_task()? {
            Some(task) => println!(
                "Task '{}' finished; {} file(s) were modified.",
                task.task_id,
                task.modified_files.len()
            ),
            None => println!("No task is active."),
        },

        TaskCommands::Show => match engine.current_task() {
            Some(task) => {
                println!("Task:     {}", task.task_id);
                println!("Started:  {}", task.started_at.format("%Y-%m-%d %H:%M:%S"));
                println!("Paths:    {}", task.allowed_paths.join(", "));
                println!("Commands: {}", task.allowed_command_patterns.join(", "));
                if task.modified_files.is_empty() {
                    println!("Modified: (none yet)");
                } else {
                    println!("Modified:");
                    for file in &task.modified_files {
                        println!(
                            "  {} at {}",
                            file.path,
                            file.modified_at.format("%H:%M:%S")
                        );
                    }
                }
            }
            None => println!("No task is active."),
        },
    }

    Ok(())
}
