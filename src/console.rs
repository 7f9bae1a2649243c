// src/console.rs

//! Line-oriented command console on stdin.

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::{SchedulerHandle, Task, TaskKind};

pub const HELP: &str = "commands: b|binary|rebuild-binary, s|styles|rebuild-styles [entry...], \
i|images|rebuild-images [entry...], j|scripts|rebuild-scripts [entry...], q|quit|exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    RebuildBinary,
    /// Rebuild the named entries of one category; empty means all of them.
    Rebuild { kind: TaskKind, entries: Vec<String> },
    Quit,
    Help,
    /// Blank line.
    Nothing,
}

impl ConsoleCommand {
    /// Tasks to submit through `execute_and_restart`.
    pub fn tasks(&self) -> Vec<Task> {
        match self {
            ConsoleCommand::RebuildBinary => vec![Task::all(TaskKind::BuildBinary)],
            ConsoleCommand::Rebuild { kind, entries } => {
                let mut tasks: Vec<Task> = if entries.is_empty() {
                    vec![Task::all(*kind)]
                } else {
                    entries.iter().map(|e| Task::new(*kind, e.as_str())).collect()
                };
                tasks.push(Task::all(TaskKind::RegenerateAssetsMapping));
                tasks
            }
            _ => Vec::new(),
        }
    }
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return ConsoleCommand::Nothing;
    };

    let kind = match command {
        "b" | "binary" | "rebuild-binary" => return ConsoleCommand::RebuildBinary,
        "q" | "quit" | "exit" => return ConsoleCommand::Quit,
        "s" | "styles" | "rebuild-styles" => TaskKind::BuildStyles,
        "i" | "images" | "rebuild-images" => TaskKind::BuildImages,
        "j" | "scripts" | "rebuild-scripts" => TaskKind::BuildJavaScripts,
        _ => return ConsoleCommand::Help,
    };
    ConsoleCommand::Rebuild {
        kind,
        entries: words.map(str::to_string).collect(),
    }
}

/// Read commands from stdin until `quit` or end of input.
///
/// Rebuild requests go straight to the scheduler. A quit is reported on
/// `quit_tx`; the caller owns the shutdown sequence. Closed stdin only stops
/// the console.
pub async fn run_console(scheduler: SchedulerHandle, quit_tx: mpsc::UnboundedSender<()>) {
    let Some(mut lines) = spawn_stdin_reader() else {
        return;
    };

    while let Some(line) = lines.recv().await {
        match parse_command(&line) {
            ConsoleCommand::Nothing => {}
            ConsoleCommand::Help => info!("{HELP}"),
            ConsoleCommand::Quit => {
                info!("quit requested");
                let _ = quit_tx.send(());
                return;
            }
            command => {
                if scheduler.execute_and_restart(command.tasks()).is_err() {
                    return;
                }
            }
        }
    }
    info!("stdin closed; console stopped");
}

/// Blocking stdin reads on a detached thread, so a pending read never holds
/// up runtime shutdown.
fn spawn_stdin_reader() -> Option<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("buildweb-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read console input");
                        return;
                    }
                }
            }
        });

    match spawned {
        Ok(_) => Some(rx),
        Err(err) => {
            warn!(error = %err, "failed to start console reader");
            None
        }
    }
}
