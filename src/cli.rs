use crate::builtin;
use crate::config::Config;
use crate::engine::ExecutionHandle;
use crate::model::DispatchEvent;
use crate::orchestrator::Controller;
use crate::registry::Registry;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// Output line routing for stdout/stderr writer.
#[derive(Debug, PartialEq)]
enum OutputLine {
    Stdout(String),
    Stderr(String),
    /// Written to stdout without a trailing newline.
    Prompt(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
                OutputLine::Prompt(prompt) => {
                    let _ = write!(out, "{}", prompt);
                    let _ = out.flush();
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "cmdctl",
    version,
    about = "Dispatch commands to registered handlers, with completion"
)]
pub struct Cli {
    /// Path to a TOML config file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Maximum number of commands running at the same time
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Fail executions that run longer than this (e.g. 30s, 2m)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Print every result as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Print completions for PREFIX and exit
    #[arg(long, value_name = "PREFIX")]
    pub complete: Option<String>,

    /// Run this command once and exit; reads commands from stdin when omitted
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Load the config file and apply CLI overrides.
pub fn load_config(args: &Cli) -> Result<Config> {
    let config = Config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?
        .merge_with_cli_args(args);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    Ok(config)
}

pub async fn run(args: Cli, config: Config) -> Result<()> {
    let registry = Arc::new(Registry::new());
    builtin::register_all(&registry).context("failed to register built-in commands")?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<DispatchEvent>();
    let controller = Controller::new(registry, &config, event_tx)?;
    debug!(commands = ?controller.registry().names(), "registered built-in commands");

    let interactive = args.complete.is_none() && args.command.is_empty();
    // Only prompt a human; piped input gets bare results.
    let prompt = (interactive && std::io::stdin().is_terminal()).then(|| config.prompt.clone());
    let (out_tx, out_handle) = spawn_output_writer();
    let printer = spawn_event_printer(event_rx, out_tx.clone(), args.json, prompt.clone());

    let outcome = if let Some(prefix) = args.complete.as_deref() {
        for suggestion in controller.autocomplete(prefix) {
            let _ = out_tx.send(OutputLine::Stdout(suggestion));
        }
        Ok(())
    } else if !args.command.is_empty() {
        if let Ok(handle) = controller.dispatch(&args.command) {
            handle.wait().await;
        }
        Ok(())
    } else {
        run_interactive(&controller, prompt.as_deref(), &out_tx).await
    };

    // Every execution has finished or been cancelled here, so dropping the
    // controller closes the sink and lets the printer drain.
    drop(controller);
    let failures = printer.await.context("event printer task failed")?;
    drop(out_tx);
    let _ = out_handle.await;

    outcome?;
    if !args.command.is_empty() && failures > 0 {
        bail!("command `{}` did not succeed", args.command[0]);
    }
    Ok(())
}

/// Forward sink events to the output writer. Resolves to the number of
/// error reports seen once the sink closes.
///
/// With a prompt, it is printed again after every event since results arrive
/// while the user is typing.
fn spawn_event_printer(
    mut event_rx: mpsc::UnboundedReceiver<DispatchEvent>,
    out_tx: mpsc::UnboundedSender<OutputLine>,
    json: bool,
    prompt: Option<String>,
) -> tokio::task::JoinHandle<usize> {
    tokio::spawn(async move {
        let mut failures = 0usize;
        while let Some(ev) = event_rx.recv().await {
            if ev.is_error() {
                failures += 1;
            }
            let line = if json {
                match serde_json::to_string(&ev) {
                    Ok(encoded) => OutputLine::Stdout(encoded),
                    Err(e) => OutputLine::Stderr(format!("failed to encode event: {e}")),
                }
            } else if ev.is_error() {
                match ev.id() {
                    Some(id) => OutputLine::Stderr(format!("[{}] {}", id, ev.to_message())),
                    None => OutputLine::Stderr(ev.to_message()),
                }
            } else {
                OutputLine::Stdout(ev.to_message())
            };
            let _ = out_tx.send(line);
            if let Some(prompt) = &prompt {
                let _ = out_tx.send(OutputLine::Prompt(prompt.clone()));
            }
        }
        failures
    })
}

/// One line of interactive input.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Empty,
    Quit,
    Complete(&'a str),
    Command(Vec<&'a str>),
}

fn parse_line(line: &str) -> Input<'_> {
    let trimmed = line.trim_start();
    if trimmed.trim_end().is_empty() {
        return Input::Empty;
    }
    if let Some(prefix) = trimmed.strip_prefix('?') {
        return Input::Complete(prefix);
    }
    match trimmed.trim_end() {
        "exit" | "quit" => Input::Quit,
        _ => Input::Command(trimmed.split_whitespace().collect()),
    }
}

/// Cancel every unfinished execution and say so. Returns how many were cancelled.
fn cancel_in_flight(
    in_flight: &[ExecutionHandle],
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> usize {
    let mut cancelled = 0;
    for handle in in_flight.iter().filter(|h| !h.is_finished()) {
        handle.cancel();
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "[{}] {}: cancelled",
            handle.id(),
            handle.command()
        )));
        cancelled += 1;
    }
    cancelled
}

async fn run_interactive(
    controller: &Controller,
    prompt: Option<&str>,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Vec<ExecutionHandle> = Vec::new();

    loop {
        if let Some(prompt) = prompt {
            let _ = out_tx.send(OutputLine::Prompt(prompt.to_string()));
        }
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                let _ = out_tx.send(OutputLine::Stdout(String::new()));
                let cancelled = cancel_in_flight(&in_flight, out_tx);
                debug!(cancelled, "interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        in_flight.retain(|h| !h.is_finished());

        match parse_line(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Complete(prefix) => {
                let suggestions = controller.autocomplete(prefix);
                if suggestions.is_empty() {
                    let _ = out_tx.send(OutputLine::Stderr("(no completions)".into()));
                }
                for suggestion in suggestions {
                    let _ = out_tx.send(OutputLine::Stdout(suggestion));
                }
            }
            Input::Command(tokens) => {
                // Rejections are reported through the sink.
                if let Ok(handle) = controller.dispatch(&tokens) {
                    in_flight.push(handle);
                }
            }
        }
    }

    futures::future::join_all(in_flight.into_iter().map(|h| h.wait())).await;
    Ok(())
}
