//! The scheduler thread and the tasks that feed it.
//!
//! The lesson tree is `Rc` based, so it is created and used on one
//! dedicated thread. Everything else talks to that thread through
//! [`Command`]s and gets the final [`Summary`] back over a oneshot.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use leitner_core::{Answer, Card, Category, IntervalPolicy, LeitnerPolicy, Lesson, Scheduler};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::session::{LearnSession, Summary};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Re-check which cards are due.
    Tick,
    Answer(Answer),
    Quit,
}

/// Parse one line typed by the learner.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "p" | "pass" | "y" | "yes" => Some(Command::Answer(Answer::Pass)),
        "f" | "fail" | "n" | "no" => Some(Command::Answer(Answer::Fail)),
        "s" | "skip" => Some(Command::Answer(Answer::Skip)),
        "q" | "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// What the scheduler thread needs besides the lesson itself.
#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    pub policy: LeitnerPolicy,
    /// Slash separated path below the root. `None` learns the whole lesson.
    pub category: Option<String>,
    /// Where to save the lesson when the session ends.
    pub save_to: Option<PathBuf>,
}

pub struct SchedulerHandle {
    pub commands: mpsc::Sender<Command>,
    pub summary: oneshot::Receiver<anyhow::Result<Summary>>,
}

/// Start the scheduler thread. `open` runs on that thread and builds the
/// lesson; prompts go to `out`.
pub fn spawn_scheduler<F>(
    open: F,
    options: SchedulerOptions,
    mut out: Box<dyn Write + Send>,
) -> anyhow::Result<SchedulerHandle>
where
    F: FnOnce() -> anyhow::Result<Lesson> + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (summary_tx, summary_rx) = oneshot::channel();

    thread::Builder::new()
        .name("leitner-scheduler".into())
        .spawn(move || {
            let result = open().and_then(|lesson| drive(&lesson, &options, command_rx, &mut out));
            if let Err(err) = &result {
                tracing::error!(error = %err, "scheduler stopped");
            }
            // receiver gone means nobody is waiting for the summary
            let _ = summary_tx.send(result);
        })
        .context("failed to start scheduler thread")?;

    Ok(SchedulerHandle {
        commands: command_tx,
        summary: summary_rx,
    })
}

fn drive(
    lesson: &Lesson,
    options: &SchedulerOptions,
    mut commands: mpsc::Receiver<Command>,
    out: &mut dyn Write,
) -> anyhow::Result<Summary> {
    let category = find_category(lesson.root(), options.category.as_deref())?;
    let mut session = LearnSession::new(category, Scheduler::new(options.policy.clone()));
    tracing::info!(
        category = %session.category().path(),
        policy = options.policy.name(),
        due = session.remaining(),
        "session started"
    );

    // progress made before a failure is still saved
    let outcome = serve(&mut session, &mut commands, out);

    let mut summary = session.summary();
    drop(session);
    if let Some(path) = &options.save_to {
        if let Err(err) = &outcome {
            tracing::warn!(error = %err, "session interrupted, saving progress");
        }
        summary.saved = store::save(lesson, path)?;
    }
    outcome.map(|()| summary)
}

fn serve<P: IntervalPolicy>(
    session: &mut LearnSession<P>,
    commands: &mut mpsc::Receiver<Command>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    prompt(session, out)?;

    while let Some(command) = commands.blocking_recv() {
        match command {
            Command::Tick => {
                if session.refresh() > 0 && session.remaining() > 0 {
                    prompt(session, out)?;
                }
            }
            Command::Answer(answer) => {
                match session.answer(answer) {
                    Ok(Some(card)) => reveal(&card, answer, out)?,
                    Ok(None) => {}
                    Err(err) => tracing::warn!(error = %err, ?answer, "answer not applied"),
                }
                prompt(session, out)?;
            }
            Command::Quit => break,
        }
    }
    Ok(())
}

/// Resolve a slash separated category path below `root`.
pub fn find_category(root: &Category, path: Option<&str>) -> anyhow::Result<Category> {
    let mut current = root.clone();
    let names = path
        .unwrap_or_default()
        .split('/')
        .map(str::trim)
        .filter(|name| !name.is_empty());

    for name in names {
        current = match current.child(name) {
            Some(child) => child,
            None => bail!("no category {name} in {}", current.path()),
        };
    }
    Ok(current)
}

fn prompt<P: IntervalPolicy>(session: &LearnSession<P>, out: &mut dyn Write) -> anyhow::Result<()> {
    match session.current() {
        Some(card) => writeln!(
            out,
            "[{} | box {} | {} due] {}",
            card.category().map(|c| c.path()).unwrap_or_default(),
            card.level(),
            session.remaining(),
            card.front().text()
        )?,
        None => writeln!(out, "Nothing due right now. Waiting for cards to expire (q to quit).")?,
    }
    out.flush()?;
    Ok(())
}

fn reveal(card: &Card, answer: Answer, out: &mut dyn Write) -> anyhow::Result<()> {
    if answer != Answer::Skip {
        writeln!(out, "  -> {}", card.back().text())?;
    }
    Ok(())
}

/// Send a [`Command::Tick`] every `period`, starting one period from now.
pub fn spawn_ticker(commands: mpsc::Sender<Command>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            if commands.send(Command::Tick).await.is_err() {
                break;
            }
        }
    })
}

/// Forward learner input as commands. End of input quits the session.
///
/// Reads on its own thread: a pending blocking read would otherwise keep
/// the runtime from shutting down.
pub fn spawn_input(commands: mpsc::Sender<Command>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("leitner-input".into())
        .spawn(move || forward_input(io::stdin().lock(), &commands))
        .context("failed to start input thread")?;
    Ok(())
}

fn forward_input(input: impl BufRead, commands: &mpsc::Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read input");
                break;
            }
        };

        match parse_command(&line) {
            Some(Command::Quit) => break,
            Some(command) => {
                if commands.blocking_send(command).is_err() {
                    return;
                }
            }
            None if line.trim().is_empty() => {}
            None => tracing::warn!(input = %line.trim(), "unknown command, use p, f, s or q"),
        }
    }
    let _ = commands.blocking_send(Command::Quit);
}
