pub mod actor;
pub mod config;
pub mod session;
pub mod store;

use std::fs;
use std::rc::Rc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use leitner_core::{import_into, Clock, Lesson, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::actor::{spawn_input, spawn_scheduler, spawn_ticker, SchedulerOptions};
use crate::config::Config;

const ROOT_NAME: &str = "All";

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::parse();
    let lesson_path = config.lesson_path();
    tracing::info!(lesson = %lesson_path.display(), "Opening lesson...");

    let options = SchedulerOptions {
        policy: config.policy(),
        category: config.category.clone(),
        save_to: Some(lesson_path),
    };
    let open_config = config.clone();
    let handle = spawn_scheduler(
        move || open_lesson(&open_config),
        options,
        Box::new(std::io::stdout()),
    )?;

    let ticker = spawn_ticker(handle.commands.clone(), config.tick());
    spawn_input(handle.commands)?;

    let summary = handle
        .summary
        .await
        .context("scheduler thread exited without a summary")??;
    ticker.abort();

    println!(
        "Passed {}, failed {}, skipped {}. {} cards moved up, {} moved down, {} still due.",
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.promoted,
        summary.demoted,
        summary.remaining
    );
    if summary.saved {
        tracing::info!("Lesson saved");
    }
    Ok(())
}

/// Load the lesson file, or start an empty lesson, then apply the
/// configured import.
fn open_lesson(config: &Config) -> anyhow::Result<Lesson> {
    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let path = config.lesson_path();
    let lesson = match store::load(&path, Rc::clone(&clock))? {
        Some(lesson) => lesson,
        None => {
            tracing::info!("No lesson found, starting a new one");
            Lesson::with_clock(ROOT_NAME, clock)
        }
    };

    if let Some(import) = &config.import {
        let content = fs::read_to_string(import)
            .with_context(|| format!("failed to read {}", import.display()))?;
        let count = import_into(lesson.root(), &content, Utc::now())
            .with_context(|| format!("failed to import {}", import.display()))?;
        tracing::info!(count, file = %import.display(), "Imported cards");
    }
    Ok(lesson)
}
