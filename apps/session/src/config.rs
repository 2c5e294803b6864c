use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use leitner_core::LeitnerPolicy;

const APP_NAME: &str = "leitner";

/// Command line and environment configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "leitner")]
#[command(about = "Review flash cards with Leitner boxes")]
#[command(version)]
pub struct Config {
    /// Lesson file to load and save
    #[arg(long, env = "LEITNER_LESSON")]
    pub lesson: Option<PathBuf>,

    /// Markdown file to import into the lesson root before learning
    #[arg(long, env = "LEITNER_IMPORT")]
    pub import: Option<PathBuf>,

    /// Days a card stays learned per level, comma separated
    #[arg(
        long,
        env = "LEITNER_DELAYS",
        value_delimiter = ',',
        default_value = "1,2,4,8,16,32,64"
    )]
    pub delays: Vec<u32>,

    /// Seconds between checks for newly expired cards
    #[arg(long, env = "LEITNER_TICK_SECS", default_value_t = 30)]
    pub tick_secs: u64,

    /// Category to learn, as a slash separated path below the root
    #[arg(long, env = "LEITNER_CATEGORY")]
    pub category: Option<String>,
}

impl Config {
    pub fn lesson_path(&self) -> PathBuf {
        match &self.lesson {
            Some(path) => path.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("lesson.json"),
        }
    }

    pub fn policy(&self) -> LeitnerPolicy {
        LeitnerPolicy::new(self.delays.clone())
    }

    /// Never zero, `tokio::time::interval` rejects that.
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }
}
