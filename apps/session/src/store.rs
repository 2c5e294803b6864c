//! Lesson persistence as pretty printed JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Context;
use leitner_core::{Clock, Lesson, LessonSnapshot};

/// Load a lesson. A missing file is not an error.
pub fn load(path: &Path, clock: Rc<dyn Clock>) -> anyhow::Result<Option<Lesson>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read lesson {}", path.display()))?;
    let snapshot: LessonSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("malformed lesson {}", path.display()))?;
    let lesson = Lesson::restore(&snapshot, clock)
        .with_context(|| format!("invalid lesson {}", path.display()))?;

    tracing::debug!(path = %path.display(), cards = lesson.root().cards().len(), "loaded lesson");
    Ok(Some(lesson))
}

/// Save the lesson if it has unsaved changes. Returns whether anything was
/// written.
///
/// The file is written next to its destination first and then renamed, so
/// a crash never leaves a truncated lesson behind.
pub fn save(lesson: &Lesson, path: &Path) -> anyhow::Result<bool> {
    if !lesson.can_save() {
        return Ok(false);
    }

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let json = serde_json::to_string_pretty(&lesson.snapshot())?;
    let tmp = temp_path(path);
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    lesson.mark_saved();
    tracing::info!(path = %path.display(), "saved lesson");
    Ok(true)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
