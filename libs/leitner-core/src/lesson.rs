//! A lesson: one category tree plus its unsaved-changes flag.

use std::cell::Cell;
use std::rc::Rc;

use crate::category::Category;
use crate::clock::Clock;
use crate::error::Result;
use crate::events::{CardEvent, CategoryEvent, CategoryObserver};
use crate::snapshot::LessonSnapshot;

#[derive(Default)]
struct DirtyFlag(Cell<bool>);

impl CategoryObserver for DirtyFlag {
    fn on_card_event(&self, _event: &CardEvent) {
        self.0.set(true);
    }

    fn on_category_event(&self, _event: &CategoryEvent) {
        self.0.set(true);
    }
}

/// Owns the root category and tracks whether anything changed since the last
/// save or load.
pub struct Lesson {
    root: Category,
    dirty: Rc<DirtyFlag>,
}

impl Lesson {
    /// Wrap an existing root. The lesson starts clean.
    pub fn new(root: Category) -> Self {
        let dirty = Rc::new(DirtyFlag::default());
        root.add_observer(dirty.clone());
        Self { root, dirty }
    }

    pub fn with_clock(root_name: &str, clock: Rc<dyn Clock>) -> Self {
        Self::new(Category::with_clock(root_name, clock))
    }

    pub fn root(&self) -> &Category {
        &self.root
    }

    /// True if the tree changed since creation or the last [`mark_saved`].
    ///
    /// [`mark_saved`]: Lesson::mark_saved
    pub fn can_save(&self) -> bool {
        self.dirty.0.get()
    }

    pub fn mark_saved(&self) {
        self.dirty.0.set(false);
    }

    /// Same categories and cards, none of them carrying learn progress. The
    /// copy counts as unsaved.
    pub fn clone_without_progress(&self) -> Lesson {
        let lesson = Lesson::new(self.root.clone_without_progress());
        lesson.dirty.0.set(true);
        lesson
    }

    pub fn snapshot(&self) -> LessonSnapshot {
        LessonSnapshot {
            root: self.root.snapshot(),
        }
    }

    /// Rebuild a lesson from a snapshot. The restored lesson starts clean.
    pub fn restore(snapshot: &LessonSnapshot, clock: Rc<dyn Clock>) -> Result<Lesson> {
        let root = snapshot.root.restore(clock)?;
        Ok(Lesson::new(root))
    }
}

impl Drop for Lesson {
    fn drop(&mut self) {
        self.root.remove_observer(&self.dirty);
    }
}
