//! Leitner box scheduling engine.
//!
//! Provides:
//! - Cards with two sides, learn dates and pass/fail stats
//! - A category tree holding one deck per level
//! - Level transitions (raise, reset, reappend, full reset) and interval policies
//! - Change notifications bubbling from a category up to the root
//! - Snapshots for persistence, markdown import and side-aware search
//!
//! The tree is single-threaded (`Rc` based). Callers that need cross-thread
//! access keep the tree on one thread and talk to it through messages.

pub mod card;
pub mod category;
pub mod clock;
pub mod error;
pub mod events;
pub mod import;
pub mod lesson;
pub mod natural;
pub mod policy;
pub mod scheduler;
pub mod search;
pub mod snapshot;

pub use card::{Card, CardSide, CardState, Side};
pub use category::Category;
pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use error::{Error, ParseError, Result};
pub use events::{CardEvent, CardEventKind, CategoryEvent, CategoryEventKind, CategoryObserver};
pub use import::{import_into, ImportedCard};
pub use lesson::Lesson;
pub use natural::natural_cmp;
pub use policy::{IntervalPolicy, LeitnerPolicy};
pub use scheduler::{full_reset, raise_level, reappend, reset_level, Answer, Scheduler};
pub use search::{find_positions, search_cards, SearchSide};
pub use snapshot::{
    CardSnapshot, CategorySnapshot, LessonSnapshot, SideSnapshot, MAX_RESTORED_LEVEL,
};
