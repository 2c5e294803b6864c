//! Shared fixtures for leitner-core integration tests.
//!
//! Provides:
//! - a controllable clock starting at a fixed instant
//! - a recording observer that keeps every event it receives
//! - helpers for building small category trees

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};

use leitner_core::{
    Card, CardEvent, CardEventKind, Category, CategoryEvent, CategoryEventKind, CategoryObserver,
    ManualClock,
};

/// 2024-03-01 09:00 UTC.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Root category driven by a manual clock.
pub fn tree(name: &str) -> (Rc<ManualClock>, Category) {
    let clock = Rc::new(ManualClock::new(start()));
    let root = Category::with_clock(name, clock.clone());
    (clock, root)
}

pub fn card(front: &str, back: &str) -> Card {
    Card::new(start(), front, back).expect("valid card")
}

pub fn child(parent: &Category, name: &str) -> Category {
    parent
        .add_category_child(Category::new(name))
        .expect("unique child name")
}

/// Asserts the deck-count invariant on every node of the subtree.
pub fn assert_deck_invariant(root: &Category) {
    for category in root.subtree() {
        let max_child = category
            .children()
            .iter()
            .map(Category::number_of_decks)
            .max()
            .unwrap_or(0);
        let decks = category.number_of_decks();
        let local_top = (0..decks)
            .rev()
            .find(|&level| !category.local_cards_at(level).is_empty())
            .map_or(0, |level| level + 1);

        assert_eq!(
            decks,
            max_child.max(local_top),
            "deck count of {} out of shape",
            category.path()
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Card {
        kind: CardEventKind,
        front: String,
        category: String,
        deck: usize,
    },
    Category {
        kind: CategoryEventKind,
        category: String,
    },
}

/// Observer that records every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    events: RefCell<Vec<Recorded>>,
}

impl RecordingObserver {
    pub fn attach(category: &Category) -> Rc<Self> {
        let observer = Rc::new(Self::default());
        category.add_observer(observer.clone());
        observer
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.borrow().clone()
    }

    pub fn card_kinds(&self) -> Vec<CardEventKind> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Recorded::Card { kind, .. } => Some(*kind),
                Recorded::Category { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl CategoryObserver for RecordingObserver {
    fn on_card_event(&self, event: &CardEvent) {
        self.events.borrow_mut().push(Recorded::Card {
            kind: event.kind,
            front: event.card.front().text().to_string(),
            category: event.category.path(),
            deck: event.deck,
        });
    }

    fn on_category_event(&self, event: &CategoryEvent) {
        self.events.borrow_mut().push(Recorded::Category {
            kind: event.kind,
            category: event.category.name(),
        });
    }
}
