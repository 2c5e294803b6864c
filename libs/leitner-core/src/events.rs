//! Change notifications.
//!
//! Events originate at the category where a mutation was applied and bubble
//! up to the root. Observing a category therefore also observes everything
//! that happens in its subtree.

use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::category::Category;

/// What happened to a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardEventKind {
    Added,
    Removed,
    /// Relocated to another category with level and stats intact. Fired once
    /// at the old and once at the new category, never as remove plus add.
    Moved,
    /// Level transition, reappend or reset.
    DeckChanged,
    /// Content or score changed. Never changes deck shape.
    Edited,
}

/// What happened to a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryEventKind {
    Added,
    Removed,
    Edited,
}

#[derive(Debug, Clone)]
pub struct CardEvent {
    pub kind: CardEventKind,
    pub card: Card,
    /// The category that held the card when the event happened. For moves
    /// this is the old category.
    pub category: Category,
    /// The deck level that held the card when the event happened.
    pub deck: usize,
}

#[derive(Debug, Clone)]
pub struct CategoryEvent {
    pub kind: CategoryEventKind,
    pub category: Category,
}

/// Receives events from an observed category and all of its descendants.
///
/// Handlers may register or unregister observers and trigger further events;
/// every dispatch iterates over a snapshot of the observer list.
pub trait CategoryObserver {
    fn on_card_event(&self, _event: &CardEvent) {}

    fn on_category_event(&self, _event: &CategoryEvent) {}
}
