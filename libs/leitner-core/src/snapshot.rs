//! Plain-data snapshots of a lesson for persistence layers.
//!
//! Snapshots are what gets serialized; the live tree is never serialized
//! directly. Restoring validates every card before the tree is returned.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{validated_sides, Card, CardData, CardSide};
use crate::category::Category;
use crate::clock::Clock;
use crate::error::{Error, Result};

/// Highest level a restored card may claim. Each level is a deck, so a
/// corrupt file must not be able to demand billions of them.
pub const MAX_RESTORED_LEVEL: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSnapshot {
    pub root: CategorySnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<CardSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategorySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSnapshot {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub learned_amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub front: SideSnapshot,
    pub back: SideSnapshot,
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
    /// Falls back to the creation date when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_touched: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_tested: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expired: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tests_total: u32,
    #[serde(default)]
    pub tests_passed: u32,
}

impl SideSnapshot {
    fn of(side: &CardSide) -> Self {
        Self {
            text: side.text().to_string(),
            images: side.images().to_vec(),
            learned_amount: side.learned_amount(),
        }
    }
}

impl Card {
    pub fn snapshot(&self) -> CardSnapshot {
        let data = self.data();
        CardSnapshot {
            front: SideSnapshot::of(&data.front),
            back: SideSnapshot::of(&data.back),
            level: data.level,
            date_created: Some(data.date_created),
            date_modified: Some(data.date_modified),
            date_touched: Some(data.date_touched),
            date_tested: data.date_tested,
            date_expired: data.date_expired,
            tests_total: data.tests_total,
            tests_passed: data.tests_passed,
        }
    }
}

impl Category {
    /// Snapshot of this subtree. Cards are listed deck by deck.
    pub fn snapshot(&self) -> CategorySnapshot {
        CategorySnapshot {
            name: self.name(),
            cards: self.local_cards().iter().map(Card::snapshot).collect(),
            children: self.children().iter().map(Category::snapshot).collect(),
        }
    }
}

impl CardSnapshot {
    /// Build a detached card. The level is applied when the card is attached.
    pub fn restore(&self) -> Result<Card> {
        let date_created = self.date_created.ok_or(Error::NullDate {
            field: "date_created",
        })?;
        let date_modified = self.date_modified.ok_or(Error::NullDate {
            field: "date_modified",
        })?;
        if date_modified < date_created {
            return Err(Error::ModifiedBeforeCreated);
        }
        if self.level > MAX_RESTORED_LEVEL {
            return Err(Error::invariant(format!(
                "card level {} exceeds {MAX_RESTORED_LEVEL}",
                self.level
            )));
        }

        let (front, back) = validated_sides(&self.front.text, &self.back.text)?;

        Ok(Card::from_data(CardData {
            category: None,
            level: self.level,
            front: CardSide::with_parts(
                front,
                self.front.images.clone(),
                self.front.learned_amount,
            ),
            back: CardSide::with_parts(back, self.back.images.clone(), self.back.learned_amount),
            date_created,
            date_modified,
            date_touched: self.date_touched.unwrap_or(date_created),
            date_tested: self.date_tested,
            date_expired: self.date_expired,
            tests_total: self.tests_total,
            tests_passed: self.tests_passed.min(self.tests_total),
        }))
    }
}

impl CategorySnapshot {
    /// Rebuild the subtree as a detached category tree using `clock`.
    pub fn restore(&self, clock: Rc<dyn Clock>) -> Result<Category> {
        let category = Category::with_clock(self.name.clone(), Rc::clone(&clock));

        let cards = self
            .cards
            .iter()
            .map(|snapshot| snapshot.restore().map(|card| (card, snapshot.level)))
            .collect::<Result<Vec<_>>>()?;
        for (card, level) in &cards {
            category.attach(card, *level);
        }

        for child in &self.children {
            category.add_category_child(child.restore(Rc::clone(&clock))?)?;
        }
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::scheduler::raise_level;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 7, 30, 0).unwrap()
    }

    fn clock() -> Rc<dyn Clock> {
        Rc::new(FixedClock(at()))
    }

    fn side(text: &str) -> SideSnapshot {
        SideSnapshot {
            text: text.to_string(),
            images: Vec::new(),
            learned_amount: 0,
        }
    }

    fn card_snapshot(front: &str) -> CardSnapshot {
        CardSnapshot {
            front: side(front),
            back: side("back"),
            level: 0,
            date_created: Some(at()),
            date_modified: Some(at()),
            date_touched: None,
            date_tested: None,
            date_expired: None,
            tests_total: 0,
            tests_passed: 0,
        }
    }

    #[test]
    fn snapshot_restore_preserves_tree() {
        let root = Category::with_clock("All", clock());
        let verbs = root.add_category_child(Category::new("Verbs")).unwrap();
        let card = Card::new(at(), "ser", "to be").unwrap();
        verbs.add_card(&card).unwrap();
        raise_level(&card, at(), at() + Duration::days(2)).unwrap();
        root.add_card(&Card::new(at(), "hola", "hello").unwrap()).unwrap();

        let snapshot = root.snapshot();
        let restored = snapshot.restore(clock()).unwrap();

        assert_eq!(restored.snapshot(), snapshot);
        let restored_card = restored.child("Verbs").unwrap().cards_at(1)[0].clone();
        assert_eq!(restored_card.tests_passed(), 1);
        assert_eq!(restored_card.date_expired(), Some(at() + Duration::days(2)));
        assert_eq!(restored.number_of_decks(), 2);
    }

    #[test]
    fn missing_dates_are_rejected() {
        let mut snapshot = card_snapshot("q");
        snapshot.date_created = None;
        assert_eq!(
            snapshot.restore().unwrap_err(),
            Error::NullDate {
                field: "date_created"
            }
        );

        let mut snapshot = card_snapshot("q");
        snapshot.date_modified = None;
        assert_eq!(
            snapshot.restore().unwrap_err(),
            Error::NullDate {
                field: "date_modified"
            }
        );
    }

    #[test]
    fn empty_text_is_rejected() {
        let category = CategorySnapshot {
            name: "All".to_string(),
            cards: vec![card_snapshot("q"), card_snapshot(" ")],
            children: Vec::new(),
        };
        assert!(matches!(
            category.restore(clock()),
            Err(Error::InvalidContent { .. })
        ));
    }

    #[test]
    fn level_sanity_rules_apply_on_restore() {
        let mut learned = card_snapshot("learned");
        learned.level = 2;
        let mut stale = card_snapshot("stale");
        stale.date_expired = Some(at());

        let category = CategorySnapshot {
            name: "All".to_string(),
            cards: vec![learned, stale],
            children: Vec::new(),
        };
        let restored = category.restore(clock()).unwrap();

        assert_eq!(restored.cards_at(2)[0].date_expired(), Some(at()));
        assert!(restored.cards_at(0)[0].is_unlearned());
    }

    #[test]
    fn absurd_levels_are_rejected() {
        let mut corrupt = card_snapshot("corrupt");
        corrupt.level = usize::MAX;
        assert!(matches!(
            corrupt.restore(),
            Err(Error::InvariantViolation(_))
        ));

        let mut top = card_snapshot("top");
        top.level = MAX_RESTORED_LEVEL;
        let category = CategorySnapshot {
            name: "All".to_string(),
            cards: vec![corrupt, top],
            children: Vec::new(),
        };
        assert!(category.restore(clock()).is_err());
    }

    #[test]
    fn highest_allowed_level_restores() {
        let mut top = card_snapshot("top");
        top.level = MAX_RESTORED_LEVEL;
        let category = CategorySnapshot {
            name: "All".to_string(),
            cards: vec![top],
            children: Vec::new(),
        };

        let restored = category.restore(clock()).unwrap();
        assert_eq!(restored.number_of_decks(), MAX_RESTORED_LEVEL + 1);
    }

    #[test]
    fn duplicate_children_are_rejected() {
        let child = CategorySnapshot {
            name: "Twin".to_string(),
            cards: Vec::new(),
            children: Vec::new(),
        };
        let category = CategorySnapshot {
            name: "All".to_string(),
            cards: Vec::new(),
            children: vec![child.clone(), child],
        };
        assert!(matches!(
            category.restore(clock()),
            Err(Error::InvariantViolation(_))
        ));
    }
}
