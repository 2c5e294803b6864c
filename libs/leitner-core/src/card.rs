//! Flash cards and their two sides.
//!
//! A [`Card`] is a shared handle: cloning it yields another handle to the same
//! card, and equality is identity. The category tree owns bucket membership;
//! the card only keeps a weak back-reference to its current owner.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::{Category, WeakCategory};
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::events::CardEventKind;

/// Which side of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Front,
    Back,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => f.write_str("front"),
            Self::Back => f.write_str("back"),
        }
    }
}

/// Where a card stands relative to a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// Never learned, or failed since.
    Unlearned,
    /// Learned and not yet due.
    Learned,
    /// Learned, but the expiration date has passed.
    Expired,
}

/// Content of one card side.
///
/// Attachments are opaque identifiers into an external store; the card never
/// holds attachment bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardSide {
    text: String,
    images: Vec<String>,
    learned_amount: u32,
}

impl CardSide {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
            learned_amount: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// How many times this side was answered correctly in the current deck.
    pub fn learned_amount(&self) -> u32 {
        self.learned_amount
    }

    pub(crate) fn with_parts(text: String, images: Vec<String>, learned_amount: u32) -> Self {
        Self {
            text,
            images,
            learned_amount,
        }
    }

    fn without_progress(&self) -> Self {
        Self {
            learned_amount: 0,
            ..self.clone()
        }
    }
}

/// Normalize side text: unify line endings and trim surrounding whitespace.
pub(crate) fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

pub(crate) fn validated_sides(front: &str, back: &str) -> Result<(String, String)> {
    let front = normalize_text(front);
    if front.is_empty() {
        return Err(Error::InvalidContent { side: Side::Front });
    }
    let back = normalize_text(back);
    if back.is_empty() {
        return Err(Error::InvalidContent { side: Side::Back });
    }
    Ok((front, back))
}

pub(crate) struct CardData {
    pub(crate) category: Option<WeakCategory>,
    pub(crate) level: usize,
    pub(crate) front: CardSide,
    pub(crate) back: CardSide,
    pub(crate) date_created: DateTime<Utc>,
    pub(crate) date_modified: DateTime<Utc>,
    pub(crate) date_touched: DateTime<Utc>,
    pub(crate) date_tested: Option<DateTime<Utc>>,
    pub(crate) date_expired: Option<DateTime<Utc>>,
    pub(crate) tests_total: u32,
    pub(crate) tests_passed: u32,
}

impl CardData {
    pub(crate) fn side_mut(&mut self, side: Side) -> &mut CardSide {
        match side {
            Side::Front => &mut self.front,
            Side::Back => &mut self.back,
        }
    }

    pub(crate) fn reset_learned_amounts(&mut self) {
        self.front.learned_amount = 0;
        self.back.learned_amount = 0;
    }
}

/// A learnable flash card.
#[derive(Clone)]
pub struct Card(Rc<RefCell<CardData>>);

impl Card {
    /// Create a detached card. Both sides must contain text.
    pub fn new(created: DateTime<Utc>, front: &str, back: &str) -> Result<Self> {
        let (front, back) = validated_sides(front, back)?;
        Ok(Self::from_sides(
            created,
            CardSide::new(front),
            CardSide::new(back),
        ))
    }

    fn from_sides(created: DateTime<Utc>, front: CardSide, back: CardSide) -> Self {
        Self::from_data(CardData {
            category: None,
            level: 0,
            front,
            back,
            date_created: created,
            date_modified: created,
            date_touched: created,
            date_tested: None,
            date_expired: None,
            tests_total: 0,
            tests_passed: 0,
        })
    }

    pub(crate) fn from_data(data: CardData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    pub(crate) fn data(&self) -> Ref<'_, CardData> {
        self.0.borrow()
    }

    pub(crate) fn data_mut(&self) -> RefMut<'_, CardData> {
        self.0.borrow_mut()
    }

    /// True if both handles point at the same card.
    pub fn ptr_eq(&self, other: &Card) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /*
     * Content
     */

    pub fn front(&self) -> CardSide {
        self.data().front.clone()
    }

    pub fn back(&self) -> CardSide {
        self.data().back.clone()
    }

    pub fn side(&self, side: Side) -> CardSide {
        match side {
            Side::Front => self.front(),
            Side::Back => self.back(),
        }
    }

    /// Replace the text of both sides.
    ///
    /// Rejects empty sides before touching anything. Setting the current
    /// content again is a no-op. Attached cards get a new modification date
    /// and fire an `Edited` event.
    pub fn set_sides(&self, front: &str, back: &str) -> Result<()> {
        let (front, back) = validated_sides(front, back)?;

        {
            let mut data = self.data_mut();
            if data.front.text == front && data.back.text == back {
                return Ok(());
            }
            data.front.text = front;
            data.back.text = back;
        }

        self.content_changed();
        Ok(())
    }

    /// Replace the attachment identifiers of one side.
    pub fn set_images(&self, side: Side, ids: Vec<String>) {
        {
            let mut data = self.data_mut();
            let card_side = data.side_mut(side);
            if card_side.images == ids {
                return;
            }
            card_side.images = ids;
        }

        self.content_changed();
    }

    pub fn learned_amount(&self, side: Side) -> u32 {
        self.side(side).learned_amount
    }

    pub fn increment_learned_amount(&self, side: Side) {
        self.data_mut().side_mut(side).learned_amount += 1;
        self.fire_edited();
    }

    /// Zero the times-correct counter of both sides.
    pub fn reset_learned_amount(&self) {
        self.data_mut().reset_learned_amounts();
        self.fire_edited();
    }

    fn content_changed(&self) {
        if let Some(category) = self.category() {
            let now = category.now();
            {
                let mut data = self.data_mut();
                data.date_modified = now.max(data.date_created);
            }
            self.fire_edited_in(&category);
        }
    }

    /*
     * Dates
     */

    /// Never later than the modification date.
    pub fn date_created(&self) -> DateTime<Utc> {
        self.data().date_created
    }

    pub fn set_date_created(&self, date: DateTime<Utc>) -> Result<()> {
        let mut data = self.data_mut();
        if date > data.date_modified {
            return Err(Error::ModifiedBeforeCreated);
        }
        data.date_created = date;
        Ok(())
    }

    pub fn date_modified(&self) -> DateTime<Utc> {
        self.data().date_modified
    }

    pub fn set_date_modified(&self, date: DateTime<Utc>) -> Result<()> {
        let mut data = self.data_mut();
        if date < data.date_created {
            return Err(Error::ModifiedBeforeCreated);
        }
        data.date_modified = date;
        Ok(())
    }

    /// Last time the card was learned, skipped, reset or created. Orders due
    /// cards across categories.
    pub fn date_touched(&self) -> DateTime<Utc> {
        self.data().date_touched
    }

    /// Last pass or fail. Skips don't count.
    pub fn date_tested(&self) -> Option<DateTime<Utc>> {
        self.data().date_tested
    }

    /// `None` while the card is unlearned.
    pub fn date_expired(&self) -> Option<DateTime<Utc>> {
        self.data().date_expired
    }

    /*
     * Stats
     */

    pub fn tests_total(&self) -> u32 {
        self.data().tests_total
    }

    pub fn tests_passed(&self) -> u32 {
        self.data().tests_passed
    }

    /// Rounded percentage of passed tests, `None` if never tested.
    pub fn pass_ratio(&self) -> Option<u32> {
        let data = self.data();
        if data.tests_total == 0 {
            return None;
        }
        let ratio = 100.0 * f64::from(data.tests_passed) / f64::from(data.tests_total);
        Some(ratio.round() as u32)
    }

    pub fn inc_stats(&self, hit: u32, total: u32) {
        {
            let mut data = self.data_mut();
            data.tests_passed += hit;
            data.tests_total += total;
        }
        self.fire_edited();
    }

    pub fn reset_stats(&self) {
        {
            let mut data = self.data_mut();
            data.tests_passed = 0;
            data.tests_total = 0;
            data.reset_learned_amounts();
        }
        self.fire_edited();
    }

    /*
     * Learn state
     */

    pub fn level(&self) -> usize {
        self.data().level
    }

    /// The category currently holding this card.
    pub fn category(&self) -> Option<Category> {
        self.data()
            .category
            .as_ref()
            .and_then(Category::upgrade)
    }

    pub fn is_attached(&self) -> bool {
        self.category().is_some()
    }

    pub fn is_unlearned(&self) -> bool {
        self.data().date_expired.is_none()
    }

    pub fn is_learned_at(&self, now: DateTime<Utc>) -> bool {
        self.data().date_expired.is_some_and(|expires| expires > now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.data().date_expired.is_some_and(|expires| expires <= now)
    }

    pub fn is_learned(&self, clock: &dyn Clock) -> bool {
        self.is_learned_at(clock.now())
    }

    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.is_expired_at(clock.now())
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> CardState {
        match self.data().date_expired {
            None => CardState::Unlearned,
            Some(expires) if expires > now => CardState::Learned,
            Some(_) => CardState::Expired,
        }
    }

    /*
     * Copies
     */

    /// Detached copy keeping only content and creation date.
    pub fn clone_without_progress(&self) -> Card {
        let data = self.data();
        Self::from_sides(
            data.date_created,
            data.front.without_progress(),
            data.back.without_progress(),
        )
    }

    /// Detached copy keeping content, dates, level and stats.
    pub fn detached_copy(&self) -> Card {
        let data = self.data();
        Self::from_data(CardData {
            category: None,
            level: data.level,
            front: data.front.clone(),
            back: data.back.clone(),
            date_created: data.date_created,
            date_modified: data.date_modified,
            date_touched: data.date_touched,
            date_tested: data.date_tested,
            date_expired: data.date_expired,
            tests_total: data.tests_total,
            tests_passed: data.tests_passed,
        })
    }

    /*
     * Events
     */

    fn fire_edited(&self) {
        if let Some(category) = self.category() {
            self.fire_edited_in(&category);
        }
    }

    fn fire_edited_in(&self, category: &Category) {
        let level = self.level();
        category.fire_card_event(CardEventKind::Edited, self, category, level);
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Card {}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Card")
            .field("front", &data.front.text)
            .field("back", &data.back.text)
            .field("level", &data.level)
            .finish()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        write!(f, "({}/{})", data.front.text, data.back.text)
    }
}
