//! The category tree and its leveled decks.
//!
//! Every category owns one bucket ("deck") of cards per level plus an ordered
//! list of child categories. Decks only hold the cards local to a category;
//! queries aggregate over the whole subtree.
//!
//! A category always has exactly as many decks as its deepest child (or as
//! its own highest non-empty local deck requires). That count is re-derived
//! on every node an event bubbles through, so it can never be set directly.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::card::Card;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::events::{
    CardEvent, CardEventKind, CategoryEvent, CategoryEventKind, CategoryObserver,
};
use crate::natural::natural_cmp;

pub(crate) type WeakCategory = Weak<RefCell<CategoryData>>;

pub(crate) struct CategoryData {
    name: String,
    depth: usize,
    decks: Vec<Vec<Card>>,
    parent: Option<WeakCategory>,
    children: Vec<Category>,
    observers: Vec<Rc<dyn CategoryObserver>>,
    clock: Rc<dyn Clock>,
}

/// A node of the category tree. Cloning yields another handle to the same
/// node; equality is identity.
#[derive(Clone)]
pub struct Category(Rc<RefCell<CategoryData>>);

impl Category {
    /// Create a detached category using the system clock.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, Rc::new(SystemClock))
    }

    /// Create a detached category with an explicit time source. Children
    /// attached later inherit it.
    pub fn with_clock(name: impl Into<String>, clock: Rc<dyn Clock>) -> Self {
        Self(Rc::new(RefCell::new(CategoryData {
            name: name.into(),
            depth: 0,
            decks: Vec::new(),
            parent: None,
            children: Vec::new(),
            observers: Vec::new(),
            clock,
        })))
    }

    pub(crate) fn upgrade(weak: &WeakCategory) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    fn downgrade(&self) -> WeakCategory {
        Rc::downgrade(&self.0)
    }

    fn data(&self) -> Ref<'_, CategoryData> {
        self.0.borrow()
    }

    fn data_mut(&self) -> RefMut<'_, CategoryData> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Category) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.data().clock)
    }

    /// Current time according to this tree's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.data().clock.now()
    }

    /*
     * Card related methods
     */

    /// Add a detached card to the level 0 deck. Fires `Added`.
    pub fn add_card(&self, card: &Card) -> Result<()> {
        self.add_card_at(card, 0)
    }

    /// Add a detached card to the deck with the given level. Fires `Added`.
    ///
    /// Cards above level 0 without an expiration date are treated as expiring
    /// now; cards at level 0 lose their expiration date.
    pub fn add_card_at(&self, card: &Card, level: usize) -> Result<()> {
        if card.is_attached() {
            return Err(Error::invariant(format!(
                "card {card} already belongs to a category"
            )));
        }

        self.attach(card, level);
        self.fire_card_event(CardEventKind::Added, card, self, level);
        Ok(())
    }

    /// Remove a card from this category or any of its descendants.
    /// Fires `Removed` at the category that actually held the card.
    pub fn remove_card(&self, card: &Card) -> Result<()> {
        let owner = self.owner_of(card)?;
        let level = owner.detach(card)?;
        owner.fire_card_event(CardEventKind::Removed, card, &owner, level);
        Ok(())
    }

    /// Move a card to another category keeping its level and stats.
    ///
    /// Fires a single `Moved` event at the old and at the new category
    /// instead of a `Removed`/`Added` pair.
    pub fn move_card(card: &Card, new_category: &Category) -> Result<()> {
        let old_category = card
            .category()
            .ok_or_else(|| Error::invariant(format!("can't move detached card {card}")))?;

        let level = old_category.detach(card)?;
        new_category.attach(card, level);
        debug!(
            from = %old_category.path(),
            to = %new_category.path(),
            level,
            "moved card"
        );

        old_category.fire_card_event(CardEventKind::Moved, card, &old_category, level);
        new_category.fire_card_event(CardEventKind::Moved, card, &old_category, level);
        Ok(())
    }

    /// The category holding `card`, provided it lies within this subtree.
    pub(crate) fn owner_of(&self, card: &Card) -> Result<Category> {
        let owner = card
            .category()
            .ok_or_else(|| Error::invariant(format!("card {card} is not in any category")))?;

        if !self.contains(&owner) {
            return Err(Error::invariant(format!(
                "card {card} is not part of category {}",
                self.path()
            )));
        }
        Ok(owner)
    }

    /// Put a card into a local deck without firing an event.
    pub(crate) fn attach(&self, card: &Card, level: usize) {
        let now = self.now();
        {
            let mut data = self.data_mut();
            while data.decks.len() <= level {
                data.decks.push(Vec::new());
            }
            data.decks[level].push(card.clone());
        }

        let mut card_data = card.data_mut();
        card_data.category = Some(self.downgrade());
        card_data.level = level;

        if level > 0 && card_data.date_expired.is_none() {
            card_data.date_expired = Some(now);
        }
        if level == 0 {
            card_data.date_expired = None;
        }
        trace!(category = %self.data().name, level, "attached card");
    }

    /// Take a card out of its local deck without firing an event. Returns
    /// the level it was found at.
    pub(crate) fn detach(&self, card: &Card) -> Result<usize> {
        let level = card.level();
        {
            let mut data = self.data_mut();
            let position = data
                .decks
                .get(level)
                .and_then(|deck| deck.iter().position(|c| c.ptr_eq(card)))
                .ok_or_else(|| {
                    Error::invariant(format!(
                        "card {card} missing from deck {level} of {}",
                        data.name
                    ))
                })?;
            data.decks[level].remove(position);
        }

        card.data_mut().category = None;
        trace!(category = %self.data().name, level, "detached card");
        Ok(level)
    }

    /*
     * Card getter methods
     */

    /// All cards of all decks in this category and its descendants.
    pub fn cards(&self) -> Vec<Card> {
        (0..self.number_of_decks())
            .flat_map(|level| self.cards_at(level))
            .collect()
    }

    /// All cards at `level` in this category and its descendants. Levels
    /// beyond the last deck yield nothing.
    pub fn cards_at(&self, level: usize) -> Vec<Card> {
        let data = self.data();
        let Some(deck) = data.decks.get(level) else {
            return Vec::new();
        };

        let mut cards = deck.clone();
        for child in &data.children {
            cards.extend(child.cards_at(level));
        }
        cards
    }

    pub fn expired_cards(&self) -> Vec<Card> {
        let now = self.now();
        self.cards()
            .into_iter()
            .filter(|card| card.is_expired_at(now))
            .collect()
    }

    pub fn expired_cards_at(&self, level: usize) -> Vec<Card> {
        let now = self.now();
        self.cards_at(level)
            .into_iter()
            .filter(|card| card.is_expired_at(now))
            .collect()
    }

    /// Cards that were learned and haven't expired yet.
    pub fn learned_cards(&self) -> Vec<Card> {
        let now = self.now();
        self.cards()
            .into_iter()
            .filter(|card| card.is_learned_at(now))
            .collect()
    }

    /// Learned cards at `level`. Level 0 never holds learned cards.
    pub fn learned_cards_at(&self, level: usize) -> Vec<Card> {
        if level == 0 {
            return Vec::new();
        }
        let now = self.now();
        self.cards_at(level)
            .into_iter()
            .filter(|card| card.is_learned_at(now))
            .collect()
    }

    /// Every level 0 card plus every expired card, deck by deck.
    pub fn learnable_cards(&self) -> Vec<Card> {
        (0..self.number_of_decks())
            .flat_map(|level| self.learnable_cards_at(level))
            .collect()
    }

    pub fn learnable_cards_at(&self, level: usize) -> Vec<Card> {
        if level == 0 {
            self.cards_at(0)
        } else {
            self.expired_cards_at(level)
        }
    }

    pub fn unlearned_cards(&self) -> Vec<Card> {
        self.cards_at(0)
    }

    /// Cards held directly by this category, excluding descendants.
    pub fn local_cards(&self) -> Vec<Card> {
        self.data().decks.iter().flatten().cloned().collect()
    }

    pub fn local_cards_at(&self, level: usize) -> Vec<Card> {
        self.data().decks.get(level).cloned().unwrap_or_default()
    }

    pub fn number_of_decks(&self) -> usize {
        self.data().decks.len()
    }

    /*
     * Category related methods
     */

    pub fn name(&self) -> String {
        self.data().name.clone()
    }

    /// Rename this category. Fires `Edited` if the name changed.
    pub fn set_name(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.data().name == name {
            return Ok(());
        }

        let parent = self.parent();
        if let Some(parent) = &parent {
            if parent.child(&name).is_some() {
                return Err(Error::invariant(format!(
                    "{} already has a child named {name}",
                    parent.path()
                )));
            }
        }

        self.data_mut().name = name;
        if let Some(parent) = &parent {
            parent.resort_child(self);
        }

        self.fire_category_event(CategoryEventKind::Edited, self);
        Ok(())
    }

    /// Slash separated names from the root down to this category.
    pub fn path(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{}/{}", parent.path(), self.data().name),
            None => self.name(),
        }
    }

    /// Number of hops to the root.
    pub fn depth(&self) -> usize {
        self.data().depth
    }

    pub fn parent(&self) -> Option<Category> {
        self.data().parent.as_ref().and_then(Category::upgrade)
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    pub fn root(&self) -> Category {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    pub fn children(&self) -> Vec<Category> {
        self.data().children.clone()
    }

    pub fn child(&self, name: &str) -> Option<Category> {
        self.data()
            .children
            .iter()
            .find(|child| child.data().name == name)
            .cloned()
    }

    /// True if `other` is this category or one of its descendants.
    pub fn contains(&self, other: &Category) -> bool {
        let mut current = Some(other.clone());
        while let Some(category) = current {
            if category.ptr_eq(self) {
                return true;
            }
            current = category.parent();
        }
        false
    }

    /// This category followed by all descendants, depth first.
    pub fn subtree(&self) -> Vec<Category> {
        let mut list = vec![self.clone()];
        for child in self.children() {
            list.extend(child.subtree());
        }
        list
    }

    /// Attach a detached category as child, keeping children in natural name
    /// order. Fires `Added`.
    pub fn add_category_child(&self, child: Category) -> Result<Category> {
        if child.parent().is_some() {
            return Err(Error::invariant(format!(
                "category {} already has a parent",
                child.path()
            )));
        }
        if child.contains(self) {
            return Err(Error::invariant(format!(
                "category {} can't become its own descendant",
                child.name()
            )));
        }
        if self.child(&child.data().name).is_some() {
            return Err(Error::invariant(format!(
                "{} already has a child named {}",
                self.path(),
                child.name()
            )));
        }

        self.adopt(&child);
        debug!(parent = %self.path(), child = %child.name(), "added category");

        self.fire_category_event(CategoryEventKind::Added, &child);
        Ok(child)
    }

    fn adopt(&self, child: &Category) {
        let (depth, clock) = {
            let data = self.data();
            (data.depth + 1, Rc::clone(&data.clock))
        };
        {
            let mut data = child.data_mut();
            data.parent = Some(self.downgrade());
        }
        child.rebase(depth, &clock);

        self.data_mut().children.push(child.clone());
        self.resort_child(child);
        self.adjust_number_of_decks();
    }

    fn rebase(&self, depth: usize, clock: &Rc<dyn Clock>) {
        {
            let mut data = self.data_mut();
            data.depth = depth;
            data.clock = Rc::clone(clock);
        }
        for child in self.children() {
            child.rebase(depth + 1, clock);
        }
    }

    fn resort_child(&self, child: &Category) {
        let mut data = self.data_mut();
        let Some(index) = data.children.iter().position(|c| c.ptr_eq(child)) else {
            return;
        };
        let child = data.children.remove(index);
        let name = child.name();
        let position = data
            .children
            .iter()
            .position(|sibling| natural_cmp(&name, &sibling.data().name).is_lt())
            .unwrap_or(data.children.len());
        data.children.insert(position, child);
    }

    /// Detach this category from its parent. Fires `Removed` while the parent
    /// link still exists so observers up the tree receive it.
    pub fn remove(&self) -> Result<()> {
        let parent = self
            .parent()
            .ok_or_else(|| Error::invariant("root category can't be removed"))?;

        parent.data_mut().children.retain(|c| !c.ptr_eq(self));
        debug!(parent = %parent.path(), child = %self.name(), "removed category");

        self.fire_category_event(CategoryEventKind::Removed, self);

        let clock = self.clock();
        self.data_mut().parent = None;
        self.rebase(0, &clock);
        Ok(())
    }

    /// Deep copy of this subtree in which no card keeps level, dates of
    /// testing or expiry, or stats.
    pub fn clone_without_progress(&self) -> Category {
        let clone = Category::with_clock(self.name(), self.clock());

        for card in self.local_cards() {
            clone.attach(&card.clone_without_progress(), 0);
        }
        for child in self.children() {
            clone.adopt(&child.clone_without_progress());
        }
        clone.adjust_number_of_decks();
        clone
    }

    /*
     * Event related methods
     */

    pub fn add_observer(&self, observer: Rc<dyn CategoryObserver>) {
        self.data_mut().observers.push(observer);
    }

    pub fn remove_observer<O>(&self, observer: &Rc<O>)
    where
        O: CategoryObserver + ?Sized,
    {
        let target = Rc::as_ptr(observer) as *const ();
        self.data_mut()
            .observers
            .retain(|o| Rc::as_ptr(o) as *const () != target);
    }

    /// This category, its parent, and so on up to the root.
    fn chain(&self) -> Vec<Category> {
        let mut chain = vec![self.clone()];
        while let Some(parent) = chain.last().and_then(Category::parent) {
            chain.push(parent);
        }
        chain
    }

    fn observers(&self) -> Vec<Rc<dyn CategoryObserver>> {
        self.data().observers.clone()
    }

    pub(crate) fn fire_card_event(
        &self,
        kind: CardEventKind,
        card: &Card,
        category: &Category,
        deck: usize,
    ) {
        let chain = self.chain();
        if kind != CardEventKind::Edited {
            for node in &chain {
                node.adjust_number_of_decks();
            }
        }

        let event = CardEvent {
            kind,
            card: card.clone(),
            category: category.clone(),
            deck,
        };
        for node in &chain {
            for observer in node.observers() {
                observer.on_card_event(&event);
            }
        }
    }

    fn fire_category_event(&self, kind: CategoryEventKind, category: &Category) {
        let chain = self.chain();
        if kind != CategoryEventKind::Edited {
            for node in &chain {
                node.adjust_number_of_decks();
            }
        }

        let event = CategoryEvent {
            kind,
            category: category.clone(),
        };
        for node in &chain {
            for observer in node.observers() {
                observer.on_category_event(&event);
            }
        }
    }

    fn adjust_number_of_decks(&self) {
        let max_child_decks = self
            .data()
            .children
            .iter()
            .map(Category::number_of_decks)
            .max()
            .unwrap_or(0);

        let mut data = self.data_mut();
        while data.decks.len() < max_child_decks {
            data.decks.push(Vec::new());
        }
        while data.decks.len() > max_child_decks && data.decks.last().is_some_and(Vec::is_empty) {
            data.decks.pop();
        }
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Category {}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data();
        f.debug_struct("Category")
            .field("name", &data.name)
            .field("depth", &data.depth)
            .field("decks", &data.decks.len())
            .field("children", &data.children.len())
            .finish()
    }
}
