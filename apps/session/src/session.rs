//! A learning session over one category.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use leitner_core::{
    Answer, Card, CardEvent, CardEventKind, Category, CategoryObserver, IntervalPolicy, Scheduler,
};

/// Watches the session's category for box movement and outside changes.
#[derive(Debug, Default)]
pub struct SessionStats {
    promoted: Cell<u32>,
    demoted: Cell<u32>,
    stale: Cell<bool>,
}

impl SessionStats {
    pub fn promoted(&self) -> u32 {
        self.promoted.get()
    }

    pub fn demoted(&self) -> u32 {
        self.demoted.get()
    }

    /// True if cards were added, removed or moved since the last refresh.
    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }
}

impl CategoryObserver for SessionStats {
    fn on_card_event(&self, event: &CardEvent) {
        match event.kind {
            CardEventKind::DeckChanged => {
                let level = event.card.level();
                if level > event.deck {
                    self.promoted.set(self.promoted.get() + 1);
                } else if level < event.deck {
                    self.demoted.set(self.demoted.get() + 1);
                }
            }
            CardEventKind::Added | CardEventKind::Removed | CardEventKind::Moved => {
                self.stale.set(true);
            }
            CardEventKind::Edited => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub promoted: u32,
    pub demoted: u32,
    /// Cards still due when the session ended.
    pub remaining: usize,
    pub saved: bool,
}

/// Serves the learnable cards of a category, least recently touched first.
///
/// Failed and skipped cards go to the back of the queue. Passed cards leave
/// it until they expire again and a [`refresh`](LearnSession::refresh)
/// picks them up.
pub struct LearnSession<P> {
    category: Category,
    scheduler: Scheduler<P>,
    queue: VecDeque<Card>,
    stats: Rc<SessionStats>,
    summary: Summary,
}

impl<P: IntervalPolicy> LearnSession<P> {
    pub fn new(category: Category, scheduler: Scheduler<P>) -> Self {
        let stats = Rc::new(SessionStats::default());
        category.add_observer(stats.clone());

        let mut session = Self {
            category,
            scheduler,
            queue: VecDeque::new(),
            stats,
            summary: Summary::default(),
        };
        session.refresh();
        session
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// The card to show next.
    pub fn current(&self) -> Option<&Card> {
        self.queue.front()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Re-evaluate which cards are due. Queued cards keep their order,
    /// cards that are no longer due are dropped and newly due cards join at
    /// the back. Returns how many joined.
    pub fn refresh(&mut self) -> usize {
        let mut due = self.category.learnable_cards();
        due.sort_by_key(|card| card.date_touched());

        self.queue.retain(|card| due.contains(card));
        let joined: Vec<Card> = due
            .into_iter()
            .filter(|card| !self.queue.contains(card))
            .collect();
        let count = joined.len();
        self.queue.extend(joined);
        self.stats.stale.set(false);

        if count > 0 {
            tracing::debug!(category = %self.category.path(), count, "cards joined the queue");
        }
        count
    }

    /// Apply `answer` to the current card. Returns the answered card, or
    /// `None` if nothing is due.
    pub fn answer(&mut self, answer: Answer) -> leitner_core::Result<Option<Card>> {
        let Some(card) = self.queue.pop_front() else {
            return Ok(None);
        };

        if let Err(err) = self.scheduler.answer(&card, answer) {
            self.queue.push_front(card);
            return Err(err);
        }

        match answer {
            Answer::Pass => self.summary.passed += 1,
            Answer::Fail => self.summary.failed += 1,
            Answer::Skip => self.summary.skipped += 1,
        }

        if self.stats.is_stale() {
            self.refresh();
        } else if card.is_unlearned() || card.is_expired_at(self.category.now()) {
            self.queue.push_back(card.clone());
        }
        Ok(Some(card))
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn summary(&self) -> Summary {
        Summary {
            promoted: self.stats.promoted(),
            demoted: self.stats.demoted(),
            remaining: self.queue.len(),
            ..self.summary.clone()
        }
    }
}

impl<P> Drop for LearnSession<P> {
    fn drop(&mut self) {
        self.category.remove_observer(&self.stats);
    }
}
