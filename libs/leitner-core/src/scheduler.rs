//! Leitner level transitions.
//!
//! Every transition takes the card out of its deck, updates its dates and
//! level, puts it back and fires one `DeckChanged` event carrying the old
//! level. A detached card is rejected before anything changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::card::{Card, CardData};
use crate::category::Category;
use crate::error::{Error, Result};
use crate::events::CardEventKind;
use crate::policy::IntervalPolicy;

/// Successful review: one level up, expiring at `expires`.
pub fn raise_level(card: &Card, tested: DateTime<Utc>, expires: DateTime<Utc>) -> Result<()> {
    let new_level = card.level() + 1;
    change_level(card, new_level, |data| {
        data.tests_passed += 1;
        data.tests_total += 1;
        data.date_tested = Some(tested);
        data.date_expired = Some(expires);
    })
}

/// Failed review: back to level 0, unlearned.
pub fn reset_level(card: &Card, tested: DateTime<Utc>) -> Result<()> {
    change_level(card, 0, |data| {
        data.tests_total += 1;
        data.date_tested = Some(tested);
        data.date_expired = None;
    })
}

/// Put the card back at the end of its own deck. Only the touch date changes.
pub fn reappend(card: &Card) -> Result<()> {
    let category = owner(card)?;
    let level = category.detach(card)?;
    card.data_mut().date_touched = category.now();
    category.attach(card, level);

    debug!(category = %category.path(), level, "reappended card");
    category.fire_card_event(CardEventKind::DeckChanged, card, &category, level);
    Ok(())
}

/// Administrative reset: all stats cleared, level 0, no test date.
pub fn full_reset(card: &Card) -> Result<()> {
    change_level(card, 0, |data| {
        data.tests_passed = 0;
        data.tests_total = 0;
        data.date_tested = None;
        data.date_expired = None;
    })
}

fn owner(card: &Card) -> Result<Category> {
    card.category()
        .ok_or_else(|| Error::invariant(format!("card {card} is not in any category")))
}

fn change_level(card: &Card, new_level: usize, update: impl FnOnce(&mut CardData)) -> Result<()> {
    let category = owner(card)?;
    let old_level = category.detach(card)?;

    {
        let mut data = card.data_mut();
        update(&mut *data);
        data.date_touched = category.now();
        data.reset_learned_amounts();
    }

    // expiration is already updated, so attach applies the level sanity rules
    category.attach(card, new_level);
    debug!(
        category = %category.path(),
        from = old_level,
        to = new_level,
        "changed card level"
    );

    category.fire_card_event(CardEventKind::DeckChanged, card, &category, old_level);
    Ok(())
}

/// Outcome of showing a card to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Pass,
    Fail,
    Skip,
}

/// Applies answers using an interval policy and the card's tree clock.
#[derive(Debug, Clone, Default)]
pub struct Scheduler<P> {
    policy: P,
}

impl<P: IntervalPolicy> Scheduler<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn answer(&self, card: &Card, answer: Answer) -> Result<()> {
        match answer {
            Answer::Pass => self.pass(card),
            Answer::Fail => self.fail(card),
            Answer::Skip => self.skip(card),
        }
    }

    pub fn pass(&self, card: &Card) -> Result<()> {
        let tested = owner(card)?.now();
        let expires = self.policy.expiration(card.level() + 1, tested);
        raise_level(card, tested, expires)
    }

    pub fn fail(&self, card: &Card) -> Result<()> {
        let tested = owner(card)?.now();
        reset_level(card, tested)
    }

    pub fn skip(&self, card: &Card) -> Result<()> {
        reappend(card)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::policy::LeitnerPolicy;
    use chrono::{Duration, TimeZone};
    use std::rc::Rc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (Rc<ManualClock>, Category, Card) {
        let clock = Rc::new(ManualClock::new(start()));
        let root = Category::with_clock("root", clock.clone());
        let card = Card::new(start(), "Q", "R").unwrap();
        root.add_card(&card).unwrap();
        (clock, root, card)
    }

    #[test]
    fn raise_level_moves_up_and_records_test() {
        let (clock, root, card) = setup();
        clock.advance(Duration::minutes(5));
        let tested = clock.now();
        raise_level(&card, tested, tested + Duration::days(7)).unwrap();

        assert_eq!(card.level(), 1);
        assert_eq!(card.tests_passed(), 1);
        assert_eq!(card.tests_total(), 1);
        assert_eq!(card.date_tested(), Some(tested));
        assert_eq!(card.date_expired(), Some(tested + Duration::days(7)));
        assert_eq!(card.date_touched(), tested);
        assert_eq!(root.cards_at(1), vec![card.clone()]);
        assert!(root.cards_at(0).is_empty());
    }

    #[test]
    fn raise_then_reset_counts_two_tests_one_pass() {
        let (_clock, _root, card) = setup();
        raise_level(&card, start(), start() + Duration::days(1)).unwrap();
        reset_level(&card, start()).unwrap();

        assert_eq!(card.level(), 0);
        assert_eq!(card.tests_total(), 2);
        assert_eq!(card.tests_passed(), 1);
        assert!(card.is_unlearned());
    }

    #[test]
    fn reappend_only_touches() {
        let (clock, root, card) = setup();
        let other = Card::new(start(), "Q2", "R2").unwrap();
        root.add_card(&other).unwrap();

        clock.advance(Duration::hours(1));
        reappend(&card).unwrap();

        assert_eq!(card.date_touched(), clock.now());
        assert_eq!(card.tests_total(), 0);
        assert_eq!(card.date_tested(), None);
        assert_eq!(root.cards_at(0), vec![other, card]);
    }

    #[test]
    fn full_reset_clears_everything() {
        let (_clock, root, card) = setup();
        raise_level(&card, start(), start() + Duration::days(1)).unwrap();
        raise_level(&card, start(), start() + Duration::days(2)).unwrap();
        full_reset(&card).unwrap();

        assert_eq!(card.level(), 0);
        assert_eq!(card.tests_total(), 0);
        assert_eq!(card.tests_passed(), 0);
        assert_eq!(card.date_tested(), None);
        assert_eq!(card.date_expired(), None);
        assert_eq!(root.number_of_decks(), 1);
    }

    #[test]
    fn detached_cards_are_rejected_untouched() {
        let card = Card::new(start(), "Q", "R").unwrap();
        assert!(raise_level(&card, start(), start()).is_err());
        assert!(reset_level(&card, start()).is_err());
        assert!(reappend(&card).is_err());
        assert!(full_reset(&card).is_err());
        assert_eq!(card.tests_total(), 0);
    }

    #[test]
    fn scheduler_uses_policy_for_expiration() {
        let (clock, _root, card) = setup();
        let scheduler = Scheduler::new(LeitnerPolicy::new(vec![1, 3]));

        scheduler.answer(&card, Answer::Pass).unwrap();
        assert_eq!(card.date_expired(), Some(clock.now() + Duration::days(1)));

        scheduler.answer(&card, Answer::Pass).unwrap();
        assert_eq!(card.level(), 2);
        assert_eq!(card.date_expired(), Some(clock.now() + Duration::days(3)));

        scheduler.answer(&card, Answer::Skip).unwrap();
        assert_eq!(card.level(), 2);

        scheduler.answer(&card, Answer::Fail).unwrap();
        assert_eq!(card.level(), 0);
        assert_eq!(card.tests_total(), 3);
    }

    #[test]
    fn pass_with_huge_delay_keeps_card_learned() {
        let (clock, root, card) = setup();
        let scheduler = Scheduler::new(LeitnerPolicy::new(vec![100_000_000]));

        scheduler.pass(&card).unwrap();

        assert_eq!(card.level(), 1);
        assert_eq!(card.date_expired(), Some(DateTime::<Utc>::MAX_UTC));
        assert!(card.is_learned(&*clock));
        assert_eq!(root.learned_cards(), vec![card]);
    }
}
