//! Plain-text search over card sides.

use serde::{Deserialize, Serialize};

use crate::card::Card;

/// Which sides a search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSide {
    Front,
    Back,
    Both,
}

/// Cards whose selected side(s) contain `needle`, in input order.
pub fn search_cards(needle: &str, side: SearchSide, match_case: bool, cards: &[Card]) -> Vec<Card> {
    let needle = fold(needle, match_case);

    cards
        .iter()
        .filter(|card| {
            let front = || fold(card.front().text(), match_case).contains(&needle);
            let back = || fold(card.back().text(), match_case).contains(&needle);
            match side {
                SearchSide::Front => front(),
                SearchSide::Back => back(),
                SearchSide::Both => front() || back(),
            }
        })
        .cloned()
        .collect()
}

/// Byte offsets of every non-overlapping occurrence of `needle` in `text`.
///
/// With `ignore_case` the offsets refer to the lowercased text. An empty
/// needle matches nowhere.
pub fn find_positions(text: &str, needle: &str, ignore_case: bool) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }

    let text = fold(text, !ignore_case);
    let needle = fold(needle, !ignore_case);
    text.match_indices(needle.as_str())
        .map(|(position, _)| position)
        .collect()
}

fn fold(text: &str, match_case: bool) -> String {
    if match_case {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cards() -> Vec<Card> {
        vec![
            Card::new(Utc::now(), "Der Hund", "the dog").unwrap(),
            Card::new(Utc::now(), "die Katze", "the cat").unwrap(),
            Card::new(Utc::now(), "das Pferd", "the horse, not a dog").unwrap(),
        ]
    }

    fn fronts(cards: &[Card]) -> Vec<String> {
        cards.iter().map(|c| c.front().text().to_string()).collect()
    }

    #[test]
    fn front_only_ignores_back() {
        let found = search_cards("dog", SearchSide::Front, false, &cards());
        assert!(found.is_empty());

        let found = search_cards("hund", SearchSide::Front, false, &cards());
        assert_eq!(fronts(&found), vec!["Der Hund"]);
    }

    #[test]
    fn back_and_both_look_at_answers() {
        let found = search_cards("dog", SearchSide::Back, false, &cards());
        assert_eq!(fronts(&found), vec!["Der Hund", "das Pferd"]);

        let found = search_cards("d", SearchSide::Both, true, &cards());
        assert_eq!(fronts(&found), vec!["Der Hund", "die Katze", "das Pferd"]);
    }

    #[test]
    fn match_case_is_respected() {
        let found = search_cards("der", SearchSide::Front, true, &cards());
        assert!(found.is_empty());

        let found = search_cards("der", SearchSide::Front, false, &cards());
        assert_eq!(fronts(&found), vec!["Der Hund"]);
    }

    #[test]
    fn positions_do_not_overlap() {
        assert_eq!(find_positions("aaaa", "aa", false), vec![0, 2]);
        assert_eq!(find_positions("Ab ab AB", "ab", true), vec![0, 3, 6]);
        assert_eq!(find_positions("Ab ab AB", "ab", false), vec![3]);
        assert!(find_positions("abc", "", true).is_empty());
    }
}
