//! Markdown card import.
//!
//! # Format
//! ```markdown
//! # Spanish/Verbs
//! Q: ser
//! A: to be (permanent)
//!
//! Q: estar
//! A: to be (temporary)
//! Multiple lines are supported.
//!
//! # Spanish
//! Q: hola
//! A: hello
//! ```
//!
//! A heading selects the category path (relative to the import root) for the
//! cards that follow; cards before any heading go into the root itself.

use chrono::{DateTime, Utc};

use crate::card::Card;
use crate::category::Category;
use crate::error::ParseError;

/// A card parsed from markdown, not yet part of any tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedCard {
    /// Category names below the import root.
    pub path: Vec<String>,
    pub front: String,
    pub back: String,
    pub line_number: usize,
}

/// Parse markdown content into imported cards.
pub fn parse(content: &str) -> Result<Vec<ImportedCard>, ParseError> {
    let mut parser = Parser::new();

    for (idx, line) in content.lines().enumerate() {
        parser.process_line(line, idx + 1)?;
    }

    parser.finalize()
}

/// Parse `content` and add every card at level 0 below `root`, creating
/// missing categories. Returns the number of imported cards.
///
/// Every card is validated before the tree is touched.
pub fn import_into(
    root: &Category,
    content: &str,
    created: DateTime<Utc>,
) -> Result<usize, ParseError> {
    let imported = parse(content)?;

    let cards = imported
        .iter()
        .map(|raw| {
            Card::new(created, &raw.front, &raw.back).map_err(|source| ParseError::InvalidCard {
                line: raw.line_number,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (raw, card) in imported.iter().zip(&cards) {
        let invalid = |source| ParseError::InvalidCard {
            line: raw.line_number,
            source,
        };
        let category = resolve_path(root, &raw.path).map_err(invalid)?;
        category.add_card(card).map_err(invalid)?;
    }

    tracing::debug!(root = %root.path(), count = cards.len(), "imported cards");
    Ok(cards.len())
}

fn resolve_path(root: &Category, path: &[String]) -> crate::Result<Category> {
    let mut current = root.clone();
    for name in path {
        current = match current.child(name) {
            Some(child) => child,
            None => current.add_category_child(Category::new(name.as_str()))?,
        };
    }
    Ok(current)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Question,
    Answer,
}

struct CardBuilder {
    path: Vec<String>,
    question: Option<String>,
    answer: Option<String>,
    start_line: usize,
}

impl CardBuilder {
    fn build(self) -> Result<ImportedCard, ParseError> {
        let front = self.question.ok_or(ParseError::MissingQuestion {
            line: self.start_line,
        })?;
        let back = self.answer.ok_or(ParseError::MissingAnswer {
            line: self.start_line,
        })?;

        Ok(ImportedCard {
            path: self.path,
            front: front.trim().to_string(),
            back: back.trim().to_string(),
            line_number: self.start_line,
        })
    }
}

struct Parser {
    path: Vec<String>,
    current: Option<CardBuilder>,
    current_field: Option<Field>,
    buffer: Vec<String>,
    cards: Vec<ImportedCard>,
}

impl Parser {
    fn new() -> Self {
        Self {
            path: Vec::new(),
            current: None,
            current_field: None,
            buffer: Vec::new(),
            cards: Vec::new(),
        }
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), ParseError> {
        match Self::parse_line(line) {
            LineType::Heading(path) => self.handle_heading(path, line_num)?,
            LineType::Question(text) => self.handle_question(text, line_num)?,
            LineType::Answer(text) => self.handle_answer(text, line_num)?,
            LineType::Text(text) => self.push_text(text),
            LineType::Empty => self.push_text(""),
        }
        Ok(())
    }

    fn parse_line(line: &str) -> LineType<'_> {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            LineType::Heading(trimmed.trim_start_matches('#'))
        } else if let Some(rest) = trimmed.strip_prefix("Q:") {
            LineType::Question(rest.trim())
        } else if let Some(rest) = trimmed.strip_prefix("A:") {
            LineType::Answer(rest.trim())
        } else if trimmed.is_empty() {
            LineType::Empty
        } else {
            LineType::Text(line)
        }
    }

    fn handle_heading(&mut self, heading: &str, line_num: usize) -> Result<(), ParseError> {
        self.finish_card()?;

        let path: Vec<String> = heading
            .split('/')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if path.is_empty() {
            return Err(ParseError::EmptyCategoryPath { line: line_num });
        }

        self.path = path;
        Ok(())
    }

    fn handle_question(&mut self, text: &str, line_num: usize) -> Result<(), ParseError> {
        self.finish_card()?;

        self.current = Some(CardBuilder {
            path: self.path.clone(),
            question: None,
            answer: None,
            start_line: line_num,
        });
        self.current_field = Some(Field::Question);
        self.buffer.push(text.to_string());
        Ok(())
    }

    fn handle_answer(&mut self, text: &str, line_num: usize) -> Result<(), ParseError> {
        self.flush_buffer();

        match &self.current {
            None => return Err(ParseError::MissingQuestion { line: line_num }),
            Some(card) if card.answer.is_some() || self.current_field == Some(Field::Answer) => {
                return Err(ParseError::UnexpectedAnswer { line: line_num });
            }
            Some(_) => {}
        }

        self.current_field = Some(Field::Answer);
        self.buffer.push(text.to_string());
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        // notes outside a card are ignored
        if self.current_field.is_some() {
            self.buffer.push(text.to_string());
        }
    }

    fn flush_buffer(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let content = self.buffer.join("\n");
        self.buffer.clear();

        if let Some(ref mut card) = self.current {
            match self.current_field {
                Some(Field::Question) => card.question = Some(content),
                Some(Field::Answer) => card.answer = Some(content),
                None => {}
            }
        }
    }

    fn finish_card(&mut self) -> Result<(), ParseError> {
        self.flush_buffer();
        self.current_field = None;

        if let Some(card) = self.current.take() {
            self.cards.push(card.build()?);
        }
        Ok(())
    }

    fn finalize(mut self) -> Result<Vec<ImportedCard>, ParseError> {
        self.finish_card()?;
        Ok(self.cards)
    }
}

enum LineType<'a> {
    Heading(&'a str),
    Question(&'a str),
    Answer(&'a str),
    Text(&'a str),
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parse_single_card() {
        let cards = parse("Q: What is Rust?\nA: A systems programming language.").unwrap();
        assert_eq!(cards.len(), 1);
        assert!(cards[0].path.is_empty());
        assert_eq!(cards[0].front, "What is Rust?");
        assert_eq!(cards[0].back, "A systems programming language.");
        assert_eq!(cards[0].line_number, 1);
    }

    #[test]
    fn parse_multiline_answer() {
        let cards = parse("Q: Explain\nA: Line 1\nLine 2\n\nLine 4\n").unwrap();
        assert_eq!(cards[0].back, "Line 1\nLine 2\n\nLine 4");
    }

    #[test]
    fn headings_set_the_category_path() {
        let input = "Q: top\nA: level\n\n# Spanish / Verbs\nQ: ser\nA: to be\n\n## Spanish\nQ: hola\nA: hello";
        let cards = parse(input).unwrap();
        assert_eq!(cards.len(), 3);
        assert!(cards[0].path.is_empty());
        assert_eq!(cards[1].path, vec!["Spanish", "Verbs"]);
        assert_eq!(cards[2].path, vec!["Spanish"]);
        assert_eq!(cards[2].line_number, 9);
    }

    #[test]
    fn reject_answer_without_question() {
        let result = parse("A: Answer only");
        assert!(matches!(result, Err(ParseError::MissingQuestion { line: 1 })));
    }

    #[test]
    fn reject_missing_answer() {
        let result = parse("Q: Question only\n\nQ: Another\nA: fine");
        assert!(matches!(result, Err(ParseError::MissingAnswer { line: 1 })));
    }

    #[test]
    fn reject_second_answer() {
        let result = parse("Q: one\nA: first\nA: second");
        assert!(matches!(result, Err(ParseError::UnexpectedAnswer { line: 3 })));
    }

    #[test]
    fn reject_empty_heading() {
        let result = parse("#  / \nQ: q\nA: a");
        assert!(matches!(result, Err(ParseError::EmptyCategoryPath { line: 1 })));
    }

    #[test]
    fn parse_empty_content() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("just some notes\n\n").unwrap().is_empty());
    }

    #[test]
    fn import_creates_categories() {
        let root = Category::new("All");
        root.add_category_child(Category::new("Spanish")).unwrap();

        let input = "# Spanish/Verbs\nQ: ser\nA: to be\n\n# Spanish\nQ: hola\nA: hello\n\n# French\nQ: oui\nA: yes";
        let count = import_into(&root, input, created()).unwrap();

        assert_eq!(count, 3);
        let spanish = root.child("Spanish").unwrap();
        assert_eq!(spanish.local_cards().len(), 1);
        assert_eq!(spanish.child("Verbs").unwrap().cards().len(), 1);
        assert_eq!(root.child("French").unwrap().cards()[0].front().text(), "oui");
        assert_eq!(root.cards().len(), 3);
    }

    #[test]
    fn import_is_all_or_nothing_for_invalid_cards() {
        let root = Category::new("All");
        let result = import_into(&root, "# A\nQ: fine\nA: ok\n\nQ:\nA: no question", created());

        assert!(matches!(
            result,
            Err(ParseError::InvalidCard {
                line: 5,
                source: Error::InvalidContent { .. }
            })
        ));
        assert!(root.children().is_empty());
        assert!(root.cards().is_empty());
    }
}
