//! Post-processing of classified conversations: label clean-up before
//! rendering and a per-side summary table.

use crate::ir::{Classification, Message, Side};
use std::fmt::Write;

/// Rows of the summary table, best to worst.
pub const TALLY_ORDER: [Classification; 11] = [
    Classification::Brilliant,
    Classification::Great,
    Classification::Best,
    Classification::Excellent,
    Classification::Good,
    Classification::Book,
    Classification::Inaccuracy,
    Classification::Mistake,
    Classification::Miss,
    Classification::Blunder,
    Classification::Megablunder,
];

/// Rewrites labels that cannot appear where they are:
///
/// * `book` after the first non-book label becomes `good`;
/// * game-ending labels survive only on the last message, or on the one
///   before it when the last is `winner`; elsewhere they become `good`.
pub fn normalize_classifications(messages: &mut [Message]) {
    let mut left_book = false;
    for message in messages.iter_mut() {
        match message.classification {
            Some(Classification::Book) if left_book => {
                message.classification = Some(Classification::Good);
            }
            Some(Classification::Book) | None => {}
            Some(_) => left_book = true,
        }
    }

    let last = messages.len().checked_sub(1);
    let winner_last = last
        .and_then(|i| messages[i].classification)
        .is_some_and(|c| c == Classification::Winner);
    for (index, message) in messages.iter_mut().enumerate() {
        let Some(classification) = message.classification else {
            continue;
        };
        if !classification.is_terminal() {
            continue;
        }
        let allowed = Some(index) == last || (winner_last && Some(index + 1) == last);
        if !allowed {
            message.classification = Some(Classification::Good);
        }
    }
}

/// Per-side counts for each row of [`TALLY_ORDER`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewTally {
    left: [usize; TALLY_ORDER.len()],
    right: [usize; TALLY_ORDER.len()],
    /// Whether each side sent at least one message.
    spoke: [bool; 2],
    elo: [Option<u32>; 2],
}

impl ReviewTally {
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut tally = Self::default();
        for message in messages {
            tally.spoke[side_index(message.side)] = true;
            let Some(classification) = message.classification else {
                continue;
            };
            let classification = match classification {
                Classification::Forced => Classification::Good,
                other => other,
            };
            let Some(row) = TALLY_ORDER.iter().position(|c| *c == classification) else {
                continue;
            };
            match message.side {
                Side::Left => tally.left[row] += 1,
                Side::Right => tally.right[row] += 1,
            }
        }
        tally
    }

    pub fn with_elo(mut self, left: Option<u32>, right: Option<u32>) -> Self {
        self.elo = [left, right];
        self
    }

    pub fn spoke(&self, side: Side) -> bool {
        self.spoke[side_index(side)]
    }

    pub fn count(&self, side: Side, classification: Classification) -> usize {
        let Some(row) = TALLY_ORDER.iter().position(|c| *c == classification) else {
            return 0;
        };
        match side {
            Side::Left => self.left[row],
            Side::Right => self.right[row],
        }
    }

    /// `(classification, left, right)` rows; megablunder only when used.
    pub fn rows(&self) -> Vec<(Classification, usize, usize)> {
        TALLY_ORDER
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, self.left[i], self.right[i]))
            .filter(|(c, l, r)| *c != Classification::Megablunder || l + r > 0)
            .collect()
    }

    /// Markdown table with an `Elo (est.)` row when any rating is known.
    /// Every cell of a side that never spoke is left blank.
    pub fn to_markdown(&self, left_label: &str, right_label: &str) -> String {
        let cell = |side: Side, value: String| {
            if self.spoke(side) { value } else { String::new() }
        };
        let row = |out: &mut String, left: String, label: &str, right: String| {
            let left = cell(Side::Left, left);
            let right = cell(Side::Right, right);
            let _ = writeln!(out, "| {left} | {label} | {right} |");
        };

        let mut out = String::new();
        row(&mut out, left_label.to_string(), "Label", right_label.to_string());
        let _ = writeln!(out, "| ---: | :---: | :--- |");
        if self.elo.iter().any(Option::is_some) {
            let elo = |i: usize| self.elo[i].map(|e| e.to_string()).unwrap_or_default();
            row(&mut out, elo(0), "Elo (est.)", elo(1));
        }
        for (classification, left, right) in self.rows() {
            row(&mut out, left.to_string(), &classification.label(), right.to_string());
        }
        out
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(side: Side, classification: Option<Classification>) -> Message {
        let message = Message::new(side, "m");
        match classification {
            Some(c) => message.classified(c),
            None => message,
        }
    }

    fn labels(messages: &[Message]) -> Vec<Option<Classification>> {
        messages.iter().map(|m| m.classification).collect()
    }

    use Classification::*;

    #[test]
    fn book_after_first_real_move_becomes_good() {
        let mut messages = vec![
            labeled(Side::Left, Some(Book)),
            labeled(Side::Right, None),
            labeled(Side::Right, Some(Book)),
            labeled(Side::Left, Some(Best)),
            labeled(Side::Right, Some(Book)),
            labeled(Side::Left, Some(Book)),
        ];
        normalize_classifications(&mut messages);
        assert_eq!(
            labels(&messages),
            vec![Some(Book), None, Some(Book), Some(Best), Some(Good), Some(Good)]
        );
    }

    #[test]
    fn terminal_labels_only_at_the_end() {
        let mut messages = vec![
            labeled(Side::Left, Some(Resign)),
            labeled(Side::Right, Some(Great)),
            labeled(Side::Left, Some(Timeout)),
        ];
        normalize_classifications(&mut messages);
        assert_eq!(labels(&messages), vec![Some(Good), Some(Great), Some(Timeout)]);
    }

    #[test]
    fn loser_label_survives_before_winner() {
        let mut messages = vec![
            labeled(Side::Left, Some(Draw)),
            labeled(Side::Left, Some(Checkmated)),
            labeled(Side::Right, Some(Winner)),
        ];
        normalize_classifications(&mut messages);
        assert_eq!(labels(&messages), vec![Some(Good), Some(Checkmated), Some(Winner)]);
    }

    #[test]
    fn normalize_handles_empty_input() {
        let mut messages: Vec<Message> = Vec::new();
        normalize_classifications(&mut messages);
        assert!(messages.is_empty());
    }

    #[test]
    fn tally_counts_per_side_and_folds_forced_into_good() {
        let messages = vec![
            labeled(Side::Left, Some(Brilliant)),
            labeled(Side::Left, Some(Forced)),
            labeled(Side::Right, Some(Good)),
            labeled(Side::Right, Some(Blunder)),
            labeled(Side::Right, Some(Winner)),
            labeled(Side::Left, None),
        ];
        let tally = ReviewTally::from_messages(&messages);
        assert_eq!(tally.count(Side::Left, Brilliant), 1);
        assert_eq!(tally.count(Side::Left, Good), 1);
        assert_eq!(tally.count(Side::Right, Good), 1);
        assert_eq!(tally.count(Side::Right, Blunder), 1);
        assert_eq!(tally.count(Side::Right, Winner), 0);
    }

    #[test]
    fn megablunder_row_only_when_used() {
        let quiet = ReviewTally::from_messages(&[labeled(Side::Left, Some(Good))]);
        assert_eq!(quiet.rows().len(), TALLY_ORDER.len() - 1);
        assert!(!quiet.to_markdown("Me", "Them").contains("Megablunder"));

        let loud = ReviewTally::from_messages(&[
            labeled(Side::Left, None),
            labeled(Side::Right, Some(Megablunder)),
        ]);
        assert_eq!(loud.rows().len(), TALLY_ORDER.len());
        assert!(loud.to_markdown("Me", "Them").contains("| 0 | Megablunder | 1 |"));
    }

    #[test]
    fn markdown_table_layout() {
        let tally = ReviewTally::from_messages(&[
            labeled(Side::Left, Some(Great)),
            labeled(Side::Right, Some(Book)),
        ]);
        let table = tally.to_markdown("Alice", "Bob");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| Alice | Label | Bob |");
        assert_eq!(lines[1], "| ---: | :---: | :--- |");
        assert_eq!(lines[2], "| 0 | Brilliant | 0 |");
        assert_eq!(lines[3], "| 1 | Great | 0 |");
        assert_eq!(lines[7], "| 0 | Book | 1 |");
        assert_eq!(lines.len(), 2 + 10);
    }

    #[test]
    fn silent_side_column_is_blank() {
        let tally = ReviewTally::from_messages(&[labeled(Side::Left, Some(Great))])
            .with_elo(Some(900), Some(1500));
        assert!(tally.spoke(Side::Left));
        assert!(!tally.spoke(Side::Right));
        let table = tally.to_markdown("Alice", "Bob");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| Alice | Label |  |");
        assert_eq!(lines[2], "| 900 | Elo (est.) |  |");
        assert_eq!(lines[4], "| 1 | Great |  |");
        assert!(!table.contains("Bob") && !table.contains("1500"));
    }

    #[test]
    fn elo_row_only_when_rated() {
        let messages = [labeled(Side::Left, None), labeled(Side::Right, None)];
        let unrated = ReviewTally::from_messages(&messages).to_markdown("A", "B");
        assert!(!unrated.contains("Elo"));

        let rated = ReviewTally::from_messages(&messages)
            .with_elo(None, Some(1720))
            .to_markdown("A", "B");
        assert_eq!(rated.lines().nth(2), Some("|  | Elo (est.) | 1720 |"));
        assert_eq!(rated.lines().count(), 2 + 1 + 10);
    }
}
