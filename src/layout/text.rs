use crate::text_metrics::TextMeasurer;
use unicode_segmentation::UnicodeSegmentation;

pub const ELLIPSIS: &str = "...";

/// What to do with a single word wider than the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Break the word between grapheme clusters.
    Split,
    /// Replace the word by its longest prefix that fits with `...`.
    Ellipsize,
}

/// Greedy word wrap; overflowing words are broken between graphemes.
pub fn wrap_to_width(text: &str, max_width: f32, measurer: &TextMeasurer) -> Vec<String> {
    wrap_to_width_with(text, max_width, measurer, OverflowPolicy::Split)
}

/// Greedy word wrap. Explicit `\n` always starts a new line and empty
/// paragraphs survive as empty lines. Empty input yields no lines.
pub fn wrap_to_width_with(
    text: &str,
    max_width: f32,
    measurer: &TextMeasurer,
    policy: OverflowPolicy,
) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(
            paragraph.trim_end_matches('\r'),
            max_width,
            measurer,
            policy,
            &mut lines,
        );
    }
    lines
}

fn wrap_paragraph(
    paragraph: &str,
    max_width: f32,
    measurer: &TextMeasurer,
    policy: OverflowPolicy,
    lines: &mut Vec<String>,
) {
    let mut current = String::new();
    for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
        let overflows = measurer.text_width(word) > max_width;
        let word = match policy {
            OverflowPolicy::Ellipsize if overflows => ellipsize_to_width(word, max_width, measurer),
            _ => word.to_string(),
        };
        if word.is_empty() {
            // nothing of it fits, not even the marker
            continue;
        }

        if current.is_empty() {
            if overflows && policy == OverflowPolicy::Split {
                current = split_graphemes(&word, max_width, measurer, lines);
            } else {
                current = word;
            }
            continue;
        }

        let candidate = format!("{current} {word}");
        if measurer.text_width(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        lines.push(std::mem::take(&mut current));
        if overflows && policy == OverflowPolicy::Split {
            current = split_graphemes(&word, max_width, measurer, lines);
        } else {
            current = word;
        }
    }
    lines.push(current);
}

/// Emits full-width pieces of `word` into `lines` and returns the trailing
/// piece, which stays open for the words that follow.
fn split_graphemes(
    word: &str,
    max_width: f32,
    measurer: &TextMeasurer,
    lines: &mut Vec<String>,
) -> String {
    let mut piece = String::new();
    let mut piece_width = 0.0f32;
    for grapheme in word.graphemes(true) {
        let advance = measurer.cluster_advance(grapheme);
        if piece_width + advance > max_width && !piece.is_empty() {
            lines.push(std::mem::take(&mut piece));
            piece_width = 0.0;
        }
        piece.push_str(grapheme);
        piece_width += advance;
    }
    piece
}

/// Longest grapheme prefix of `word` that fits `max_width` together with the
/// ellipsis, followed by the ellipsis. Empty when not even the ellipsis fits.
pub fn ellipsize_to_width(word: &str, max_width: f32, measurer: &TextMeasurer) -> String {
    if measurer.text_width(ELLIPSIS) > max_width {
        return String::new();
    }
    let mut truncated = String::new();
    for grapheme in word.graphemes(true) {
        let candidate = format!("{truncated}{grapheme}{ELLIPSIS}");
        if measurer.text_width(&candidate) <= max_width {
            truncated.push_str(grapheme);
        } else {
            break;
        }
    }
    truncated.push_str(ELLIPSIS);
    truncated
}
