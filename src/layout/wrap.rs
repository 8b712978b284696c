/// Wrap `text` into lines no wider than `max_width` characters.
///
/// Words are taken in order and appended to the current line (separated by a single space)
/// while the line stays within `max_width`. A word that does not fit closes the current line
/// and starts the next one. Words longer than `max_width` are never split; they occupy a line
/// of their own and overflow the bound. Widths are measured in `char`s, and a width of zero is
/// treated as one.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
            continue;
        }

        if current_width + 1 + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::wrap_text;

    fn words(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn wraps_greedily_at_width() {
        let lines = wrap_text("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn exact_fit_stays_on_line() {
        let lines = wrap_text("abcd efgh", 9);
        assert_eq!(lines, vec!["abcd efgh"]);
    }

    #[test]
    fn long_word_overflows_on_its_own_line() {
        let lines = wrap_text("a supercalifragilistic b", 5);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn leading_long_word_does_not_emit_empty_line() {
        let lines = wrap_text("indemnification clause", 6);
        assert_eq!(lines, vec!["indemnification", "clause"]);
        assert!(lines.iter().all(|line| !line.is_empty()));
    }

    #[test]
    fn blank_input_produces_no_lines() {
        assert!(wrap_text("", 10).is_empty());
        assert!(wrap_text(" \n\t ", 10).is_empty());
    }

    #[test]
    fn zero_width_places_each_word_alone() {
        assert_eq!(wrap_text("a b c", 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn widths_count_characters_not_bytes() {
        let lines = wrap_text("café déjà vu", 10);
        assert_eq!(lines, vec!["café déjà", "vu"]);
    }

    #[test]
    fn lines_respect_width_or_longest_word() {
        let text = "The Lessee shall pay the Lessor a monthly rent of one thousand dollars \
                    (USD 1,000) on or before the first business day of each calendar month.";
        for width in [1, 7, 12, 20, 45, 90] {
            let longest = words(text).iter().map(|w| w.chars().count()).max().unwrap();
            let bound = width.max(longest);
            for line in wrap_text(text, width) {
                assert!(line.chars().count() <= bound, "{line:?} exceeds {bound}");
            }
        }
    }

    #[test]
    fn preserves_word_sequence() {
        let text = "  Party A\tagrees\n\nto   pay Party B  $500 upon signature. ";
        for width in [1, 5, 10, 90] {
            let joined = wrap_text(text, width).join(" ");
            assert_eq!(words(&joined), words(text));
        }
    }

    #[test]
    fn rewrapping_is_idempotent_and_deterministic() {
        let text = "This Agreement shall be governed by and construed in accordance with the \
                    laws of the State of New York without regard to conflict of laws.";
        for width in [3, 10, 33, 90] {
            let first = wrap_text(text, width);
            assert_eq!(first, wrap_text(text, width));
            assert_eq!(wrap_text(&first.join(" "), width), first);
        }
    }
}
