//! Line-length limits and word wrapping for free-form text input.

/// Longest line, in characters, the model accepts
pub const MAX_LINE_CHARS: usize = 75;

/// Wrap free-form text into lines of at most `max_chars` characters.
///
/// Words are kept whole and joined by single spaces. A word longer than
/// `max_chars` is split into `max_chars`-sized pieces.
pub fn split_into_segments(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let chars: Vec<char> = word.chars().collect();
        for piece in chars.chunks(max_chars) {
            let separator = usize::from(current_len > 0);
            if current_len + separator + piece.len() > max_chars {
                segments.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(piece);
            current_len += piece.len();
        }
    }

    if current_len > 0 {
        segments.push(current);
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_segment() {
        assert_eq!(split_into_segments("hello there", 75), vec!["hello there"]);
    }

    #[test]
    fn test_wraps_on_word_boundaries() {
        let segments = split_into_segments("aaa bbb ccc ddd", 7);
        assert_eq!(segments, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_collapses_whitespace() {
        let segments = split_into_segments("  one \n two\tthree  ", 75);
        assert_eq!(segments, vec!["one two three"]);
    }

    #[test]
    fn test_long_word_is_split() {
        let segments = split_into_segments("abcdefghij", 4);
        assert_eq!(segments, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_every_segment_respects_limit() {
        let text = "Now this is a story all about how my life got flipped turned upside down \
                    and I'd like to take a minute just sit right there";
        for segment in split_into_segments(text, MAX_LINE_CHARS) {
            assert!(segment.chars().count() <= MAX_LINE_CHARS);
        }
    }

    #[test]
    fn test_empty_text_has_no_segments() {
        assert!(split_into_segments("   ", 75).is_empty());
    }
}
