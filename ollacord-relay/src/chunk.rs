//! Splitting replies into platform-sized messages

/// Split `text` into contiguous pieces of at most `size` characters.
///
/// Piece `i` covers characters `[i * size, min((i + 1) * size, n))`, so
/// joining the pieces gives back `text`. Empty input yields no pieces.
/// Characters are `char`s; a piece never splits a code point.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(&text[start..]);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("", 2000).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("hello", 2000), vec!["hello"]);
    }

    #[test]
    fn test_exact_multiple() {
        let text = "a".repeat(4000);
        let chunks = chunk_text(&text, 2000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 2000));
    }

    #[test]
    fn test_4500_chars_split_2000_2000_500() {
        let text: String = (0..4500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = chunk_text(&text, 2000);

        let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lens, vec![2000, 2000, 500]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "héllo wörld ✨🦀";
        let chunks = chunk_text(text, 3);

        assert_eq!(chunks, vec!["hél", "lo ", "wör", "ld ", "✨🦀"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[test]
    fn test_zero_size_is_treated_as_one() {
        assert_eq!(chunk_text("abc", 0), vec!["a", "b", "c"]);
    }
}
