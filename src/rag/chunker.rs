//! Document chunking: bounded overlapping windows with sentence snapping.

use crate::errors::ApiError;

/// Sentence-ending delimiters, searched in this order. The first delimiter
/// with any occurrence in the window wins; the cut lands after its first
/// character so the punctuation stays with the chunk.
const DELIMITERS: [&[char]; 4] = [&['.', ' '], &['!', ' '], &['?', ' '], &['\n']];

/// Splits `text` into an ordered sequence of non-empty chunks.
///
/// A window of `max_size` characters advances through the text; when the
/// window ends strictly inside the remaining text, the cut is pulled back
/// to the last sentence boundary inside the window if one exists. The
/// cursor then advances to `end - overlap`, so adjacent chunks share up to
/// `overlap` characters and every character is covered at least once.
///
/// Sizes are in Unicode characters, not bytes. Deterministic for a given
/// `(text, max_size, overlap)`.
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Result<Vec<String>, ApiError> {
    if max_size == 0 {
        return Err(ApiError::validation(
            "INVALID_CHUNK_CONFIG",
            "chunk size must be positive",
        ));
    }
    if overlap >= max_size {
        return Err(ApiError::validation(
            "INVALID_CHUNK_CONFIG",
            format!("overlap {} must be smaller than chunk size {}", overlap, max_size),
        ));
    }

    let chars: Vec<char> = text.chars().collect();

    if chars.len() <= max_size {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![trimmed.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        // Logical end is unclamped; the slice below clamps. Keeping it
        // unclamped makes the final cursor advance terminate the loop.
        let mut end = start + max_size;

        if end < chars.len() {
            // A cut inside the overlap region would move the cursor
            // backward; fall through to the raw boundary in that case.
            if let Some(cut) = last_boundary(&chars[start..end]) {
                if cut > overlap {
                    end = start + cut;
                }
            }
        }

        let slice_end = end.min(chars.len());
        let piece: String = chars[start..slice_end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        start = end - overlap;
    }

    Ok(chunks)
}

/// Index one past the first character of the last delimiter occurrence in
/// `window`, or None when no delimiter fits entirely inside it.
fn last_boundary(window: &[char]) -> Option<usize> {
    for delimiter in DELIMITERS {
        if let Some(pos) = rfind(window, delimiter) {
            return Some(pos + 1);
        }
    }
    None
}

fn rfind(window: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > window.len() {
        return None;
    }
    (0..=window.len() - needle.len()).rev().find(|&i| window[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_a_single_trimmed_chunk() {
        let chunks = chunk("  hello world  ", 500, 50).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        assert!(chunk("   \n\t  ", 500, 50).unwrap().is_empty());
        assert!(chunk("", 500, 50).unwrap().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(chunk("text", 0, 0).is_err());
        assert!(chunk("text", 100, 100).is_err());
        assert!(chunk("text", 100, 150).is_err());
    }

    #[test]
    fn flat_text_splits_at_raw_boundaries() {
        // 1200 chars with no sentence delimiters: exactly three chunks of
        // 500, 500 and the remainder, the second starting at char 450.
        let text = "a".repeat(1200);
        let chunks = chunk(&text, 500, 50).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(chunks[1].chars().count(), 500);
        assert_eq!(chunks[2].chars().count(), 300);
    }

    #[test]
    fn cursor_advances_by_size_minus_overlap() {
        let text: String = ('a'..='z').cycle().take(1200).collect();
        let chunks = chunk(&text, 500, 50).unwrap();
        let chars: Vec<char> = text.chars().collect();

        let expected_second: String = chars[450..950].iter().collect();
        assert_eq!(chunks[1], expected_second);
    }

    #[test]
    fn cuts_prefer_sentence_boundaries() {
        let mut text = "x".repeat(380);
        text.push_str(". ");
        text.push_str(&"y".repeat(400));

        let chunks = chunk(&text, 500, 50).unwrap();
        // Window [0, 500) contains ". " at 380; cut lands after the period.
        assert!(chunks[0].ends_with('.'));
        assert_eq!(chunks[0].chars().count(), 381);
    }

    #[test]
    fn newline_is_a_boundary() {
        let mut text = "x".repeat(300);
        text.push('\n');
        text.push_str(&"y".repeat(400));

        let chunks = chunk(&text, 500, 50).unwrap();
        assert_eq!(chunks[0], "x".repeat(300));
    }

    #[test]
    fn every_character_is_covered() {
        let text: String = ('a'..='z').cycle().take(2345).collect();
        let chars: Vec<char> = text.chars().collect();
        let max_size = 300;
        let overlap = 40;

        // Recompute the span walk and confirm the union covers the input.
        let mut covered_to = 0usize;
        let mut start = 0usize;
        while start < chars.len() {
            let end = start + max_size;
            let slice_end = end.min(chars.len());
            assert!(start <= covered_to, "gap before {}", start);
            covered_to = covered_to.max(slice_end);
            start = end - overlap;
        }
        assert_eq!(covered_to, chars.len());

        // And the produced chunks agree with those spans.
        let chunks = chunk(&text, max_size, overlap).unwrap();
        assert!(!chunks.is_empty());
        for piece in &chunks {
            assert!(piece.chars().count() <= max_size);
        }
    }

    #[test]
    fn adjacent_chunks_share_exactly_the_overlap() {
        // No delimiters and no trimmable whitespace, so every cut is a raw
        // boundary and each pair shares exactly `overlap` characters.
        let text: String = ('a'..='z').cycle().take(1500).collect();
        let overlap = 50;
        let chunks = chunk(&text, 400, overlap).unwrap();
        assert!(chunks.len() >= 2);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();

            assert!(prev.len() >= overlap && next.len() >= overlap);
            assert_eq!(prev[prev.len() - overlap..], next[..overlap]);
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let text: String = "The quick brown fox. Jumps over the lazy dog! Again? Yes.\n"
            .repeat(40);
        let first = chunk(&text, 200, 30).unwrap();
        let second = chunk(&text, 200, 30).unwrap();
        assert_eq!(first, second);
    }
}
