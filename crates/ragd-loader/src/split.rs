//! Stride-based text splitter
//!
//! Slices a run of text into fixed-size windows that overlap by a
//! configured amount. Windows are measured in characters and ignore
//! word boundaries.

/// Split `text` into windows of at most `chunk_size` characters, each
/// consecutive pair overlapping by `chunk_overlap` characters.
///
/// Text no longer than `chunk_size` comes back as a single chunk. The
/// window start advances by `chunk_size - chunk_overlap` per step,
/// floored at 1 so a misconfigured overlap still makes forward
/// progress and terminates.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let stride = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "short document";
        let chunks = split_text(text, 1000, 100);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_exact_size_is_single_chunk() {
        let text = "a".repeat(100);
        let chunks = split_text(&text, 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_empty_text_is_single_empty_chunk() {
        let chunks = split_text("", 1000, 100);
        assert_eq!(chunks, vec![String::new()]);
    }

    #[test]
    fn test_windows_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = split_text(&text, 10, 4);

        assert_eq!(chunks[0], "abcdefghij");
        // Next window starts stride = 6 characters later
        assert_eq!(chunks[1], "ghijklmnop");
        // Every chunk except possibly the last is full-size
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.chars().count(), 10);
        }
        assert!(chunks.last().unwrap().ends_with('z'));
    }

    #[test]
    fn test_roundtrip_reconstruction() {
        let text: String = (0..2357).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let (chunk_size, overlap) = (300, 50);
        let chunks = split_text(&text, chunk_size, overlap);
        assert!(chunks.len() > 1);

        // Concatenating chunks with the overlaps removed reconstructs
        // the original text exactly.
        let mut rebuilt: String = chunks[0].clone();
        for chunk in &chunks[1..] {
            rebuilt.extend(chunk.chars().skip(overlap));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_chunk_count_estimate() {
        let len = 1900;
        let (chunk_size, overlap) = (1000, 100);
        let text = "x".repeat(len);
        let chunks = split_text(&text, chunk_size, overlap);

        let stride = chunk_size - overlap;
        let expected = (len - overlap).div_ceil(stride);
        assert_eq!(chunks.len(), expected);
    }

    #[test]
    fn test_degenerate_overlap_still_terminates() {
        // overlap >= chunk_size would give a zero or negative stride;
        // the splitter floors it at 1.
        let text = "abcdefghij";
        let chunks = split_text(text, 4, 4);

        assert!(chunks.len() <= text.len());
        assert_eq!(chunks[0], "abcd");
        assert_eq!(chunks[1], "bcde");
        assert!(chunks.last().unwrap().ends_with('j'));
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "안녕하세요 세계".repeat(40);
        let chunks = split_text(&text, 50, 10);
        // Char-based windows never split inside a UTF-8 sequence
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert!(total >= text.chars().count());
    }
}
