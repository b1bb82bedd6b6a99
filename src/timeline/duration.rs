//! Caption segmentation and the per-segment duration buckets.

/// Segments with at least this many words get the long bucket.
pub const LONG_SEGMENT_WORDS: usize = 10;
/// Seconds on screen for a long segment.
pub const LONG_SEGMENT_SECS: u32 = 5;
/// Seconds on screen for every other segment, including the empty one.
pub const SHORT_SEGMENT_SECS: u32 = 3;

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split text into sentence-terminated pieces.
///
/// A piece is a maximal run of non-terminator characters followed by at most one terminator.
/// Pieces are trimmed and empty ones dropped; terminators with no preceding text are discarded.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if is_terminator(c) {
            chars.next();
            continue;
        }
        let mut end = text.len();
        while let Some(&(i, c)) = chars.peek() {
            if is_terminator(c) {
                chars.next();
                end = i + c.len_utf8();
                break;
            }
            chars.next();
            end = i + c.len_utf8();
        }
        let piece = text[start..end].trim();
        if !piece.is_empty() {
            out.push(piece);
        }
    }
    out
}

/// Segment a caption for display. Always yields at least one segment.
///
/// Blank captions yield a single empty segment. Captions made only of terminators yield the
/// trimmed caption as their single segment.
pub fn segment_caption(caption: &str) -> Vec<&str> {
    let sentences = split_sentences(caption);
    if sentences.is_empty() {
        vec![caption.trim()]
    } else {
        sentences
    }
}

/// Whitespace-separated word count; the empty segment counts as one word.
pub fn word_count(segment: &str) -> usize {
    segment.split_whitespace().count().max(1)
}

/// On-screen duration of one caption segment in whole seconds.
pub fn segment_duration_secs(segment: &str) -> u32 {
    if word_count(segment) >= LONG_SEGMENT_WORDS {
        LONG_SEGMENT_SECS
    } else {
        SHORT_SEGMENT_SECS
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/duration.rs"]
mod tests;
