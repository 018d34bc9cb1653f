/// A slice of the input text with its character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    pub text: &'a str,
    /// Offset in characters (not bytes) from the start of the input
    pub start: usize,
}

/// Split `text` into overlapping windows of at most `size` characters.
///
/// Windows advance by `size - overlap` characters and stop as soon as one
/// reaches the end of the text, so the tail is never emitted twice.
/// Callers must validate `0 < overlap < size`.
pub fn windows(text: &str, size: usize, overlap: usize) -> Vec<Window<'_>> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }

    // Byte offset of every char boundary, plus the end of the string.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    boundaries.push(text.len());
    let total = boundaries.len() - 1;

    let step = size.saturating_sub(overlap).max(1);
    let mut out = Vec::with_capacity(total / step + 1);
    let mut start = 0usize;
    loop {
        let end = (start + size).min(total);
        out.push(Window {
            text: &text[boundaries[start]..boundaries[end]],
            start,
        });
        if end == total {
            break;
        }
        start += step;
    }
    out
}
