use crate::error::{ChunkerError, Result};
use crate::fixed::Window;
use async_trait::async_trait;
use ndarray::ArrayView1;
use unicode_segmentation::UnicodeSegmentation;

/// Embedding capability needed by the semantic strategy.
#[async_trait]
pub trait SentenceEmbedder: Send + Sync {
    async fn embed_sentences(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Split `text` where the meaning shifts between adjacent sentence groups.
///
/// Every sentence is joined with `buffer_size` neighbours on each side,
/// the groups are embedded, and a break is placed after sentence `i`
/// when the cosine distance between groups `i` and `i + 1` is strictly
/// above the `percentile` of all distances.
pub async fn split<'a>(
    text: &'a str,
    embedder: &dyn SentenceEmbedder,
    percentile: f32,
    buffer_size: usize,
) -> Result<Vec<Window<'a>>> {
    let spans = sentence_spans(text);
    if spans.len() <= 1 {
        return Ok(spans_to_windows(text, &spans, &[]));
    }

    let sentences: Vec<&str> = spans.iter().map(|&(s, e)| &text[s..e]).collect();
    let groups = combine_groups(&sentences, buffer_size);
    let embeddings = embedder.embed_sentences(&groups).await?;
    if embeddings.len() != groups.len() {
        return Err(ChunkerError::Embedding(format!(
            "expected {} sentence embeddings, got {}",
            groups.len(),
            embeddings.len()
        )));
    }

    let distances = cosine_distances(&embeddings);
    let cuts = breakpoints(&distances, percentile);
    log::debug!(
        "semantic split: {} sentences, {} breakpoints",
        sentences.len(),
        cuts.len()
    );
    Ok(spans_to_windows(text, &spans, &cuts))
}

/// Byte spans of sentences. Whitespace-only fragments are folded into the
/// preceding sentence so the spans stay contiguous.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for (start, piece) in text.split_sentence_bound_indices() {
        let end = start + piece.len();
        match spans.last_mut() {
            Some(last) if piece.trim().is_empty() || text[last.0..last.1].trim().is_empty() => {
                last.1 = end;
            }
            _ => spans.push((start, end)),
        }
    }
    spans
}

pub fn combine_groups(sentences: &[&str], buffer_size: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|idx| {
            let lo = idx.saturating_sub(buffer_size);
            let hi = (idx + buffer_size + 1).min(sentences.len());
            sentences[lo..hi]
                .iter()
                .map(|s| s.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// `1 - cosine_similarity` between each pair of adjacent vectors.
pub fn cosine_distances(vectors: &[Vec<f32>]) -> Vec<f32> {
    vectors
        .windows(2)
        .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm == 0.0 {
        0.0
    } else {
        a.dot(&b) / norm
    }
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Indices `i` such that a chunk ends after sentence `i`.
pub fn breakpoints(distances: &[f32], pct: f32) -> Vec<usize> {
    let threshold = percentile(distances, pct);
    distances
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > threshold)
        .map(|(idx, _)| idx)
        .collect()
}

fn spans_to_windows<'a>(
    text: &'a str,
    spans: &[(usize, usize)],
    cuts: &[usize],
) -> Vec<Window<'a>> {
    if spans.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(cuts.len() + 1);
    let mut first = 0usize;
    let mut char_start = 0usize;
    let ends = cuts.iter().copied().chain(std::iter::once(spans.len() - 1));
    for last in ends {
        let slice = &text[spans[first].0..spans[last].1];
        out.push(Window {
            text: slice,
            start: char_start,
        });
        char_start += slice.chars().count();
        first = last + 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let values = [0.1, 0.2, 0.3, 0.4, 0.5];
        assert!((percentile(&values, 50.0) - 0.3).abs() < 1e-6);
        assert!((percentile(&values, 95.0) - 0.48).abs() < 1e-6);
        assert!((percentile(&values, 100.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn breakpoint_requires_strictly_greater_distance() {
        assert!(breakpoints(&[0.2, 0.2, 0.2], 50.0).is_empty());
        assert_eq!(breakpoints(&[0.1, 0.9, 0.1], 50.0), vec![1]);
    }

    #[test]
    fn groups_include_neighbours() {
        let groups = combine_groups(&["a.", "b.", "c."], 1);
        assert_eq!(groups, vec!["a. b.", "a. b. c.", "b. c."]);
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let d = cosine_distances(&[vec![1.0, 0.0], vec![2.0, 0.0], vec![0.0, 1.0]]);
        assert!(d[0].abs() < 1e-6);
        assert!((d[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn whitespace_fragments_fold_into_previous_sentence() {
        let text = "One. Two!\n\nThree?";
        let spans = sentence_spans(text);
        let joined: String = spans.iter().map(|&(s, e)| &text[s..e]).collect();
        assert_eq!(joined, text);
        assert!(spans.iter().all(|&(s, e)| !text[s..e].trim().is_empty()));
    }
}
