use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

pub const SUMMARY_MAX_CHARS: usize = 200;
pub const MAX_KEYWORDS: usize = 5;

// English and Spanish function words.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "can", "could", "did", "do", "does",
    "for", "from", "had", "has", "have", "he", "her", "his", "how", "if", "in", "into", "is", "it",
    "its", "may", "might", "must", "not", "of", "on", "or", "our", "she", "should", "so", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those", "to", "was",
    "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your", "al", "como", "con", "de", "del", "el", "en", "es", "esta", "este", "la", "las", "lo",
    "los", "más", "mas", "no", "o", "para", "pero", "por", "que", "se", "si", "sin", "su", "sus",
    "un", "una", "uno", "unos", "unas", "y", "ya",
];

/// First sentence of `text`, capped at [`SUMMARY_MAX_CHARS`] characters.
pub fn summarize(text: &str) -> Option<String> {
    let first = text
        .unicode_sentences()
        .map(str::trim)
        .find(|s| !s.is_empty())?;
    Some(first.chars().take(SUMMARY_MAX_CHARS).collect())
}

/// Most frequent non-stopword terms, ties broken alphabetically.
pub fn keywords(text: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.unicode_words() {
        let word = word.to_lowercase();
        if word.chars().count() < 3
            || word.chars().all(|c| c.is_numeric())
            || STOPWORDS.contains(&word.as_str())
        {
            continue;
        }
        *counts.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(|(word, _)| word)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn summary_is_first_sentence() {
        let summary = summarize("  Glamping tents sleep four. They have heating.");
        assert_eq!(summary.as_deref(), Some("Glamping tents sleep four."));
        assert_eq!(summarize("   "), None);
    }

    #[test]
    fn summary_is_capped() {
        let long = "x".repeat(500);
        assert_eq!(summarize(&long).map(|s| s.chars().count()), Some(SUMMARY_MAX_CHARS));
    }

    #[test]
    fn keywords_rank_by_frequency_then_alphabetically() {
        let text = "The tent and the tent. A dome, a dome! Lake river forest meadow.";
        assert_eq!(
            keywords(text),
            vec!["dome", "tent", "forest", "lake", "meadow"]
        );
    }
}
