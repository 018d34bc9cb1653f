use docqa_chunker::{
    Chunker, ChunkerConfig, ChunkerError, ChunkingStrategy, Document, DocumentFormat, StrategyKind,
};
use pretty_assertions::assert_eq;

fn fixed(size: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkerConfig::with_strategy(ChunkingStrategy::Fixed {
        size,
        overlap,
    }))
}

fn alphabet_text(len: usize) -> String {
    (0..len).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

#[tokio::test]
async fn twelve_hundred_chars_make_three_overlapping_chunks() {
    let text = alphabet_text(1200);
    let docs = vec![Document::new(text.clone(), "data/documents/guide.txt", DocumentFormat::Text)];

    let chunks = fixed(500, 50).chunk(&docs).await.expect("chunking");

    assert_eq!(chunks.len(), 3);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 500, "chunk too long: {}", chunk.char_len());
        assert_eq!(chunk.metadata.source, "data/documents/guide.txt");
        assert_eq!(chunk.metadata.strategy, StrategyKind::Fixed);
    }
    let offsets: Vec<_> = chunks.iter().map(|c| c.metadata.start_offset).collect();
    assert_eq!(offsets, vec![Some(0), Some(450), Some(900)]);

    for pair in chunks.windows(2) {
        let tail: String = pair[0].text.chars().skip(pair[0].char_len() - 50).collect();
        let head: String = pair[1].text.chars().take(50).collect();
        assert_eq!(tail, head);
    }

    let mut rebuilt = chunks[0].text.clone();
    for chunk in &chunks[1..] {
        rebuilt.extend(chunk.text.chars().skip(50));
    }
    assert_eq!(rebuilt, text);
}

#[tokio::test]
async fn short_document_is_one_chunk() {
    let docs = vec![Document::new("Check-in starts at 3pm.", "faq.txt", DocumentFormat::Text)];
    let chunks = fixed(500, 50).chunk(&docs).await.expect("chunking");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Check-in starts at 3pm.");
}

#[tokio::test]
async fn empty_and_blank_inputs_produce_nothing() {
    let chunker = fixed(500, 50);
    assert!(chunker.chunk(&[]).await.expect("empty").is_empty());

    let blank = vec![Document::new(" \n\t ", "blank.txt", DocumentFormat::Text)];
    assert!(chunker.chunk(&blank).await.expect("blank").is_empty());
}

#[tokio::test]
async fn chunk_index_restarts_per_document_and_keeps_page() {
    let docs = vec![
        Document::new(alphabet_text(120), "a.pdf", DocumentFormat::Pdf).with_page(1),
        Document::new(alphabet_text(60), "a.pdf", DocumentFormat::Pdf).with_page(2),
    ];
    let chunks = fixed(50, 10).chunk(&docs).await.expect("chunking");

    let page_two: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.page == Some(2))
        .map(|c| c.metadata.chunk_index)
        .collect();
    assert_eq!(page_two, vec![0, 1]);
    assert_eq!(chunks[0].metadata.origin(), "a.pdf#p1");
}

#[tokio::test]
async fn invalid_parameters_are_rejected() {
    let docs = vec![Document::new("text", "a.txt", DocumentFormat::Text)];
    let err = fixed(50, 50).chunk(&docs).await.unwrap_err();
    assert!(matches!(err, ChunkerError::Configuration(_)));
}

#[tokio::test]
async fn metadata_extraction_is_opt_in() {
    let docs = vec![Document::new(
        "Glamping domes have heating. Domes face the lake.",
        "stay.txt",
        DocumentFormat::Text,
    )];
    let plain = fixed(500, 50).chunk(&docs).await.expect("chunking");
    assert!(plain[0].metadata.summary.is_none());
    assert!(plain[0].metadata.keywords.is_empty());

    let config = ChunkerConfig {
        extract_metadata: true,
        ..ChunkerConfig::default()
    };
    let enriched = Chunker::new(config).chunk(&docs).await.expect("chunking");
    assert_eq!(
        enriched[0].metadata.summary.as_deref(),
        Some("Glamping domes have heating.")
    );
    assert_eq!(enriched[0].metadata.keywords[0], "domes");
}
