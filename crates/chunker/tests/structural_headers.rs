use docqa_chunker::{Chunker, ChunkerConfig, ChunkingStrategy, Document, DocumentFormat};
use pretty_assertions::assert_eq;

const GUIDE: &str = "Welcome to the camp.

# Accommodation
Tents and domes.

## Domes
Heated geodesic domes.

### Amenities
Hot tub included.

## Tents
Canvas bell tents.

# Activities
Kayaking on the lake.
";

fn structural(max_chars: usize, overlap: usize) -> Chunker {
    Chunker::new(ChunkerConfig::with_strategy(ChunkingStrategy::Structural {
        max_chars,
        overlap,
    }))
}

fn header<'a>(chunk: &'a docqa_chunker::Chunk, level: usize) -> Option<&'a str> {
    chunk
        .metadata
        .headers
        .get(&format!("header_{level}"))
        .map(String::as_str)
}

#[tokio::test]
async fn sections_follow_headings_and_keep_heading_text() {
    let docs = vec![Document::new(GUIDE, "guide.md", DocumentFormat::Markdown)];
    let chunks = structural(500, 50).chunk(&docs).await.expect("chunking");

    assert_eq!(chunks.len(), 6);
    assert!(chunks[0].metadata.headers.is_empty());
    assert!(chunks[1].text.starts_with("# Accommodation"));

    let amenities = &chunks[3];
    assert!(amenities.text.contains("Hot tub"));
    assert_eq!(header(amenities, 1), Some("Accommodation"));
    assert_eq!(header(amenities, 2), Some("Domes"));
    assert_eq!(header(amenities, 3), Some("Amenities"));

    let tents = &chunks[4];
    assert_eq!(header(tents, 2), Some("Tents"));
    assert_eq!(header(tents, 3), None);

    let activities = &chunks[5];
    assert_eq!(header(activities, 1), Some("Activities"));
    assert_eq!(header(activities, 2), None);

    let rebuilt: String = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(rebuilt, GUIDE);
}

#[tokio::test]
async fn oversized_section_is_rewindowed_with_same_headers() {
    let body = "lorem ipsum ".repeat(40);
    let text = format!("# Long\n{body}");
    let docs = vec![Document::new(text, "long.md", DocumentFormat::Markdown)];

    let chunks = structural(100, 20).chunk(&docs).await.expect("chunking");

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.char_len() <= 100);
        assert_eq!(header(chunk, 1), Some("Long"));
    }
    let offsets: Vec<_> = chunks
        .iter()
        .take(3)
        .map(|c| c.metadata.start_offset)
        .collect();
    assert_eq!(offsets, vec![Some(0), Some(80), Some(160)]);
}

#[tokio::test]
async fn plain_text_without_headings_is_one_section() {
    let docs = vec![Document::new("just a note", "n.txt", DocumentFormat::Text)];
    let chunks = structural(500, 50).chunk(&docs).await.expect("chunking");
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].metadata.headers.is_empty());
}
