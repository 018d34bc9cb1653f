use docqa_chunker::ChunkingStrategy;
use docqa_indexer::{Indexer, IngestionPipeline};
use docqa_vector_store::{Embedder, HashEmbedder, VectorIndex, VectorStoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn guide_text(len: usize) -> String {
    "Breakfast is served in the main lodge from seven to ten. "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

/// Readers running through a full reset and rebuild only ever see a complete
/// collection or no collection at all.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn searches_during_rebuild_never_see_a_partial_file() {
    let docs = TempDir::new().expect("docs dir");
    let index = TempDir::new().expect("index dir");
    std::fs::write(docs.path().join("guide.txt"), guide_text(8_000)).expect("write");

    let embedder = Arc::new(HashEmbedder::default());
    let store = Arc::new(VectorIndex::open(index.path()).await.expect("open"));
    let pipeline = IngestionPipeline::new(
        Indexer::new(store.clone(), embedder.clone()).with_batch_size(3),
    );
    let strategy = ChunkingStrategy::Fixed {
        size: 300,
        overlap: 30,
    };
    let full = pipeline
        .ingest(docs.path(), "documents_fixed", &strategy, true)
        .await
        .expect("initial build")
        .chunks_indexed;

    let query = embedder.embed("When is breakfast?").await.expect("embed");
    let done = Arc::new(AtomicBool::new(false));
    let reader = tokio::spawn({
        let store = store.clone();
        let done = done.clone();
        async move {
            let mut searches = 0usize;
            while !done.load(Ordering::SeqCst) {
                match store.search("documents_fixed", &query, 4).await {
                    Ok(hits) => assert!(hits.len() <= 4),
                    Err(VectorStoreError::CollectionNotFound(_)) => {}
                    Err(e) => panic!("search failed during rebuild: {e}"),
                }
                match store.count("documents_fixed").await {
                    Ok(count) => assert_eq!(count, full),
                    Err(VectorStoreError::CollectionNotFound(_)) => {}
                    Err(e) => panic!("count failed during rebuild: {e}"),
                }
                searches += 1;
                tokio::task::yield_now().await;
            }
            searches
        }
    });

    for _ in 0..5 {
        let report = pipeline
            .ingest(docs.path(), "documents_fixed", &strategy, true)
            .await
            .expect("rebuild");
        assert_eq!(report.chunks_indexed, full);
    }
    done.store(true, Ordering::SeqCst);

    let searches = reader.await.expect("reader");
    assert!(searches > 0);
    let hits = store
        .search("documents_fixed", &embedder.embed("breakfast").await.expect("embed"), 4)
        .await
        .expect("search after rebuild");
    assert_eq!(hits.len(), 4);
}
