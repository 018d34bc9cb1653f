use crate::composer::AnswerComposer;
use crate::error::{Result, SearchError};
use crate::retriever::{Retriever, DEFAULT_K};

/// Question answering over one collection: retrieve, then compose.
#[derive(Clone)]
pub struct QaService {
    retriever: Retriever,
    composer: AnswerComposer,
    collection: String,
    k: usize,
}

impl QaService {
    pub fn new(
        retriever: Retriever,
        composer: AnswerComposer,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            composer,
            collection: collection.into(),
            k: DEFAULT_K,
        }
    }

    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Answer `question` grounded in the collection.
    ///
    /// An empty question is rejected before anything is retrieved. Finding
    /// no relevant context is not an error: the model is still asked and
    /// told the context is empty.
    pub async fn ask(&self, question: &str, language: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let retrieved = self
            .retriever
            .retrieve(question, &self.collection, self.k)
            .await?;
        log::info!(
            "Answering with {} chunks from '{}'",
            retrieved.len(),
            self.collection
        );
        self.composer.answer(question, language, &retrieved).await
    }
}
