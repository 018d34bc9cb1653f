use crate::error::Result;
use crate::generation::Generator;
use crate::retriever::RetrievalResult;
use std::sync::Arc;

pub const AUTO_LANGUAGE: &str = "Auto";

const GROUNDING_INSTRUCTION: &str = concat!(
    "Answer the question using only the information in the context below. ",
    "If the context does not contain the answer, say that you do not have that information."
);
const EMPTY_CONTEXT: &str = "(no relevant context was found)";

/// Directive telling the model which language to answer in.
///
/// `"Auto"` (any case) or an empty value mirrors the question's language.
#[must_use]
pub fn language_directive(language: &str) -> String {
    let language = language.trim();
    if language.is_empty() || language.eq_ignore_ascii_case(AUTO_LANGUAGE) {
        "Respond in the same language as the question.".to_string()
    } else {
        format!("Respond in {language}.")
    }
}

/// Turns a question and its retrieved context into one generation call.
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn Generator>,
    persona: Option<String>,
}

impl AnswerComposer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            persona: None,
        }
    }

    /// Leading line describing who is answering.
    #[must_use]
    pub fn with_persona(mut self, persona: Option<String>) -> Self {
        self.persona = persona.filter(|p| !p.trim().is_empty());
        self
    }

    #[must_use]
    pub fn build_prompt(
        &self,
        question: &str,
        language: &str,
        retrieved: &RetrievalResult,
    ) -> String {
        let mut prompt = String::new();
        if let Some(persona) = &self.persona {
            prompt.push_str(persona.trim());
            prompt.push_str("\n\n");
        }
        prompt.push_str(GROUNDING_INSTRUCTION);
        prompt.push('\n');
        prompt.push_str(&language_directive(language));
        prompt.push_str("\n\nContext:\n");
        if retrieved.is_empty() {
            prompt.push_str(EMPTY_CONTEXT);
        } else {
            prompt.push_str(&retrieved.texts().collect::<Vec<_>>().join("\n\n"));
        }
        prompt.push_str("\n\nQuestion: ");
        prompt.push_str(question.trim());
        prompt.push_str("\nAnswer:");
        prompt
    }

    /// Generate exactly once and return the model's output unchanged. No retries.
    pub async fn answer(
        &self,
        question: &str,
        language: &str,
        retrieved: &RetrievalResult,
    ) -> Result<String> {
        let prompt = self.build_prompt(question, language, retrieved);
        Ok(self.generator.generate(&prompt).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::RetrievedChunk;
    use docqa_chunker::{Chunk, ChunkMetadata, Document, DocumentFormat, StrategyKind};

    fn retrieved(texts: &[&str]) -> RetrievalResult {
        RetrievalResult {
            chunks: texts
                .iter()
                .map(|text| {
                    let doc = Document::new(*text, "faq.txt", DocumentFormat::Text);
                    RetrievedChunk {
                        chunk: Chunk::new(
                            *text,
                            ChunkMetadata::for_document(&doc, StrategyKind::Fixed),
                        ),
                        score: 1.0,
                    }
                })
                .collect(),
        }
    }

    struct Unused;

    #[async_trait::async_trait]
    impl Generator for Unused {
        fn model_id(&self) -> &str {
            "unused"
        }

        async fn generate(
            &self,
            _prompt: &str,
        ) -> std::result::Result<String, crate::GenerationError> {
            unreachable!("prompt tests never generate")
        }
    }

    #[test]
    fn auto_language_is_case_insensitive() {
        let expected = "Respond in the same language as the question.";
        assert_eq!(language_directive("Auto"), expected);
        assert_eq!(language_directive("auto"), expected);
        assert_eq!(language_directive("AUTO"), expected);
        assert_eq!(language_directive("Spanish"), "Respond in Spanish.");
        assert_eq!(language_directive("galego"), "Respond in galego.");
    }

    #[test]
    fn prompt_keeps_retrieval_order_and_question_last() {
        let composer = AnswerComposer::new(Arc::new(Unused))
            .with_persona(Some("You are the Espazo Nature assistant.".to_string()));
        let prompt = composer.build_prompt(
            "Is breakfast included?",
            "Auto",
            &retrieved(&["first", "second"]),
        );

        assert!(prompt.starts_with("You are the Espazo Nature assistant."));
        let first = prompt.find("first").expect("first chunk");
        let second = prompt.find("second").expect("second chunk");
        assert!(first < second);
        assert!(prompt.contains("first\n\nsecond"));
        assert!(prompt.trim_end().ends_with("Question: Is breakfast included?\nAnswer:"));
    }

    #[test]
    fn empty_context_is_marked_explicitly() {
        let composer = AnswerComposer::new(Arc::new(Unused));
        let prompt = composer.build_prompt("Hola?", "Spanish", &RetrievalResult::default());
        assert!(prompt.contains("Context:\n(no relevant context was found)"));
        assert!(prompt.contains("Respond in Spanish."));
    }

    struct Fixed(&'static str);

    #[async_trait::async_trait]
    impl Generator for Fixed {
        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn generate(
            &self,
            _prompt: &str,
        ) -> std::result::Result<String, crate::GenerationError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn answer_is_the_generator_output_unchanged() {
        let composer = AnswerComposer::new(Arc::new(Fixed("  Sí, desde las 8.\n\n- Buffet\n")));
        let answer = composer
            .answer("¿Hay desayuno?", "Auto", &retrieved(&["Breakfast at 8."]))
            .await
            .expect("answer");
        assert_eq!(answer, "  Sí, desde las 8.\n\n- Buffet\n");

        let composer = AnswerComposer::new(Arc::new(Fixed("")));
        let answer = composer
            .answer("Hi?", "Auto", &RetrievalResult::default())
            .await
            .expect("empty answer");
        assert_eq!(answer, "");
    }
}
