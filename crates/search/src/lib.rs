//! Query-time side of docqa: retrieve relevant chunks and phrase an answer
//! grounded in them.

mod composer;
mod error;
mod generation;
mod retriever;
mod service;

pub use composer::{language_directive, AnswerComposer, AUTO_LANGUAGE};
pub use error::{GenerationError, Result, SearchError};
pub use generation::{
    Generator, OllamaGenerator, DEFAULT_CHAT_MODEL, DEFAULT_GENERATION_TIMEOUT,
};
pub use retriever::{
    RetrievalResult, RetrievedChunk, Retriever, DEFAULT_K, DEFAULT_RETRIEVAL_TIMEOUT,
};
pub use service::QaService;
