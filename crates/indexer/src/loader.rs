use crate::error::{IndexerError, Result};
use docqa_chunker::{Document, DocumentFormat};
use std::path::Path;

/// Load one source file into documents.
///
/// Text and Markdown files yield a single document. PDFs yield one document
/// per page with a 1-based page number.
pub async fn load_file(path: &Path) -> Result<Vec<Document>> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(DocumentFormat::from_extension)
        .ok_or_else(|| load_error(path, "unsupported file extension"))?;

    match format {
        DocumentFormat::Text | DocumentFormat::Markdown => load_text(path, format).await,
        DocumentFormat::Pdf => {
            let owned = path.to_path_buf();
            tokio::task::spawn_blocking(move || load_pdf(&owned))
                .await
                .map_err(|e| load_error(path, format!("pdf worker failed: {e}")))?
        }
    }
}

async fn load_text(path: &Path, format: DocumentFormat) -> Result<Vec<Document>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| load_error(path, e.to_string()))?;
    let text =
        String::from_utf8(bytes).map_err(|e| load_error(path, format!("invalid UTF-8: {e}")))?;
    Ok(vec![Document::new(text, source_name(path), format)])
}

fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    let pdf =
        lopdf::Document::load(path).map_err(|e| load_error(path, format!("corrupt PDF: {e}")))?;
    if pdf.is_encrypted() {
        return Err(load_error(path, "encrypted PDF"));
    }

    let source = source_name(path);
    let mut documents = Vec::new();
    for page in pdf.get_pages().keys().copied() {
        match pdf.extract_text(&[page]) {
            Ok(text) => {
                documents.push(
                    Document::new(text, source.clone(), DocumentFormat::Pdf).with_page(page),
                );
            }
            Err(e) => log::warn!("{}: page {page} has no extractable text: {e}", path.display()),
        }
    }

    if documents.is_empty() {
        return Err(load_error(path, "no readable pages"));
    }
    Ok(documents)
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

fn load_error(path: &Path, reason: impl Into<String>) -> IndexerError {
    IndexerError::Load {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn text_file_is_one_document() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("faq.TXT");
        tokio::fs::write(&path, "Check-in at 3pm.").await.expect("write");

        let docs = load_file(&path).await.expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Check-in at 3pm.");
        assert_eq!(docs[0].metadata.format, DocumentFormat::Text);
        assert_eq!(docs[0].metadata.page, None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_load_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("bad.txt");
        tokio::fs::write(&path, [0xff, 0xfe, 0x00]).await.expect("write");

        let err = load_file(&path).await.unwrap_err();
        assert!(matches!(err, IndexerError::Load { .. }));
    }

    #[tokio::test]
    async fn corrupt_pdf_is_load_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        tokio::fs::write(&path, b"not a pdf").await.expect("write");

        let err = load_file(&path).await.unwrap_err();
        assert!(matches!(err, IndexerError::Load { reason, .. } if reason.contains("corrupt")));
    }
}
