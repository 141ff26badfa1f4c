//! Document ingestion: base64 decode, text extraction with OCR fallback,
//! and LLM structuring.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use intake_cloud::{ObjectStore, StorageError};

use crate::dates::parse_date_safe;
use crate::llm::ChatCompletion;
use crate::ocr::OcrEngine;
use crate::pdf::{self, PdfError, ReplaceReport};
use crate::prompt::{build_medical_prompt, parse_model_reply};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File data is not valid base64")]
    InvalidBase64,

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Decode base64 file content. A `data:<mime>;base64,` prefix and embedded
/// whitespace are tolerated.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, PipelineError> {
    let payload = match input.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => input,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|_| PipelineError::InvalidBase64)
}

/// Outcome of running one document through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// No native text was found, so `text` came from OCR.
    pub scanned: bool,
    pub text: String,
    /// Raw model reply. `None` when no model is configured or the call failed.
    pub reply: Option<String>,
}

impl Extraction {
    /// The model reply parsed as a JSON object.
    pub fn structured(&self) -> Option<serde_json::Value> {
        self.reply.as_deref().and_then(parse_model_reply)
    }

    /// `type_of_fax` from the structured reply, when non-empty.
    pub fn fax_type(&self) -> Option<String> {
        self.structured()?
            .get("type_of_fax")?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// `demographics.DOB` from the structured reply, normalised.
    pub fn patient_dob(&self) -> Option<NaiveDate> {
        let structured = self.structured()?;
        parse_date_safe(structured.get("demographics")?.get("DOB")?.as_str()?)
    }
}

pub struct IngestionPipeline {
    ocr: Arc<dyn OcrEngine>,
    llm: Option<Arc<dyn ChatCompletion>>,
}

impl IngestionPipeline {
    pub fn new(ocr: Arc<dyn OcrEngine>, llm: Option<Arc<dyn ChatCompletion>>) -> Self {
        Self { ocr, llm }
    }

    /// Classify the PDF, pull its text (OCR for scanned documents) and ask
    /// the model for the structured extraction.
    ///
    /// Extraction failures degrade to empty text and a missing reply; they
    /// are logged, never returned.
    pub async fn extract(&self, bytes: &[u8]) -> Extraction {
        let scanned = pdf::is_scanned_pdf(bytes);

        let text = if scanned {
            self.ocr.extract_text(bytes).await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "OCR extraction failed");
                String::new()
            })
        } else {
            pdf::extract_text(bytes).unwrap_or_else(|e| {
                tracing::error!(error = %e, "Native text extraction failed");
                String::new()
            })
        };

        let reply = match &self.llm {
            Some(llm) => match llm.complete(&build_medical_prompt(&text)).await {
                Ok(reply) => Some(reply),
                Err(e) => {
                    tracing::error!(error = %e, "LLM extraction failed");
                    None
                }
            },
            None => None,
        };

        tracing::info!(scanned, text_len = text.len(), has_reply = reply.is_some(), "Document extracted");
        Extraction {
            scanned,
            text,
            reply,
        }
    }
}

/// Download both PDFs from `store`, splice `pages` and return the result as
/// base64 with the per-page report.
pub async fn replace_pages_from_urls(
    store: &dyn ObjectStore,
    original_url: &str,
    replacement_url: &str,
    pages: &[u32],
) -> Result<(String, ReplaceReport), PipelineError> {
    let original = store.download(original_url).await?;
    let replacement = store.download(replacement_url).await?;
    let (merged, report) = pdf::replace_pages(&original, &replacement, pages)?;
    Ok((STANDARD.encode(merged), report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::ocr::OcrError;
    use crate::pdf::tests::build_pdf;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use intake_cloud::memory::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockOcr {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockOcr {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl OcrEngine for MockOcr {
        async fn extract_text(&self, _pdf: &[u8]) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(OcrError::ExecutionFailed {
                    binary: "tesseract".into(),
                    exit_code: Some(1),
                    stderr: "boom".into(),
                });
            }
            Ok("--- Page 1 ---\nScanned referral".into())
        }
    }

    struct MockLlm(Result<String, ()>);

    #[async_trait]
    impl ChatCompletion for MockLlm {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            assert!(prompt.contains("Fax Text:"));
            self.0.clone().map_err(|_| LlmError::EmptyCompletion)
        }
    }

    fn reply() -> String {
        r#"```json
{"type_of_fax": "Referral", "demographics": {"DOB": "02/14/1961"}}
```"#
            .to_string()
    }

    #[tokio::test]
    async fn native_pdf_skips_ocr() {
        let ocr = MockOcr::new(false);
        let pipeline = IngestionPipeline::new(ocr.clone(), Some(Arc::new(MockLlm(Ok(reply())))));

        let extraction = pipeline.extract(&build_pdf(&["CPAP order for J. Doe"])).await;

        assert!(!extraction.scanned);
        assert!(extraction.text.contains("CPAP order"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
        assert_eq!(extraction.fax_type().as_deref(), Some("Referral"));
        assert_eq!(
            extraction.patient_dob(),
            NaiveDate::from_ymd_opt(1961, 2, 14)
        );
    }

    #[tokio::test]
    async fn scanned_pdf_goes_through_ocr() {
        let ocr = MockOcr::new(false);
        let pipeline = IngestionPipeline::new(ocr.clone(), None);

        let extraction = pipeline.extract(&build_pdf(&[""])).await;

        assert!(extraction.scanned);
        assert_eq!(extraction.text, "--- Page 1 ---\nScanned referral");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
        assert!(extraction.reply.is_none());
        assert!(extraction.structured().is_none());
    }

    #[tokio::test]
    async fn failures_degrade_to_empty_results() {
        let pipeline =
            IngestionPipeline::new(MockOcr::new(true), Some(Arc::new(MockLlm(Err(())))));

        let extraction = pipeline.extract(b"not a pdf").await;

        assert!(extraction.scanned);
        assert_eq!(extraction.text, "");
        assert!(extraction.reply.is_none());
    }

    #[test]
    fn base64_accepts_data_urls_and_whitespace() {
        assert_eq!(decode_base64("JVBE\nRg==").unwrap(), b"%PDF");
        assert_eq!(
            decode_base64("data:application/pdf;base64,JVBERg==").unwrap(),
            b"%PDF"
        );
        assert_matches!(decode_base64("***"), Err(PipelineError::InvalidBase64));
    }

    #[tokio::test]
    async fn replace_from_urls_round_trips_through_store() {
        let store = InMemoryStore::new();
        let original = store
            .insert("acme/original.pdf", build_pdf(&["Old one", "Old two"]))
            .await;
        let replacement = store
            .insert("acme/replacement.pdf", build_pdf(&["New one", "New two"]))
            .await;

        let (encoded, report) = replace_pages_from_urls(&store, &original, &replacement, &[1, 9])
            .await
            .unwrap();

        assert_eq!(report.replaced, vec![1]);
        assert_eq!(report.skipped.len(), 1);
        let merged = STANDARD.decode(encoded).unwrap();
        assert_eq!(pdf::page_count(&merged).unwrap(), 2);
        assert!(pdf::extract_text(&merged).unwrap().contains("New one"));
        assert!(pdf::extract_text(&merged).unwrap().contains("Old two"));
    }

    #[tokio::test]
    async fn missing_source_object_is_storage_error() {
        let store = InMemoryStore::new();
        assert_matches!(
            replace_pages_from_urls(&store, "memory://a.pdf", "memory://b.pdf", &[1]).await,
            Err(PipelineError::Storage(StorageError::NotFound(_)))
        );
    }
}
