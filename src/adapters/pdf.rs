use crate::domain::ports::TextExtractor;
use crate::utils::error::{AutomationError, Result};
use std::panic::{self, AssertUnwindSafe};

/// Text layer extraction with `pdf-extract`. Scanned documents without a text
/// layer come back blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, name: &str, bytes: &[u8]) -> Result<String> {
        // pdf-extract panics on some malformed files instead of returning an error
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(AutomationError::PdfError {
                file: name.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(AutomationError::PdfError {
                file: name.to_string(),
                message: "the PDF parser aborted on this file".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_reported_as_pdf_error() {
        let err = PdfTextExtractor
            .extract_text("corrompido.pdf", b"definitely not a pdf")
            .unwrap_err();
        assert!(matches!(err, AutomationError::PdfError { ref file, .. } if file == "corrompido.pdf"));
    }
}
