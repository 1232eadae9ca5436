use super::ExtractionError;

/// Extracts text page by page, skipping pages with no text, joined by newlines.
///
/// `pdf_extract` can panic on malformed input, so the call is isolated with
/// `catch_unwind`.
pub fn extract_pdf_text(data: &[u8]) -> Result<String, ExtractionError> {
    let pages = match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data))
    {
        Ok(Ok(pages)) => pages,
        Ok(Err(err)) => return Err(ExtractionError::Pdf(err.to_string())),
        Err(_) => return Err(ExtractionError::Pdf("parser panicked".to_string())),
    };
    Ok(join_pages(&pages))
}

fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|page| page.as_ref().trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages_skips_blank_pages() {
        let pages = ["Page one\n", "   \n", "", "\n Page four "];
        assert_eq!(join_pages(&pages), "Page one\nPage four");
    }

    #[test]
    fn test_join_pages_without_text() {
        assert_eq!(join_pages(&["  ", "\n"]), "");
        assert_eq!(join_pages::<&str>(&[]), "");
    }

    #[test]
    fn test_garbage_is_a_pdf_error() {
        let err = extract_pdf_text(b"%PDF-garbage").unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)));
    }
}
