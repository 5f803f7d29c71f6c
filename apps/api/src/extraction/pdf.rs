use std::panic;

use tracing::warn;

/// Best-effort local text layer of a PDF.
///
/// Never fails: scanned or malformed PDFs yield an empty string and the remote
/// OCR pass works from the raw bytes instead.
pub fn text_layer(bytes: &[u8]) -> String {
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => text.trim().to_string(),
        Ok(Err(e)) => {
            warn!("No usable PDF text layer: {e}");
            String::new()
        }
        Err(_) => {
            warn!("PDF text layer extraction panicked; relying on remote OCR");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_give_empty_text() {
        assert_eq!(text_layer(b"definitely not a pdf"), "");
    }

    #[test]
    fn test_empty_buffer_gives_empty_text() {
        assert_eq!(text_layer(&[]), "");
    }
}
