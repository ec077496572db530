// PDF helpers shared by the upload form and the offline `extract` command.

use anyhow::Context;

pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts text from a PDF stored fully in memory.
/// Thin wrapper over the `pdf-extract` crate API.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> anyhow::Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .context("failed to extract text from PDF bytes using pdf-extract")?;
    Ok(text)
}

/// Returns true if given content-type or head indicates a PDF file.
/// - Content-Type: application/pdf (case-insensitive, substring match)
/// - Magic bytes: %PDF-
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains(PDF_MIME) || head.starts_with(PDF_MAGIC)
}

/// Determines the MIME type of a local file.
///
/// Magic signatures win over the file name, so a renamed image is never
/// reported as a PDF. When no signature matches, the extension decides;
/// a `.pdf` name without the PDF header falls through to octet-stream.
pub fn sniff_mime(file_name: &str, head: &[u8]) -> &'static str {
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    const GIF: &[u8] = b"GIF8";
    const ZIP: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
    const GZIP: &[u8] = &[0x1F, 0x8B];

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if head.starts_with(PDF_MAGIC) {
        return PDF_MIME;
    }
    if head.starts_with(PNG) {
        return "image/png";
    }
    if head.starts_with(JPEG) {
        return "image/jpeg";
    }
    if head.starts_with(GIF) {
        return "image/gif";
    }
    if head.starts_with(GZIP) {
        return "application/gzip";
    }
    if head.starts_with(ZIP) {
        // Office documents are zip containers
        return match extension.as_str() {
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "odt" => "application/vnd.oasis.opendocument.text",
            _ => "application/zip",
        };
    }

    match extension.as_str() {
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "doc" => "application/msword",
        "rtf" => "application/rtf",
        _ => "application/octet-stream",
    }
}
