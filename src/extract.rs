//! Local file readers for ingestion.
//!
//! Dispatches on extension and returns `(title, text)`. The title is the
//! file name unless the format carries its own (HTML `<title>`).
//! Unrecognized extensions are a [`RagError::UnsupportedSource`]; the
//! ingestion pipeline warns and skips those, it never aborts on them.

use anyhow::{Context, Result};
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

use crate::error::RagError;
use crate::fetch;

/// Extensions the local ingester will pick up during a directory walk.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "html", "htm", "docx"];

/// Decompressed byte cap for a single docx XML entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Read one local file into `(title, text)`.
pub fn read_file(path: &Path) -> Result<(String, String)> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let ext = extension_of(path)
        .ok_or_else(|| RagError::UnsupportedSource(path.display().to_string()))?;

    match ext.as_str() {
        "txt" | "md" => {
            let text = read_lossy(path)?;
            Ok((file_name, text))
        }
        "html" | "htm" => {
            let html = read_lossy(path)?;
            let title = fetch::extract_title(&html).unwrap_or(file_name);
            Ok((title, fetch::strip_html(&html)))
        }
        "pdf" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = pdf_extract::extract_text_from_mem(&bytes)
                .with_context(|| format!("PDF extraction failed for {}", path.display()))?;
            Ok((file_name, text))
        }
        "docx" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = extract_docx(&bytes)
                .with_context(|| format!("DOCX extraction failed for {}", path.display()))?;
            Ok((file_name, text))
        }
        _ => Err(RagError::UnsupportedSource(path.display().to_string()).into()),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Read as UTF-8, replacing invalid sequences rather than failing.
fn read_lossy(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pull the text runs (`w:t` elements) out of `word/document.xml`,
/// separating paragraphs with newlines.
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;

    let mut xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .context("word/document.xml not found")?;
        entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut xml)?;
        if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            anyhow::bail!("word/document.xml exceeds size limit");
        }
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text_run = true,
            Event::Text(t) if in_text_run => {
                out.push_str(t.unescape().unwrap_or_default().as_ref());
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => {
                    if !out.ends_with('\n') && !out.is_empty() {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("notes.md")));
        assert!(is_supported(Path::new("report.PDF")));
        assert!(!is_supported(Path::new("image.png")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn test_read_txt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "plain text body").unwrap();
        let (title, text) = read_file(&path).unwrap();
        assert_eq!(title, "notes.txt");
        assert_eq!(text, "plain text body");
    }

    #[test]
    fn test_read_html_uses_document_title() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.html");
        std::fs::write(&path, "<html><title>Real Title</title><body><p>Body here</p></body></html>")
            .unwrap();
        let (title, text) = read_file(&path).unwrap();
        assert_eq!(title, "Real Title");
        assert!(text.contains("Body here"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn test_unsupported_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("binary.exe");
        std::fs::write(&path, "whatever").unwrap();
        let err = read_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn test_invalid_docx_is_error_not_panic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.docx");
        std::fs::write(&path, "not a zip archive").unwrap();
        assert!(read_file(&path).is_err());
    }

    #[test]
    fn test_minimal_docx_text_runs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.docx");

        let file = std::fs::File::create(&path).unwrap();
        let mut zip_writer = zip::ZipWriter::new(file);
        zip_writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip_writer
            .write_all(
                br#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second paragraph.</w:t></w:r></w:p>
  </w:body>
</w:document>"#,
            )
            .unwrap();
        zip_writer.finish().unwrap();

        let (_, text) = read_file(&path).unwrap();
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
    }
}
