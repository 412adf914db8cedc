//! Text extraction for supported document formats.
//!
//! - `.txt`: read as UTF-8
//! - `.docx`: paragraphs of `word/document.xml` joined with newlines

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

/// Archive member holding the main body of a word-processor document
const DOCX_BODY_PART: &str = "word/document.xml";

/// Document formats the corpus loader enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    WordDocument,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::PlainText),
            "docx" => Some(Self::WordDocument),
            _ => None,
        }
    }
}

/// Check whether a path has an extension the extractor can read.
pub fn is_supported(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_some()
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(PathBuf),

    #[error("Malformed document archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Malformed document XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
}

/// Produces the plain text of a document.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Extractor for every `DocumentFormat`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl TextExtractor for DocumentExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        match DocumentFormat::from_path(path) {
            Some(DocumentFormat::PlainText) => read_plain_text(path),
            Some(DocumentFormat::WordDocument) => read_word_document(path),
            None => Err(ExtractError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExtractError + '_ {
    move |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn read_plain_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    String::from_utf8(bytes).map_err(|_| ExtractError::InvalidUtf8(path.to_path_buf()))
}

fn read_word_document(path: &Path) -> Result<String, ExtractError> {
    let archive_error = |source| ExtractError::Archive {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_error(path))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(archive_error)?;
    let body = archive.by_name(DOCX_BODY_PART).map_err(archive_error)?;

    paragraphs_from_xml(BufReader::new(body)).map_err(|source| ExtractError::Xml {
        path: path.to_path_buf(),
        source,
    })
}

/// Collect paragraph texts (`w:p`) from WordprocessingML, one per line.
///
/// Text runs (`w:t`) are concatenated, `w:tab` becomes a tab and
/// `w:br`/`w:cr` become line breaks. Namespace prefixes are ignored.
fn paragraphs_from_xml<R: BufRead>(source: R) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_paragraph => current.push('\t'),
                b"br" | b"cr" if in_paragraph => current.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text => {
                let text: Cow<str> = e.unescape()?;
                current.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    in_paragraph = false;
                    paragraphs.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Write a minimal `.docx` archive whose body contains `paragraphs`.
    pub(crate) fn write_docx(path: &Path, paragraphs: &[&str]) {
        let mut body = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        );
        for paragraph in paragraphs {
            body.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
            body.push_str(
                &paragraph
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;"),
            );
            body.push_str("</w:t></w:r></w:p>");
        }
        body.push_str("</w:body></w:document>");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file(DOCX_BODY_PART, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/notes.txt")),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("Report.DOCX")),
            Some(DocumentFormat::WordDocument)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("image.png")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
        assert!(!is_supported(Path::new("old.doc")));
    }

    #[test]
    fn test_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello wörld\nsecond line").unwrap();

        let text = DocumentExtractor.extract_text(&path).unwrap();
        assert_eq!(text, "hello wörld\nsecond line");
    }

    #[test]
    fn test_plain_text_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let result = DocumentExtractor.extract_text(&path);
        assert!(matches!(result, Err(ExtractError::InvalidUtf8(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DocumentExtractor.extract_text(&dir.path().join("gone.txt"));
        assert!(matches!(result, Err(ExtractError::Io { .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let result = DocumentExtractor.extract_text(&path);
        assert!(matches!(result, Err(ExtractError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_word_document_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        write_docx(&path, &["First paragraph", "Fish & chips", "Third"]);

        let text = DocumentExtractor.extract_text(&path).unwrap();
        assert_eq!(text, "First paragraph\nFish & chips\nThird");
    }

    #[test]
    fn test_word_document_that_is_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, "plain text pretending").unwrap();

        let result = DocumentExtractor.extract_text(&path);
        assert!(matches!(result, Err(ExtractError::Archive { .. })));
    }

    #[test]
    fn test_runs_tabs_and_breaks() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:tab/><w:t>world</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>line</w:t><w:br/><w:t>break</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = paragraphs_from_xml(xml.as_bytes()).unwrap();
        assert_eq!(text, "Hello\tworld\n\nline\nbreak");
    }
}
