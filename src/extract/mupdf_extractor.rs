//! MuPDF page extractor
//!
//! Opens a fresh MuPDF document for every call; MuPDF documents are not
//! thread-safe, and each call runs on its own blocking thread.

use mupdf::{Document, TextPage, TextPageOptions};

use super::{ContentFormat, ExtractorError, PageExtractor};

const PDF_MIME: &str = "application/pdf";

impl From<mupdf::Error> for ExtractorError {
    fn from(err: mupdf::Error) -> Self {
        ExtractorError::Open(err.to_string())
    }
}

/// Extracts page text (plain or as HTML paragraphs) with MuPDF
#[derive(Debug, Clone, Copy)]
pub struct MupdfExtractor {
    format: ContentFormat,
}

impl MupdfExtractor {
    pub fn new(format: ContentFormat) -> Self {
        Self { format }
    }
}

impl PageExtractor for MupdfExtractor {
    fn page_count(&self, data: &[u8]) -> Result<usize, ExtractorError> {
        let doc = Document::from_bytes(data, PDF_MIME)?;
        Ok(doc.page_count()?.max(0) as usize)
    }

    fn extract_page(&self, data: &[u8], page: usize) -> Result<String, ExtractorError> {
        let doc = Document::from_bytes(data, PDF_MIME)?;
        let total = doc.page_count()?.max(0) as usize;
        if page == 0 || page > total {
            return Err(ExtractorError::NoSuchPage { page, total });
        }

        let page_error = |e: mupdf::Error| ExtractorError::Page {
            page,
            message: e.to_string(),
        };
        let loaded = doc.load_page((page - 1) as i32).map_err(page_error)?;
        let text_page = loaded
            .to_text_page(TextPageOptions::empty())
            .map_err(page_error)?;

        Ok(render_blocks(&text_blocks(&text_page), self.format))
    }
}

/// Lines of text per block, in reading order
fn text_blocks(text_page: &TextPage) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();

    for block in text_page.blocks() {
        let lines: Vec<String> = block
            .lines()
            .map(|line| line.chars().filter_map(|ch| ch.char()).collect::<String>())
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if !lines.is_empty() {
            blocks.push(lines);
        }
    }

    blocks
}

fn render_blocks(blocks: &[Vec<String>], format: ContentFormat) -> String {
    match format {
        ContentFormat::Text => blocks
            .iter()
            .map(|lines| lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n"),
        ContentFormat::Html => blocks
            .iter()
            .map(|lines| {
                let escaped: Vec<_> = lines
                    .iter()
                    .map(|line| html_escape::encode_text(line).into_owned())
                    .collect();
                format!("<p>{}</p>", escaped.join("<br>\n"))
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
