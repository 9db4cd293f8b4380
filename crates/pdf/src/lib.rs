//! # docgen-pdf: PDF Source Documents
//!
//! Turns an uploaded PDF into a [`SourceDocument`]: the raw bytes for the
//! remote context strategies and the extracted text for the inline ones.

use docgen::SourceDocument;
use pdf::{
    content::{Op, TextDrawAdjusted},
    file::FileOptions,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("The uploaded file is empty")]
    Empty,
    #[error("Failed to parse PDF content: {0}")]
    Parse(String),
}

/// A downward move wider than this many font heights starts a new paragraph.
const PARAGRAPH_GAP: f32 = 1.5;
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Extracts text from all pages of a PDF synchronously.
///
/// Lines are separated by `\n`. A blank line (`\n\n`) marks a paragraph
/// boundary: the end of a page, or a vertical jump between lines that is wider
/// than normal line spacing. Pages that cannot be decoded are skipped with a
/// warning.
pub fn extract_text(pdf_data: &[u8]) -> Result<String, PdfError> {
    let file = FileOptions::cached()
        .load(pdf_data)
        .map_err(|e| PdfError::Parse(e.to_string()))?;
    let resolver = file.resolver();
    let mut full_text = String::new();

    for page_num in 0..file.num_pages() {
        let page = match file.get_page(page_num) {
            Ok(page) => page,
            Err(e) => {
                warn!("Skipping unreadable page {page_num}: {e}");
                continue;
            }
        };
        let Some(content) = &page.contents else {
            continue;
        };
        let operations = content
            .operations(&resolver)
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        let mut layout = TextLayout::default();
        for op in operations.iter() {
            match op {
                Op::TextDraw { text } => push_text(&mut full_text, &text.to_string_lossy()),
                Op::TextDrawAdjusted { array } => {
                    for item in array {
                        if let TextDrawAdjusted::Text(text) = item {
                            push_text(&mut full_text, &text.to_string_lossy());
                        }
                    }
                }
                Op::TextFont { size, .. } => layout.font_size = *size,
                Op::BeginText => layout.begin_block(),
                Op::SetTextMatrix { matrix } => {
                    layout.set_matrix(matrix.d, matrix.f, &mut full_text)
                }
                Op::MoveTextPosition { translation } => {
                    layout.move_line(translation.y, &mut full_text)
                }
                Op::TextNewline | Op::EndText => end_line(&mut full_text),
                _ => {}
            }
        }
        paragraph_break(&mut full_text);
    }
    Ok(full_text.trim().to_string())
}

/// Vertical text position within one page, in user space units.
#[derive(Debug)]
struct TextLayout {
    font_size: f32,
    scale: f32,
    line_origin: f32,
    last_y: Option<f32>,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            scale: 1.0,
            line_origin: 0.0,
            last_y: None,
        }
    }
}

impl TextLayout {
    /// `BT` resets the text matrix but not the position of the last line drawn.
    fn begin_block(&mut self) {
        self.scale = 1.0;
        self.line_origin = 0.0;
    }

    /// `Tm`: absolute line start; `d` is the vertical scale of the matrix.
    fn set_matrix(&mut self, d: f32, y: f32, out: &mut String) {
        self.scale = if d == 0.0 { 1.0 } else { d.abs() };
        self.line_origin = y;
        self.move_to(y, out);
    }

    /// `Td`: offset from the current line start, in text space.
    fn move_line(&mut self, dy: f32, out: &mut String) {
        self.line_origin += dy * self.scale;
        self.move_to(self.line_origin, out);
    }

    fn move_to(&mut self, y: f32, out: &mut String) {
        if let Some(previous) = self.last_y {
            let drop = previous - y;
            if drop > PARAGRAPH_GAP * self.font_size.abs() * self.scale {
                paragraph_break(out);
            } else if drop.abs() > f32::EPSILON {
                end_line(out);
            }
        }
        self.last_y = Some(y);
    }
}

fn push_text(out: &mut String, text: &str) {
    out.extend(text.chars().filter(|c| !c.is_control()));
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn paragraph_break(out: &mut String) {
    end_line(out);
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
}

/// Reads an uploaded PDF into a [`SourceDocument`].
///
/// A PDF without extractable text is still returned; whether that is an error
/// depends on the context strategy that consumes it.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn read_pdf(file_name: &str, bytes: Vec<u8>) -> Result<SourceDocument, PdfError> {
    if bytes.is_empty() {
        return Err(PdfError::Empty);
    }
    let text = extract_text(&bytes)?;
    if text.is_empty() {
        warn!("'{file_name}' contains no extractable text.");
    } else {
        info!("Extracted {} characters from '{file_name}'.", text.chars().count());
    }
    Ok(SourceDocument {
        file_name: file_name.to_string(),
        bytes,
        text,
    })
}
