//! # Template Filler
//!
//! Writes answers into a `.docx` template by replacing literal placeholder tokens
//! inside paragraph runs. Only body-level paragraphs are visited.
//!
//! With [`FillStrategy::Run`] a placeholder is replaced only inside a run whose own
//! text contains it, so a token split across runs by the word processor is not
//! found. [`FillStrategy::Paragraph`] matches against the paragraph's concatenated
//! text instead and redistributes the result over the runs it touched.

use docx_rs::{
    AlignmentType, Break, BreakType, DocumentChild, Docx, Justification, Paragraph, ParagraphChild,
    Run, RunChild, Text,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    /// Replace inside individual runs; placeholders spanning runs are ignored.
    #[default]
    Run,
    /// Replace across run boundaries within a paragraph.
    Paragraph,
}

impl FillStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillStrategy::Run => "run",
            FillStrategy::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run" => Ok(FillStrategy::Run),
            "paragraph" => Ok(FillStrategy::Paragraph),
            other => Err(format!(
                "unknown fill strategy '{other}' (expected 'run' or 'paragraph')"
            )),
        }
    }
}

/// Replaces `placeholder` with `replacement` throughout the document body.
///
/// Every paragraph that contains the placeholder is left-aligned. Returns the
/// number of replacements made; zero means the document was not modified.
pub fn fill_placeholder(
    doc: &mut Docx,
    placeholder: &str,
    replacement: &str,
    strategy: FillStrategy,
) -> usize {
    if placeholder.is_empty() {
        return 0;
    }
    let placeholder = encoded(placeholder);
    let replacement = encoded(replacement);

    let mut replaced = 0;
    for child in doc.document.children.iter_mut() {
        if let DocumentChild::Paragraph(paragraph) = child {
            replaced += match strategy {
                FillStrategy::Run => fill_runs(paragraph, &placeholder, &replacement),
                FillStrategy::Paragraph => fill_across_runs(paragraph, &placeholder, &replacement),
            };
        }
    }
    replaced
}

/// The text of each body paragraph, runs concatenated.
pub fn paragraph_texts(doc: &Docx) -> Vec<String> {
    doc.document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect()
}

/// Whether `placeholder` occurs inside a single body paragraph of `doc`.
pub fn placeholder_occurs(doc: &Docx, placeholder: &str) -> bool {
    if placeholder.is_empty() {
        return false;
    }
    let placeholder = encoded(placeholder);
    paragraph_texts(doc)
        .iter()
        .any(|text| text.contains(&placeholder))
}

/// Converts plain text into the representation docx-rs keeps inside `Text` nodes.
fn encoded(text: &str) -> String {
    Text::new(text).text
}

fn runs(paragraph: &Paragraph) -> impl Iterator<Item = &Run> {
    paragraph.children.iter().filter_map(|child| match child {
        ParagraphChild::Run(run) => Some(run.as_ref()),
        _ => None,
    })
}

fn run_text(run: &Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    runs(paragraph).map(run_text).collect()
}

fn align_left(paragraph: &mut Paragraph) {
    paragraph.property.alignment = Some(Justification::new(AlignmentType::Left.to_string()));
}

/// Rewrites a run's text content in place, keeping its properties and any
/// non-text children. Newlines become line breaks.
fn set_run_text(run: &mut Run, text: &str) {
    let mut rebuilt = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            rebuilt.push(RunChild::Break(Break::new(BreakType::TextWrapping)));
        }
        if !line.is_empty() {
            rebuilt.push(RunChild::Text(Text {
                text: line.to_string(),
                preserve_space: true,
            }));
        }
    }

    let mut rebuilt = Some(rebuilt);
    let mut children = Vec::with_capacity(run.children.len());
    for child in std::mem::take(&mut run.children) {
        match child {
            RunChild::Text(_) | RunChild::Break(_) => {
                if let Some(new_children) = rebuilt.take() {
                    children.extend(new_children);
                }
            }
            other => children.push(other),
        }
    }
    if let Some(new_children) = rebuilt {
        children.extend(new_children);
    }
    run.children = children;
}

fn fill_runs(paragraph: &mut Paragraph, placeholder: &str, replacement: &str) -> usize {
    if !paragraph_text(paragraph).contains(placeholder) {
        return 0;
    }
    align_left(paragraph);

    let mut replaced = 0;
    for child in paragraph.children.iter_mut() {
        if let ParagraphChild::Run(run) = child {
            let text = run_text(run);
            if text.contains(placeholder) {
                replaced += text.matches(placeholder).count();
                set_run_text(run, &text.replace(placeholder, replacement));
            }
        }
    }
    replaced
}

/// Maps a byte position in the concatenated text to `(run index, offset in run)`.
///
/// Start positions resolve to the run holding the next character; end positions
/// resolve to the run holding the previous one.
fn locate(texts: &[String], pos: usize, is_end: bool) -> (usize, usize) {
    let mut offset = 0;
    for (i, text) in texts.iter().enumerate() {
        let len = text.len();
        let inside = if is_end {
            pos > offset && pos <= offset + len
        } else {
            pos >= offset && pos < offset + len
        };
        if inside {
            return (i, pos - offset);
        }
        offset += len;
    }
    let last = texts.len().saturating_sub(1);
    (last, texts.get(last).map_or(0, String::len))
}

fn fill_across_runs(paragraph: &mut Paragraph, placeholder: &str, replacement: &str) -> usize {
    let original: Vec<String> = runs(paragraph).map(run_text).collect();
    if !original.concat().contains(placeholder) {
        return 0;
    }
    align_left(paragraph);

    let mut texts = original.clone();
    let mut replaced = 0;
    let mut search_from = 0;
    loop {
        let joined = texts.concat();
        let Some(found) = joined[search_from..].find(placeholder) else {
            break;
        };
        let start = search_from + found;
        let end = start + placeholder.len();
        let (first, first_offset) = locate(&texts, start, false);
        let (last, last_offset) = locate(&texts, end, true);

        if first == last {
            texts[first].replace_range(first_offset..last_offset, replacement);
        } else {
            texts[first].replace_range(first_offset.., replacement);
            for text in &mut texts[first + 1..last] {
                text.clear();
            }
            texts[last].replace_range(..last_offset, "");
        }
        replaced += 1;
        search_from = start + replacement.len();
    }

    let mut index = 0;
    for child in paragraph.children.iter_mut() {
        if let ParagraphChild::Run(run) = child {
            if texts[index] != original[index] {
                set_run_text(run, &texts[index]);
            }
            index += 1;
        }
    }
    replaced
}
