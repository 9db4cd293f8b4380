use serde::{Deserialize, Serialize};

/// A named group of prompts that share one assistant and one formatting suffix.
///
/// Sections are declared in configuration and processed in declaration order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// Sheet holding the `Placeholder` and `Prompt` columns.
    pub prompt_sheet: String,
    /// Sheet whose first data cell holds the formatting instruction.
    pub format_sheet: String,
    /// Opaque identifier of the remote assistant answering this section.
    pub assistant_id: String,
}

impl Section {
    pub fn sheets(&self) -> SheetPair<'_> {
        SheetPair {
            prompt_sheet: &self.prompt_sheet,
            format_sheet: &self.format_sheet,
        }
    }
}

/// The two sheet identifiers a catalog source needs for one section.
#[derive(Debug, Clone, Copy)]
pub struct SheetPair<'a> {
    pub prompt_sheet: &'a str,
    pub format_sheet: &'a str,
}

/// A single row of a prompt sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptEntry {
    pub placeholder: String,
    pub prompt: String,
}

impl PromptEntry {
    pub fn new(placeholder: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            prompt: prompt.into(),
        }
    }

    /// Appends the section's formatting suffix to the prompt text, verbatim.
    pub fn compose(&self, formatting_suffix: &str) -> String {
        format!("{}{}", self.prompt, formatting_suffix)
    }
}

/// Everything a section's sheets yield: ordered entries plus the shared suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptCatalog {
    pub entries: Vec<PromptEntry>,
    pub formatting_suffix: String,
}

impl PromptCatalog {
    /// Yields `(placeholder, composed prompt)` pairs in sheet order.
    pub fn composed(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.placeholder.as_str(), entry.compose(&self.formatting_suffix)))
    }
}
