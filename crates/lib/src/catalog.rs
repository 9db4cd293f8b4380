//! # Prompt Catalog
//!
//! A catalog source turns a pair of sheet identifiers into a [`PromptCatalog`].
//! The tabular formats themselves live in the `docgen-sheets` plugin crate; this
//! module holds the trait they implement and the row-level rules they share.

use crate::{
    errors::CatalogError,
    types::{PromptCatalog, PromptEntry, SheetPair},
};
use tracing::warn;

/// Header of the column holding template placeholders.
pub const PLACEHOLDER_COLUMN: &str = "Placeholder";
/// Header of the column holding prompt text.
pub const PROMPT_COLUMN: &str = "Prompt";

/// A tabular source of prompt catalogs.
pub trait CatalogSource: Send + Sync {
    /// Loads the entries of `sheets.prompt_sheet` and the suffix of `sheets.format_sheet`.
    fn load(&self, sheets: SheetPair<'_>) -> Result<PromptCatalog, CatalogError>;

    /// A human readable name for logs and error messages.
    fn describe(&self) -> String;
}

/// Builds a catalog from already-decoded sheet rows.
///
/// Both sheets are given as rows of cell strings, header row first. Sources only
/// need to decode their format into this shape.
pub fn catalog_from_rows(
    sheets: SheetPair<'_>,
    prompt_rows: &[Vec<String>],
    format_rows: &[Vec<String>],
) -> Result<PromptCatalog, CatalogError> {
    let entries = entries_from_rows(sheets.prompt_sheet, prompt_rows)?;
    let formatting_suffix = formatting_from_rows(sheets.format_sheet, format_rows)?;
    Ok(PromptCatalog {
        entries,
        formatting_suffix,
    })
}

fn column_index(sheet: &str, header: &[String], column: &str) -> Result<usize, CatalogError> {
    header
        .iter()
        .position(|cell| cell.trim() == column)
        .ok_or_else(|| CatalogError::ColumnNotFound {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })
}

fn entries_from_rows(sheet: &str, rows: &[Vec<String>]) -> Result<Vec<PromptEntry>, CatalogError> {
    let Some((header, body)) = rows.split_first() else {
        return Err(CatalogError::ColumnNotFound {
            sheet: sheet.to_string(),
            column: PLACEHOLDER_COLUMN.to_string(),
        });
    };
    let placeholder_idx = column_index(sheet, header, PLACEHOLDER_COLUMN)?;
    let prompt_idx = column_index(sheet, header, PROMPT_COLUMN)?;

    let mut entries = Vec::with_capacity(body.len());
    for (offset, row) in body.iter().enumerate() {
        // +2: one for the header, one for 1-based row numbers.
        let row_number = offset + 2;
        let placeholder = row.get(placeholder_idx).map(String::as_str).unwrap_or("");
        let prompt = row.get(prompt_idx).map(String::as_str).unwrap_or("");

        if placeholder.is_empty() {
            if !prompt.trim().is_empty() {
                warn!("Sheet '{sheet}' row {row_number} has a prompt but no placeholder; skipping.");
            }
            continue;
        }
        if prompt.trim().is_empty() {
            warn!("Sheet '{sheet}' row {row_number} ('{placeholder}') has no prompt; skipping.");
            continue;
        }
        entries.push(PromptEntry::new(placeholder, prompt));
    }
    Ok(entries)
}

fn formatting_from_rows(sheet: &str, rows: &[Vec<String>]) -> Result<String, CatalogError> {
    rows.get(1)
        .and_then(|row| row.first())
        .cloned()
        .ok_or_else(|| CatalogError::MissingFormatting(sheet.to_string()))
}
