//! # `docgen-sheets`: Prompt Catalog Sources
//!
//! Implements the `CatalogSource` trait from the core `docgen` library for two
//! tabular formats:
//!
//! - [`XlsxCatalog`]: a spreadsheet workbook (`.xlsx`, `.xlsm`, `.xls`, `.ods`)
//!   whose sheets are addressed by name.
//! - [`CsvCatalog`]: a directory holding one `<sheet>.csv` file per sheet.
//!
//! Both decode a sheet into rows of cell strings, header first, and leave the
//! column rules to `docgen::catalog::catalog_from_rows`.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use docgen::{
    catalog::{catalog_from_rows, CatalogSource},
    errors::CatalogError,
    types::{PromptCatalog, SheetPair},
};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

type Rows = Vec<Vec<String>>;

// --- Workbook Catalog ---

#[derive(Debug, Clone)]
enum Workbook {
    File(PathBuf),
    Bytes { name: String, bytes: Arc<Vec<u8>> },
}

/// A prompt catalog stored in a spreadsheet workbook.
///
/// The workbook is re-read on every load, so edits between runs are picked up.
#[derive(Debug, Clone)]
pub struct XlsxCatalog {
    workbook: Workbook,
}

impl XlsxCatalog {
    /// Opens the workbook at `path`, failing early when it cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let catalog = Self {
            workbook: Workbook::File(path.as_ref().to_path_buf()),
        };
        catalog.with_workbook(|_| Ok(()))?;
        Ok(catalog)
    }

    /// Uses an in-memory workbook, e.g. one received as an upload.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, CatalogError> {
        let catalog = Self {
            workbook: Workbook::Bytes {
                name: name.into(),
                bytes: Arc::new(bytes),
            },
        };
        catalog.with_workbook(|_| Ok(()))?;
        Ok(catalog)
    }

    fn name(&self) -> String {
        match &self.workbook {
            Workbook::File(path) => path.display().to_string(),
            Workbook::Bytes { name, .. } => name.clone(),
        }
    }

    fn open_error(&self, err: impl std::fmt::Display) -> CatalogError {
        CatalogError::Open {
            source_name: self.name(),
            message: err.to_string(),
        }
    }

    /// Opens the workbook once and hands `f` a function reading sheets from it.
    fn with_workbook<T>(
        &self,
        f: impl FnOnce(&mut dyn FnMut(&str) -> Result<Rows, CatalogError>) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        match &self.workbook {
            Workbook::File(path) => {
                let mut workbook = open_workbook_auto(path).map_err(|e| self.open_error(e))?;
                f(&mut |sheet: &str| sheet_rows(&mut workbook, sheet))
            }
            Workbook::Bytes { bytes, .. } => {
                let cursor = Cursor::new(bytes.as_slice());
                let mut workbook =
                    open_workbook_auto_from_rs(cursor).map_err(|e| self.open_error(e))?;
                f(&mut |sheet: &str| sheet_rows(&mut workbook, sheet))
            }
        }
    }
}

impl CatalogSource for XlsxCatalog {
    fn load(&self, sheets: SheetPair<'_>) -> Result<PromptCatalog, CatalogError> {
        self.with_workbook(|read| {
            let prompt_rows = read(sheets.prompt_sheet)?;
            let format_rows = read(sheets.format_sheet)?;
            debug!(
                "Read {} prompt row(s) from '{}'.",
                prompt_rows.len().saturating_sub(1),
                sheets.prompt_sheet
            );
            catalog_from_rows(sheets, &prompt_rows, &format_rows)
        })
    }

    fn describe(&self) -> String {
        format!("workbook '{}'", self.name())
    }
}

fn sheet_rows<RS: Read + Seek>(
    workbook: &mut Sheets<RS>,
    sheet: &str,
) -> Result<Rows, CatalogError> {
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Err(CatalogError::SheetNotFound(sheet.to_string()));
    }
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| CatalogError::Read {
            sheet: sheet.to_string(),
            message: e.to_string(),
        })?;
    Ok(range_rows(&range))
}

/// Converts a worksheet range into rows of display strings. Empty cells become
/// empty strings.
pub fn range_rows(range: &Range<Data>) -> Rows {
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

// --- CSV Directory Catalog ---

/// A prompt catalog stored as a directory of `<sheet>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvCatalog {
    dir: PathBuf,
}

impl CsvCatalog {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(CatalogError::Open {
                source_name: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }
        Ok(Self { dir })
    }

    fn read_sheet(&self, sheet: &str) -> Result<Rows, CatalogError> {
        let path = self.dir.join(format!("{sheet}.csv"));
        if !path.is_file() {
            return Err(CatalogError::SheetNotFound(sheet.to_string()));
        }
        let read_error = |message: String| CatalogError::Read {
            sheet: sheet.to_string(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| read_error(e.to_string()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| read_error(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        // A byte order mark would otherwise stick to the first header.
        if let Some(first) = rows.first_mut().and_then(|row: &mut Vec<String>| row.first_mut()) {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }
        Ok(rows)
    }
}

impl CatalogSource for CsvCatalog {
    fn load(&self, sheets: SheetPair<'_>) -> Result<PromptCatalog, CatalogError> {
        let prompt_rows = self.read_sheet(sheets.prompt_sheet)?;
        let format_rows = self.read_sheet(sheets.format_sheet)?;
        catalog_from_rows(sheets, &prompt_rows, &format_rows)
    }

    fn describe(&self) -> String {
        format!("CSV directory '{}'", self.dir.display())
    }
}

/// Opens the catalog at `path`: a directory is read as CSV sheets, anything
/// else as a workbook.
pub fn open_catalog(path: impl AsRef<Path>) -> Result<Arc<dyn CatalogSource>, CatalogError> {
    let path = path.as_ref();
    if path.is_dir() {
        Ok(Arc::new(CsvCatalog::open(path)?))
    } else {
        Ok(Arc::new(XlsxCatalog::open(path)?))
    }
}
