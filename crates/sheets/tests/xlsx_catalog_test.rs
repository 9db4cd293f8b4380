//! # Workbook Catalog Tests

use docgen::{catalog::CatalogSource, errors::CatalogError, types::SheetPair, PromptEntry};
use docgen_sheets::{open_catalog, XlsxCatalog};
use rust_xlsxwriter::Workbook;

const BO: SheetPair<'static> = SheetPair {
    prompt_sheet: "BO_Prompts",
    format_sheet: "BO_Format_add",
};

/// Builds `.xlsx` bytes with one worksheet per `(name, rows)` pair.
fn build_workbook(sheets: &[(&str, &[&[&str]])]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    worksheet.write_string(r as u32, c as u16, *cell).unwrap();
                }
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn company_workbook() -> Vec<u8> {
    build_workbook(&[
        (
            "BO_Prompts",
            &[
                &["Notes", "Prompt", "Placeholder"],
                &["", "Describe the history.", "{{BO_HISTORY}}"],
                &["", "", ""],
                &["short", "List the products.", "{{BO_PRODUCTS}}"],
            ],
        ),
        (
            "BO_Format_add",
            &[&["Formatting"], &[" Answer in plain prose."]],
        ),
        ("AH_Prompts", &[&["Placeholder", "Prompt"]]),
    ])
}

#[test]
fn test_load_catalog_from_workbook_bytes() {
    // --- 1. Arrange ---
    let catalog = XlsxCatalog::from_bytes("prompt_db.xlsx", company_workbook()).unwrap();

    // --- 2. Act ---
    let loaded = catalog.load(BO).unwrap();

    // --- 3. Assert ---
    assert_eq!(
        loaded.entries,
        vec![
            PromptEntry::new("{{BO_HISTORY}}", "Describe the history."),
            PromptEntry::new("{{BO_PRODUCTS}}", "List the products."),
        ]
    );
    assert_eq!(loaded.formatting_suffix, " Answer in plain prose.");
    assert_eq!(catalog.describe(), "workbook 'prompt_db.xlsx'");
}

#[test]
fn test_open_catalog_reads_workbook_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prompt_db.xlsx");
    std::fs::write(&path, company_workbook()).unwrap();

    let loaded = open_catalog(&path).unwrap().load(BO).unwrap();

    assert_eq!(loaded.entries.len(), 2);
    assert_eq!(loaded.entries[0].placeholder, "{{BO_HISTORY}}");
}

#[test]
fn test_missing_format_sheet_is_reported() {
    let catalog = XlsxCatalog::from_bytes("prompt_db.xlsx", company_workbook()).unwrap();
    let pair = SheetPair {
        prompt_sheet: "AH_Prompts",
        format_sheet: "AH_Format_add",
    };

    let err = catalog.load(pair).unwrap_err();

    assert!(matches!(err, CatalogError::SheetNotFound(ref s) if s == "AH_Format_add"));
}
