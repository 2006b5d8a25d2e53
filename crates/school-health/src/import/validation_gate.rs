//! Pre-flight checks run before an upload is imported

use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use super::row_parser::RowParser;
use crate::config::ImportConfig;

/// Leading bytes of OOXML (zip) and legacy BIFF (OLE2) workbooks
const SPREADSHEET_SIGNATURES: [&[u8]; 2] = [&[0x50, 0x4B, 0x03, 0x04], &[0xD0, 0xCF, 0x11, 0xE0]];

const ALLOWED_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub total_rows: usize,
    pub valid_rows: usize,
    /// MIME type sniffed from the content, when recognisable
    pub detected_type: Option<String>,
}

pub fn has_spreadsheet_signature(buffer: &[u8]) -> bool {
    SPREADSHEET_SIGNATURES
        .iter()
        .any(|signature| buffer.starts_with(signature))
}

pub fn has_spreadsheet_extension(file_name: &str) -> bool {
    let lower = file_name.trim().to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub fn detect_mime_type(buffer: &[u8]) -> Option<String> {
    infer::get(buffer).map(|kind| kind.mime_type().to_string())
}

/// Size, signature and extension checks; these need no parsing
pub fn check_file(buffer: &[u8], file_name: &str, config: &ImportConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if buffer.len() > config.max_file_size {
        errors.push(format!(
            "File too large. The maximum allowed size is {}MB",
            config.max_file_size / (1024 * 1024)
        ));
    }

    if !has_spreadsheet_signature(buffer) {
        errors.push("Invalid file type. Only .xlsx and .xls files are allowed".to_string());
    }

    if !has_spreadsheet_extension(file_name) {
        errors.push("Invalid file extension. Use .xlsx or .xls".to_string());
    }

    errors
}

/// Full gate: file checks, then a trial parse when those pass
pub fn validate_file(
    buffer: &[u8],
    file_name: &str,
    config: &ImportConfig,
    parser: &RowParser,
) -> FileValidation {
    let mut validation = FileValidation {
        errors: check_file(buffer, file_name, config),
        detected_type: detect_mime_type(buffer),
        ..FileValidation::default()
    };

    if validation.errors.is_empty() {
        match parser.parse_buffer(buffer) {
            Ok(parsed) => {
                validation.total_rows = parsed.total_rows;
                validation.valid_rows = parsed.valid_rows;

                if parsed.total_rows == 0 {
                    validation
                        .errors
                        .push("The file is empty or contains no valid data".to_string());
                }
                if parsed.valid_rows == 0 {
                    validation
                        .errors
                        .push("No valid records found. Check the column layout.".to_string());
                }

                if !parsed.errors.is_empty() {
                    validation.warnings.push(format!(
                        "{} validation errors found. Check the report after importing.",
                        parsed.errors.len()
                    ));
                }
                if (parsed.valid_rows as f64) < parsed.total_rows as f64 * config.warn_valid_ratio {
                    validation.warnings.push(format!(
                        "Fewer than {:.0}% of the records are valid. Check the file format.",
                        config.warn_valid_ratio * 100.0
                    ));
                }
                if parsed.total_rows > config.warn_row_count {
                    validation.warnings.push(
                        "File has many records. Processing may take several minutes.".to_string(),
                    );
                }
            }
            Err(e) => validation.errors.push(format!("Could not read the file: {e}")),
        }
    }

    validation.is_valid = validation.errors.is_empty();
    debug!(
        file_name,
        is_valid = validation.is_valid,
        errors = validation.errors.len(),
        warnings = validation.warnings.len(),
        "Validated upload"
    );
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    const HEADER: [&str; 6] = ["Nome", "Data de Nascimento", "Escola", "Turma", "Período", "Ano Letivo"];

    fn workbook(rows: &[[&str; 6]]) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, value) in HEADER.iter().enumerate() {
            sheet.write_string(0, c as u16, *value).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32 + 1, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    fn valid_row(name: &str) -> [&str; 6] {
        [name, "10/03/2015", "EMEF Centro", "5º Ano A", "M", "2025"]
    }

    fn gate(buffer: &[u8], file_name: &str) -> FileValidation {
        validate_file(buffer, file_name, &ImportConfig::default(), &RowParser::default())
    }

    #[test]
    fn test_clean_workbook_passes() {
        let buffer = workbook(&[valid_row("Ana"), valid_row("Bia")]);
        let validation = gate(&buffer, "alunos.xlsx");

        assert!(validation.is_valid, "{:?}", validation.errors);
        assert!(validation.warnings.is_empty());
        assert_eq!(validation.total_rows, 2);
        assert_eq!(validation.valid_rows, 2);
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let mut buffer = vec![0u8; 10 * 1024 * 1024 + 1];
        buffer[..4].copy_from_slice(&[0x50, 0x4B, 0x03, 0x04]);
        let validation = gate(&buffer, "big.xlsx");

        assert!(!validation.is_valid);
        assert_eq!(
            validation.errors,
            vec!["File too large. The maximum allowed size is 10MB"]
        );
    }

    #[test]
    fn test_wrong_signature_and_extension() {
        let validation = gate(b"name,birth\nAna,10/03/2015\n", "alunos.csv");
        assert!(!validation.is_valid);
        assert_eq!(validation.errors.len(), 2);
        assert!(validation.errors[0].starts_with("Invalid file type"));
        assert!(validation.errors[1].starts_with("Invalid file extension"));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_spreadsheet_extension("ALUNOS.XLSX"));
        assert!(has_spreadsheet_extension("turma.xls"));
        assert!(!has_spreadsheet_extension("turma.xlsm"));
    }

    #[test]
    fn test_legacy_signature_is_recognised() {
        assert!(has_spreadsheet_signature(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1]));
        assert!(!has_spreadsheet_signature(&[0x50, 0x4B]));
    }

    #[test]
    fn test_header_only_workbook_is_empty() {
        let buffer = workbook(&[]);
        let validation = gate(&buffer, "vazio.xlsx");

        assert!(!validation.is_valid);
        assert!(validation.errors.contains(&"The file is empty or contains no valid data".to_string()));
    }

    #[test]
    fn test_warnings_for_partially_invalid_file() {
        let mut bad = valid_row("Caio");
        bad[4] = "Invalido";
        let buffer = workbook(&[valid_row("Ana"), valid_row("Bia"), bad]);
        let validation = gate(&buffer, "alunos.xlsx");

        assert!(validation.is_valid);
        assert_eq!(validation.valid_rows, 2);
        assert_eq!(validation.warnings.len(), 2);
        assert!(validation.warnings[0].starts_with("1 validation errors"));
        assert!(validation.warnings[1].starts_with("Fewer than 80%"));
    }

    #[test]
    fn test_large_row_count_warns() {
        let config = ImportConfig {
            warn_row_count: 2,
            ..ImportConfig::default()
        };
        let buffer = workbook(&[valid_row("Ana"), valid_row("Bia"), valid_row("Caio")]);
        let validation = validate_file(&buffer, "a.xlsx", &config, &RowParser::default());
        assert!(validation.is_valid);
        assert_eq!(
            validation.warnings,
            vec!["File has many records. Processing may take several minutes."]
        );
    }
}
