//! Writes workbooks as plain CSV files.
//!
//! Layout under the output directory:
//!
//! ```text
//! <variant>/workbook.csv                       sheet,file,hidden
//! <variant>/<sheet name>.csv                   one file per sheet
//! Rebalancing_Weights_Upload_<variant>.csv     FactSet-ID/ISIN,Shares/Weights
//! Index_Levels.csv                             Date,<variant>...
//! ```

use crate::domain::error::IndexError;
use crate::domain::export::{Sheet, Workbook};
use crate::ports::export_port::ExportPort;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MANIFEST_FILE: &str = "workbook.csv";
pub const UPLOAD_HEADER: [&str; 2] = ["FactSet-ID/ISIN", "Shares/Weights"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExportAdapter;

impl CsvExportAdapter {
    pub fn new() -> Self {
        Self
    }

    pub fn upload_file_name(workbook: &Workbook) -> String {
        format!("Rebalancing_Weights_Upload_{}.csv", workbook.variant)
    }
}

/// File name for a sheet: spaces become underscores, other characters outside
/// `[A-Za-z0-9_-]` are dropped.
pub fn sheet_file_name(sheet_name: &str) -> String {
    let stem: String = sheet_name
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' || c == '-' => Some(c),
            _ => None,
        })
        .collect();
    format!("{stem}.csv")
}

fn csv_error(path: &Path, e: csv::Error) -> IndexError {
    IndexError::data(format!("failed to write {}: {}", path.display(), e))
}

fn write_rows<I, R>(path: &Path, header: &[String], rows: I) -> Result<(), IndexError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    writer.write_record(header).map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer
            .write_record(row.into_iter().collect::<Vec<_>>())
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_sheet(dir: &Path, sheet: &Sheet) -> Result<PathBuf, IndexError> {
    let path = dir.join(sheet_file_name(&sheet.name));
    write_rows(&path, &sheet.header, sheet.rows.iter().cloned())?;
    Ok(path)
}

impl ExportPort for CsvExportAdapter {
    fn write(&self, workbook: &Workbook, output_dir: &Path) -> Result<(), IndexError> {
        let dir = output_dir.join(workbook.variant.code());
        fs::create_dir_all(&dir)?;

        let mut manifest = Vec::with_capacity(workbook.sheets.len());
        for sheet in &workbook.sheets {
            write_sheet(&dir, sheet)?;
            manifest.push(vec![
                sheet.name.clone(),
                sheet_file_name(&sheet.name),
                sheet.hidden.to_string(),
            ]);
        }
        let header = ["sheet", "file", "hidden"].map(String::from);
        write_rows(&dir.join(MANIFEST_FILE), &header, manifest)?;

        let upload = output_dir.join(Self::upload_file_name(workbook));
        let header = UPLOAD_HEADER.map(String::from);
        write_rows(
            &upload,
            &header,
            workbook
                .last_day_weights
                .iter()
                .map(|(ticker, weight)| vec![ticker.clone(), weight.to_string()]),
        )?;

        info!(
            variant = %workbook.variant,
            dir = %dir.display(),
            sheets = workbook.sheets.len(),
            "workbook exported"
        );
        Ok(())
    }

    fn write_index_levels(&self, sheet: &Sheet, output_dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(output_dir)?;
        let path = write_sheet(output_dir, sheet)?;
        info!(path = %path.display(), "index levels exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::total_return::IndexVariant;
    use tempfile::TempDir;

    fn workbook() -> Workbook {
        Workbook {
            variant: IndexVariant::GrossTotalReturn,
            sheets: vec![
                Sheet {
                    name: "Index Level".to_string(),
                    hidden: false,
                    header: vec!["Date".to_string(), "Index Level".to_string()],
                    rows: vec![vec!["2024-02-01".to_string(), "101.5".to_string()]],
                },
                Sheet {
                    name: "Calculated Shares".to_string(),
                    hidden: true,
                    header: vec!["Date".to_string(), "A".to_string()],
                    rows: vec![],
                },
            ],
            last_day_weights: vec![("A".to_string(), 0.75), ("B".to_string(), 0.25)],
        }
    }

    #[test]
    fn sheet_file_names() {
        assert_eq!(sheet_file_name("Index Level"), "Index_Level.csv");
        assert_eq!(
            sheet_file_name("Weights - Rebalancing Date"),
            "Weights_-_Rebalancing_Date.csv"
        );
    }

    #[test]
    fn writes_sheets_manifest_and_upload() {
        let dir = TempDir::new().unwrap();
        CsvExportAdapter::new().write(&workbook(), dir.path()).unwrap();

        let index = fs::read_to_string(dir.path().join("GTR/Index_Level.csv")).unwrap();
        assert_eq!(index, "Date,Index Level\n2024-02-01,101.5\n");

        let manifest = fs::read_to_string(dir.path().join("GTR/workbook.csv")).unwrap();
        assert_eq!(
            manifest,
            "sheet,file,hidden\n\
             Index Level,Index_Level.csv,false\n\
             Calculated Shares,Calculated_Shares.csv,true\n"
        );

        let upload =
            fs::read_to_string(dir.path().join("Rebalancing_Weights_Upload_GTR.csv")).unwrap();
        assert_eq!(upload, "FactSet-ID/ISIN,Shares/Weights\nA,0.75\nB,0.25\n");
    }

    #[test]
    fn index_levels_written_at_top_level() {
        let dir = TempDir::new().unwrap();
        let sheet = Sheet {
            name: "Index Levels".to_string(),
            hidden: false,
            header: vec!["Date".to_string(), "PR".to_string(), "GTR".to_string()],
            rows: vec![vec!["2024-02-01".to_string(), "100".to_string(), "101".to_string()]],
        };
        CsvExportAdapter::new()
            .write_index_levels(&sheet, dir.path())
            .unwrap();
        let content = fs::read_to_string(dir.path().join("Index_Levels.csv")).unwrap();
        assert_eq!(content, "Date,PR,GTR\n2024-02-01,100,101\n");
    }

    #[test]
    fn unwritable_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        assert!(CsvExportAdapter::new().write(&workbook(), &blocker).is_err());
    }
}
