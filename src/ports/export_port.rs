//! Export port for audit workbooks.

use crate::domain::error::IndexError;
use crate::domain::export::{Sheet, Workbook};
use std::path::Path;

/// Port for persisting the tables of an index run.
pub trait ExportPort {
    fn write(&self, workbook: &Workbook, output_dir: &Path) -> Result<(), IndexError>;

    /// Writes the cross-variant levels sheet next to the per-variant workbooks.
    fn write_index_levels(&self, sheet: &Sheet, output_dir: &Path) -> Result<(), IndexError>;
}
