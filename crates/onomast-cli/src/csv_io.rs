//! CSV collaborators: read a name list, write it back enriched.
//!
//! The output keeps every source column of the selected rows and appends
//! the enrichment columns in [`ENRICHMENT_COLUMNS`] order.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use csv::StringRecord;
use onomast_core::{ENRICHMENT_COLUMNS, EnrichmentRecord};

/// A CSV file held in memory, with the position of its name column.
#[derive(Debug)]
pub struct NameTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    name_index: usize,
}

impl NameTable {
    pub fn read(path: &Path, name_column: &str) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("cannot read header of {}", path.display()))?
            .clone();

        let Some(name_index) = headers.iter().position(|h| h.trim() == name_column) else {
            bail!(
                "column '{name_column}' not found in {} (columns: {})",
                path.display(),
                headers.iter().collect::<Vec<_>>().join(", ")
            );
        };

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("malformed row in {}", path.display()))?;

        Ok(Self {
            headers,
            rows,
            name_index,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name cell of row `row`; empty when the row is short.
    pub fn name(&self, row: usize) -> &str {
        self.rows[row].get(self.name_index).unwrap_or_default()
    }

    /// Header row of the enriched output.
    pub fn output_headers(&self) -> StringRecord {
        let mut headers = self.headers.clone();
        for column in ENRICHMENT_COLUMNS {
            headers.push_field(column);
        }
        headers
    }
}

/// `<dir>/<stem>_enriched.csv` next to `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "names".to_string());
    input.with_file_name(format!("{stem}_enriched.csv"))
}

/// Write `records` merged into their source rows.
///
/// `selection[i]` is the table row behind the item with id `i`. Rows
/// without a record (an aborted run) are left out.
pub fn write_enriched(
    path: &Path,
    table: &NameTable,
    selection: &[usize],
    records: &[EnrichmentRecord],
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    writer.write_record(&table.output_headers())?;

    for record in records {
        let Some(&row) = selection.get(record.item_id) else {
            bail!("record for unknown item {}", record.item_id);
        };
        let mut out = table.rows[row].clone();
        for value in record.column_values() {
            out.push_field(&value);
        }
        writer.write_record(&out)?;
    }

    writer
        .flush()
        .with_context(|| format!("cannot write {}", path.display()))?;
    Ok(records.len())
}
