//! Import and export pipelines
//!
//! Both are synchronous and take the store as a trait object; the web layer
//! runs them on the blocking thread pool.

use log::{debug, info, warn};

use crate::archive::{build_archive, extract_csv, EXPORT_ENTRY_NAME};
use crate::csv_processor::{encode_prices, normalize, parse_all, NormalizedRow, SkipReason};
use crate::database::PriceStore;
use crate::error::Result;
use crate::models::StatsSummary;

/// Per-request counters describing what happened to each CSV row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportDiagnostics {
    pub rows_read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub skipped_too_few_fields: usize,
    pub skipped_header: usize,
    pub skipped_invalid_price: usize,
}

impl ImportDiagnostics {
    /// Rows that did not end up in the table, for any reason
    pub fn skipped(&self) -> usize {
        self.skipped_too_few_fields
            + self.skipped_header
            + self.skipped_invalid_price
            + self.duplicates
            + self.rejected
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::TooFewFields => self.skipped_too_few_fields += 1,
            SkipReason::HeaderRow => self.skipped_header += 1,
            SkipReason::InvalidPrice => self.skipped_invalid_price += 1,
        }
    }
}

/// What a successful import hands back to the caller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportReport {
    /// Whole-table statistics after the commit
    pub stats: StatsSummary,
    pub diagnostics: ImportDiagnostics,
}

/// Import an uploaded archive: extract, parse, validate, insert, then
/// compute whole-table statistics.
///
/// Anything that fails before the commit aborts the import with nothing
/// persisted. A statistics failure after the commit only degrades the
/// returned stats to zero.
pub fn handle_import(store: &dyn PriceStore, archive_bytes: &[u8]) -> Result<ImportReport> {
    let csv_bytes = extract_csv(archive_bytes)?;
    let rows = parse_all(&csv_bytes)?;
    info!("Read {} CSV rows from upload", rows.len());

    let mut diagnostics = ImportDiagnostics {
        rows_read: rows.len(),
        ..Default::default()
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        match normalize(row) {
            NormalizedRow::Record(record) => records.push(record),
            NormalizedRow::Skip(reason) => diagnostics.record_skip(reason),
        }
    }
    debug!(
        "{} rows valid, {} skipped before insert",
        records.len(),
        rows.len() - records.len()
    );

    let outcome = store.insert_batch(&records)?;
    diagnostics.inserted = outcome.inserted;
    diagnostics.duplicates = outcome.duplicates;
    diagnostics.rejected = outcome.rejected;

    let stats = match store.aggregate_stats() {
        Ok(stats) => stats,
        Err(e) => {
            warn!("Failed to compute statistics after import: {}", e);
            StatsSummary::default()
        }
    };

    info!(
        "Table now holds {} items in {} categories, total {:.2}",
        stats.total_items, stats.total_categories, stats.total_price
    );

    Ok(ImportReport { stats, diagnostics })
}

/// Export the whole table as a ZIP archive holding a single `data.csv`
pub fn handle_export(store: &dyn PriceStore) -> Result<Vec<u8>> {
    let prices = store.read_all()?;
    let csv_bytes = encode_prices(&prices)?;
    let archive = build_archive(EXPORT_ENTRY_NAME, &csv_bytes)?;

    info!(
        "Exported {} records ({} byte archive)",
        prices.len(),
        archive.len()
    );
    Ok(archive)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
